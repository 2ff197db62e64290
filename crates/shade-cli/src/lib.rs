//! CLI library components for the shade cross-compiler.

pub mod cli;
pub mod logging;
pub mod overrides;
