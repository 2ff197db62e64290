//! The intermediate representation passed from the front end to the back
//! end.
//!
//! A module is a little-endian word stream: a five-word header (magic,
//! version, generator, instruction count, reserved schema word) followed by
//! instructions whose first word is `(word_count << 16) | opcode`.
//! Positions inside a module are expressed with [`ir_position`] so that the
//! front end's and the back end's source maps meet in the same coordinate
//! space.

pub mod error;
pub mod instruction;
pub mod module;

/// Name under which IR positions appear as a source in maps and
/// diagnostics.
pub const IR_SOURCE_NAME: &str = "<ir>";

pub use error::{IrError, Result};
pub use instruction::{Instruction, Opcode, TokenKind};
pub use module::{
    HEADER_WORDS, MAGIC, Module, TOKEN_TEXT_OPERAND, VERSION, instruction_index, ir_position,
};
