//! Position tables, source maps and map composition.
//!
//! A [`PositionTable`] is built while a translation step emits output and
//! sealed before use. [`SourceMapBuilder`] wraps a table with the identity of
//! the files involved and seals into a [`SourceMap`]. [`compose`] fuses the
//! maps of consecutive steps into one end-to-end map, and [`codec`] converts
//! tables to and from the source map v3 `mappings` string.

pub mod builder;
pub mod codec;
pub mod compose;
pub mod error;
pub mod source_map;
pub mod table;

pub use builder::SourceMapBuilder;
pub use codec::EncodedMappings;
pub use compose::{Composition, compose, compose_chain};
pub use error::{CodecError, MapError, Result, TablePhase};
pub use source_map::{SourceMap, SourceMapDocument};
pub use table::PositionTable;
