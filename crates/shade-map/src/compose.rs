//! Map composition: fusing `A -> B` and `B -> C` into `A -> C`.

use shade_model::{MappingEntry, SourcePosition};

use crate::source_map::SourceMap;
use crate::table::PositionTable;

/// Result of composing two maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub map: SourceMap,
    /// Generated positions of `bc` whose intermediate position has no
    /// origin in `ab`. They are left unmapped.
    pub gaps: Vec<SourcePosition>,
}

impl Composition {
    pub fn gap_count(&self) -> usize {
        self.gaps.len()
    }
}

/// Composes `ab` (A -> B) with `bc` (B -> C).
///
/// Every entry `(c, b)` of `bc` is resolved through `ab.lookup(b)`; hits
/// become `(c, a)` and misses are reported as gaps. The result describes
/// `bc`'s generated file in terms of `ab`'s sources. A symbol name from
/// `ab` takes precedence over one from `bc`.
pub fn compose(ab: &SourceMap, bc: &SourceMap) -> Composition {
    let mut entries = Vec::with_capacity(bc.mappings().len());
    let mut gaps = Vec::new();

    for entry in bc.mappings() {
        let intermediate = SourcePosition::generated(entry.original.line, entry.original.column);
        match ab.lookup(intermediate) {
            Some(origin) => entries.push(MappingEntry {
                generated: entry.generated,
                original: origin.original,
                name: origin.name.clone().or_else(|| entry.name.clone()),
            }),
            None => gaps.push(entry.generated),
        }
    }

    let map = SourceMap::new(
        bc.file(),
        ab.sources().to_vec(),
        ab.sources_content().map(<[Option<String>]>::to_vec),
        PositionTable::from_entries(entries),
    );
    Composition { map, gaps }
}

/// Composes a chain of maps left to right, `maps[0]` being the first
/// translation step. Gaps from every step are collected.
pub fn compose_chain<'a>(maps: impl IntoIterator<Item = &'a SourceMap>) -> Option<Composition> {
    let mut maps = maps.into_iter();
    let first = maps.next()?.clone();
    let mut acc = Composition {
        map: first,
        gaps: Vec::new(),
    };
    for next in maps {
        let step = compose(&acc.map, next);
        acc.gaps.extend(step.gaps);
        acc.map = step.map;
    }
    Some(acc)
}
