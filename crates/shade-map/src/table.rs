//! The position table: an ordered generated -> original relation.

use shade_model::{MappingEntry, SourcePosition};

use crate::error::{MapError, Result, TablePhase};

/// Entries mapping positions in a generated text to positions in its input.
///
/// A table is built incrementally while a translation stage emits output and
/// sealed before it is queried or serialized. Once sealed, entries are sorted
/// by generated `(line, column)` and no two entries share a generated
/// position; when several entries were added for the same generated position
/// the last one added wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionTable {
    entries: Vec<MappingEntry>,
    phase: TablePhase,
}

impl Default for PositionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionTable {
    /// Creates an empty, open table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            phase: TablePhase::Open,
        }
    }

    /// Builds a sealed table from entries in any order.
    pub fn from_entries(entries: impl IntoIterator<Item = MappingEntry>) -> Self {
        let mut table = Self {
            entries: entries.into_iter().collect(),
            phase: TablePhase::Open,
        };
        table.seal();
        table
    }

    pub fn phase(&self) -> TablePhase {
        self.phase
    }

    pub fn is_sealed(&self) -> bool {
        self.phase == TablePhase::Sealed
    }

    /// Appends a mapping. Fails once the table is sealed.
    pub fn add(
        &mut self,
        generated: SourcePosition,
        original: SourcePosition,
        name: Option<String>,
    ) -> Result<()> {
        self.push(MappingEntry {
            generated,
            original,
            name,
        })
    }

    pub fn push(&mut self, entry: MappingEntry) -> Result<()> {
        self.require(TablePhase::Open, "add")?;
        self.entries.push(entry);
        Ok(())
    }

    /// Sorts, deduplicates and freezes the table.
    ///
    /// Sealing an already sealed table does nothing.
    pub fn seal(&mut self) {
        if self.is_sealed() {
            return;
        }
        // Stable sort: entries for one generated position stay in insertion
        // order, so keeping the last of each run is last-write-wins.
        self.entries.sort_by_key(|entry| entry.generated.line_col());
        let mut deduped: Vec<MappingEntry> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match deduped.last_mut() {
                Some(last) if last.generated.line_col() == entry.generated.line_col() => {
                    *last = entry;
                }
                _ => deduped.push(entry),
            }
        }
        self.entries = deduped;
        self.phase = TablePhase::Sealed;
    }

    /// Consuming form of [`PositionTable::seal`].
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.seal();
        self
    }

    /// Returns the entry with the greatest generated position not after
    /// `generated`, or `None` when the query precedes every entry.
    ///
    /// The generated file index is not part of the ordering key.
    pub fn lookup(&self, generated: SourcePosition) -> Result<Option<&MappingEntry>> {
        self.require(TablePhase::Sealed, "lookup")?;
        Ok(self.find(generated))
    }

    pub(crate) fn find(&self, generated: SourcePosition) -> Option<&MappingEntry> {
        let key = generated.line_col();
        let index = self
            .entries
            .partition_point(|entry| entry.generated.line_col() <= key);
        index.checked_sub(1).map(|index| &self.entries[index])
    }

    /// Entries in table order (insertion order while open).
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MappingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn require(&self, required: TablePhase, operation: &'static str) -> Result<()> {
        if self.phase == required {
            Ok(())
        } else {
            Err(MapError::InvalidState {
                operation,
                required,
                actual: self.phase,
            })
        }
    }
}

impl<'a> IntoIterator for &'a PositionTable {
    type Item = &'a MappingEntry;
    type IntoIter = std::slice::Iter<'a, MappingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, column: u32) -> SourcePosition {
        SourcePosition::generated(line, column)
    }

    #[test]
    fn add_after_seal_is_invalid_state() {
        let mut table = PositionTable::new();
        table.add(pos(1, 0), pos(1, 0), None).unwrap();
        table.seal();
        let err = table.add(pos(2, 0), pos(2, 0), None).unwrap_err();
        assert!(matches!(
            err,
            MapError::InvalidState {
                operation: "add",
                required: TablePhase::Open,
                actual: TablePhase::Sealed,
            }
        ));
    }

    #[test]
    fn lookup_before_seal_is_invalid_state() {
        let table = PositionTable::new();
        assert!(matches!(
            table.lookup(pos(1, 0)),
            Err(MapError::InvalidState { .. })
        ));
    }

    #[test]
    fn seal_sorts_and_keeps_last_write() {
        let mut table = PositionTable::new();
        table.add(pos(2, 4), pos(9, 9), None).unwrap();
        table.add(pos(1, 0), pos(1, 1), None).unwrap();
        table.add(pos(2, 4), pos(3, 3), Some("x".into())).unwrap();
        table.seal();

        let entries = table.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].generated, pos(1, 0));
        assert_eq!(entries[1].original, pos(3, 3));
        assert_eq!(entries[1].name.as_deref(), Some("x"));
    }

    #[test]
    fn second_seal_is_a_no_op() {
        let mut table = PositionTable::new();
        table.add(pos(3, 0), pos(1, 0), None).unwrap();
        table.add(pos(1, 0), pos(2, 0), None).unwrap();
        table.seal();
        let snapshot = table.clone();
        table.seal();
        assert_eq!(table, snapshot);
    }

    #[test]
    fn lookup_attributes_gaps_to_preceding_entry() {
        let table = PositionTable::from_entries([
            MappingEntry::new(pos(1, 0), pos(10, 0)),
            MappingEntry::new(pos(1, 8), pos(10, 5)),
            MappingEntry::new(pos(3, 2), pos(12, 0)),
        ]);

        assert_eq!(table.lookup(pos(1, 8)).unwrap().unwrap().original, pos(10, 5));
        assert_eq!(table.lookup(pos(2, 40)).unwrap().unwrap().original, pos(10, 5));
        assert_eq!(table.lookup(pos(9, 0)).unwrap().unwrap().original, pos(12, 0));
        assert!(PositionTable::from_entries([MappingEntry::new(pos(2, 0), pos(1, 0))])
            .lookup(pos(1, 5))
            .unwrap()
            .is_none());
    }

    #[test]
    fn empty_table_has_no_mapping() {
        let table = PositionTable::new().sealed();
        assert!(table.lookup(pos(1, 0)).unwrap().is_none());
        assert!(table.is_empty());
    }
}
