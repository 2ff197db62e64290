use shade_model::SourcePosition;

use crate::error::Result;
use crate::source_map::SourceMap;
use crate::table::PositionTable;

/// Accumulates the mappings and source identities of one translation step.
#[derive(Debug, Clone, Default)]
pub struct SourceMapBuilder {
    file: String,
    table: PositionTable,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
}

impl SourceMapBuilder {
    /// Starts a map for the generated file `file`.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    /// Registers an original file and returns its index. Registering the
    /// same name twice returns the first index; content given later fills a
    /// missing one.
    pub fn add_source(&mut self, name: impl Into<String>, content: Option<String>) -> u32 {
        let name = name.into();
        if let Some(index) = self.sources.iter().position(|source| *source == name) {
            if self.sources_content[index].is_none() {
                self.sources_content[index] = content;
            }
            return index as u32;
        }
        self.sources.push(name);
        self.sources_content.push(content);
        (self.sources.len() - 1) as u32
    }

    pub fn add(
        &mut self,
        generated: SourcePosition,
        original: SourcePosition,
        name: Option<String>,
    ) -> Result<()> {
        self.table.add(generated, original, name)
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Seals into a map over the registered sources, embedding whatever
    /// content was registered with them.
    pub fn finish(self) -> SourceMap {
        let content = self
            .sources_content
            .iter()
            .any(Option::is_some)
            .then_some(self.sources_content);
        SourceMap::new(self.file, self.sources, content, self.table)
    }

    /// Seals into a map over an explicit source list.
    pub fn seal(
        self,
        sources: Vec<String>,
        sources_content: Option<Vec<Option<String>>>,
    ) -> SourceMap {
        SourceMap::new(self.file, sources, sources_content, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_sources_once() {
        let mut builder = SourceMapBuilder::new("out.glsl");
        assert_eq!(builder.add_source("a.frag", None), 0);
        assert_eq!(builder.add_source("inc.glsl", Some("x".into())), 1);
        assert_eq!(builder.add_source("a.frag", Some("y".into())), 0);

        builder
            .add(SourcePosition::generated(1, 0), SourcePosition::new(1, 1, 0), None)
            .unwrap();
        let map = builder.finish();
        assert_eq!(map.file(), "out.glsl");
        assert_eq!(map.sources(), ["a.frag", "inc.glsl"]);
        assert_eq!(
            map.sources_content(),
            Some(&[Some("y".to_string()), Some("x".to_string())][..])
        );
        assert!(map.mappings().is_sealed());
    }

    #[test]
    fn seal_uses_explicit_sources() {
        let mut builder = SourceMapBuilder::new("out.hlsl");
        builder
            .add(SourcePosition::generated(1, 0), SourcePosition::new(0, 4, 2), None)
            .unwrap();
        let map = builder.seal(vec!["<ir>".into()], None);
        assert_eq!(map.sources(), ["<ir>"]);
        assert!(map.sources_content().is_none());
        assert_eq!(map.mappings().len(), 1);
    }
}
