//! Pretty-printing of lowered tokens with position recording.

use shade_ir::TokenKind;
use shade_map::PositionTable;
use shade_model::{MappingEntry, SourcePosition};

use crate::tok::Tok;

const INDENT: usize = 4;
const CONTROL_KEYWORDS: [&str; 5] = ["if", "for", "while", "switch", "return"];

/// A verbatim line (`#version 330`) and the IR position it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub origin: SourcePosition,
}

impl Line {
    pub fn new(text: impl Into<String>, origin: SourcePosition) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }
}

/// Lowered output: verbatim header lines followed by body tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emission {
    pub header: Vec<Line>,
    pub tokens: Vec<Tok>,
}

/// Renders an emission one statement per line with four-space indentation.
/// Every header line and every token is recorded at its generated
/// position.
pub fn render(emission: &Emission) -> (String, PositionTable) {
    let mut writer = Writer::default();
    for line in &emission.header {
        writer.entries.push(MappingEntry::new(
            SourcePosition::generated(writer.line, 0),
            line.origin,
        ));
        writer.text.push_str(&line.text);
        writer.text.push('\n');
        writer.line += 1;
    }

    let tokens = &emission.tokens;
    for (index, token) in tokens.iter().enumerate() {
        let next = tokens.get(index + 1);
        match token.text.as_str() {
            "{" if token.kind == TokenKind::Punct => {
                writer.token(token, true);
                writer.depth += 1;
                writer.newline();
            }
            "}" if token.kind == TokenKind::Punct => {
                writer.newline();
                writer.depth = writer.depth.saturating_sub(1);
                writer.token(token, false);
                let joins = next.is_some_and(|next| next.is(";") || next.is(",") || next.is("else"));
                if !joins {
                    writer.newline();
                }
            }
            ";" if writer.parens == 0 => {
                writer.token(token, false);
                writer.newline();
            }
            _ => {
                let space = writer.space_before(token);
                writer.token(token, space);
            }
        }
    }
    writer.newline();

    let Writer { text, entries, .. } = writer;
    (text, PositionTable::from_entries(entries))
}

struct Writer {
    text: String,
    entries: Vec<MappingEntry>,
    line: u32,
    column: u32,
    depth: usize,
    parens: usize,
    at_line_start: bool,
    prev: Option<Tok>,
    prev_unary: bool,
}

impl Default for Writer {
    fn default() -> Self {
        Self {
            text: String::new(),
            entries: Vec::new(),
            line: 1,
            column: 0,
            depth: 0,
            parens: 0,
            at_line_start: true,
            prev: None,
            prev_unary: false,
        }
    }
}

impl Writer {
    fn newline(&mut self) {
        if !self.at_line_start {
            self.text.push('\n');
            self.line += 1;
            self.column = 0;
            self.at_line_start = true;
            self.prev = None;
            self.prev_unary = false;
        }
    }

    fn token(&mut self, token: &Tok, space: bool) {
        if self.at_line_start {
            let indent = self.depth * INDENT;
            self.text.extend(std::iter::repeat_n(' ', indent));
            self.column = indent as u32;
            self.at_line_start = false;
        } else if space {
            self.text.push(' ');
            self.column += 1;
        }

        self.entries.push(MappingEntry {
            generated: SourcePosition::generated(self.line, self.column),
            original: token.origin,
            name: token.name.clone(),
        });
        self.text.push_str(&token.text);
        self.column += token.text.chars().count() as u32;

        if token.kind == TokenKind::Punct {
            match token.text.as_str() {
                "(" => self.parens += 1,
                ")" => self.parens = self.parens.saturating_sub(1),
                _ => {}
            }
        }
        self.prev_unary = self.is_prefix(token);
        self.prev = Some(token.clone());
    }

    /// Whether `token`, about to be written after `self.prev`, is a prefix
    /// operator.
    fn is_prefix(&self, token: &Tok) -> bool {
        if token.kind != TokenKind::Punct
            || !matches!(token.text.as_str(), "-" | "+" | "!" | "~" | "++" | "--")
        {
            return false;
        }
        !self.prev_is_operand()
    }

    fn prev_is_operand(&self) -> bool {
        match &self.prev {
            None => false,
            Some(prev) => match prev.kind {
                TokenKind::Number => true,
                TokenKind::Ident => !CONTROL_KEYWORDS.contains(&prev.text.as_str()),
                TokenKind::Punct => matches!(prev.text.as_str(), ")" | "]"),
            },
        }
    }

    fn space_before(&self, token: &Tok) -> bool {
        let Some(prev) = &self.prev else {
            return false;
        };
        if self.prev_unary {
            return false;
        }
        let text = token.text.as_str();
        if matches!(prev.text.as_str(), "(" | "[" | ".") && prev.kind == TokenKind::Punct {
            return false;
        }
        if token.kind == TokenKind::Punct {
            match text {
                ")" | "]" | "," | ";" | "." | "[" => return false,
                "(" => {
                    let control = CONTROL_KEYWORDS.contains(&prev.text.as_str());
                    return match prev.kind {
                        TokenKind::Ident => control,
                        TokenKind::Punct => !matches!(prev.text.as_str(), ")" | "]"),
                        TokenKind::Number => true,
                    };
                }
                "++" | "--" if self.prev_is_operand() => return false,
                _ => {}
            }
        }
        true
    }
}
