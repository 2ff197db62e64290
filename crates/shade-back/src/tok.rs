//! Working tokens for the lowering passes.

use std::ops::Range;

use shade_ir::TokenKind;
use shade_model::SourcePosition;

/// A token being lowered. `origin` is the IR position it derives from and
/// is what the emitted text maps back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tok {
    pub kind: TokenKind,
    pub text: String,
    pub origin: SourcePosition,
    /// Original spelling when lowering renamed the token.
    pub name: Option<String>,
}

impl Tok {
    pub fn new(kind: TokenKind, text: impl Into<String>, origin: SourcePosition) -> Self {
        Self {
            kind,
            text: text.into(),
            origin,
            name: None,
        }
    }

    pub fn ident(text: impl Into<String>, origin: SourcePosition) -> Self {
        Self::new(TokenKind::Ident, text, origin)
    }

    pub fn punct(text: impl Into<String>, origin: SourcePosition) -> Self {
        Self::new(TokenKind::Punct, text, origin)
    }

    pub fn number(text: impl Into<String>, origin: SourcePosition) -> Self {
        Self::new(TokenKind::Number, text, origin)
    }

    /// The same position and kind with new text, remembering the old
    /// spelling as the symbol name.
    #[must_use]
    pub fn renamed(&self, text: impl Into<String>) -> Self {
        Self {
            kind: self.kind,
            text: text.into(),
            origin: self.origin,
            name: self.name.clone().or_else(|| Some(self.text.clone())),
        }
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }
}

/// Builds a token sequence from space-separated source text, every token
/// taking `origin`.
pub fn synth(text: &str, origin: SourcePosition) -> Vec<Tok> {
    text.split_whitespace()
        .map(|word| {
            let first = word.chars().next().unwrap_or(' ');
            let kind = if first.is_ascii_alphabetic() || first == '_' || word.starts_with("[[") {
                TokenKind::Ident
            } else if first.is_ascii_digit() {
                TokenKind::Number
            } else {
                TokenKind::Punct
            };
            Tok::new(kind, word, origin)
        })
        .collect()
}

/// Index of the bracket closing the one at `open`.
pub fn matching_close(tokens: &[Tok], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        match token.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Argument ranges of the call whose `(` is at `open`, plus the index of
/// the closing `)`.
pub fn call_args(tokens: &[Tok], open: usize) -> Option<(Vec<Range<usize>>, usize)> {
    let close = matching_close(tokens, open)?;
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    for index in open + 1..close {
        match tokens[index].text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth = depth.saturating_sub(1),
            "," if depth == 0 => {
                args.push(start..index);
                start = index + 1;
            }
            _ => {}
        }
    }
    if start < close {
        args.push(start..close);
    }
    Some((args, close))
}

/// Whether the identifier at `index` is called (`name(`).
pub fn is_call(tokens: &[Tok], index: usize) -> bool {
    tokens[index].is_ident() && tokens.get(index + 1).is_some_and(|next| next.is("("))
}

/// Identifier as a C identifier (`basic.vert` -> `basic_vert`).
pub fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect();
    if out.chars().next().is_none_or(|ch| ch.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}
