use std::fmt;

use shade_model::{ShaderStage, SourceLanguage};

/// Instruction opcodes. The low half of an instruction's first word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    Source = 1,
    EntryPoint = 2,
    Extension = 3,
    Token = 4,
}

impl Opcode {
    pub fn from_word(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Source),
            2 => Some(Self::EntryPoint),
            3 => Some(Self::Extension),
            4 => Some(Self::Token),
            _ => None,
        }
    }
}

/// Lexical class of a token instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    Number,
    Punct,
}

impl TokenKind {
    pub(crate) fn to_word(self) -> u32 {
        match self {
            Self::Ident => 0,
            Self::Number => 1,
            Self::Punct => 2,
        }
    }

    pub(crate) fn from_word(word: u32) -> Option<Self> {
        match word {
            0 => Some(Self::Ident),
            1 => Some(Self::Number),
            2 => Some(Self::Punct),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Surface language and version the module was compiled from.
    Source {
        language: SourceLanguage,
        version: u32,
        es: bool,
    },
    /// Stage and the entry point's name in the surface source.
    EntryPoint { stage: ShaderStage, name: String },
    /// An `#extension` line, forwarded verbatim (`GL_OES_standard_derivatives : enable`).
    Extension { text: String },
    /// One token of the canonicalised shader body.
    Token { kind: TokenKind, text: String },
}

impl Instruction {
    pub fn ident(text: impl Into<String>) -> Self {
        Self::Token {
            kind: TokenKind::Ident,
            text: text.into(),
        }
    }

    pub fn number(text: impl Into<String>) -> Self {
        Self::Token {
            kind: TokenKind::Number,
            text: text.into(),
        }
    }

    pub fn punct(text: impl Into<String>) -> Self {
        Self::Token {
            kind: TokenKind::Punct,
            text: text.into(),
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Source { .. } => Opcode::Source,
            Self::EntryPoint { .. } => Opcode::EntryPoint,
            Self::Extension { .. } => Opcode::Extension,
            Self::Token { .. } => Opcode::Token,
        }
    }

    /// Operand words following the opcode word.
    pub(crate) fn operands(&self) -> Vec<u32> {
        let mut words = Vec::new();
        match self {
            Self::Source {
                language,
                version,
                es,
            } => {
                words.push(language_word(*language));
                words.push(*version);
                words.push(u32::from(*es));
            }
            Self::EntryPoint { stage, name } => {
                words.push(stage_word(*stage));
                pack_string(name, &mut words);
            }
            Self::Extension { text } => pack_string(text, &mut words),
            Self::Token { kind, text } => {
                words.push(kind.to_word());
                pack_string(text, &mut words);
            }
        }
        words
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source {
                language,
                version,
                es,
            } => write!(f, "Source {language} {version}{}", if *es { " es" } else { "" }),
            Self::EntryPoint { stage, name } => write!(f, "EntryPoint {stage} \"{name}\""),
            Self::Extension { text } => write!(f, "Extension \"{text}\""),
            Self::Token { kind, text } => write!(f, "Token {kind:?} \"{text}\""),
        }
    }
}

pub(crate) fn language_word(language: SourceLanguage) -> u32 {
    match language {
        SourceLanguage::Glsl => 0,
        SourceLanguage::Hlsl => 1,
    }
}

pub(crate) fn language_from_word(word: u32) -> Option<SourceLanguage> {
    match word {
        0 => Some(SourceLanguage::Glsl),
        1 => Some(SourceLanguage::Hlsl),
        _ => None,
    }
}

pub(crate) fn stage_word(stage: ShaderStage) -> u32 {
    ShaderStage::ALL
        .iter()
        .position(|candidate| *candidate == stage)
        .map_or(0, |index| index as u32)
}

pub(crate) fn stage_from_word(word: u32) -> Option<ShaderStage> {
    ShaderStage::ALL.get(word as usize).copied()
}

/// Packs a string as NUL-terminated UTF-8, little-endian, zero padded to a
/// word boundary.
pub(crate) fn pack_string(text: &str, words: &mut Vec<u32>) {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    words.extend(
        bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
    );
}

/// Reads a packed string, returning it and the number of words consumed.
pub(crate) fn unpack_string(words: &[u32]) -> Option<(String, usize)> {
    let mut bytes = Vec::new();
    for (index, word) in words.iter().enumerate() {
        for byte in word.to_le_bytes() {
            if byte == 0 {
                let text = String::from_utf8(bytes).ok()?;
                return Some((text, index + 1));
            }
            bytes.push(byte);
        }
    }
    None
}
