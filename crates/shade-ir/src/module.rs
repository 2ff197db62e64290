use shade_model::{ShaderStage, SourceLanguage, SourcePosition};

use crate::error::{IrError, Result};
use crate::instruction::{
    Instruction, Opcode, TokenKind, language_from_word, stage_from_word, unpack_string,
};

pub const MAGIC: u32 = 0x5348_4431;
pub const VERSION: u32 = 0x0001_0000;
pub const GENERATOR: u32 = 0x0000_0001;
pub const HEADER_WORDS: usize = 5;

/// Operand offset of a token's text, used as the column of its IR position.
pub const TOKEN_TEXT_OPERAND: u32 = 2;

/// Synthetic IR position of an instruction operand: the line is the
/// 1-based instruction index, the column the operand word offset.
pub fn ir_position(instruction: usize, operand: u32) -> SourcePosition {
    let line = u32::try_from(instruction + 1).unwrap_or(u32::MAX);
    SourcePosition::generated(line, operand)
}

/// Inverse of [`ir_position`]: the 0-based instruction index.
pub fn instruction_index(position: SourcePosition) -> Option<usize> {
    (position.line as usize).checked_sub(1)
}

/// A decoded IR module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    instructions: Vec<Instruction>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction and returns its index.
    pub fn push(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// `(language, version, es)` from the first `Source` instruction.
    pub fn source(&self) -> Option<(SourceLanguage, u32, bool)> {
        self.instructions.iter().find_map(|instruction| match instruction {
            Instruction::Source {
                language,
                version,
                es,
            } => Some((*language, *version, *es)),
            _ => None,
        })
    }

    pub fn entry_point(&self) -> Option<(usize, ShaderStage, &str)> {
        self.instructions
            .iter()
            .enumerate()
            .find_map(|(index, instruction)| match instruction {
                Instruction::EntryPoint { stage, name } => Some((index, *stage, name.as_str())),
                _ => None,
            })
    }

    pub fn extensions(&self) -> impl Iterator<Item = (usize, &str)> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(index, instruction)| match instruction {
                Instruction::Extension { text } => Some((index, text.as_str())),
                _ => None,
            })
    }

    /// Body tokens with their instruction indices.
    pub fn tokens(&self) -> impl Iterator<Item = (usize, TokenKind, &str)> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(index, instruction)| match instruction {
                Instruction::Token { kind, text } => Some((index, *kind, text.as_str())),
                _ => None,
            })
    }

    /// Serializes to little-endian words.
    pub fn encode(&self) -> Vec<u8> {
        let mut words = vec![
            MAGIC,
            VERSION,
            GENERATOR,
            u32::try_from(self.instructions.len()).unwrap_or(u32::MAX),
            0,
        ];
        for instruction in &self.instructions {
            let operands = instruction.operands();
            let word_count = (operands.len() + 1) as u32;
            words.push((word_count << 16) | u32::from(instruction.opcode() as u16));
            words.extend(operands);
        }
        words.iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(IrError::Unaligned(bytes.len()));
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        if words.len() < HEADER_WORDS {
            return Err(IrError::MissingHeader(HEADER_WORDS));
        }
        if words[0] != MAGIC {
            return Err(IrError::BadMagic(words[0]));
        }
        if words[1] != VERSION {
            return Err(IrError::UnsupportedVersion(words[1]));
        }
        let bound = words[3];

        let mut instructions = Vec::new();
        let mut cursor = HEADER_WORDS;
        while cursor < words.len() {
            let index = instructions.len();
            let word_count = (words[cursor] >> 16) as usize;
            let opcode = (words[cursor] & 0xffff) as u16;
            if word_count == 0 {
                return Err(IrError::ZeroWordCount { index });
            }
            let end = cursor + word_count;
            if end > words.len() {
                return Err(IrError::Truncated { index });
            }
            let operands = &words[cursor + 1..end];
            let opcode =
                Opcode::from_word(opcode).ok_or(IrError::UnknownOpcode { index, opcode })?;
            instructions.push(decode_instruction(index, opcode, operands)?);
            cursor = end;
        }

        if bound as usize != instructions.len() {
            return Err(IrError::BoundMismatch {
                declared: bound,
                actual: instructions.len(),
            });
        }
        Ok(Self { instructions })
    }
}

impl FromIterator<Instruction> for Module {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

fn decode_instruction(index: usize, opcode: Opcode, operands: &[u32]) -> Result<Instruction> {
    let invalid = |operand: &'static str| IrError::InvalidOperand { index, operand };
    let string = |words: &[u32], operand: &'static str| {
        unpack_string(words)
            .filter(|(_, used)| *used == words.len())
            .map(|(text, _)| text)
            .ok_or(invalid(operand))
    };

    match opcode {
        Opcode::Source => match operands {
            [language, version, es] => Ok(Instruction::Source {
                language: language_from_word(*language).ok_or(invalid("language"))?,
                version: *version,
                es: *es != 0,
            }),
            _ => Err(invalid("source")),
        },
        Opcode::EntryPoint => {
            let (stage, name) = operands.split_first().ok_or(invalid("stage"))?;
            Ok(Instruction::EntryPoint {
                stage: stage_from_word(*stage).ok_or(invalid("stage"))?,
                name: string(name, "name")?,
            })
        }
        Opcode::Extension => Ok(Instruction::Extension {
            text: string(operands, "text")?,
        }),
        Opcode::Token => {
            let (kind, text) = operands.split_first().ok_or(invalid("kind"))?;
            Ok(Instruction::Token {
                kind: TokenKind::from_word(*kind).ok_or(invalid("kind"))?,
                text: string(text, "text")?,
            })
        }
    }
}
