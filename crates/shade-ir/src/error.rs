use thiserror::Error;

/// Errors raised while decoding an IR byte buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("IR buffer length {0} is not a multiple of 4")]
    Unaligned(usize),

    #[error("IR buffer is shorter than the {0}-word header")]
    MissingHeader(usize),

    #[error("bad IR magic number {0:#010x}")]
    BadMagic(u32),

    #[error("unsupported IR version {0}")]
    UnsupportedVersion(u32),

    #[error("instruction {index} has a zero word count")]
    ZeroWordCount { index: usize },

    #[error("instruction {index} runs past the end of the buffer")]
    Truncated { index: usize },

    #[error("instruction {index} has unknown opcode {opcode}")]
    UnknownOpcode { index: usize, opcode: u16 },

    #[error("instruction {index} has an invalid {operand} operand")]
    InvalidOperand { index: usize, operand: &'static str },

    #[error("header declares {declared} instructions but the stream holds {actual}")]
    BoundMismatch { declared: u32, actual: usize },
}

pub type Result<T> = std::result::Result<T, IrError>;
