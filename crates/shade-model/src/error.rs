use thiserror::Error;

/// Errors raised while parsing model values from user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown shader stage: {0}")]
    UnknownStage(String),
    #[error("unknown target profile: {0}")]
    UnknownProfile(String),
    #[error("invalid profile version '{value}' for {profile}")]
    InvalidVersion { profile: String, value: String },
    #[error("invalid define '{0}': expected NAME or NAME=VALUE")]
    InvalidDefine(String),
    #[error("invalid exclusion '{0}': expected STAGE:PROFILE")]
    InvalidExclusion(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
