use shade_map::MapError;
use shade_model::{Diagnostic, DiagnosticOrigin};
use thiserror::Error;

/// The surface source did not compile. No IR is produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("front end rejected the source ({} diagnostics)", .diagnostics.len())]
pub struct FrontEndError {
    pub diagnostics: Vec<Diagnostic>,
}

impl FrontEndError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

impl From<MapError> for FrontEndError {
    fn from(err: MapError) -> Self {
        Self::new(vec![Diagnostic::error(
            DiagnosticOrigin::FrontEnd,
            format!("position map: {err}"),
        )])
    }
}
