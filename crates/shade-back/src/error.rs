use shade_ir::IrError;
use shade_model::{Diagnostic, DiagnosticOrigin};
use thiserror::Error;

/// The IR could not be lowered to the requested target. No output is
/// produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("back end rejected the module ({} diagnostics)", .diagnostics.len())]
pub struct BackEndError {
    pub diagnostics: Vec<Diagnostic>,
}

impl BackEndError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub(crate) fn message(message: impl Into<String>) -> Self {
        Self::new(vec![Diagnostic::error(DiagnosticOrigin::BackEnd, message)])
    }
}

impl From<IrError> for BackEndError {
    fn from(err: IrError) -> Self {
        Self::message(format!("malformed IR: {err}"))
    }
}
