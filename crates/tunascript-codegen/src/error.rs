//! Codegen's error type (spec §7 "CodegenError"): an impossible lowering or
//! an unknown intrinsic use during WAT emission. Codegen errors abort the
//! compile immediately rather than accumulating like type errors.

use tunascript_common::{CompileError, Diagnostic, Span};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct CodegenError(pub Diagnostic);

impl CodegenError {
    #[must_use]
    pub fn new(file: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self(Diagnostic::error(file, span, message))
    }
}

impl From<CodegenError> for CompileError {
    fn from(err: CodegenError) -> Self {
        CompileError::Codegen(err.0)
    }
}
