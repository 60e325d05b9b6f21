//! The loader's error taxonomy, convertible into the shared
//! [`tunascript_common::CompileError::Import`] / `::Parse` variants.

use tunascript_common::{CompileError, Diagnostic, Span};

#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error(
        "the library directory could not be located (set TUNASCRIPT_LIB_DIR or create a `lib/` directory)"
    )]
    LibraryNotFound,

    #[error("unknown built-in module `{0}`")]
    UnknownBuiltin(String),

    #[error("`{specifier}`: unsupported import specifier (expected a built-in module name or a `./`/`../` relative path)")]
    UnsupportedSpecifier {
        specifier: String,
        file: String,
        span: Span,
    },

    #[error("`{specifier}`: module not found")]
    ImportNotFound {
        specifier: String,
        file: String,
        span: Span,
    },

    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("{message}")]
    Parse {
        file: String,
        span: Span,
        message: String,
    },
}

impl LoadError {
    #[must_use]
    pub fn into_compile_error(self) -> CompileError {
        let message = self.to_string();
        match self {
            LoadError::UnsupportedSpecifier { file, span, .. }
            | LoadError::ImportNotFound { file, span, .. } => {
                CompileError::Import(Diagnostic::error(file, span, message))
            }
            LoadError::Parse { file, span, .. } => {
                CompileError::Parse(Diagnostic::error(file, span, message))
            }
            LoadError::LibraryNotFound | LoadError::Io { .. } | LoadError::UnknownBuiltin(_) => {
                CompileError::Import(Diagnostic::error("<compiler>", Span::dummy(), message))
            }
        }
    }
}
