//! Diagnostics and the compiler's error taxonomy.
//!
//! Every error the compiler core can raise is one of the five kinds in
//! [`CompileError`]. Parse and codegen errors abort the current file; type
//! errors accumulate so that a single run can report many problems at once
//! (see the propagation policy in the specification's error-handling
//! section).

use crate::position::LineMap;
use crate::span::Span;
use std::fmt;

/// Severity of a diagnostic. The compiler core only ever produces `Error`
/// today; `Warning` exists for forward compatibility with lint-like checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Severity {
    Warning,
    Error,
}

/// A single error or warning, anchored to the exact AST node that caused it
/// (never the containing statement — see the diagnostic-spans design note).
#[derive(Clone, Debug, serde::Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub span: Span,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error(file: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            span,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Render as `{line}:{col}: {message}`, per the user-visible presentation
    /// rule: spans always reference the original source file, and offsets
    /// are 1-indexed for humans even though `Span` itself is 0-indexed bytes.
    #[must_use]
    pub fn render(&self, source: &str) -> String {
        let map = LineMap::build(source);
        let pos = map.offset_to_position(self.span.start, source);
        format!("{}:{}: {}", pos.line + 1, pos.character + 1, self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.span, self.message)
    }
}

/// The compiler's error taxonomy. Each phase only ever returns its own
/// variant; [`CompileError::Many`] is how the checker reports an accumulated
/// batch of [`Diagnostic`]s for a single compile.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CompileError {
    /// Forbidden syntax: stray semicolons, BOM, malformed tokens, grammar
    /// violations.
    #[error("{0}")]
    Parse(Diagnostic),

    /// A module could not be resolved: unknown specifier, missing file, I/O
    /// failure surfaced verbatim.
    #[error("{0}")]
    Import(Diagnostic),

    /// Assignability/unification failure, unresolved symbol, wrong arity,
    /// SQL mismatch, JSX misuse, shadowing, `?` outside an error-returning
    /// function, and the rest of the semantic-layer failures.
    #[error("{0}")]
    Type(Diagnostic),

    /// An impossible lowering or unknown intrinsic use during WAT emission.
    #[error("{0}")]
    Codegen(Diagnostic),

    /// The external WAT-to-WASM assembler rejected the emitted module.
    #[error("assembly failed: {0}")]
    Assembly(String),

    /// The checker accumulated more than one diagnostic across the program.
    /// Callers that want a single error should use [`CompileError::first`].
    #[error("{} errors", .0.len())]
    Many(Vec<Diagnostic>),
}

impl CompileError {
    /// The compiler's public result carries the first accumulated error when
    /// callers ask for a single error, and the full list otherwise.
    #[must_use]
    pub fn first(&self) -> Option<&Diagnostic> {
        match self {
            CompileError::Parse(d)
            | CompileError::Import(d)
            | CompileError::Type(d)
            | CompileError::Codegen(d) => Some(d),
            CompileError::Many(diags) => diags.first(),
            CompileError::Assembly(_) => None,
        }
    }

    /// All diagnostics carried by this error, in source order.
    #[must_use]
    pub fn all(&self) -> Vec<&Diagnostic> {
        match self {
            CompileError::Parse(d)
            | CompileError::Import(d)
            | CompileError::Type(d)
            | CompileError::Codegen(d) => vec![d],
            CompileError::Many(diags) => diags.iter().collect(),
            CompileError::Assembly(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_produces_one_indexed_line_and_column() {
        let source = "const a = 1\nconst b = +\n";
        let span = Span::new(23, 24);
        let diag = Diagnostic::error("main.tuna", span, "unexpected token");
        assert_eq!(diag.render(source), "2:12: unexpected token");
    }

    #[test]
    fn many_reports_the_first_error_in_source_order() {
        let d1 = Diagnostic::error("main.tuna", Span::new(0, 1), "first");
        let d2 = Diagnostic::error("main.tuna", Span::new(5, 6), "second");
        let err = CompileError::Many(vec![d1.clone(), d2]);
        assert_eq!(err.first().unwrap().message, d1.message);
        assert_eq!(err.all().len(), 2);
    }
}
