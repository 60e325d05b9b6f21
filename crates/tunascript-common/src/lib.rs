//! Common types and utilities shared across the TunaScript compiler core.
//!
//! This crate provides the foundation that every other compiler crate builds on:
//! - String interning (`Atom`, `Interner`)
//! - Source spans (`Span`, `Spanned`, `SpanBuilder`)
//! - Line/column position tracking (`LineMap`, `Position`)
//! - Numeric literal parsing
//! - Diagnostics (`Diagnostic`, `Severity`, `CompileError`)
//! - The source file registry shared by the loader, checker, and codegen

pub mod diagnostics;
pub mod interner;
pub mod numeric;
pub mod position;
pub mod source_file;
pub mod span;

pub use diagnostics::{CompileError, Diagnostic, Severity};
pub use interner::{Atom, Interner};
pub use position::{LineMap, Position, Range};
pub use source_file::{read_source_file, SourceFile, SourceId, SourceRegistry};
pub use span::{ByteSpan, Span, SpanBuilder, Spanned};
