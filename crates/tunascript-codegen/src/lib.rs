//! The TunaScript code generator (spec §4.4): lowers a
//! [`tunascript_checker::CheckedProgram`] into a single WAT text module
//! targeting the Wasm-GC reference-type proposal. Consumes the checker's
//! output only; never re-derives types or re-resolves symbols itself.

mod context;
mod decl_gen;
mod error;
mod expr_gen;
mod functions_gen;
mod intrinsics;
mod jsx_gen;
mod module_gen;
mod names;
mod runtime_helpers;
mod sql_gen;
mod stmt_gen;
mod string_table;
mod wat_writer;

pub use context::Codegen;
pub use error::CodegenError;
pub use module_gen::{assemble, generate};
