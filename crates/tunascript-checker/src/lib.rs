//! The TunaScript type checker (spec §4.3): symbol table, scoping, type
//! inference, SQL schema validation, and JSX component resolution. Consumes
//! a [`tunascript_loader::LoadedProgram`] and produces a [`CheckedProgram`]
//! that the code generator reads without re-running inference.

mod checked_program;
mod checker;
mod expr_check;
mod jsx_check;
mod scope;
mod sql_check;
mod stmt_check;
mod symbol;
mod table_registry;
mod type_resolve;

pub use checked_program::{CheckedProgram, JsxComponentUse, ModuleInfo};
pub use checker::check_program;
pub use symbol::{Symbol, SymbolId, SymbolKind, SymbolTable};
pub use table_registry::{TableColumnSchema, TableRegistry, TableSchema};
pub use type_resolve::{resolve_type_expr, TypeAliasDef, TypeEnv};
