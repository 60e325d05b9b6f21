//! Checker output persisted for the code generator: per-module symbol
//! tables, per-expression types, per-identifier symbol bindings, JSX
//! component resolutions, and the table registry (data model §3 "Checker
//! state").

use rustc_hash::FxHashMap;
use tunascript_common::{Diagnostic, Span};
use tunascript_parser::ast::Module;
use tunascript_solver::Type;

use crate::symbol::{SymbolId, SymbolTable};
use crate::table_registry::TableRegistry;

/// A JSX custom-component call site's resolution: which function it calls
/// and the props object type it was checked against.
#[derive(Debug, Clone)]
pub struct JsxComponentUse {
    pub component: SymbolId,
    pub props_ty: Type,
}

/// Everything the checker recorded about one loaded module.
#[derive(Debug)]
pub struct ModuleInfo {
    pub path: String,
    pub module: Module,
    /// Exported name -> symbol, for import resolution by other modules.
    pub exports: FxHashMap<String, SymbolId>,
    /// Every top-level name visible inside this module (exported or not).
    pub top_level: FxHashMap<String, SymbolId>,
}

/// The full result of checking a loaded program (data model §3 "Checker
/// state"). Spans are keyed by byte offset since a single module's
/// expressions never collide in practice (checked one module at a time) —
/// keyed by `(module path, span)` to disambiguate across modules.
#[derive(Debug, Default)]
pub struct CheckedProgram {
    pub modules: FxHashMap<String, ModuleInfo>,
    pub symbols: SymbolTable,
    pub tables: TableRegistry,
    pub expr_types: FxHashMap<(String, Span), Type>,
    pub identifier_symbols: FxHashMap<(String, Span), SymbolId>,
    pub jsx_components: FxHashMap<(String, Span), JsxComponentUse>,
    pub errors: Vec<Diagnostic>,
    pub entry: String,
}

impl CheckedProgram {
    #[must_use]
    pub fn expr_type(&self, module: &str, span: Span) -> Option<&Type> {
        self.expr_types.get(&(module.to_string(), span))
    }

    #[must_use]
    pub fn identifier_symbol(&self, module: &str, span: Span) -> Option<SymbolId> {
        self.identifier_symbols.get(&(module.to_string(), span)).copied()
    }
}
