//! The code generator's per-compile state (spec §3 "Code generator state"):
//! module id assignment, stable WAT names, the string intern table, the
//! lambda registry, and the local-variable scope stack used while lowering
//! one function body.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use tunascript_checker::{CheckedProgram, SymbolId};
use tunascript_common::Atom;
use tunascript_parser::ast::{FunctionLiteralBody, Param};
use tunascript_solver::Type;

use crate::names::ModuleIds;
use crate::string_table::StringTable;
use crate::wat_writer::WatWriter;

/// A pending function literal (lambda), discovered in source order while
/// lowering expressions. Each one is later emitted as its own WAT function
/// plus a function-value thunk (spec §4.4 "Function values and indirect
/// calls").
#[derive(Debug, Clone)]
pub struct LambdaDef {
    pub name: String,
    pub params: Vec<Param>,
    pub param_types: Vec<Type>,
    pub ret_type: Type,
    pub body: FunctionLiteralBody,
    /// The enclosing function's module id, so the lambda's captured
    /// top-level bindings resolve against the same module.
    pub module_id: u32,
    /// Free variables captured from the enclosing scope: (name, wat local
    /// or global reference, type). Lowered as extra leading parameters on
    /// the lambda's real body, invisible to the fnvalue thunk (which only
    /// ever supplies the declared parameters via the boxed-argument array).
    pub captures: Vec<(String, Type)>,
}

/// An entry-module top-level `export function` that needs a host-visible
/// wasm export (spec §4.4 "exported functions from the entry module get an
/// exported wrapper that calls `__ensure_init`"). Built by
/// [`crate::decl_gen`] while lowering declarations; consumed once, by
/// `module_gen`, after every module has been lowered.
#[derive(Debug, Clone)]
pub struct ExportedFunction {
    pub tuna_name: String,
    /// The real (unexported) function this wrapper forwards to.
    pub wat_fn: String,
    pub params: Vec<(String, &'static str)>,
    pub ret_wat: Option<&'static str>,
}

/// One local variable slot inside the function currently being lowered.
#[derive(Debug, Clone)]
pub struct LocalSlot {
    pub wat_name: String,
    pub ty: Type,
}

#[derive(Debug, Default)]
struct LocalScope {
    bindings: IndexMap<String, LocalSlot>,
}

/// Opaque snapshot of [`Codegen`]'s function-lowering state, produced by
/// [`Codegen::snapshot_function_state`].
pub struct FunctionStateSnapshot {
    scopes: Vec<LocalScope>,
    temp_counter: u32,
    pending_locals: Vec<(String, &'static str)>,
}

pub struct Codegen<'a> {
    pub program: &'a CheckedProgram,
    pub module_ids: ModuleIds,
    pub strings: StringTable,

    // Append-only output buffers, concatenated in order by `module_gen`
    // once every section is finished (design note "never backpatches").
    pub imports: WatWriter,
    pub globals: WatWriter,
    pub functions: WatWriter,

    pub lambdas: Vec<LambdaDef>,
    lambda_counter: u32,

    /// Every function-value thunk export name that must exist: one per
    /// top-level function/extern that is ever referenced as a value, plus
    /// one per lambda. Order-preserving so dispatcher emission is
    /// deterministic.
    pub fn_values: IndexSet<String>,

    /// Declared local-function WAT param/local signatures, keyed by the
    /// thunk export name, needed by the dispatcher and by `fnvalue` thunk
    /// bodies to know how to unbox each argument.
    pub fn_signatures: FxHashMap<String, (Vec<Type>, Type, String)>,

    scopes: Vec<LocalScope>,
    temp_counter: u32,

    /// Function-local declaration buffer (`(local $x i64)` lines),
    /// accumulated while lowering a body and flushed into the function
    /// signature once the body is fully lowered (locals must be declared
    /// before any code in WAT).
    pub pending_locals: Vec<(String, &'static str)>,

    /// Set once a module with any `create_table` is found; drives whether
    /// `register_tables` is called from `__init`.
    pub has_tables: bool,

    /// Entry-module exported functions awaiting a wasm-export wrapper;
    /// see [`ExportedFunction`].
    pub exported_functions: Vec<ExportedFunction>,
}

impl<'a> Codegen<'a> {
    #[must_use]
    pub fn new(program: &'a CheckedProgram) -> Self {
        Self {
            module_ids: ModuleIds::assign(program),
            strings: StringTable::new(),
            imports: WatWriter::new(),
            globals: WatWriter::new(),
            functions: WatWriter::new(),
            lambdas: Vec::new(),
            lambda_counter: 0,
            fn_values: IndexSet::new(),
            fn_signatures: FxHashMap::default(),
            scopes: vec![LocalScope::default()],
            temp_counter: 0,
            pending_locals: Vec::new(),
            has_tables: !program.tables.is_empty(),
            exported_functions: Vec::new(),
            program,
        }
    }

    pub fn globals_mut(&mut self) -> &mut WatWriter {
        &mut self.globals
    }

    pub fn intern(&mut self, s: &str) -> Atom {
        self.strings.intern(s)
    }

    #[must_use]
    pub fn string_global(&self, atom: Atom) -> String {
        self.strings.global_name(atom)
    }

    pub fn next_lambda_index(&mut self) -> u32 {
        let idx = self.lambda_counter;
        self.lambda_counter += 1;
        idx
    }

    pub fn next_temp(&mut self, prefix: &str) -> String {
        let idx = self.temp_counter;
        self.temp_counter += 1;
        format!("${prefix}{idx}")
    }

    pub fn reset_function_state(&mut self) {
        self.scopes = vec![LocalScope::default()];
        self.temp_counter = 0;
        self.pending_locals.clear();
    }

    /// Park the in-flight function-lowering state (scopes, temp counter,
    /// pending locals) so a nested function literal can be lowered in a
    /// fresh, isolated one, then restored with
    /// [`Self::restore_function_state`].
    pub fn snapshot_function_state(&mut self) -> FunctionStateSnapshot {
        FunctionStateSnapshot {
            scopes: std::mem::replace(&mut self.scopes, vec![LocalScope::default()]),
            temp_counter: std::mem::replace(&mut self.temp_counter, 0),
            pending_locals: std::mem::take(&mut self.pending_locals),
        }
    }

    /// Restore a previously parked function-lowering state, returning the
    /// `(local ...)` declarations accumulated while the nested function was
    /// being lowered so the caller can emit them in that function's own
    /// preamble.
    pub fn restore_function_state(&mut self, snapshot: FunctionStateSnapshot) -> Vec<(String, &'static str)> {
        let nested_locals = std::mem::replace(&mut self.pending_locals, snapshot.pending_locals);
        self.scopes = snapshot.scopes;
        self.temp_counter = snapshot.temp_counter;
        nested_locals
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(LocalScope::default());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declare a fresh local, registering it as a WAT `(local ...)` to be
    /// emitted in the function's preamble, and bind `name` to it in the
    /// current scope frame.
    pub fn declare_local(&mut self, name: &str, ty: &Type, wat_ty: &'static str) -> String {
        let wat_name = self.next_temp("local");
        self.pending_locals.push((wat_name.clone(), wat_ty));
        self.scopes.last_mut().expect("scope stack never empty").bindings.insert(
            name.to_string(),
            LocalSlot {
                wat_name: wat_name.clone(),
                ty: ty.clone(),
            },
        );
        wat_name
    }

    #[must_use]
    pub fn lookup_local(&self, name: &str) -> Option<&LocalSlot> {
        for scope in self.scopes.iter().rev() {
            if let Some(slot) = scope.bindings.get(name) {
                return Some(slot);
            }
        }
        None
    }

    /// The stable WAT name for a top-level symbol (a function, extern, or
    /// module-level const global), following its alias chain to the symbol
    /// that actually owns the declaration.
    #[must_use]
    pub fn symbol_wat_name(&self, sym: SymbolId) -> String {
        let resolved = self.program.symbols.resolve_alias(sym);
        let symbol = self.program.symbols.get(resolved);
        let module_id = self.module_ids.id_of(&symbol.owner_module);
        crate::names::wat_name(module_id, &symbol.name)
    }

    #[must_use]
    pub fn symbol_owner_and_name(&self, sym: SymbolId) -> (String, String) {
        let resolved = self.program.symbols.resolve_alias(sym);
        let symbol = self.program.symbols.get(resolved);
        (symbol.owner_module.clone(), symbol.name.clone())
    }
}
