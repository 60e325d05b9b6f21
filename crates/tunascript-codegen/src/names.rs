//! Stable name assignment (design note "Stable name assignment"): module ids
//! are assigned by sorted path order so the same input always produces
//! identical WAT, independent of the loader's (hash-map-backed) iteration
//! order.

use rustc_hash::FxHashMap;
use tunascript_checker::CheckedProgram;

/// Maps every loaded module's path/built-in name to a stable, sorted-order
/// integer id.
#[derive(Debug)]
pub struct ModuleIds {
    ids: FxHashMap<String, u32>,
}

impl ModuleIds {
    #[must_use]
    pub fn assign(program: &CheckedProgram) -> Self {
        let mut paths: Vec<&String> = program.modules.keys().collect();
        paths.sort();
        let ids = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| (path.clone(), i as u32))
            .collect();
        Self { ids }
    }

    #[must_use]
    pub fn id_of(&self, module_path: &str) -> u32 {
        *self
            .ids
            .get(module_path)
            .unwrap_or_else(|| panic!("module `{module_path}` was never assigned an id"))
    }
}

/// `$m{id}_{name}` — a symbol's stable WAT function/global name.
#[must_use]
pub fn wat_name(module_id: u32, name: &str) -> String {
    format!("$m{module_id}_{}", sanitize(name))
}

/// The export name used for a function-value thunk (spec §4.4 "Function
/// values and indirect calls"). This string is also what gets interned and
/// boxed as the runtime representation of a first-class function value.
#[must_use]
pub fn fnvalue_export_name(module_id: u32, name: &str) -> String {
    format!("m{module_id}_{}_fnvalue", sanitize(name))
}

#[must_use]
pub fn fnvalue_wat_name(module_id: u32, name: &str) -> String {
    format!("$m{module_id}_{}_fnvalue", sanitize(name))
}

/// A lambda (function literal) gets a synthetic name scoped to its
/// discovery order within the enclosing module, since it has no surface
/// name of its own.
#[must_use]
pub fn lambda_name(module_id: u32, index: u32) -> String {
    format!("$m{module_id}_lambda{index}")
}

#[must_use]
pub fn lambda_export_name(module_id: u32, index: u32) -> String {
    format!("m{module_id}_lambda{index}_fnvalue")
}

/// WAT identifiers are `[A-Za-z0-9_.$]`; every TunaScript identifier already
/// satisfies this (the lexer only accepts `[A-Za-z_][A-Za-z0-9_]*`), so this
/// is an identity function kept as a single seam in case a future builtin
/// needs characters WAT doesn't allow bare.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
