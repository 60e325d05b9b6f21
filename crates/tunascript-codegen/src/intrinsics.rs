//! Marshaling for the three built-in import classes host modules declare:
//! plain host calls (`log`, `stringify`, filesystem, HTTP, SQL, ...),
//! generic array helpers whose type parameters the checker infers rather
//! than declares (`map`/`filter`/`reduce`/`range`/`length`), and `gc`, which
//! takes no arguments and returns nothing.

use tunascript_checker::SymbolId;
use tunascript_parser::ast::TypeExpr;

use crate::context::Codegen;
use crate::error::CodegenError;
use crate::names::wat_name;

/// The WAT type used at an import boundary for one declared parameter or
/// return type. `integer` crosses as a raw `i64`; `bool` as a raw `i32`;
/// everything else (including every array, object, and union type) crosses
/// boxed, since the host side only ever sees one uniform reference shape.
#[must_use]
pub fn abi_type(te: &TypeExpr) -> &'static str {
    match te {
        TypeExpr::Named(name, _) if name == "integer" => "i64",
        TypeExpr::Named(name, _) if name == "bool" => "i32",
        _ => "(ref $boxed)",
    }
}

#[must_use]
fn abi_result(ret: Option<&TypeExpr>) -> Option<&'static str> {
    match ret {
        None => None,
        Some(TypeExpr::Named(name, _)) if name == "void" => None,
        Some(te) => Some(abi_type(te)),
    }
}

impl Codegen<'_> {
    /// Emit `(import "env" "{name}" (func ${module_id}_{name} ...))` for
    /// every extern function declared in a built-in module. Called once per
    /// compile, before any function bodies are lowered, so every call site
    /// can assume the import already exists.
    pub fn emit_builtin_imports(&mut self) {
        let mut paths: Vec<&String> = self.program.modules.keys().collect();
        paths.sort();
        for path in paths {
            let info = &self.program.modules[path];
            for decl in &info.module.declarations {
                if let tunascript_parser::ast::Declaration::ExternFunction(ext) = decl {
                    let module_id = self.module_ids.id_of(path);
                    let wat_fn = wat_name(module_id, &ext.name);
                    let mut sig = String::new();
                    sig.push_str(&format!("(import \"env\" \"{}\" (func {wat_fn}", ext.name));
                    for p in &ext.params {
                        let t = p.type_annotation.as_ref().map_or("(ref $boxed)", abi_type);
                        sig.push_str(&format!(" (param {t})"));
                    }
                    if let Some(result) = abi_result(ext.ret.as_ref()) {
                        sig.push_str(&format!(" (result {result})"));
                    }
                    sig.push_str("))");
                    self.imports.line(sig);
                }
            }
        }
    }

    /// Lower a call to a generic array built-in (`map`/`filter`/`reduce`)
    /// whose second argument is always a function value. These cross the
    /// host boundary as `(array, fnvalue-name, ...)` so the runtime can
    /// invoke the callback through the dispatcher.
    pub fn lower_generic_array_call(
        &mut self,
        module_path: &str,
        name: &str,
        args: &[String],
    ) -> Result<String, CodegenError> {
        let module_id = self.module_ids.id_of("array");
        let wat_fn = wat_name(module_id, name);
        Ok(format!("(call {wat_fn} {})", args.join(" ")))
    }

    #[must_use]
    pub fn symbol_is_extern(&self, sym: SymbolId) -> bool {
        let resolved = self.program.symbols.resolve_alias(sym);
        matches!(
            self.program.symbols.get(resolved).kind,
            tunascript_checker::SymbolKind::Builtin
        )
    }
}
