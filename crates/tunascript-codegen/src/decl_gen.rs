//! Top-level declaration lowering: user functions become WAT functions,
//! top-level consts become globals (initialized eagerly when the
//! initializer is a literal, deferred into `__init` otherwise), and table
//! declarations contribute to the JSON blob `__init` hands to
//! `register_tables`. Extern function declarations are handled once, up
//! front, by [`crate::intrinsics::Codegen::emit_builtin_imports`]; type
//! aliases carry no runtime representation.

use tunascript_parser::ast::{ConstDecl, Declaration, ExprKind, FunctionDecl};
use tunascript_solver::Type;

use crate::context::Codegen;
use crate::error::CodegenError;
use crate::names::wat_name;

/// A top-level const whose initializer is not a compile-time literal, and so
/// must run inside `__init` rather than as a WAT global's constant
/// expression.
pub struct DeferredConstInit {
    pub global: String,
    pub module_path: String,
    pub init: tunascript_parser::ast::Expr,
    pub ty: Type,
}

impl Codegen<'_> {
    pub fn lower_module_declarations(
        &mut self,
        module_path: &str,
        deferred: &mut Vec<DeferredConstInit>,
    ) -> Result<(), CodegenError> {
        let decls = self.program.modules[module_path].module.declarations.clone();
        for decl in &decls {
            match decl {
                Declaration::Function(f) => self.lower_function_decl(module_path, f)?,
                Declaration::Const(c) => self.lower_const_decl(module_path, c, deferred)?,
                // A table declaration has no per-declaration WAT of its own;
                // the checker already built `program.tables`, and
                // `module_gen` serializes the whole registry to JSON once,
                // for the single `register_tables` call `__init` makes.
                Declaration::Table(_) | Declaration::ExternFunction(_) | Declaration::TypeAlias(_) => {}
            }
        }
        Ok(())
    }

    fn lower_function_decl(&mut self, module_path: &str, f: &FunctionDecl) -> Result<(), CodegenError> {
        let module_id = self.module_ids.id_of(module_path);
        let wat_fn = wat_name(module_id, &f.name);
        self.reset_function_state();
        self.push_scope();

        let (declared_params, ret_ty) = self.function_signature(module_path, &f.name);
        let mut param_types = Vec::with_capacity(f.params.len());
        let mut param_locals: Vec<(String, &'static str)> = Vec::with_capacity(f.params.len());
        let mut header = format!("(func {wat_fn}");
        for (p, ty) in f.params.iter().zip(declared_params.into_iter()) {
            let wat_ty: &'static str = if ty.is_reference_typed() { "(ref $boxed)" } else { primitive_wat_type(&ty) };
            let local = self.declare_local(&p.name, &ty, wat_ty);
            header.push_str(&format!(" (param {local} {wat_ty})"));
            param_locals.push((local, wat_ty));
            param_types.push(ty);
        }
        let ret_wat = if !ret_ty.is_void_like() {
            Some(if ret_ty.is_reference_typed() { "(ref $boxed)" } else { primitive_wat_type(&ret_ty) })
        } else {
            None
        };
        if let Some(rt) = ret_wat {
            header.push_str(&format!(" (result {rt})"));
        }

        let body = self.lower_block_as_function_body(module_path, &f.body, &ret_ty)?;
        self.pop_scope();

        self.functions.open(header);
        for (name, ty) in &self.pending_locals.clone() {
            self.functions.line(format!("(local {name} {ty})"));
        }
        self.functions.raw(&body);
        self.functions.close();
        self.functions.blank();

        if f.exported {
            self.fn_values.insert(crate::names::fnvalue_export_name(module_id, &f.name));
            self.fn_signatures.insert(
                crate::names::fnvalue_export_name(module_id, &f.name),
                (param_types, ret_ty.clone(), wat_fn.clone()),
            );
            // Only the entry module's own exported functions get a wasm-level
            // export; a library module's `export` only means "importable by
            // other TunaScript modules" (spec §4.2), not host-visible.
            if module_path == self.program.entry {
                self.exported_functions.push(crate::context::ExportedFunction {
                    tuna_name: f.name.clone(),
                    wat_fn,
                    params: param_locals,
                    ret_wat,
                });
            }
        }
        Ok(())
    }

    fn lower_const_decl(
        &mut self,
        module_path: &str,
        c: &ConstDecl,
        deferred: &mut Vec<DeferredConstInit>,
    ) -> Result<(), CodegenError> {
        let module_id = self.module_ids.id_of(module_path);
        let global = wat_name(module_id, &c.name);
        let ty = self
            .program
            .expr_type(module_path, c.init.span)
            .cloned()
            .unwrap_or(Type::Json);
        let wat_ty = if ty.is_reference_typed() { "(ref null $boxed)".to_string() } else { primitive_wat_type(&ty).to_string() };

        if let Some(text) = literal_const_text(&c.init.kind) {
            self.globals_mut().line(format!("(global {global} (mut {wat_ty}) ({text}))"));
        } else {
            let default = if ty.is_reference_typed() { "(ref.null $boxed)".to_string() } else { zero_value(&ty) };
            self.globals_mut().line(format!("(global {global} (mut {wat_ty}) ({default}))"));
            deferred.push(DeferredConstInit {
                global,
                module_path: module_path.to_string(),
                init: c.init.clone(),
                ty,
            });
        }
        Ok(())
    }

    /// The checker already resolved this function's full signature into its
    /// symbol's `Type::Func`; codegen reads it back rather than
    /// re-resolving the surface `TypeExpr` annotations itself.
    fn function_signature(&self, module_path: &str, name: &str) -> (Vec<Type>, Type) {
        let info = &self.program.modules[module_path];
        let Some(&sym) = info.top_level.get(name) else {
            return (Vec::new(), Type::Void);
        };
        match self.program.symbols.resolved_type(sym) {
            Type::Func(func_ty) => (func_ty.params.to_vec(), func_ty.ret.clone()),
            _ => (Vec::new(), Type::Void),
        }
    }
}

#[must_use]
pub fn primitive_wat_type(ty: &Type) -> &'static str {
    match ty.widen() {
        Type::I64 => "i64",
        Type::F64 => "f64",
        Type::Bool => "i32",
        Type::I32 => "i32",
        _ => "i64",
    }
}

#[must_use]
fn zero_value(ty: &Type) -> String {
    match primitive_wat_type(ty) {
        "f64" => "f64.const 0".to_string(),
        "i32" => "i32.const 0".to_string(),
        _ => "i64.const 0".to_string(),
    }
}

/// A constant-expression WAT initializer for the handful of literal shapes
/// a global's initializer is allowed to be; anything else returns `None`
/// and is instead run from `__init`.
fn literal_const_text(kind: &ExprKind) -> Option<String> {
    match kind {
        ExprKind::IntegerLiteral(n) => Some(format!("i64.const {n}")),
        ExprKind::FloatLiteral(n) => Some(format!("f64.const {n}")),
        ExprKind::BoolLiteral(b) => Some(format!("i32.const {}", i32::from(*b))),
        _ => None,
    }
}
