//! Call lowering and first-class function values. Direct calls to a
//! resolved top-level function or extern import become a plain `call`;
//! calling through a value of function type (a variable holding a
//! function, a callback parameter, the result of some other expression)
//! goes through `$dispatch_fnvalue`, a string-keyed chain over every
//! function ever observed as a value, since this generator's boxed
//! representation has no indirect-call table to target instead.
//!
//! Function literals compile to ordinary top-level-shaped WAT functions
//! with no captured environment: a literal may only reference its own
//! parameters and module-level bindings, the same as a named function
//! declaration. Recorded as an Open Question resolution in DESIGN.md.

use tunascript_checker::SymbolId;
use tunascript_parser::ast::{Expr, ExprKind, FunctionLiteralBody, Param, TypeExpr};
use tunascript_solver::Type;

use crate::context::Codegen;
use crate::decl_gen::primitive_wat_type;
use crate::error::CodegenError;

impl Codegen<'_> {
    pub fn lower_call(&mut self, module_path: &str, expr: &Expr, ty: &Type) -> Result<String, CodegenError> {
        match &expr.kind {
            ExprKind::Call { callee, args, .. } => self.lower_plain_call(module_path, callee, args, ty),
            ExprKind::MethodCall { receiver, method, args, .. } => {
                self.lower_method_call(module_path, expr, receiver, method, args, ty)
            }
            _ => unreachable!("lower_call only handles Call/MethodCall expressions"),
        }
    }

    fn lower_plain_call(&mut self, module_path: &str, callee: &Expr, args: &[Expr], ty: &Type) -> Result<String, CodegenError> {
        if let ExprKind::Identifier(_) = &callee.kind {
            if self.lookup_local(ident_name(callee)).is_none() {
                if let Some(sym) = self.program.identifier_symbol(module_path, callee.span) {
                    let resolved = self.program.symbols.resolve_alias(sym);
                    let kind = self.program.symbols.get(resolved).kind;
                    if matches!(kind, tunascript_checker::SymbolKind::Func | tunascript_checker::SymbolKind::Builtin) {
                        let refs: Vec<&Expr> = args.iter().collect();
                        return self.lower_direct_call(module_path, sym, &refs, ty);
                    }
                }
            }
        }
        self.lower_indirect_call(module_path, callee, args, ty)
    }

    fn lower_method_call(
        &mut self,
        module_path: &str,
        expr: &Expr,
        receiver: &Expr,
        method: &str,
        args: &[Expr],
        ty: &Type,
    ) -> Result<String, CodegenError> {
        let Some(sym) = self.program.identifier_symbol(module_path, expr.span) else {
            return Err(CodegenError::new(module_path, expr.span, format!("unresolved method `{method}` reached codegen")));
        };
        let resolved = self.program.symbols.resolve_alias(sym);
        let kind = self.program.symbols.get(resolved).kind;
        if !matches!(kind, tunascript_checker::SymbolKind::Func | tunascript_checker::SymbolKind::Builtin) {
            return Err(CodegenError::new(module_path, expr.span, format!("`{method}` does not resolve to a callable symbol")));
        }
        let mut refs: Vec<&Expr> = Vec::with_capacity(args.len() + 1);
        refs.push(receiver);
        refs.extend(args.iter());
        self.lower_direct_call(module_path, sym, &refs, ty)
    }

    fn lower_direct_call(&mut self, module_path: &str, sym: SymbolId, args: &[&Expr], ty: &Type) -> Result<String, CodegenError> {
        let resolved = self.program.symbols.resolve_alias(sym);
        let is_extern = self.symbol_is_extern(sym);
        let (owner, name) = self.symbol_owner_and_name(sym);
        let (param_types, ret_ty) = match self.program.symbols.resolved_type(resolved) {
            Type::Func(ft) => (ft.params.to_vec(), ft.ret.clone()),
            _ => (Vec::new(), Type::Void),
        };

        let mut lowered = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let arg_ty = self.expr_ty(module_path, arg);
            let value = self.lower_expr(module_path, arg)?;
            let target = param_types.get(i).cloned().unwrap_or_else(|| arg_ty.clone());
            let coerced = if is_extern {
                self.coerce_extern_arg(&value, &arg_ty, &target)
            } else {
                self.coerce_user_arg(&value, &arg_ty, &target)
            };
            lowered.push(coerced);
        }

        if is_extern && owner == "array" && matches!(name.as_str(), "map" | "filter" | "reduce") {
            let call = self.lower_generic_array_call(&owner, &name, &lowered)?;
            return Ok(self.finish_call_result(call, &ret_ty, ty, is_extern));
        }

        let wat_fn = self.symbol_wat_name(sym);
        let call = format!("(call {wat_fn} {})", lowered.join(" "));
        Ok(self.finish_call_result(call, &ret_ty, ty, is_extern))
    }

    fn lower_indirect_call(&mut self, module_path: &str, callee: &Expr, args: &[Expr], ty: &Type) -> Result<String, CodegenError> {
        let callee_wat = self.lower_expr(module_path, callee)?;
        let mut boxed_args = Vec::with_capacity(args.len());
        for arg in args {
            let arg_ty = self.expr_ty(module_path, arg);
            let value = self.lower_expr(module_path, arg)?;
            boxed_args.push(if arg_ty.is_reference_typed() { value } else { self.box_raw(&value, &arg_ty.widen()) });
        }
        let args_arr = format!("(array.new_fixed $valarr {} {})", boxed_args.len(), boxed_args.join(" "));
        let call = format!("(call $dispatch_fnvalue (call $unbox_funcname {callee_wat}) {args_arr})");
        Ok(self.unbox_to(&call, ty))
    }

    /// ABI coercion for a call across the `env` import boundary: only
    /// `integer`/`bool`-typed parameters travel raw, matching
    /// [`crate::intrinsics::abi_type`].
    fn coerce_extern_arg(&self, value: &str, arg_ty: &Type, target_ty: &Type) -> String {
        match target_ty.widen() {
            Type::I64 => {
                if arg_ty.is_reference_typed() {
                    format!("(call $unbox_i64 {value})")
                } else {
                    value.to_string()
                }
            }
            Type::Bool => {
                if arg_ty.is_reference_typed() {
                    format!("(call $unbox_bool {value})")
                } else {
                    value.to_string()
                }
            }
            _ => {
                if arg_ty.is_reference_typed() {
                    value.to_string()
                } else {
                    self.box_raw(value, &arg_ty.widen())
                }
            }
        }
    }

    /// ABI coercion for a call to a user-defined function: every primitive
    /// base type (`i64`/`f64`/`i32`/`bool`) travels raw, matching the
    /// parameter representation [`crate::decl_gen`] gives top-level
    /// functions.
    fn coerce_user_arg(&self, value: &str, arg_ty: &Type, target_ty: &Type) -> String {
        if target_ty.is_reference_typed() {
            if arg_ty.is_reference_typed() {
                value.to_string()
            } else {
                self.box_raw(value, &arg_ty.widen())
            }
        } else if arg_ty.is_reference_typed() {
            self.unbox_to(value, target_ty)
        } else if arg_ty.widen() == Type::I64 && target_ty.widen() == Type::F64 {
            format!("(f64.convert_i64_s {value})")
        } else {
            value.to_string()
        }
    }

    fn finish_call_result(&self, call: String, ret_ty: &Type, ty: &Type, is_extern: bool) -> String {
        if ret_ty.is_void_like() {
            return call;
        }
        let raw_kind = if is_extern {
            match ret_ty.widen() {
                Type::I64 => Some(Type::I64),
                Type::Bool => Some(Type::Bool),
                _ => None,
            }
        } else if ret_ty.is_reference_typed() {
            None
        } else {
            Some(ret_ty.widen())
        };
        match raw_kind {
            Some(k) => {
                if ty.is_reference_typed() {
                    self.box_raw(&call, &k)
                } else {
                    call
                }
            }
            None => self.unbox_to(&call, ty),
        }
    }

    pub fn lower_function_literal(
        &mut self,
        module_path: &str,
        params: &[Param],
        _ret: &Option<TypeExpr>,
        body: &FunctionLiteralBody,
        ty: &Type,
    ) -> Result<String, CodegenError> {
        let (param_types, ret_ty) = match ty {
            Type::Func(ft) => (ft.params.to_vec(), ft.ret.clone()),
            _ => (vec![Type::Json; params.len()], Type::Json),
        };
        let module_id = self.module_ids.id_of(module_path);
        let idx = self.next_lambda_index();
        let wat_fn = crate::names::lambda_name(module_id, idx);
        let export_name = crate::names::lambda_export_name(module_id, idx);

        let snapshot = self.snapshot_function_state();
        self.push_scope();

        let mut header = format!("(func {wat_fn}");
        let mut declared_param_types = Vec::with_capacity(params.len());
        for (p, pty) in params.iter().zip(param_types.iter()) {
            let wat_ty: &'static str = if pty.is_reference_typed() { "(ref $boxed)" } else { primitive_wat_type(pty) };
            let local = self.declare_local(&p.name, pty, wat_ty);
            header.push_str(&format!(" (param {local} {wat_ty})"));
            declared_param_types.push(pty.clone());
        }
        let ret_wat = if !ret_ty.is_void_like() {
            Some(if ret_ty.is_reference_typed() { "(ref $boxed)" } else { primitive_wat_type(&ret_ty) })
        } else {
            None
        };
        if let Some(rt) = ret_wat {
            header.push_str(&format!(" (result {rt})"));
        }

        let body_wat = match body {
            FunctionLiteralBody::Block(block) => self.lower_block_as_function_body(module_path, block, &ret_ty)?,
            FunctionLiteralBody::Expr(e) => {
                let v = self.lower_expr(module_path, e)?;
                format!("(return {v})\n")
            }
        };
        self.pop_scope();
        let lambda_locals = self.restore_function_state(snapshot);

        self.functions.open(header);
        for (name, wat_ty) in &lambda_locals {
            self.functions.line(format!("(local {name} {wat_ty})"));
        }
        self.functions.raw(&body_wat);
        self.functions.close();
        self.functions.blank();

        self.fn_values.insert(export_name.clone());
        self.fn_signatures.insert(export_name.clone(), (declared_param_types, ret_ty, wat_fn));

        let atom = self.intern(&export_name);
        let global = self.string_global(atom);
        Ok(format!("(call $val_from_funcname (global.get {global}))"))
    }

    /// Emit one dispatch thunk per registered function value (every
    /// top-level function/extern ever referenced as a value, plus every
    /// lambda), then the `$dispatch_fnvalue` chain over all of them. Called
    /// once, after the whole program has been walked, since `fn_values`
    /// only reaches its final contents at that point.
    pub fn emit_fn_value_thunks(&mut self) {
        let entries: Vec<(String, Vec<Type>, Type, String)> = self
            .fn_values
            .iter()
            .map(|export_name| {
                let (params, ret, wat_fn) = self
                    .fn_signatures
                    .get(export_name)
                    .cloned()
                    .unwrap_or_else(|| (Vec::new(), Type::Void, format!("${export_name}")));
                (export_name.clone(), params, ret, wat_fn)
            })
            .collect();

        for (export_name, param_types, ret_ty, wat_fn) in &entries {
            let thunk_name = format!("${export_name}_thunk");
            let mut call_args = Vec::new();
            for (i, pty) in param_types.iter().enumerate() {
                let raw = format!("(call $arr_get (local.get $args) (i32.const {i}))");
                call_args.push(if pty.is_reference_typed() { raw } else { format!("(call $unbox_{} {raw})", scalar_suffix(pty)) });
            }
            let call = format!("(call {wat_fn} {})", call_args.join(" "));
            let boxed_call = if ret_ty.is_void_like() {
                format!("(block (result (ref $boxed)) {call} (call $val_undefined))")
            } else if ret_ty.is_reference_typed() {
                call
            } else {
                format!("(call $val_from_{} {call})", scalar_suffix(ret_ty))
            };
            self.functions.open(format!("(func {thunk_name} (param $args (ref $valarr)) (result (ref $boxed))"));
            self.functions.raw(&format!("(return {boxed_call})\n"));
            self.functions.close();
            self.functions.blank();
        }

        self.emit_dispatcher(&entries);
    }

    fn emit_dispatcher(&mut self, entries: &[(String, Vec<Type>, Type, String)]) {
        let mut chain = "(unreachable)".to_string();
        for (export_name, ..) in entries.iter().rev() {
            let atom = self.intern(export_name);
            let global = self.string_global(atom);
            let thunk_name = format!("${export_name}_thunk");
            chain = format!(
                "(if (result (ref $boxed)) (call $str_eq (local.get $name) (global.get {global})) \
                 (then (call {thunk_name} (local.get $args))) (else {chain}))"
            );
        }
        self.functions.open("(func $dispatch_fnvalue (param $name (ref $str)) (param $args (ref $valarr)) (result (ref $boxed))".to_string());
        self.functions.raw(&format!("{chain}\n"));
        self.functions.close();
        self.functions.blank();
    }
}

fn ident_name(expr: &Expr) -> &str {
    match &expr.kind {
        ExprKind::Identifier(name) => name,
        _ => unreachable!("ident_name called on a non-identifier expression"),
    }
}

/// The suffix shared by `$val_from_*`/`$unbox_*` for a raw scalar type.
/// `Bool` and `I32` share the plain-`i32` representation `$val_from_bool`/
/// `$unbox_bool` already implement.
fn scalar_suffix(ty: &Type) -> &'static str {
    match ty.widen() {
        Type::F64 => "f64",
        Type::Bool | Type::I32 => "bool",
        _ => "i64",
    }
}
