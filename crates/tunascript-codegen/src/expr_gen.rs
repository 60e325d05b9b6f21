//! Expression lowering: every [`ExprKind`] variant becomes a single,
//! already-boxed-or-raw WAT text blob according to its checked static type
//! (primitives travel raw on the value stack; everything else crosses as a
//! `(ref $boxed)`, per the boxing-discipline design note this generator is
//! built around).

use tunascript_checker::SymbolKind;
use tunascript_parser::ast::{ArrayLiteralItem, BinaryOp, Expr, ExprKind, ObjectLiteralItem, TemplatePart, UnaryOp};
use tunascript_solver::Type;

use crate::context::Codegen;
use crate::decl_gen::primitive_wat_type;
use crate::error::CodegenError;

impl Codegen<'_> {
    #[must_use]
    pub fn expr_ty(&self, module_path: &str, expr: &Expr) -> Type {
        self.program.expr_type(module_path, expr.span).cloned().unwrap_or(Type::Json)
    }

    /// Box a raw value of `widened` (a primitive base type) into a
    /// `(ref $boxed)`.
    #[must_use]
    pub fn box_raw(&self, raw: &str, widened: &Type) -> String {
        match widened {
            Type::I64 => format!("(call $val_from_i64 {raw})"),
            Type::F64 => format!("(call $val_from_f64 {raw})"),
            Type::Bool => format!("(call $val_from_bool {raw})"),
            _ => raw.to_string(),
        }
    }

    /// Unbox a `(ref $boxed)` down to the raw representation `target`
    /// expects, or leave it boxed if `target` is itself reference-typed.
    #[must_use]
    pub fn unbox_to(&self, boxed: &str, target: &Type) -> String {
        match target.widen() {
            Type::I64 => format!("(call $unbox_i64 {boxed})"),
            Type::F64 => format!("(call $unbox_f64 {boxed})"),
            Type::Bool => format!("(call $unbox_bool {boxed})"),
            _ => boxed.to_string(),
        }
    }

    /// Like [`Self::lower_expr`] but guarantees a raw `i32` boolean result,
    /// for contexts (an `if`/loop condition) that cannot accept a boxed
    /// value even when the checked type is a literal-refined `bool`.
    pub fn lower_bool_expr(&mut self, module_path: &str, expr: &Expr) -> Result<String, CodegenError> {
        let ty = self.expr_ty(module_path, expr);
        let value = self.lower_expr(module_path, expr)?;
        Ok(if ty.is_reference_typed() {
            format!("(call $unbox_bool {value})")
        } else {
            value
        })
    }

    pub fn lower_expr(&mut self, module_path: &str, expr: &Expr) -> Result<String, CodegenError> {
        let ty = self.expr_ty(module_path, expr);
        match &expr.kind {
            ExprKind::IntegerLiteral(n) => Ok(self.finish_literal(format!("(i64.const {n})"), &Type::I64, &ty)),
            ExprKind::FloatLiteral(n) => Ok(self.finish_literal(format!("(f64.const {n})"), &Type::F64, &ty)),
            ExprKind::BoolLiteral(b) => Ok(self.finish_literal(format!("(i32.const {})", i32::from(*b)), &Type::Bool, &ty)),
            ExprKind::NullLiteral => Ok("(call $val_null)".to_string()),
            ExprKind::UndefinedLiteral => Ok("(call $val_undefined)".to_string()),
            ExprKind::StringLiteral(s) => Ok(self.lower_string_literal(s)),
            ExprKind::TemplateLiteral(parts) => self.lower_template(module_path, parts),
            ExprKind::Identifier(name) => self.lower_identifier(module_path, name, expr, &ty),
            ExprKind::Binary { op, left, right } => self.lower_binary(module_path, *op, left, right, &ty),
            ExprKind::Unary { op, operand } => self.lower_unary(module_path, *op, operand),
            ExprKind::Member { object, property, optional } => {
                self.lower_member(module_path, object, property, *optional, &ty)
            }
            ExprKind::Index { object, index, optional } => self.lower_index(module_path, object, index, *optional, &ty),
            ExprKind::Call { .. } | ExprKind::MethodCall { .. } => self.lower_call(module_path, expr, &ty),
            ExprKind::FunctionLiteral { params, ret, body, .. } => {
                self.lower_function_literal(module_path, params, ret, body, &ty)
            }
            ExprKind::If { cond, then_branch, else_branch } => {
                self.lower_if_expr(module_path, cond, then_branch, else_branch.as_deref(), &ty)
            }
            ExprKind::Switch { scrutinee, cases } => self.lower_switch_expr(module_path, scrutinee, cases, &ty),
            ExprKind::Block(block, tail) => self.lower_block_expr(module_path, block, tail),
            ExprKind::Try(inner) => self.lower_try(module_path, inner, &ty),
            ExprKind::Object(obj) => self.lower_object_literal(module_path, obj),
            ExprKind::Array(arr) => self.lower_array_literal(module_path, arr),
            ExprKind::Jsx(node) => self.lower_jsx(module_path, node),
            ExprKind::Sql(block) => self.lower_sql(module_path, block, &ty),
            ExprKind::As { expr: inner, .. } => self.lower_expr(module_path, inner),
            ExprKind::Paren(inner) => self.lower_expr(module_path, inner),
        }
    }

    /// A literal node's own checked type is usually its exact primitive
    /// (`I64`/`F64`/`Bool`) but can be a narrower `Literal` refinement
    /// (e.g. inside a `case 1:` arm); either way the raw instruction is the
    /// same, boxed only if the refined type says this occurrence is used
    /// reference-typed.
    fn finish_literal(&self, raw: String, widened: &Type, checked_ty: &Type) -> String {
        if checked_ty.is_reference_typed() {
            self.box_raw(&raw, widened)
        } else {
            raw
        }
    }

    fn lower_string_literal(&mut self, s: &str) -> String {
        let atom = self.intern(s);
        let global = self.string_global(atom);
        format!("(call $val_from_string (global.get {global}))")
    }

    fn lower_template(&mut self, module_path: &str, parts: &[TemplatePart]) -> Result<String, CodegenError> {
        let mut acc: Option<String> = None;
        for part in parts {
            let piece_boxed = match part {
                TemplatePart::Literal(s) => self.lower_string_literal(s),
                TemplatePart::Expr(e) => {
                    let ty = self.expr_ty(module_path, e);
                    let value = self.lower_expr(module_path, e)?;
                    self.stringify_value(&value, &ty)
                }
            };
            let piece_raw = format!("(call $unbox_string {piece_boxed})");
            acc = Some(match acc {
                None => piece_raw,
                Some(prev) => format!("(call $str_concat {prev} {piece_raw})"),
            });
        }
        let raw = acc.unwrap_or_else(|| "(call $str_new (i32.const 0))".to_string());
        Ok(format!("(call $val_from_string {raw})"))
    }

    /// Render any checked value as a boxed string, the way `${expr}`
    /// interpolation and the `to_string` host import both need to.
    pub(crate) fn stringify_value(&mut self, value: &str, ty: &Type) -> String {
        match ty.widen() {
            Type::String => value.to_string(),
            _ if ty.is_reference_typed() => {
                let host = self.host_import_name("prelude", "to_string");
                format!("(call {host} {value})")
            }
            _ => {
                let host = self.host_import_name("prelude", "to_string");
                format!("(call {host} {})", self.box_raw(value, &ty.widen()))
            }
        }
    }

    pub(crate) fn host_import_name(&self, builtin_module: &str, name: &str) -> String {
        let module_id = self.module_ids.id_of(builtin_module);
        crate::names::wat_name(module_id, name)
    }

    fn lower_identifier(&mut self, module_path: &str, name: &str, expr: &Expr, ty: &Type) -> Result<String, CodegenError> {
        if let Some(slot) = self.lookup_local(name) {
            let wat_name = slot.wat_name.clone();
            return Ok(format!("(local.get {wat_name})"));
        }
        let Some(sym) = self.program.identifier_symbol(module_path, expr.span) else {
            return Err(CodegenError::new(module_path, expr.span, format!("unresolved identifier `{name}` reached codegen")));
        };
        let kind = self.program.symbols.get(self.program.symbols.resolve_alias(sym)).kind;
        match kind {
            SymbolKind::Func | SymbolKind::Builtin => self.lower_function_value_ref(sym),
            SymbolKind::Var => {
                let global = self.symbol_wat_name(sym);
                Ok(format!("(global.get {global})"))
            }
            SymbolKind::Type => Err(CodegenError::new(module_path, expr.span, format!("`{name}` is a type, not a value"))),
        }
        .map(|v| {
            // A var's stored representation always matches its declared
            // type already, so only literal refinements (read back at a
            // wider type than they were stored) ever need a box here.
            let _ = ty;
            v
        })
    }

    fn lower_function_value_ref(&mut self, sym: tunascript_checker::SymbolId) -> Result<String, CodegenError> {
        let (owner, name) = self.symbol_owner_and_name(sym);
        let module_id = self.module_ids.id_of(&owner);
        let export_name = crate::names::fnvalue_export_name(module_id, &name);
        self.register_fn_value(&export_name, sym);
        let atom = self.intern(&export_name);
        let global = self.string_global(atom);
        Ok(format!("(call $val_from_funcname (global.get {global}))"))
    }

    fn register_fn_value(&mut self, export_name: &str, sym: tunascript_checker::SymbolId) {
        if self.fn_values.contains(export_name) {
            return;
        }
        self.fn_values.insert(export_name.to_string());
        let (owner, name) = self.symbol_owner_and_name(sym);
        let module_id = self.module_ids.id_of(&owner);
        let wat_fn = crate::names::wat_name(module_id, &name);
        if let Type::Func(func_ty) = self.program.symbols.resolved_type(sym) {
            self.fn_signatures
                .insert(export_name.to_string(), (func_ty.params.to_vec(), func_ty.ret.clone(), wat_fn));
        }
    }

    fn lower_binary(
        &mut self,
        module_path: &str,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        result_ty: &Type,
    ) -> Result<String, CodegenError> {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let l = self.lower_expr(module_path, left)?;
            let r = self.lower_expr(module_path, right)?;
            return Ok(match op {
                BinaryOp::And => format!("(if (result i32) {l} (then {r}) (else (i32.const 0)))"),
                BinaryOp::Or => format!("(if (result i32) {l} (then (i32.const 1)) (else {r}))"),
                _ => unreachable!(),
            });
        }

        let left_ty = self.expr_ty(module_path, left);
        let right_ty = self.expr_ty(module_path, right);
        let l = self.lower_expr(module_path, left)?;
        let r = self.lower_expr(module_path, right)?;

        if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
            return Ok(self.lower_equality(op, &l, &r, &left_ty, &right_ty));
        }

        let numeric_kind = if left_ty.widen() == Type::F64 || right_ty.widen() == Type::F64 {
            NumKind::F64
        } else {
            NumKind::I64
        };
        let l = promote(&l, &left_ty, numeric_kind);
        let r = promote(&r, &right_ty, numeric_kind);
        let raw = if op == BinaryOp::Mod && numeric_kind == NumKind::F64 {
            self.f64_rem(&l, &r)
        } else {
            let instr = arith_instr(op, numeric_kind);
            format!("({instr} {l} {r})")
        };
        Ok(if result_ty.is_reference_typed() && is_arith_op(op) {
            self.box_raw(&raw, &numeric_kind.ty())
        } else {
            raw
        })
    }

    /// Wasm has no `f64.rem`; lower `a % b` as `a - trunc(a / b) * b`. Binds
    /// both operands to locals first so a side-effecting operand (a call)
    /// isn't evaluated twice.
    fn f64_rem(&mut self, l: &str, r: &str) -> String {
        let l_tmp = self.next_temp("modl");
        self.pending_locals.push((l_tmp.clone(), "f64"));
        let r_tmp = self.next_temp("modr");
        self.pending_locals.push((r_tmp.clone(), "f64"));
        format!(
            "(block (result f64) \
                (local.set {l_tmp} {l}) (local.set {r_tmp} {r}) \
                (f64.sub (local.get {l_tmp}) \
                    (f64.mul (f64.trunc (f64.div (local.get {l_tmp}) (local.get {r_tmp}))) (local.get {r_tmp}))))"
        )
    }

    fn lower_equality(&self, op: BinaryOp, l: &str, r: &str, left_ty: &Type, right_ty: &Type) -> String {
        let raw_numeric = !left_ty.is_reference_typed() && !right_ty.is_reference_typed();
        let eq = if raw_numeric {
            match (left_ty.widen(), right_ty.widen()) {
                (Type::F64, _) | (_, Type::F64) => format!("(f64.eq {l} {r})"),
                _ => format!("(i32.eq {l} {r})"),
            }
        } else {
            let lb = if left_ty.is_reference_typed() { l.to_string() } else { self.box_raw(l, &left_ty.widen()) };
            let rb = if right_ty.is_reference_typed() { r.to_string() } else { self.box_raw(r, &right_ty.widen()) };
            format!("(call $val_eq {lb} {rb})")
        };
        if op == BinaryOp::NotEq {
            format!("(i32.eqz {eq})")
        } else {
            eq
        }
    }

    fn lower_unary(&mut self, module_path: &str, op: UnaryOp, operand: &Expr) -> Result<String, CodegenError> {
        let ty = self.expr_ty(module_path, operand);
        let value = self.lower_expr(module_path, operand)?;
        Ok(match (op, ty.widen()) {
            (UnaryOp::Plus, _) => value,
            (UnaryOp::Neg, Type::F64) => format!("(f64.neg {value})"),
            (UnaryOp::Neg, _) => format!("(i64.sub (i64.const 0) {value})"),
        })
    }

    fn lower_member(&mut self, module_path: &str, object: &Expr, property: &str, optional: bool, ty: &Type) -> Result<String, CodegenError> {
        let recv = self.lower_expr(module_path, object)?;
        let key_atom = self.intern(property);
        let key_global = self.string_global(key_atom);
        let recv_local = self.next_temp("recv");
        self.pending_locals.push((recv_local.clone(), "(ref $boxed)"));
        let lookup = format!(
            "(call $obj_get (call $unbox_object (local.tee {recv_local} {recv})) (global.get {key_global}))"
        );
        let result_boxed = if optional {
            format!(
                "(if (result (ref $boxed)) (call $is_nullish (local.get {recv_local})) (then (call $val_undefined)) (else {lookup}))"
            )
        } else {
            lookup
        };
        Ok(self.unbox_to(&result_boxed, ty))
    }

    fn lower_index(&mut self, module_path: &str, object: &Expr, index: &Expr, optional: bool, ty: &Type) -> Result<String, CodegenError> {
        let recv_ty = self.expr_ty(module_path, object);
        let recv = self.lower_expr(module_path, object)?;
        let idx_ty = self.expr_ty(module_path, index);
        let idx = self.lower_expr(module_path, index)?;
        let idx_i32 = if idx_ty.widen() == Type::I64 { format!("(i32.wrap_i64 {idx})") } else { idx };

        let result_boxed = match recv_ty.widen() {
            Type::Array(_) => format!("(call $arr_get (call $unbox_array {recv}) {idx_i32})"),
            _ => format!("(call $obj_get (call $unbox_object {recv}) (call $unbox_string {idx_i32}))"),
        };
        let _ = optional;
        Ok(self.unbox_to(&result_boxed, ty))
    }

    fn lower_object_literal(&mut self, module_path: &str, obj: &tunascript_parser::ast::ObjectLiteral) -> Result<String, CodegenError> {
        let mut keys = Vec::new();
        let mut vals = Vec::new();
        let mut prelude = String::new();
        for item in &obj.items {
            match item {
                ObjectLiteralItem::Prop(p) => {
                    let ty = self
                        .program
                        .expr_type(module_path, p.value.span)
                        .cloned()
                        .unwrap_or(Type::Json);
                    let raw = self.lower_expr(module_path, &p.value)?;
                    let boxed = if ty.is_reference_typed() { raw } else { self.box_raw(&raw, &ty.widen()) };
                    set_object_prop(&mut keys, &mut vals, p.key.clone(), boxed);
                }
                ObjectLiteralItem::Spread(src) => {
                    let src_ty = self.expr_ty(module_path, src);
                    let raw = self.lower_expr(module_path, src)?;
                    let obj_local = self.next_temp("spread_obj");
                    self.pending_locals.push((obj_local.clone(), "(ref $obj)"));
                    prelude.push_str(&format!("(local.set {obj_local} (call $unbox_object {raw}))"));
                    if let Type::Object(o) = src_ty.widen() {
                        for prop in &o.props {
                            let key_atom = self.intern(&prop.name);
                            let key_global = self.string_global(key_atom);
                            let get = format!("(call $obj_get (local.get {obj_local}) (global.get {key_global}))");
                            set_object_prop(&mut keys, &mut vals, prop.name.to_string(), get);
                        }
                    }
                }
            }
        }
        let keys_arr = self.emit_string_array(&keys);
        let vals_arr = format!("(array.new_fixed $valarr {} {})", vals.len(), vals.join(" "));
        let built = format!("(call $val_from_object (call $obj_new {keys_arr} {vals_arr}))");
        Ok(if prelude.is_empty() {
            built
        } else {
            format!("(block (result (ref $boxed)) {prelude} {built})")
        })
    }

    pub(crate) fn emit_string_array(&mut self, names: &[String]) -> String {
        let globals: Vec<String> = names
            .iter()
            .map(|n| {
                let atom = self.intern(n);
                format!("(global.get {})", self.string_global(atom))
            })
            .collect();
        format!("(array.new_fixed $strarr {} {})", globals.len(), globals.join(" "))
    }

    fn lower_array_literal(&mut self, module_path: &str, arr: &tunascript_parser::ast::ArrayLiteral) -> Result<String, CodegenError> {
        if !arr.items.iter().any(|i| matches!(i, ArrayLiteralItem::Spread(_))) {
            let mut elems = Vec::new();
            for item in &arr.items {
                let ArrayLiteralItem::Element(e) = item else { unreachable!() };
                let ty = self.expr_ty(module_path, e);
                let raw = self.lower_expr(module_path, e)?;
                let boxed = if ty.is_reference_typed() { raw } else { self.box_raw(&raw, &ty.widen()) };
                elems.push(boxed);
            }
            return Ok(format!(
                "(call $val_from_array (array.new_fixed $valarr {} {}))",
                elems.len(),
                elems.join(" ")
            ));
        }

        // A spread source's length is only known at runtime, so the fixed-
        // size `array.new_fixed` path above can't be used: allocate the
        // result array once every item's total length is known, then copy
        // each element/spread source into it by index (the same
        // `$arr_get`-by-index walk `lower_pattern_bind` uses for array
        // destructuring).
        let mut prelude = String::new();
        let mut len_terms = Vec::new();
        enum BuildItem {
            Element(String),
            Spread { arr_local: String, len_local: String },
        }
        let mut items = Vec::new();
        for item in &arr.items {
            match item {
                ArrayLiteralItem::Element(e) => {
                    let ty = self.expr_ty(module_path, e);
                    let raw = self.lower_expr(module_path, e)?;
                    let boxed = if ty.is_reference_typed() { raw } else { self.box_raw(&raw, &ty.widen()) };
                    items.push(BuildItem::Element(boxed));
                    len_terms.push("(i32.const 1)".to_string());
                }
                ArrayLiteralItem::Spread(src) => {
                    let raw = self.lower_expr(module_path, src)?;
                    let arr_local = self.next_temp("spread_arr");
                    self.pending_locals.push((arr_local.clone(), "(ref $valarr)"));
                    let len_local = self.next_temp("spread_len");
                    self.pending_locals.push((len_local.clone(), "i32"));
                    prelude.push_str(&format!(
                        "(local.set {arr_local} (call $unbox_array {raw}))\
                         (local.set {len_local} (call $arr_len (local.get {arr_local})))"
                    ));
                    len_terms.push(format!("(local.get {len_local})"));
                    items.push(BuildItem::Spread { arr_local, len_local });
                }
            }
        }

        let total_local = self.next_temp("total_len");
        self.pending_locals.push((total_local.clone(), "i32"));
        let mut total_expr = len_terms[0].clone();
        for term in &len_terms[1..] {
            total_expr = format!("(i32.add {total_expr} {term})");
        }
        prelude.push_str(&format!("(local.set {total_local} {total_expr})"));

        let result_local = self.next_temp("spread_result");
        self.pending_locals.push((result_local.clone(), "(ref $valarr)"));
        prelude.push_str(&format!("(local.set {result_local} (call $arr_new (local.get {total_local})))"));

        let write_idx = self.next_temp("write_idx");
        self.pending_locals.push((write_idx.clone(), "i32"));
        prelude.push_str(&format!("(local.set {write_idx} (i32.const 0))"));

        for item in items {
            match item {
                BuildItem::Element(boxed) => {
                    prelude.push_str(&format!(
                        "(call $arr_set (local.get {result_local}) (local.get {write_idx}) {boxed})\
                         (local.set {write_idx} (i32.add (local.get {write_idx}) (i32.const 1)))"
                    ));
                }
                BuildItem::Spread { arr_local, len_local } => {
                    let copy_idx = self.next_temp("copy_idx");
                    self.pending_locals.push((copy_idx.clone(), "i32"));
                    let loop_label = self.next_temp("spread_loop");
                    prelude.push_str(&format!(
                        "(local.set {copy_idx} (i32.const 0))\
                         (block {loop_label}_done\
                           (loop {loop_label}\
                             (br_if {loop_label}_done (i32.ge_u (local.get {copy_idx}) (local.get {len_local})))\
                             (call $arr_set (local.get {result_local}) (local.get {write_idx}) (call $arr_get (local.get {arr_local}) (local.get {copy_idx})))\
                             (local.set {write_idx} (i32.add (local.get {write_idx}) (i32.const 1)))\
                             (local.set {copy_idx} (i32.add (local.get {copy_idx}) (i32.const 1)))\
                             (br {loop_label})))"
                    ));
                }
            }
        }

        Ok(format!(
            "(block (result (ref $boxed)) {prelude} (call $val_from_array (local.get {result_local})))"
        ))
    }

    fn lower_if_expr(
        &mut self,
        module_path: &str,
        cond: &Expr,
        then_branch: &Expr,
        else_branch: Option<&Expr>,
        ty: &Type,
    ) -> Result<String, CodegenError> {
        let cond_wat = self.lower_expr(module_path, cond)?;
        let wat_ty = result_wat_type(ty);
        let then_wat = self.lower_expr(module_path, then_branch)?;
        let else_wat = match else_branch {
            Some(e) => self.lower_expr(module_path, e)?,
            None => self.default_value(ty),
        };
        Ok(format!(
            "(if (result {wat_ty}) {cond_wat} (then {then_wat}) (else {else_wat}))"
        ))
    }

    fn lower_switch_expr(
        &mut self,
        module_path: &str,
        scrutinee: &Expr,
        cases: &[tunascript_parser::ast::SwitchCase],
        ty: &Type,
    ) -> Result<String, CodegenError> {
        use tunascript_parser::ast::SwitchCaseBody;
        let scrutinee_ty = self.expr_ty(module_path, scrutinee);
        let scrutinee_wat = self.lower_expr(module_path, scrutinee)?;
        let tmp = self.next_temp("switch");
        let wat_ty: &'static str = if scrutinee_ty.is_reference_typed() { "(ref $boxed)" } else { primitive_wat_type(&scrutinee_ty) };
        self.pending_locals.push((tmp.clone(), wat_ty));

        let mut chain = self.default_value(ty);
        for case in cases.iter().rev() {
            let cond = match &case.pattern {
                Some(pat) => self.lower_case_condition(module_path, &tmp, pat, &scrutinee_ty),
                None => "(i32.const 1)".to_string(),
            };
            let body_wat = match &case.body {
                SwitchCaseBody::Value(e) => self.lower_expr(module_path, e)?,
                SwitchCaseBody::Return(e) => {
                    let ret = match e {
                        Some(e) => format!("(return {})", self.lower_expr(module_path, e)?),
                        None => "(return)".to_string(),
                    };
                    format!("(block (result {}) {ret} {})", result_wat_type(ty), self.default_value(ty))
                }
            };
            chain = format!("(if (result {}) {cond} (then {body_wat}) (else {chain}))", result_wat_type(ty));
        }
        Ok(format!("(block (result {}) (local.set {tmp} {scrutinee_wat}) {chain})", result_wat_type(ty)))
    }

    /// Compare the scrutinee's runtime kind against `case pat as T`'s `T`
    /// (spec §4.4: "compare the runtime kind ... and, for object types with
    /// literal-tagged properties, additionally test each literal property
    /// via structural equality"). `case pat:` with no `as T` always matches,
    /// as does any case over a non-reference-typed scrutinee — there is only
    /// one possible runtime representation to discriminate there.
    fn lower_case_condition(
        &mut self,
        module_path: &str,
        scrutinee_local: &str,
        pattern: &tunascript_parser::ast::CasePattern,
        scrutinee_ty: &Type,
    ) -> String {
        if pattern.narrow_type.is_none() || !scrutinee_ty.is_reference_typed() {
            return "(i32.const 1)".to_string();
        }
        let narrowed = self
            .program
            .expr_type(module_path, pattern.span)
            .cloned()
            .unwrap_or(Type::Json);
        self.tag_test_expr(&format!("(local.get {scrutinee_local})"), &narrowed)
    }

    /// Build the runtime test that `value_expr` (a `(ref $boxed)`-producing
    /// WAT blob) has the shape `ty` narrows to.
    fn tag_test_expr(&mut self, value_expr: &str, ty: &Type) -> String {
        use tunascript_solver::LiteralValue;
        match ty {
            Type::Union(members) => {
                let mut acc = "(i32.const 0)".to_string();
                for member in members.iter() {
                    let test = self.tag_test_expr(value_expr, member);
                    acc = format!("(i32.or {test} {acc})");
                }
                acc
            }
            Type::Literal(base, lit) => {
                let base_test = self.tag_test_expr(value_expr, base);
                let value_test = match lit {
                    LiteralValue::Integer(n) => format!("(i64.eq (call $unbox_i64 {value_expr}) (i64.const {n}))"),
                    LiteralValue::Float(bits) => {
                        format!("(f64.eq (call $unbox_f64 {value_expr}) (f64.reinterpret_i64 (i64.const {bits})))")
                    }
                    LiteralValue::Bool(b) => format!("(i32.eq (call $unbox_bool {value_expr}) (i32.const {}))", i32::from(*b)),
                    LiteralValue::String(s) => {
                        let atom = self.intern(s);
                        let global = self.string_global(atom);
                        format!("(call $str_eq (call $unbox_string {value_expr}) (global.get {global}))")
                    }
                    LiteralValue::Null => "(i32.const 1)".to_string(),
                };
                format!("(i32.and {base_test} {value_test})")
            }
            Type::Object(obj) => {
                let mut acc = format!(
                    "(i32.eq (struct.get $boxed $tag {value_expr}) (i32.const {}))",
                    crate::runtime_helpers::TAG_OBJECT
                );
                for prop in &obj.props {
                    if let Type::Literal(..) = &prop.ty {
                        let key_atom = self.intern(&prop.name);
                        let key_global = self.string_global(key_atom);
                        let field_expr = format!(
                            "(call $obj_get (call $unbox_object {value_expr}) (global.get {key_global}))"
                        );
                        let field_test = self.tag_test_expr(&field_expr, &prop.ty);
                        acc = format!("(i32.and {acc} {field_test})");
                    }
                }
                acc
            }
            _ => format!(
                "(i32.eq (struct.get $boxed $tag {value_expr}) (i32.const {}))",
                tag_const(ty)
            ),
        }
    }

    fn lower_block_expr(&mut self, module_path: &str, block: &tunascript_parser::ast::Block, tail: &Expr) -> Result<String, CodegenError> {
        self.push_scope();
        let mut stmts = String::new();
        for stmt in &block.statements {
            stmts.push_str(&self.lower_stmt(module_path, stmt)?);
        }
        let tail_wat = self.lower_expr(module_path, tail)?;
        let ty = self.expr_ty(module_path, tail);
        self.pop_scope();
        Ok(format!(
            "(block (result {}) {stmts} {tail_wat})",
            result_wat_type(&ty)
        ))
    }

    /// The postfix `?` operator: on an error-shaped union member, returns
    /// the error immediately from the enclosing function; otherwise
    /// evaluates to the narrowed success type.
    fn lower_try(&mut self, module_path: &str, inner: &Expr, ty: &Type) -> Result<String, CodegenError> {
        let inner_wat = self.lower_expr(module_path, inner)?;
        let tmp = self.next_temp("try");
        self.pending_locals.push((tmp.clone(), "(ref $boxed)"));
        Ok(format!(
            "(block (result {})\n\
             (local.set {tmp} {inner_wat})\n\
             (if (call $is_error_shape (local.get {tmp})) (then (return (local.get {tmp}))))\n\
             (local.get {tmp})\n)",
            result_wat_type(ty)
        ))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum NumKind {
    I64,
    F64,
}

impl NumKind {
    fn ty(self) -> Type {
        match self {
            NumKind::I64 => Type::I64,
            NumKind::F64 => Type::F64,
        }
    }
}

/// Object literals resolve duplicate keys (a later explicit property, or a
/// later spread, overriding an earlier one) by overwriting in place rather
/// than appending — `$obj_get` returns the first matching key it finds, so
/// every key can only ever appear once in the emitted arrays.
fn set_object_prop(keys: &mut Vec<String>, vals: &mut Vec<String>, key: String, val: String) {
    match keys.iter().position(|k| *k == key) {
        Some(pos) => vals[pos] = val,
        None => {
            keys.push(key);
            vals.push(val);
        }
    }
}

fn promote(value: &str, ty: &Type, target: NumKind) -> String {
    match (ty.widen(), target) {
        (Type::I64, NumKind::F64) => format!("(f64.convert_i64_s {value})"),
        _ => value.to_string(),
    }
}

fn is_arith_op(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
}

fn arith_instr(op: BinaryOp, kind: NumKind) -> &'static str {
    match (op, kind) {
        (BinaryOp::Add, NumKind::I64) => "i64.add",
        (BinaryOp::Add, NumKind::F64) => "f64.add",
        (BinaryOp::Sub, NumKind::I64) => "i64.sub",
        (BinaryOp::Sub, NumKind::F64) => "f64.sub",
        (BinaryOp::Mul, NumKind::I64) => "i64.mul",
        (BinaryOp::Mul, NumKind::F64) => "f64.mul",
        (BinaryOp::Div, NumKind::I64) => "i64.div_s",
        (BinaryOp::Div, NumKind::F64) => "f64.div",
        (BinaryOp::Mod, NumKind::I64) => "i64.rem_s",
        (BinaryOp::Mod, NumKind::F64) => unreachable!("f64 % is lowered via Codegen::f64_rem"),
        (BinaryOp::Lt, NumKind::I64) => "i64.lt_s",
        (BinaryOp::Lt, NumKind::F64) => "f64.lt",
        (BinaryOp::Le, NumKind::I64) => "i64.le_s",
        (BinaryOp::Le, NumKind::F64) => "f64.le",
        (BinaryOp::Gt, NumKind::I64) => "i64.gt_s",
        (BinaryOp::Gt, NumKind::F64) => "f64.gt",
        (BinaryOp::Ge, NumKind::I64) => "i64.ge_s",
        (BinaryOp::Ge, NumKind::F64) => "f64.ge",
        (BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::And | BinaryOp::Or, _) => unreachable!("handled separately"),
    }
}

/// The `$boxed.$tag` value a non-literal, non-union, non-object narrow type
/// implies at runtime.
fn tag_const(ty: &Type) -> i32 {
    use crate::runtime_helpers::*;
    match ty {
        Type::I64 | Type::I32 => TAG_I64,
        Type::F64 => TAG_F64,
        Type::Bool => TAG_BOOL,
        Type::String => TAG_STRING,
        Type::Array(_) | Type::Tuple(_) => TAG_ARRAY,
        Type::Object(_) => TAG_OBJECT,
        Type::Null => TAG_NULL,
        Type::Undefined | Type::Void => TAG_UNDEFINED,
        Type::Func(_) => TAG_FUNC,
        _ => TAG_JSON,
    }
}

#[must_use]
pub fn result_wat_type(ty: &Type) -> &'static str {
    if ty.is_void_like() {
        ""
    } else if ty.is_reference_typed() {
        "(ref $boxed)"
    } else {
        primitive_wat_type(ty)
    }
}
