//! Statement and block lowering. Every lowering function returns a raw WAT
//! text blob (a sequence of fully parenthesized instructions) rather than
//! writing into a shared writer directly, so a caller can splice a block's
//! code into whatever context it belongs in (a function body, a branch of
//! an `if`, a loop body) without re-deriving indentation.

use tunascript_parser::ast::{Block, ForStmt, IfStmt, Pattern, ReturnStmt, Stmt};
use tunascript_solver::Type;

use crate::context::Codegen;
use crate::error::CodegenError;

impl Codegen<'_> {
    pub fn lower_block_as_function_body(
        &mut self,
        module_path: &str,
        block: &Block,
        ret_ty: &Type,
    ) -> Result<String, CodegenError> {
        let mut out = String::new();
        let mut fell_through = true;
        for stmt in &block.statements {
            out.push_str(&self.lower_stmt(module_path, stmt)?);
            if matches!(stmt, Stmt::Return(_)) {
                fell_through = false;
            }
        }
        // A function whose checked return type isn't void but whose body
        // falls off the end (legal only when every path already returned,
        // per the checker's exhaustiveness pass) still needs a trailing
        // value the validator accepts; emit the type's zero value as a
        // defensive fallback instruction that should be unreachable.
        if fell_through && !ret_ty.is_void_like() {
            out.push_str(&self.default_value(ret_ty));
            out.push('\n');
        }
        Ok(out)
    }

    pub fn lower_block(&mut self, module_path: &str, block: &Block) -> Result<String, CodegenError> {
        self.push_scope();
        let mut out = String::new();
        out.push_str("(block\n");
        for stmt in &block.statements {
            out.push_str(&self.lower_stmt(module_path, stmt)?);
        }
        out.push_str(")\n");
        self.pop_scope();
        Ok(out)
    }

    pub(crate) fn lower_stmt(&mut self, module_path: &str, stmt: &Stmt) -> Result<String, CodegenError> {
        match stmt {
            Stmt::Const(c) => {
                let ty = self
                    .program
                    .expr_type(module_path, c.init.span)
                    .cloned()
                    .unwrap_or(Type::Json);
                let value = self.lower_expr(module_path, &c.init)?;
                let wat_ty: &'static str = if ty.is_reference_typed() { "(ref $boxed)" } else { crate::decl_gen::primitive_wat_type(&ty) };
                let local = self.declare_local(&c.name, &ty, wat_ty);
                Ok(format!("(local.set {local} {value})\n"))
            }
            Stmt::If(stmt) => self.lower_if_stmt(module_path, stmt),
            Stmt::For(stmt) => self.lower_for_stmt(module_path, stmt),
            Stmt::Return(stmt) => self.lower_return_stmt(module_path, stmt),
            Stmt::Expr(stmt) => {
                let ty = self.program.expr_type(module_path, stmt.expr.span).cloned().unwrap_or(Type::Void);
                let value = self.lower_expr(module_path, &stmt.expr)?;
                if ty.is_void_like() {
                    Ok(format!("{value}\n"))
                } else {
                    Ok(format!("(drop {value})\n"))
                }
            }
            Stmt::Block(b) => self.lower_block(module_path, b),
        }
    }

    fn lower_if_stmt(&mut self, module_path: &str, stmt: &IfStmt) -> Result<String, CodegenError> {
        let cond = self.lower_bool_expr(module_path, &stmt.cond)?;
        let then_body = self.lower_block(module_path, &stmt.then_branch)?;
        let mut out = format!("(if {cond}\n  (then\n{then_body}  )\n");
        if let Some(else_branch) = &stmt.else_branch {
            let else_body = self.lower_stmt(module_path, else_branch)?;
            out.push_str(&format!("  (else\n{else_body}  )\n"));
        }
        out.push_str(")\n");
        Ok(out)
    }

    /// `for (const pat of expr) { ... }` lowers to an index-counted loop over
    /// the iterable's boxed array representation; destructuring patterns
    /// bind fresh locals from each element at the top of the loop body.
    fn lower_for_stmt(&mut self, module_path: &str, stmt: &ForStmt) -> Result<String, CodegenError> {
        let iter_ty = self
            .program
            .expr_type(module_path, stmt.iterable.span)
            .cloned()
            .unwrap_or(Type::Json);
        let iterable = self.lower_expr(module_path, &stmt.iterable)?;

        self.push_scope();
        let arr_local = self.declare_local("__iter_arr", &Type::Json, "(ref $valarr)");
        let idx_local = self.declare_local("__iter_idx", &Type::I32, "i32");
        let len_local = self.declare_local("__iter_len", &Type::I32, "i32");

        let elem_ty = match iter_ty {
            Type::Array(elem) => (*elem).clone(),
            _ => Type::Json,
        };
        let elem_wat: &'static str = if elem_ty.is_reference_typed() { "(ref $boxed)" } else { crate::decl_gen::primitive_wat_type(&elem_ty) };
        let elem_boxed_local = self.declare_local("__iter_elem", &Type::Json, "(ref $boxed)");

        let bind = self.lower_pattern_bind(&stmt.pattern, &elem_ty, &format!("(local.get {elem_boxed_local})"));
        let body = self.lower_block(module_path, &stmt.body)?;

        let loop_label = self.next_temp("loop");
        let mut out = String::new();
        out.push_str(&format!(
            "(local.set {arr_local} (call $unbox_array {iterable}))\n\
             (local.set {len_local} (call $arr_len (local.get {arr_local})))\n\
             (local.set {idx_local} (i32.const 0))\n\
             (block {loop_label}_done\n\
             (loop {loop_label}\n\
             (br_if {loop_label}_done (i32.ge_u (local.get {idx_local}) (local.get {len_local})))\n\
             (local.set {elem_boxed_local} (call $arr_get (local.get {arr_local}) (local.get {idx_local})))\n\
             {bind}\n{body}\
             (local.set {idx_local} (i32.add (local.get {idx_local}) (i32.const 1)))\n\
             (br {loop_label})\n\
             )\n)\n"
        ));
        let _ = elem_wat;
        self.pop_scope();
        Ok(out)
    }

    fn lower_return_stmt(&mut self, module_path: &str, stmt: &ReturnStmt) -> Result<String, CodegenError> {
        match &stmt.value {
            Some(expr) => {
                let value = self.lower_expr(module_path, expr)?;
                Ok(format!("(return {value})\n"))
            }
            None => Ok("(return)\n".to_string()),
        }
    }

    /// Bind a (possibly destructuring) pattern against an already-lowered
    /// source expression, declaring one local per bound name.
    pub fn lower_pattern_bind(&mut self, pattern: &Pattern, ty: &Type, source: &str) -> String {
        match pattern {
            Pattern::Identifier { name, .. } => {
                let wat_ty: &'static str = if ty.is_reference_typed() { "(ref $boxed)" } else { crate::decl_gen::primitive_wat_type(ty) };
                let local = self.declare_local(name, ty, wat_ty);
                format!("(local.set {local} {source})\n")
            }
            Pattern::Array { elements, .. } => {
                let mut out = String::new();
                let arr_local = self.declare_local("__destr_arr", ty, "(ref $valarr)");
                out.push_str(&format!("(local.set {arr_local} (call $unbox_array {source}))\n"));
                for (i, elem_pat) in elements.iter().enumerate() {
                    let elem_source = format!("(call $arr_get (local.get {arr_local}) (i32.const {i}))");
                    out.push_str(&self.lower_pattern_bind(elem_pat, &Type::Json, &elem_source));
                }
                out
            }
            Pattern::Object { props, .. } => {
                let mut out = String::new();
                let obj_local = self.declare_local("__destr_obj", ty, "(ref $obj)");
                out.push_str(&format!("(local.set {obj_local} (call $unbox_object {source}))\n"));
                for prop in props {
                    let key_atom = self.intern(&prop.key);
                    let key_global = self.string_global(key_atom);
                    let prop_source = format!("(call $obj_get (local.get {obj_local}) (global.get {key_global}))");
                    let local = self.declare_local(&prop.binding, &Type::Json, "(ref $boxed)");
                    out.push_str(&format!("(local.set {local} {prop_source})\n"));
                }
                out
            }
        }
    }

    /// The default value instruction for a type, used where the grammar
    /// permits an omission the runtime still needs a concrete value for
    /// (e.g. a function whose every branch already returned).
    pub fn default_value(&mut self, ty: &Type) -> String {
        if ty.is_reference_typed() {
            "(call $val_undefined)".to_string()
        } else {
            match crate::decl_gen::primitive_wat_type(ty) {
                "f64" => "(f64.const 0)".to_string(),
                "i32" => "(i32.const 0)".to_string(),
                _ => "(i64.const 0)".to_string(),
            }
        }
    }
}
