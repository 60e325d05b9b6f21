//! Statement checking: blocks, `if`, `for…of` with destructuring, `return`,
//! local `const`, and `switch`-expression case narrowing (spec §4.3
//! scoping rules and narrowing rules).

use tunascript_parser::ast::{Block, CasePattern, Pattern, Stmt, SwitchCase, SwitchCaseBody};
use tunascript_solver::{is_assignable, Type};

use crate::checker::{Checker, ModuleCtx};
use crate::expr_check::narrow_cond;

impl Checker {
    /// Check a function or lambda body's statement list. The caller has
    /// already pushed the frame that holds the parameters.
    pub(crate) fn check_function_body_block(&mut self, ctx: &mut ModuleCtx, block: &Block) {
        self.check_stmts(ctx, &block.statements);
    }

    /// Check a block *expression*: `{ stmts...; tail }`. Pushes its own
    /// frame (the braces are a fresh lexical scope) and evaluates to the
    /// tail expression's type.
    pub(crate) fn check_block_expr(
        &mut self,
        ctx: &mut ModuleCtx,
        block: &Block,
        tail: &tunascript_parser::ast::Expr,
    ) -> Type {
        ctx.scopes.push();
        self.check_stmts(ctx, &block.statements);
        let ty = self.check_expr(ctx, tail);
        ctx.scopes.pop();
        ty
    }

    pub(crate) fn check_stmts(&mut self, ctx: &mut ModuleCtx, stmts: &[Stmt]) {
        for stmt in stmts {
            self.check_stmt(ctx, stmt);
        }
    }

    fn check_stmt(&mut self, ctx: &mut ModuleCtx, stmt: &Stmt) {
        match stmt {
            Stmt::Const(local) => {
                let inferred = self.check_expr(ctx, &local.init);
                let declared = match &local.type_annotation {
                    Some(t) => {
                        let declared = self.resolve_type(ctx, t);
                        if !is_assignable(&inferred, &declared) {
                            self.error(
                                &ctx.path.clone(),
                                local.init.span,
                                format!("cannot assign `{inferred}` to `{}` of declared type `{declared}`", local.name),
                            );
                        }
                        declared
                    }
                    None => inferred,
                };
                self.declare_local(ctx, &local.name, declared, local.span);
            }
            Stmt::If(if_stmt) => {
                let narrow = narrow_cond(&if_stmt.cond);
                self.check_expr(ctx, &if_stmt.cond);
                ctx.scopes.push();
                if let Some((name, type_annotation, span)) = &narrow {
                    let ty = self.resolve_type(ctx, type_annotation);
                    self.rebind_local(ctx, name, ty, *span);
                }
                self.check_stmts(ctx, &if_stmt.then_branch.statements);
                ctx.scopes.pop();
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.check_else_stmt(ctx, else_branch);
                }
            }
            Stmt::For(for_stmt) => {
                let iterable_ty = self.check_expr(ctx, &for_stmt.iterable);
                let elem_ty = match &iterable_ty {
                    Type::Array(elem) => (**elem).clone(),
                    Type::Tuple(elems) => Type::union(elems.to_vec()),
                    _ => {
                        self.error(&ctx.path.clone(), for_stmt.iterable.span, format!("`{iterable_ty}` is not iterable"));
                        Type::Json
                    }
                };
                ctx.scopes.push();
                self.bind_pattern(ctx, &for_stmt.pattern, &elem_ty);
                self.check_stmts(ctx, &for_stmt.body.statements);
                ctx.scopes.pop();
            }
            Stmt::Return(ret) => {
                let value_ty = ret.value.as_ref().map(|v| self.check_expr(ctx, v)).unwrap_or(Type::Undefined);
                match ctx.return_type.clone() {
                    Some(expected) => {
                        if !is_assignable(&value_ty, &expected) {
                            self.error(
                                &ctx.path.clone(),
                                ret.span,
                                format!("cannot return `{value_ty}` from a function declared to return `{expected}`"),
                            );
                        }
                    }
                    None => self.error(&ctx.path.clone(), ret.span, "`return` outside a function body"),
                }
            }
            Stmt::Expr(expr_stmt) => {
                self.check_expr(ctx, &expr_stmt.expr);
            }
            Stmt::Block(block) => {
                ctx.scopes.push();
                self.check_stmts(ctx, &block.statements);
                ctx.scopes.pop();
            }
        }
    }

    fn check_else_stmt(&mut self, ctx: &mut ModuleCtx, else_branch: &Stmt) {
        ctx.scopes.push();
        self.check_stmt(ctx, else_branch);
        ctx.scopes.pop();
    }

    /// Bind a destructuring pattern against `ty` in the current scope frame
    /// (used by `for…of` and, with a narrowed type, by `switch` case
    /// patterns).
    pub(crate) fn bind_pattern(&mut self, ctx: &mut ModuleCtx, pattern: &Pattern, ty: &Type) {
        match pattern {
            Pattern::Identifier { name, type_annotation, span } => {
                let bound_ty = match type_annotation {
                    Some(annotation) => {
                        let declared = self.resolve_type(ctx, annotation);
                        if !is_assignable(ty, &declared) {
                            self.error(
                                &ctx.path.clone(),
                                *span,
                                format!("cannot bind `{ty}` to `{name}` of declared type `{declared}`"),
                            );
                        }
                        declared
                    }
                    None => ty.clone(),
                };
                self.declare_local(ctx, name, bound_ty, *span);
            }
            Pattern::Array { elements, span } => {
                for (i, element) in elements.iter().enumerate() {
                    let element_ty = tuple_or_array_member(ty, i).unwrap_or_else(|| {
                        self.error(&ctx.path.clone(), *span, format!("`{ty}` cannot be array-destructured"));
                        Type::Json
                    });
                    self.bind_pattern(ctx, element, &element_ty);
                }
            }
            Pattern::Object { props, span } => {
                for prop in props {
                    let prop_ty = object_prop_type(ty, &prop.key).unwrap_or_else(|| {
                        self.error(&ctx.path.clone(), *span, format!("`{ty}` has no property `{}`", prop.key));
                        Type::Json
                    });
                    self.declare_local(ctx, &prop.binding, prop_ty, prop.span);
                }
            }
        }
    }

    pub(crate) fn check_switch(
        &mut self,
        ctx: &mut ModuleCtx,
        scrutinee: &tunascript_parser::ast::Expr,
        cases: &[SwitchCase],
    ) -> Type {
        let scrutinee_ty = self.check_expr(ctx, scrutinee);
        let scrutinee_ident = match &scrutinee.kind {
            tunascript_parser::ast::ExprKind::Identifier(name) => Some(name.clone()),
            _ => None,
        };
        let mut member_types = Vec::new();
        for case in cases {
            ctx.scopes.push();
            if let Some(pattern) = &case.pattern {
                self.narrow_case_pattern(ctx, pattern, scrutinee_ident.as_deref(), &scrutinee_ty);
            }
            match &case.body {
                SwitchCaseBody::Value(expr) => member_types.push(self.check_expr(ctx, expr)),
                SwitchCaseBody::Return(value) => {
                    let value_ty = value.as_ref().map(|v| self.check_expr(ctx, v)).unwrap_or(Type::Undefined);
                    match ctx.return_type.clone() {
                        Some(expected) => {
                            if !is_assignable(&value_ty, &expected) {
                                self.error(
                                    &ctx.path.clone(),
                                    case.span,
                                    format!("cannot return `{value_ty}` from a function declared to return `{expected}`"),
                                );
                            }
                        }
                        None => self.error(&ctx.path.clone(), case.span, "`return` outside a function body"),
                    }
                }
            }
            ctx.scopes.pop();
        }
        Type::union(member_types)
    }

    fn narrow_case_pattern(
        &mut self,
        ctx: &mut ModuleCtx,
        pattern: &CasePattern,
        scrutinee_ident: Option<&str>,
        scrutinee_ty: &Type,
    ) {
        let narrowed_ty = match &pattern.narrow_type {
            Some(t) => self.resolve_type(ctx, t),
            None => scrutinee_ty.clone(),
        };
        // Codegen needs this narrowed type at the case's own span to compile
        // the runtime type-tag test `case pat as T` implies; there is no
        // other place it could read it back from.
        self.record_expr_type(ctx, pattern.span, narrowed_ty.clone());
        match &pattern.pattern {
            Pattern::Identifier { name, span, .. } => {
                if scrutinee_ident == Some(name.as_str()) {
                    self.rebind_local(ctx, name, narrowed_ty, *span);
                } else {
                    self.declare_local(ctx, name, narrowed_ty, *span);
                }
            }
            Pattern::Array { .. } | Pattern::Object { .. } => {
                self.bind_pattern(ctx, &pattern.pattern, &narrowed_ty);
            }
        }
    }
}

fn tuple_or_array_member(ty: &Type, index: usize) -> Option<Type> {
    match ty {
        Type::Array(elem) => Some((**elem).clone()),
        Type::Tuple(elems) => elems.get(index).cloned(),
        _ => None,
    }
}

fn object_prop_type(ty: &Type, name: &str) -> Option<Type> {
    match ty {
        Type::Object(o) => o.props.iter().find(|p| &*p.name == name).map(|p| p.ty.clone()),
        _ => None,
    }
}
