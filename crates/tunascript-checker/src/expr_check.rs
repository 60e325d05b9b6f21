//! Expression type inference (spec §4.3 "Inference rules"). Every call
//! records the expression's inferred type via `record_expr_type` so the
//! generator can later consult it without re-running inference.

use indexmap::IndexMap;
use std::rc::Rc;
use tunascript_common::Span;
use tunascript_parser::ast::{
    ArrayLiteralItem, BinaryOp, Expr, ExprKind, ObjectLiteralItem, TemplatePart, TypeExpr,
};
use tunascript_solver::{comparable, is_assignable, Type};

use crate::checker::{Checker, ModuleCtx};

impl Checker {
    pub(crate) fn check_expr(&mut self, ctx: &mut ModuleCtx, expr: &Expr) -> Type {
        let ty = self.check_expr_kind(ctx, expr);
        self.record_expr_type(ctx, expr.span, ty.clone());
        ty
    }

    fn check_expr_kind(&mut self, ctx: &mut ModuleCtx, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::IntegerLiteral(i) => Type::literal_int(*i),
            ExprKind::FloatLiteral(f) => Type::literal_float(*f),
            ExprKind::StringLiteral(s) => Type::literal_string(s.as_str()),
            ExprKind::BoolLiteral(b) => Type::literal_bool(*b),
            ExprKind::NullLiteral => Type::literal_null(),
            ExprKind::UndefinedLiteral => Type::Undefined,
            ExprKind::TemplateLiteral(parts) => {
                for part in parts {
                    if let TemplatePart::Expr(e) = part {
                        self.check_expr(ctx, e);
                    }
                }
                Type::String
            }
            ExprKind::Identifier(name) => self.check_identifier(ctx, name, expr.span),
            ExprKind::Binary { op, left, right } => {
                let lty = self.check_expr(ctx, left);
                let rty = self.check_expr(ctx, right);
                self.check_binary(ctx, *op, &lty, &rty, expr.span)
            }
            ExprKind::Unary { operand, .. } => {
                let oty = self.check_expr(ctx, operand);
                let widened = oty.widen();
                if widened.is_numeric() {
                    widened
                } else {
                    self.error(
                        &ctx.path.clone(),
                        expr.span,
                        format!("unary operator requires a numeric operand, found `{oty}`"),
                    );
                    Type::I64
                }
            }
            ExprKind::Member { object, property, optional } => {
                let obj_ty = self.check_expr(ctx, object);
                let search_ty = if *optional { strip_nullish(&obj_ty) } else { obj_ty.clone() };
                match lookup_object_prop(&search_ty, property) {
                    Some(prop_ty) => {
                        if *optional {
                            Type::union(vec![prop_ty, Type::Undefined])
                        } else {
                            prop_ty
                        }
                    }
                    None => {
                        self.error(
                            &ctx.path.clone(),
                            expr.span,
                            format!("type `{obj_ty}` has no property `{property}`"),
                        );
                        Type::Json
                    }
                }
            }
            ExprKind::Index { object, index, optional: _ } => {
                let obj_ty = self.check_expr(ctx, object);
                self.check_expr(ctx, index);
                match &obj_ty {
                    Type::Array(elem) => Type::union(vec![(**elem).clone(), Type::error_shape()]),
                    Type::Tuple(elems) => Type::union(elems.to_vec()),
                    Type::Object(o) => o.index_signature.clone().unwrap_or(Type::Json),
                    _ => {
                        self.error(&ctx.path.clone(), expr.span, format!("type `{obj_ty}` is not indexable"));
                        Type::Json
                    }
                }
            }
            ExprKind::Call { callee, type_args, args } => self.check_call(ctx, callee, type_args, args, expr.span),
            ExprKind::MethodCall { receiver, method, type_args, args } => {
                let callee = Expr {
                    kind: ExprKind::Identifier(method.clone()),
                    span: expr.span,
                };
                let mut full_args = Vec::with_capacity(args.len() + 1);
                full_args.push((**receiver).clone());
                full_args.extend(args.iter().cloned());
                self.check_call(ctx, &callee, type_args, &full_args, expr.span)
            }
            ExprKind::FunctionLiteral { type_params, params, ret, body } => {
                self.check_function_literal(ctx, type_params, params, ret, body, None)
            }
            ExprKind::If { cond, then_branch, else_branch } => self.check_if_expr(ctx, cond, then_branch, else_branch.as_deref()),
            ExprKind::Switch { scrutinee, cases } => self.check_switch(ctx, scrutinee, cases),
            ExprKind::Block(block, tail) => self.check_block_expr(ctx, block, tail),
            ExprKind::Try(inner) => self.check_try(ctx, inner, expr.span),
            ExprKind::Object(obj) => self.check_object_literal(ctx, obj),
            ExprKind::Array(arr) => self.check_array_literal(ctx, arr),
            ExprKind::Jsx(node) => self.check_jsx(ctx, node),
            ExprKind::Sql(block) => self.check_sql(ctx, block),
            ExprKind::As { expr: inner, type_annotation } => {
                self.check_expr(ctx, inner);
                self.resolve_type(ctx, type_annotation)
            }
            ExprKind::Paren(inner) => self.check_expr(ctx, inner),
        }
    }

    fn check_identifier(&mut self, ctx: &mut ModuleCtx, name: &str, span: Span) -> Type {
        match ctx.scopes.lookup(name) {
            Some(sym) => {
                self.identifier_symbols.insert((ctx.path.clone(), span), sym);
                self.symbols.resolved_type(sym)
            }
            None => {
                self.error(&ctx.path.clone(), span, format!("unknown identifier `{name}`"));
                Type::Json
            }
        }
    }

    fn check_binary(&mut self, ctx: &mut ModuleCtx, op: BinaryOp, lty: &Type, rty: &Type, span: Span) -> Type {
        match op {
            BinaryOp::Add => {
                if lty.widen() == Type::String && rty.widen() == Type::String {
                    return Type::String;
                }
                self.check_numeric_match(ctx, lty, rty, span)
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => self.check_numeric_match(ctx, lty, rty, span),
            BinaryOp::Eq | BinaryOp::NotEq => {
                if !comparable(lty, rty) {
                    self.error(&ctx.path.clone(), span, format!("cannot compare `{lty}` and `{rty}`"));
                }
                Type::Bool
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.check_numeric_match(ctx, lty, rty, span);
                Type::Bool
            }
            BinaryOp::And | BinaryOp::Or => {
                if lty.widen() != Type::Bool || rty.widen() != Type::Bool {
                    self.error(&ctx.path.clone(), span, "boolean operator requires `bool` operands");
                }
                Type::Bool
            }
        }
    }

    fn check_numeric_match(&mut self, ctx: &mut ModuleCtx, lty: &Type, rty: &Type, span: Span) -> Type {
        let lw = lty.widen();
        let rw = rty.widen();
        if lw.is_numeric() && lw == rw {
            lw
        } else {
            self.error(
                &ctx.path.clone(),
                span,
                format!("numeric operator requires matching numeric types, found `{lty}` and `{rty}`"),
            );
            Type::I64
        }
    }

    fn check_if_expr(&mut self, ctx: &mut ModuleCtx, cond: &Expr, then_branch: &Expr, else_branch: Option<&Expr>) -> Type {
        let narrow = narrow_cond(cond);
        self.check_expr(ctx, cond);
        ctx.scopes.push();
        if let Some((name, type_annotation, span)) = &narrow {
            let ty = self.resolve_type(ctx, type_annotation);
            self.rebind_local(ctx, name, ty, *span);
        }
        let then_ty = self.check_expr(ctx, then_branch);
        ctx.scopes.pop();
        match else_branch {
            Some(e) => {
                ctx.scopes.push();
                let else_ty = self.check_expr(ctx, e);
                ctx.scopes.pop();
                Type::union(vec![then_ty, else_ty])
            }
            None => Type::union(vec![then_ty, Type::Undefined]),
        }
    }

    fn check_try(&mut self, ctx: &mut ModuleCtx, inner: &Expr, span: Span) -> Type {
        let inner_ty = self.check_expr(ctx, inner);
        let (success, has_error) = inner_ty.split_error();
        if !has_error {
            self.error(
                &ctx.path.clone(),
                span,
                format!("`?` used on `{inner_ty}`, which is not `T | error`"),
            );
        }
        let ok = match &ctx.return_type {
            Some(ret) => ret.split_error().1,
            None => false,
        };
        if !ok {
            self.error(
                &ctx.path.clone(),
                span,
                "`?` used outside a function whose return type includes `error`",
            );
        }
        success
    }

    fn check_object_literal(&mut self, ctx: &mut ModuleCtx, obj: &tunascript_parser::ast::ObjectLiteral) -> Type {
        let mut props: IndexMap<String, Type> = IndexMap::new();
        for item in &obj.items {
            match item {
                ObjectLiteralItem::Prop(p) => {
                    let ty = self.check_expr(ctx, &p.value);
                    props.insert(p.key.clone(), ty);
                }
                ObjectLiteralItem::Spread(e) => {
                    let spread_ty = self.check_expr(ctx, e);
                    match &spread_ty {
                        Type::Object(o) => {
                            for prop in &o.props {
                                props.insert(prop.name.to_string(), prop.ty.clone());
                            }
                        }
                        _ => self.error(&ctx.path.clone(), e.span, "spread target is not an object type"),
                    }
                }
            }
        }
        Type::object(props.into_iter().map(|(k, v)| (Rc::from(k.as_str()), v)).collect(), None)
    }

    fn check_array_literal(&mut self, ctx: &mut ModuleCtx, arr: &tunascript_parser::ast::ArrayLiteral) -> Type {
        let mut elem_types = Vec::new();
        for item in &arr.items {
            match item {
                ArrayLiteralItem::Element(e) => elem_types.push(self.check_expr(ctx, e)),
                ArrayLiteralItem::Spread(e) => {
                    let spread_ty = self.check_expr(ctx, e);
                    match &spread_ty {
                        Type::Array(inner) => elem_types.push((**inner).clone()),
                        Type::Tuple(elems) => elem_types.extend(elems.iter().cloned()),
                        _ => self.error(&ctx.path.clone(), e.span, "spread target is not an array"),
                    }
                }
            }
        }
        if elem_types.is_empty() {
            Type::array(Type::Json)
        } else {
            Type::array(Type::union(elem_types))
        }
    }

    pub(crate) fn check_call(
        &mut self,
        ctx: &mut ModuleCtx,
        callee: &Expr,
        type_args: &[TypeExpr],
        args: &[Expr],
        span: Span,
    ) -> Type {
        if let ExprKind::Identifier(name) = &callee.kind {
            match ctx.scopes.lookup(name) {
                Some(sym) => {
                    self.identifier_symbols.insert((ctx.path.clone(), callee.span), sym);
                    let resolved = self.symbols.resolve_alias(sym);
                    let owner = self.symbols.get(resolved).owner_module.clone();
                    let sym_name = self.symbols.get(resolved).name.clone();
                    match (owner.as_str(), sym_name.as_str()) {
                        ("array", "map") => return self.check_map(ctx, args, span),
                        ("array", "filter") => return self.check_filter(ctx, args, span),
                        ("array", "reduce") => return self.check_reduce(ctx, args, span),
                        ("json", "decode") => return self.check_decode(ctx, type_args, args, span),
                        _ => {}
                    }
                }
                None => {
                    self.error(&ctx.path.clone(), callee.span, format!("unknown identifier `{name}`"));
                    for arg in args {
                        self.check_expr(ctx, arg);
                    }
                    return Type::Json;
                }
            }
        }
        self.check_ordinary_call(ctx, callee, args, span)
    }

    fn check_ordinary_call(&mut self, ctx: &mut ModuleCtx, callee: &Expr, args: &[Expr], span: Span) -> Type {
        let callee_ty = self.check_expr(ctx, callee);
        let Some((params, ret)) = func_info(&callee_ty) else {
            self.error(&ctx.path.clone(), callee.span, format!("`{callee_ty}` is not callable"));
            for arg in args {
                self.check_expr(ctx, arg);
            }
            return Type::Json;
        };
        if params.len() != args.len() {
            self.error(
                &ctx.path.clone(),
                span,
                format!("expected {} argument(s), found {}", params.len(), args.len()),
            );
        }
        for (i, arg) in args.iter().enumerate() {
            let Some(expected) = params.get(i) else {
                self.check_expr(ctx, arg);
                continue;
            };
            let arg_ty = self.check_arg_contextual(ctx, arg, expected);
            if !is_assignable(&arg_ty, expected) {
                self.error(
                    &ctx.path.clone(),
                    arg.span,
                    format!("argument {} of type `{arg_ty}` is not assignable to `{expected}`", i + 1),
                );
            }
        }
        ret
    }

    fn check_arg_contextual(&mut self, ctx: &mut ModuleCtx, arg: &Expr, expected: &Type) -> Type {
        if let ExprKind::FunctionLiteral { type_params, params, ret, body } = &arg.kind {
            if let Some((exp_params, exp_ret)) = func_info(expected) {
                let ty = self.check_function_literal(ctx, type_params, params, ret, body, Some((&exp_params, &exp_ret)));
                self.record_expr_type(ctx, arg.span, ty.clone());
                return ty;
            }
        }
        self.check_expr(ctx, arg)
    }

    fn check_map(&mut self, ctx: &mut ModuleCtx, args: &[Expr], span: Span) -> Type {
        if args.len() != 2 {
            self.error(&ctx.path.clone(), span, "`map` expects 2 arguments");
            return Type::array(Type::Json);
        }
        let xs_ty = self.check_expr(ctx, &args[0]);
        let elem_ty = array_elem(&xs_ty).unwrap_or_else(|| {
            self.error(&ctx.path.clone(), args[0].span, "`map`'s first argument must be an array");
            Type::Json
        });
        let f_ty = self.check_arg_contextual(ctx, &args[1], &Type::func(vec![], vec![elem_ty], Type::Json));
        Type::array(func_info(&f_ty).map(|(_, ret)| ret).unwrap_or(Type::Json))
    }

    fn check_filter(&mut self, ctx: &mut ModuleCtx, args: &[Expr], span: Span) -> Type {
        if args.len() != 2 {
            self.error(&ctx.path.clone(), span, "`filter` expects 2 arguments");
            return Type::array(Type::Json);
        }
        let xs_ty = self.check_expr(ctx, &args[0]);
        let elem_ty = array_elem(&xs_ty).unwrap_or_else(|| {
            self.error(&ctx.path.clone(), args[0].span, "`filter`'s first argument must be an array");
            Type::Json
        });
        self.check_arg_contextual(ctx, &args[1], &Type::func(vec![], vec![elem_ty.clone()], Type::Bool));
        Type::array(elem_ty)
    }

    fn check_reduce(&mut self, ctx: &mut ModuleCtx, args: &[Expr], span: Span) -> Type {
        if args.len() != 3 {
            self.error(&ctx.path.clone(), span, "`reduce` expects 3 arguments");
            return Type::Json;
        }
        let xs_ty = self.check_expr(ctx, &args[0]);
        let elem_ty = array_elem(&xs_ty).unwrap_or_else(|| {
            self.error(&ctx.path.clone(), args[0].span, "`reduce`'s first argument must be an array");
            Type::Json
        });
        let initial_ty = self.check_expr(ctx, &args[2]);
        self.check_arg_contextual(
            ctx,
            &args[1],
            &Type::func(vec![], vec![initial_ty.clone(), elem_ty], initial_ty.clone()),
        );
        initial_ty
    }

    /// Checks a function literal. `expected` carries the contextual
    /// parameter/return types when this literal appears where a function
    /// type is already known (a callback argument) — outside such a
    /// context, every parameter needs its own annotation (spec §4.1
    /// "lambda parameters require type annotations except when checked
    /// contextually").
    pub(crate) fn check_function_literal(
        &mut self,
        ctx: &mut ModuleCtx,
        type_params: &[String],
        params: &[tunascript_parser::ast::Param],
        ret: &Option<TypeExpr>,
        body: &tunascript_parser::ast::FunctionLiteralBody,
        expected: Option<(&[Type], &Type)>,
    ) -> Type {
        ctx.scopes.push();
        let mut param_tys = Vec::with_capacity(params.len());
        for (i, p) in params.iter().enumerate() {
            let ty = match &p.type_annotation {
                Some(t) => self.resolve_type(ctx, t),
                None => match expected.and_then(|(params, _)| params.get(i)) {
                    Some(t) => t.clone(),
                    None => {
                        self.error(
                            &ctx.path.clone(),
                            p.span,
                            format!("parameter `{}` requires a type annotation", p.name),
                        );
                        Type::Json
                    }
                },
            };
            param_tys.push(ty.clone());
            self.declare_local(ctx, &p.name, ty, p.span);
        }
        let declared_ret = ret.as_ref().map(|t| self.resolve_type(ctx, t));
        let previous_return = ctx.return_type.clone();
        let body_ty = match body {
            tunascript_parser::ast::FunctionLiteralBody::Block(block) => {
                ctx.return_type = declared_ret.clone().or_else(|| expected.map(|(_, ret)| ret.clone()));
                self.check_function_body_block(ctx, block);
                ctx.return_type.clone().unwrap_or(Type::Void)
            }
            tunascript_parser::ast::FunctionLiteralBody::Expr(e) => self.check_expr(ctx, e),
        };
        ctx.return_type = previous_return;
        ctx.scopes.pop();
        let ret_ty = declared_ret.unwrap_or(body_ty);
        Type::func(type_params.iter().map(|t| Rc::from(t.as_str())).collect(), param_tys, ret_ty)
    }

    fn check_decode(&mut self, ctx: &mut ModuleCtx, type_args: &[TypeExpr], args: &[Expr], span: Span) -> Type {
        if args.len() != 1 {
            self.error(&ctx.path.clone(), span, "`decode` expects 1 argument");
            return Type::Json;
        }
        self.check_expr(ctx, &args[0]);
        match type_args.first() {
            Some(t) => self.resolve_type(ctx, t),
            None => {
                self.error(&ctx.path.clone(), span, "`decode` requires an explicit type argument, e.g. `decode<T>(v)`");
                Type::Json
            }
        }
    }
}

fn array_elem(ty: &Type) -> Option<Type> {
    match ty {
        Type::Array(elem) => Some((**elem).clone()),
        _ => None,
    }
}

pub(crate) fn func_info(ty: &Type) -> Option<(Vec<Type>, Type)> {
    match ty {
        Type::Func(f) => Some((f.params.to_vec(), f.ret.clone())),
        _ => None,
    }
}

fn lookup_object_prop(ty: &Type, name: &str) -> Option<Type> {
    match ty {
        Type::Object(o) => o.props.iter().find(|p| &*p.name == name).map(|p| p.ty.clone()),
        _ => None,
    }
}

fn strip_nullish(ty: &Type) -> Type {
    match ty {
        Type::Union(members) => Type::union(
            members
                .iter()
                .filter(|m| !m.is_void_like() && !matches!(m, Type::Null))
                .cloned()
                .collect(),
        ),
        other => other.clone(),
    }
}

/// `if (x as T)` narrows the identifier `x` to `T` inside the then-branch
/// only (spec §4.3).
pub(crate) fn narrow_cond(cond: &Expr) -> Option<(String, TypeExpr, Span)> {
    if let ExprKind::As { expr, type_annotation } = &cond.kind {
        if let ExprKind::Identifier(name) = &expr.kind {
            return Some((name.clone(), (**type_annotation).clone(), cond.span));
        }
    }
    None
}
