//! Detects whether a module uses SQL/table features, which triggers the
//! on-demand load of the `server` built-in (spec §4.2 item 2, last bullet).

use tunascript_parser::ast::*;

#[must_use]
pub fn module_uses_sql(module: &Module) -> bool {
    module.declarations.iter().any(declaration_uses_sql)
}

fn declaration_uses_sql(decl: &Declaration) -> bool {
    match decl {
        Declaration::Const(c) => expr_uses_sql(&c.init),
        Declaration::Function(f) => block_uses_sql(&f.body),
        Declaration::ExternFunction(_) | Declaration::TypeAlias(_) => false,
        Declaration::Table(_) => true,
    }
}

fn block_uses_sql(block: &Block) -> bool {
    block.statements.iter().any(stmt_uses_sql)
}

fn stmt_uses_sql(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Const(s) => expr_uses_sql(&s.init),
        Stmt::If(s) => {
            expr_uses_sql(&s.cond)
                || block_uses_sql(&s.then_branch)
                || s.else_branch.as_deref().is_some_and(stmt_uses_sql)
        }
        Stmt::For(s) => expr_uses_sql(&s.iterable) || block_uses_sql(&s.body),
        Stmt::Return(s) => s.value.as_ref().is_some_and(expr_uses_sql),
        Stmt::Expr(s) => expr_uses_sql(&s.expr),
        Stmt::Block(b) => block_uses_sql(b),
    }
}

fn expr_uses_sql(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Sql(_) => true,
        ExprKind::IntegerLiteral(_)
        | ExprKind::FloatLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::NullLiteral
        | ExprKind::UndefinedLiteral
        | ExprKind::Identifier(_) => false,
        ExprKind::TemplateLiteral(parts) => parts.iter().any(|p| match p {
            TemplatePart::Literal(_) => false,
            TemplatePart::Expr(e) => expr_uses_sql(e),
        }),
        ExprKind::Binary { left, right, .. } => expr_uses_sql(left) || expr_uses_sql(right),
        ExprKind::Unary { operand, .. } => expr_uses_sql(operand),
        ExprKind::Member { object, .. } => expr_uses_sql(object),
        ExprKind::Index { object, index, .. } => expr_uses_sql(object) || expr_uses_sql(index),
        ExprKind::Call { callee, args, .. } => {
            expr_uses_sql(callee) || args.iter().any(expr_uses_sql)
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            expr_uses_sql(receiver) || args.iter().any(expr_uses_sql)
        }
        ExprKind::FunctionLiteral { body, .. } => match body {
            FunctionLiteralBody::Block(b) => block_uses_sql(b),
            FunctionLiteralBody::Expr(e) => expr_uses_sql(e),
        },
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            expr_uses_sql(cond)
                || expr_uses_sql(then_branch)
                || else_branch.as_deref().is_some_and(expr_uses_sql)
        }
        ExprKind::Switch { scrutinee, cases } => {
            expr_uses_sql(scrutinee)
                || cases.iter().any(|c| match &c.body {
                    SwitchCaseBody::Value(e) => expr_uses_sql(e),
                    SwitchCaseBody::Return(Some(e)) => expr_uses_sql(e),
                    SwitchCaseBody::Return(None) => false,
                })
        }
        ExprKind::Block(block, tail) => block_uses_sql(block) || expr_uses_sql(tail),
        ExprKind::Try(inner) => expr_uses_sql(inner),
        ExprKind::Object(obj) => obj.items.iter().any(|item| match item {
            ObjectLiteralItem::Prop(p) => expr_uses_sql(&p.value),
            ObjectLiteralItem::Spread(e) => expr_uses_sql(e),
        }),
        ExprKind::Array(arr) => arr.items.iter().any(|item| match item {
            ArrayLiteralItem::Element(e) => expr_uses_sql(e),
            ArrayLiteralItem::Spread(e) => expr_uses_sql(e),
        }),
        ExprKind::Jsx(node) => jsx_node_uses_sql(node),
        ExprKind::As { expr, .. } => expr_uses_sql(expr),
        ExprKind::Paren(inner) => expr_uses_sql(inner),
    }
}

fn jsx_node_uses_sql(node: &JsxNode) -> bool {
    match node {
        JsxNode::Element(el) => {
            el.attributes
                .iter()
                .any(|a| a.value.as_ref().is_some_and(expr_uses_sql))
                || el.spread_attributes.iter().any(expr_uses_sql)
                || el.children.iter().any(jsx_child_uses_sql)
        }
        JsxNode::Fragment(fr) => fr.children.iter().any(jsx_child_uses_sql),
    }
}

fn jsx_child_uses_sql(child: &JsxChild) -> bool {
    match child {
        JsxChild::Text(_) => false,
        JsxChild::Expr(e) => expr_uses_sql(e),
        JsxChild::Node(n) => jsx_node_uses_sql(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunascript_parser::parse_module;

    #[test]
    fn detects_inline_sql_expression() {
        let src = "export function main(): void { execute { DELETE FROM t } }";
        let module = parse_module("m.tuna", src).unwrap();
        assert!(module_uses_sql(&module));
    }

    #[test]
    fn detects_create_table() {
        let src = "create_table users { id INTEGER PRIMARY_KEY }";
        let module = parse_module("m.tuna", src).unwrap();
        assert!(module_uses_sql(&module));
    }

    #[test]
    fn plain_module_does_not_use_sql() {
        let src = "export const x: integer = 1 + 2";
        let module = parse_module("m.tuna", src).unwrap();
        assert!(!module_uses_sql(&module));
    }
}
