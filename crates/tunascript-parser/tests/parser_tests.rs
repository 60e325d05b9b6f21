//! Grammar-level parser tests (spec §4.1).

use tunascript_parser::ast::{BinaryOp, Declaration, ExprKind, Stmt};
use tunascript_parser::parse_module;

fn parse_ok(src: &str) -> tunascript_parser::ast::Module {
    parse_module("test.tuna", src).expect("expected source to parse")
}

fn main_body(module: &tunascript_parser::ast::Module) -> &tunascript_parser::ast::Block {
    match &module.declarations[0] {
        Declaration::Function(f) => &f.body,
        other => panic!("expected a function declaration, found {other:?}"),
    }
}

#[test]
fn semicolons_are_a_parse_error() {
    let err = parse_module("test.tuna", "export function main(): void { const x: integer = 1; }")
        .expect_err("semicolons must be rejected");
    assert!(err.message.to_lowercase().contains("semicolon"));
}

#[test]
fn newline_before_paren_does_not_continue_previous_expression() {
    // `foo` is a complete expression statement; the following line's `(bar)`
    // must parse as its own parenthesized-expression statement, not as a
    // call `foo(bar)` (spec §4.1 syntactic rule).
    let module = parse_ok(
        "export function main(): void {\n\
             foo\n\
             (bar)\n\
         }",
    );
    let body = main_body(&module);
    assert_eq!(body.statements.len(), 2);
    match &body.statements[0] {
        Stmt::Expr(s) => assert!(matches!(s.expr.kind, ExprKind::Identifier(ref n) if n == "foo")),
        other => panic!("expected an identifier expression statement, found {other:?}"),
    }
    match &body.statements[1] {
        Stmt::Expr(s) => assert!(matches!(s.expr.kind, ExprKind::Paren(_))),
        other => panic!("expected a parenthesized expression statement, found {other:?}"),
    }
}

#[test]
fn newline_before_bracket_does_not_continue_previous_expression() {
    let module = parse_ok(
        "export function main(): void {\n\
             foo\n\
             [1, 2]\n\
         }",
    );
    let body = main_body(&module);
    assert_eq!(body.statements.len(), 2);
    match &body.statements[1] {
        Stmt::Expr(s) => assert!(matches!(s.expr.kind, ExprKind::Array(_))),
        other => panic!("expected an array-literal expression statement, found {other:?}"),
    }
}

#[test]
fn call_and_index_on_the_same_line_still_chain() {
    let module = parse_ok("export function main(): void {\n    foo(1)[0]\n}");
    let body = main_body(&module);
    assert_eq!(body.statements.len(), 1);
    match &body.statements[0] {
        Stmt::Expr(s) => assert!(matches!(s.expr.kind, ExprKind::Index { .. })),
        other => panic!("expected an index expression, found {other:?}"),
    }
}

#[test]
fn shadowing_const_introduction_is_allowed_by_the_parser() {
    // Shadowing is a *checker* error (spec §4.3), not a parse error; the
    // grammar itself must accept it.
    parse_ok(
        "export function main(): void {\n\
             const x: integer = 1\n\
             const x: integer = 2\n\
             log(to_string(x))\n\
         }",
    );
}

#[test]
fn method_call_sugar_is_recorded_distinctly() {
    let module = parse_ok("export function main(): void { obj.func(1, 2) }");
    let body = main_body(&module);
    match &body.statements[0] {
        Stmt::Expr(s) => assert!(matches!(s.expr.kind, ExprKind::MethodCall { .. })),
        other => panic!("expected a method-call expression, found {other:?}"),
    }
}

#[test]
fn template_literal_interpolation_parses_literal_and_expr_parts() {
    let module = parse_ok("export function main(): void { log(`hi ${name}!`) }");
    let body = main_body(&module);
    let stmt = match &body.statements[0] {
        Stmt::Expr(s) => s,
        other => panic!("expected an expression statement, found {other:?}"),
    };
    let call_args = match &stmt.expr.kind {
        ExprKind::Call { args, .. } => args,
        other => panic!("expected a call, found {other:?}"),
    };
    match &call_args[0].kind {
        ExprKind::TemplateLiteral(parts) => assert_eq!(parts.len(), 3),
        other => panic!("expected a template literal, found {other:?}"),
    }
}

#[test]
fn switch_case_with_return_does_not_contribute_to_switch_value() {
    let module = parse_ok(
        "export function f(v: integer | string): integer {\n\
             switch (v) {\n\
                 case v as string: return 0\n\
                 case v as integer: v\n\
             }\n\
         }",
    );
    let body = main_body_of(&module, "f");
    match &body.statements[0] {
        Stmt::Expr(s) => match &s.expr.kind {
            ExprKind::Switch { cases, .. } => {
                assert_eq!(cases.len(), 2);
                assert!(matches!(
                    cases[0].body,
                    tunascript_parser::ast::SwitchCaseBody::Return(_)
                ));
                assert!(matches!(
                    cases[1].body,
                    tunascript_parser::ast::SwitchCaseBody::Value(_)
                ));
            }
            other => panic!("expected a switch expression, found {other:?}"),
        },
        other => panic!("expected an expression statement, found {other:?}"),
    }
}

#[test]
fn for_of_with_object_destructuring_pattern() {
    let module = parse_ok(
        "export function main(): void {\n\
             for (const { id, name } of rows) {\n\
                 log(name)\n\
             }\n\
         }",
    );
    let body = main_body(&module);
    match &body.statements[0] {
        Stmt::For(f) => assert!(matches!(f.pattern, tunascript_parser::ast::Pattern::Object { .. })),
        other => panic!("expected a for-of statement, found {other:?}"),
    }
}

#[test]
fn create_table_declaration_parses_columns_and_constraints() {
    let module = parse_ok(
        "create_table users {\n\
             id INTEGER PRIMARY KEY,\n\
             name TEXT NOT NULL\n\
         }",
    );
    match &module.declarations[0] {
        Declaration::Table(t) => {
            assert_eq!(t.name, "users");
            assert_eq!(t.columns.len(), 2);
            assert_eq!(t.columns[0].sql_type, "INTEGER");
            assert_eq!(t.columns[1].constraints, "NOT NULL");
        }
        other => panic!("expected a table declaration, found {other:?}"),
    }
}

#[test]
fn inline_sql_block_captures_params_between_text_segments() {
    let module = parse_ok(
        "export function main(): void | error {\n\
             const id: integer = 1\n\
             execute { UPDATE users SET name = {id} WHERE id = {id} }\n\
         }",
    );
    let body = main_body(&module);
    match &body.statements[1] {
        Stmt::Expr(s) => match &s.expr.kind {
            ExprKind::Sql(block) => {
                assert_eq!(block.form, tunascript_parser::ast::SqlForm::Execute);
                let param_count = block
                    .segments
                    .iter()
                    .filter(|s| matches!(s, tunascript_parser::ast::SqlSegment::Param(_)))
                    .count();
                assert_eq!(param_count, 2);
            }
            other => panic!("expected a SQL block, found {other:?}"),
        },
        other => panic!("expected an expression statement, found {other:?}"),
    }
}

#[test]
fn jsx_element_with_children_and_spread_attributes() {
    let module = parse_ok(
        "export function main(): void {\n\
             const x: string = <div class=\"a\" ...rest>hi</div>\n\
         }",
    );
    let body = main_body(&module);
    match &body.statements[0] {
        Stmt::Const(c) => match &c.init.kind {
            ExprKind::Jsx(tunascript_parser::ast::JsxNode::Element(el)) => {
                assert_eq!(el.tag, "div");
                assert!(!el.is_component);
                assert_eq!(el.attributes.len(), 1);
                assert_eq!(el.spread_attributes.len(), 1);
                assert_eq!(el.children.len(), 1);
            }
            other => panic!("expected a JSX element, found {other:?}"),
        },
        other => panic!("expected a const statement, found {other:?}"),
    }
}

#[test]
fn binary_operator_precedence_multiplies_before_adding() {
    let module = parse_ok("export function main(): void { const x: integer = 1 + 2 * 3 }");
    let body = main_body(&module);
    match &body.statements[0] {
        Stmt::Const(c) => match &c.init.kind {
            ExprKind::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected `+` at the top, found {other:?}"),
        },
        other => panic!("expected a const statement, found {other:?}"),
    }
}

fn main_body_of<'a>(module: &'a tunascript_parser::ast::Module, name: &str) -> &'a tunascript_parser::ast::Block {
    for decl in &module.declarations {
        if let Declaration::Function(f) = decl {
            if f.name == name {
                return &f.body;
            }
        }
    }
    panic!("no function named `{name}`")
}
