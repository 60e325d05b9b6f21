//! End-to-end checker tests: load a small program through the real loader
//! (entry file + the embedded `lib/` built-ins) and run `check_program`
//! against it, asserting on the accumulated diagnostics or on successful
//! checking. Mirrors the concrete scenarios in spec.md §8.

use std::fs;
use tunascript_checker::check_program;
use tunascript_common::CompileError;
use tunascript_loader::{LibraryIndex, LoaderConfig, LoadedProgram, ModuleLoader};

fn load(source: &str) -> LoadedProgram {
    let dir = tempfile::tempdir().unwrap();
    let entry = dir.path().join("main.tuna");
    fs::write(&entry, source).unwrap();
    let lib = LibraryIndex::discover(&LoaderConfig::default()).unwrap();
    ModuleLoader::new(&lib).load_program(&entry).unwrap()
}

fn messages(err: &CompileError) -> Vec<String> {
    err.all().iter().map(|d| d.message.clone()).collect()
}

#[test]
fn arithmetic_and_string_concat_checks_clean() {
    let loaded = load(
        r#"
        export function main(): void {
            const a: integer = 40 + 2
            const s: string = "ab" + "cd"
            log(to_string(a))
            log(s)
        }
        "#,
    );
    let program = check_program(&loaded).expect("well-typed program should check cleanly");
    assert!(program.errors.is_empty());
}

#[test]
fn integer_float_mixing_is_a_type_error() {
    let loaded = load(
        r#"
        export function main(): void {
            const a: integer = 1
            const b: number = 2.0
            const c = a == b
            log(to_string(c))
        }
        "#,
    );
    let err = check_program(&loaded).expect_err("mixing integer and number must be a TypeError");
    assert!(matches!(err, CompileError::Many(_) | CompileError::Type(_)));
}

#[test]
fn shadowing_an_outer_binding_is_an_error() {
    let loaded = load(
        r#"
        export function main(): void {
            const x: integer = 1
            if (true) {
                const x: integer = 2
                log(to_string(x))
            }
        }
        "#,
    );
    let err = check_program(&loaded).expect_err("shadowing must be rejected");
    assert!(messages(&err).iter().any(|m| m.contains("shadows")));
}

#[test]
fn try_operator_outside_error_returning_function_is_an_error() {
    let loaded = load(
        r#"
        function first(xs: integer[]): integer | error {
            const v = xs[0]?
            return v
        }
        export function main(): void {
            const v = first([])?
            log(to_string(v))
        }
        "#,
    );
    let err = check_program(&loaded).expect_err("`?` requires the enclosing fn to return error");
    assert!(!messages(&err).is_empty());
}

#[test]
fn try_operator_inside_error_returning_function_checks_clean() {
    let loaded = load(
        r#"
        function first(xs: integer[]): integer | error {
            const v = xs[0]?
            return v
        }
        export function main(): void | error {
            const v = first([])?
            log(to_string(v))
        }
        "#,
    );
    let program = check_program(&loaded).expect("`?` is legal here");
    assert!(program.errors.is_empty());
}

#[test]
fn switch_expression_result_is_union_of_case_bodies() {
    let loaded = load(
        r#"
        export function main(): void {
            const v: integer | string = 42
            const m = switch (v) {
                case v as integer: "int"
                case v as string: "str"
            }
            log(m)
        }
        "#,
    );
    let program = check_program(&loaded).expect("narrowed switch should check cleanly");
    assert!(program.errors.is_empty());
}

#[test]
fn sql_query_referencing_unknown_column_is_an_error() {
    let loaded = load(
        r#"
        create_table users {
            id INTEGER PRIMARY KEY,
            name TEXT
        }
        export function main(): void | error {
            const rows = fetch_all { SELECT id, email FROM users }?
            log(to_string(rows))
        }
        "#,
    );
    let err = check_program(&loaded).expect_err("`email` is not a column of `users`");
    assert!(messages(&err).iter().any(|m| m.contains("email")));
}

#[test]
fn sql_query_against_declared_schema_checks_clean() {
    let loaded = load(
        r#"
        create_table users {
            id INTEGER PRIMARY KEY,
            name TEXT
        }
        export function main(): void | error {
            const rows = fetch_all { SELECT id, name FROM users ORDER BY id }?
            log(to_string(rows))
        }
        "#,
    );
    let program = check_program(&loaded).expect("query matches the registered schema");
    assert!(program.errors.is_empty());
}

#[test]
fn jsx_custom_component_with_unknown_prop_is_an_error() {
    let loaded = load(
        r#"
        export function Layout(props: { title: string, children: JSX }): JSX {
            return <section><h1>{props.title}</h1>{props.children}</section>
        }
        export function main(): void {
            log(<Layout title="Home" subtitle="extra">hi</Layout>)
        }
        "#,
    );
    let err = check_program(&loaded).expect_err("`subtitle` is not a declared prop");
    assert!(!messages(&err).is_empty());
}

#[test]
fn jsx_composition_with_declared_props_checks_clean() {
    let loaded = load(
        r#"
        export function Layout(props: { title: string, children: JSX }): JSX {
            return <section><h1>{props.title}</h1>{props.children}</section>
        }
        export function main(): void {
            log(<Layout title="Home"><p>Welcome</p></Layout>)
        }
        "#,
    );
    let program = check_program(&loaded).expect("matching props should check cleanly");
    assert!(program.errors.is_empty());
}

#[test]
fn select_star_row_type_expands_to_declared_columns() {
    let loaded = load(
        r#"
        create_table users {
            id INTEGER PRIMARY KEY,
            name TEXT
        }
        export function main(): void | error {
            const rows: { id: string, name: string }[] = fetch_all { SELECT * FROM users }?
            log(to_string(rows))
        }
        "#,
    );
    let program = check_program(&loaded).expect("`*` should expand to the table's declared columns");
    assert!(program.errors.is_empty());
}

#[test]
fn array_map_filter_reduce_infer_element_types_without_annotations() {
    let loaded = load(
        r#"
        export function main(): void {
            const xs: integer[] = [1, 2, 3]
            const doubled = map(xs, n => n * 2)
            const total = reduce(doubled, (acc, v) => acc + v, 0)
            log(to_string(total))
            log(to_string(length(doubled)))
        }
        "#,
    );
    let program = check_program(&loaded).expect("generic built-ins should infer cleanly");
    assert!(program.errors.is_empty());
}
