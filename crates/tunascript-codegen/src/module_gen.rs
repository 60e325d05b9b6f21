//! Top-level orchestration: walks the whole checked program once, then
//! assembles every section `crate::context::Codegen`'s other modules fill
//! in into the single WAT module spec §6 describes — imports, memory/data,
//! globals, functions, and `_start`.
//!
//! This is the one place that decides section *order*; every other module
//! in this crate only ever appends to one of `Codegen`'s buffers or to the
//! string table, per the "never backpatches" design note.

use tunascript_checker::CheckedProgram;

use crate::context::Codegen;
use crate::decl_gen::DeferredConstInit;
use crate::error::CodegenError;
use crate::runtime_helpers::{GC_TYPE_SECTION, IS_ERROR_SHAPE_TEMPLATE, RUNTIME_HELPERS};
use crate::wat_writer::WatWriter;

/// Generate the complete WAT text for a checked program (spec §4.4, §6).
#[tracing::instrument(skip_all, fields(entry = %program.entry, modules = program.modules.len()))]
pub fn generate(program: &CheckedProgram) -> Result<String, CodegenError> {
    tracing::debug!("starting codegen");
    let mut cg = Codegen::new(program);
    cg.emit_builtin_imports();

    let mut module_paths: Vec<&String> = program.modules.keys().collect();
    module_paths.sort();

    let mut deferred: Vec<DeferredConstInit> = Vec::new();
    for path in &module_paths {
        cg.lower_module_declarations(path, &mut deferred)?;
    }

    cg.emit_fn_value_thunks();

    require_main(program, &cg)?;

    // Every remaining interning (the error-tag literals, each deferred
    // const's own initializer, the table-registration JSON blob) must
    // happen before the string table is frozen below.
    let type_key_atom = cg.intern("type");
    let type_key_global = cg.string_global(type_key_atom);
    let error_tag_atom = cg.intern("error");
    let error_tag_global = cg.string_global(error_tag_atom);

    // A program that ever writes an inline `execute`/`fetch_one`/... block
    // imports `host`'s `sql_*` externs, so its presence in the loaded set
    // is exactly the condition for needing the default db handle global
    // (see DESIGN.md's "default database handle" decision: handle `0`
    // names whatever database the host runtime treats as default, with no
    // explicit `db_open` call required from generated code).
    let uses_sql = program.modules.contains_key("host");

    let tables_json_global = if cg.has_tables {
        let json = program.tables.to_json();
        let atom = cg.intern(&json);
        Some(cg.string_global(atom))
    } else {
        None
    };

    let mut init_body = WatWriter::new();
    lower_deferred_consts(&mut cg, &mut init_body, deferred)?;

    let layout = std::mem::take(&mut cg.strings).finish();

    let mut out = String::new();
    out.push_str("(module\n");
    out.push_str(&cg.imports.finish());
    out.push('\n');
    out.push_str(GC_TYPE_SECTION);
    out.push('\n');

    let pages = layout.pages.max(1);
    out.push_str(&format!("  (memory $memory {pages})\n"));
    out.push_str("  (export \"memory\" (memory $memory))\n\n");

    for (i, entry) in layout.entries.iter().enumerate() {
        out.push_str(&format!(
            "  (data $sd{i} \"{}\")\n",
            escape_wat_bytes(&entry.bytes)
        ));
    }
    out.push('\n');

    out.push_str("  (global $__inited (mut i32) (i32.const 0))\n");
    for entry in &layout.entries {
        out.push_str(&format!("  (global {} (mut (ref null $str)) (ref.null $str))\n", entry.global));
    }
    if uses_sql {
        out.push_str(&format!("  (global {} i64 (i64.const 0))\n", crate::sql_gen::DB_GLOBAL));
    }
    out.push_str("  (global $__main_result (mut (ref null $boxed)) (ref.null $boxed))\n");
    out.push('\n');
    out.push_str(&cg.globals.finish());
    out.push('\n');

    out.push_str(RUNTIME_HELPERS);
    out.push('\n');
    let is_error_shape = IS_ERROR_SHAPE_TEMPLATE
        .replace("{key_global}", &type_key_global)
        .replace("{value_global}", &error_tag_global);
    out.push_str(&is_error_shape);
    out.push('\n');

    out.push_str(&cg.functions.finish());
    out.push('\n');

    // `__init` constructs every interned string from its data segment, runs
    // deferred top-level const initializers, and registers table schemas
    // if the program declares any, then marks itself done (spec §3
    // "Module initialization globals are written exactly once ... guarded
    // by an `__inited` flag"). The default db handle needs no init-time
    // work: it is a plain constant, not opened by generated code.
    let mut init_fn = WatWriter::new();
    init_fn.open("(func $__init".to_string());
    for (name, wat_ty) in &cg.pending_locals.clone() {
        init_fn.line(format!("(local {name} {wat_ty})"));
    }
    for (i, entry) in layout.entries.iter().enumerate() {
        init_fn.line(format!(
            "(global.set {} (array.new_data $str $sd{i} (i32.const 0) (i32.const {})))",
            entry.global, entry.len
        ));
    }
    init_fn.raw(&init_body.finish());
    if let Some(json_global) = tables_json_global {
        let register_tables = cg.host_import_name("host", "register_tables");
        init_fn.line(format!(
            "(call {register_tables} (call $val_from_string (global.get {json_global})))"
        ));
    }
    init_fn.line("(global.set $__inited (i32.const 1))");
    init_fn.close();
    out.push_str(&init_fn.finish());
    out.push('\n');

    out.push_str(
        "  (func $__ensure_init\n    (if (i32.eqz (global.get $__inited)) (then (call $__init)))\n  )\n\n",
    );

    for exported in &cg.exported_functions {
        out.push_str(&emit_export_wrapper(exported));
    }

    out.push_str(&emit_start(&cg));

    out.push_str(")\n");
    tracing::debug!(bytes = out.len(), "codegen finished");
    Ok(out)
}

/// Assemble generated WAT text into a `.wasm` binary (spec.md §2 item 6:
/// "WAT→WASM assembly ... delegated to a library binding"). Separate from
/// [`generate`] so a caller that only wants the text — or a test asserting
/// the text itself parses — doesn't pay for assembly it doesn't need.
pub fn assemble(wat_text: &str) -> Result<Vec<u8>, CodegenError> {
    wat::parse_str(wat_text).map_err(|err| {
        CodegenError::new("<generated>", tunascript_common::Span::dummy(), err.to_string())
    })
}

fn lower_deferred_consts(
    cg: &mut Codegen<'_>,
    init_body: &mut WatWriter,
    deferred: Vec<DeferredConstInit>,
) -> Result<(), CodegenError> {
    for d in deferred {
        cg.reset_function_state();
        cg.push_scope();
        let value = cg.lower_expr(&d.module_path, &d.init)?;
        cg.pop_scope();
        for (name, wat_ty) in cg.pending_locals.clone() {
            init_body.line(format!("(local {name} {wat_ty})"));
        }
        init_body.line(format!("(global.set {} {value})", d.global));
    }
    cg.reset_function_state();
    Ok(())
}

/// `export function main(): void` or `export function main(): void | error`
/// is the one required entry point (spec §6).
fn require_main(program: &CheckedProgram, cg: &Codegen<'_>) -> Result<(), CodegenError> {
    let found = cg
        .exported_functions
        .iter()
        .any(|f| f.tuna_name == "main" && f.params.is_empty());
    if found {
        return Ok(())
    }
    Err(CodegenError::new(
        &program.entry,
        tunascript_common::Span::dummy(),
        "program has no `export function main(): void` entry point",
    ))
}

fn emit_export_wrapper(exported: &crate::context::ExportedFunction) -> String {
    let mut w = WatWriter::new();
    let mut header = format!("(func {}_export (export \"{}\")", exported.wat_fn, exported.tuna_name);
    for (local, wat_ty) in &exported.params {
        header.push_str(&format!(" (param {local} {wat_ty})"));
    }
    if let Some(rt) = exported.ret_wat {
        header.push_str(&format!(" (result {rt})"));
    }
    w.open(header);
    w.line("(call $__ensure_init)".to_string());
    let args = exported
        .params
        .iter()
        .map(|(local, _)| format!("(local.get {local})"))
        .collect::<Vec<_>>()
        .join(" ");
    let call = format!("(call {} {args})", exported.wat_fn);
    if exported.ret_wat.is_some() {
        w.line(format!("(return {call})"));
    } else {
        w.line(call);
    }
    w.close();
    w.blank();
    w.finish()
}

/// `_start` runs module init, then invokes `main`, stashing a non-void
/// result in `$__main_result` for the host to read (spec §6 "optionally
/// storing a `main` result for the runtime to inspect").
fn emit_start(cg: &Codegen<'_>) -> String {
    let main = cg
        .exported_functions
        .iter()
        .find(|f| f.tuna_name == "main" && f.params.is_empty())
        .expect("require_main already validated main exists");

    let mut w = WatWriter::new();
    w.open("(func $_start (export \"_start\")".to_string());
    w.line("(call $__ensure_init)".to_string());
    let call = format!("(call {})", main.wat_fn);
    if main.ret_wat.is_some() {
        w.line(format!("(global.set $__main_result {call})"));
    } else {
        w.line(call);
    }
    w.close();
    w.blank();
    w.finish()
}

/// WAT string-literal escaping: printable ASCII goes through as-is except
/// `"` and `\`; everything else becomes `\XX`.
fn escape_wat_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{b:02x}")),
        }
    }
    out
}
