//! Inline SQL lowering (spec §4.4 "SQL lowering"). An `execute`/`fetch_one`/
//! `fetch_optional`/`fetch`/`fetch_all { ... }` block becomes a call to the
//! matching `host` intrinsic ([`crate::sql_gen`] mirrors the text
//! reconstruction [`tunascript_checker::sql_check`] already validated
//! against): the segments are rejoined into one query string with each
//! `{param}` replaced by `?`, every param expression is boxed into a
//! `json[]` array, and the call goes out against the implicit default
//! database handle `$__db` every SQL-using program gets (see DESIGN.md's
//! "default database handle" decision).

use tunascript_parser::ast::{SqlBlock, SqlForm, SqlSegment};
use tunascript_solver::Type;

use crate::context::Codegen;
use crate::error::CodegenError;

/// The global holding the database handle every inline SQL block reads.
/// Declared and initialized by `module_gen` once, the first time any loaded
/// module is found to use SQL.
pub const DB_GLOBAL: &str = "$__db";

impl Codegen<'_> {
    pub fn lower_sql(&mut self, module_path: &str, block: &SqlBlock, ty: &Type) -> Result<String, CodegenError> {
        let mut sql_text = String::new();
        let mut params = Vec::new();
        for segment in &block.segments {
            match segment {
                SqlSegment::Text(t) => sql_text.push_str(t),
                SqlSegment::Param(expr) => {
                    let arg_ty = self.expr_ty(module_path, expr);
                    let value = self.lower_expr(module_path, expr)?;
                    let boxed = if arg_ty.is_reference_typed() { value } else { self.box_raw(&value, &arg_ty.widen()) };
                    params.push(boxed);
                    sql_text.push('?');
                }
            }
        }

        let text_atom = self.intern(&sql_text);
        let text_global = self.string_global(text_atom);
        let query_arg = format!("(call $val_from_string (global.get {text_global}))");
        let params_arr = format!("(array.new_fixed $valarr {} {})", params.len(), params.join(" "));
        let params_arg = format!("(call $val_from_array {params_arr})");

        let host_fn = self.host_import_name("host", form_fn_name(block.form));
        let call = format!("(call {host_fn} (global.get {DB_GLOBAL}) {query_arg} {params_arg})");
        Ok(self.unbox_to(&call, ty))
    }
}

fn form_fn_name(form: SqlForm) -> &'static str {
    match form {
        SqlForm::Execute => "sql_execute",
        SqlForm::FetchOne => "sql_fetch_one",
        SqlForm::FetchOptional => "sql_fetch_optional",
        SqlForm::Fetch | SqlForm::FetchAll => "sql_query",
    }
}
