//! Inline SQL validation (spec §4.3 "SQL validation"): enough of a SQL
//! reader to identify the statement kind, target table, and referenced
//! columns, checked against the registered `create_table` schemas. Each
//! query form has a fixed result-type shape.

use std::rc::Rc;
use tunascript_parser::ast::{SqlBlock, SqlForm, SqlSegment};
use tunascript_solver::Type;

use crate::checker::{Checker, ModuleCtx};

struct SqlAnalysis {
    table: Option<String>,
    referenced_columns: Vec<String>,
    is_select: bool,
    projection: Vec<String>,
}

impl Checker {
    pub(crate) fn check_sql(&mut self, ctx: &mut ModuleCtx, block: &SqlBlock) -> Type {
        let mut sql_text = String::new();
        for segment in &block.segments {
            match segment {
                SqlSegment::Text(t) => sql_text.push_str(t),
                SqlSegment::Param(expr) => {
                    let ty = self.check_expr(ctx, expr);
                    if !is_primitive_or_json(&ty) {
                        self.error(
                            &ctx.path.clone(),
                            expr.span,
                            format!("SQL parameter must be a primitive or `json`, found `{ty}`"),
                        );
                    }
                    sql_text.push('?');
                }
            }
        }

        let analysis = analyze_sql(&sql_text);
        if let Some(table_name) = &analysis.table {
            match self.tables.get(table_name) {
                Some(schema) => {
                    for column in &analysis.referenced_columns {
                        if column != "*" && !schema.has_column(column) {
                            self.error(
                                &ctx.path.clone(),
                                block.span,
                                format!("table `{table_name}` has no column `{column}`"),
                            );
                        }
                    }
                }
                None if !self.tables.is_empty() => {
                    self.error(&ctx.path.clone(), block.span, format!("unknown table `{table_name}`"));
                }
                None => {}
            }
        }

        let row_ty = if analysis.is_select {
            let star_schema = if analysis.projection == ["*"] {
                analysis.table.as_deref().and_then(|name| self.tables.get(name))
            } else {
                None
            };
            match star_schema {
                Some(schema) => schema.row_type(),
                None => Type::object(
                    analysis.projection.iter().map(|name| (Rc::from(name.as_str()), Type::String)).collect(),
                    None,
                ),
            }
        } else {
            Type::object(vec![], None)
        };

        match block.form {
            SqlForm::Execute => Type::union(vec![Type::Void, Type::error_shape()]),
            SqlForm::FetchOne => Type::union(vec![row_ty, Type::error_shape()]),
            SqlForm::FetchOptional => Type::union(vec![row_ty, Type::Null, Type::error_shape()]),
            SqlForm::Fetch | SqlForm::FetchAll => Type::union(vec![Type::array(row_ty), Type::error_shape()]),
        }
    }
}

fn is_primitive_or_json(ty: &Type) -> bool {
    matches!(
        ty.widen(),
        Type::I64 | Type::F64 | Type::Bool | Type::String | Type::Json | Type::Null | Type::Undefined
    )
}

fn analyze_sql(text: &str) -> SqlAnalysis {
    let trimmed = text.trim_start();
    let upper = trimmed.to_uppercase();
    if upper.starts_with("SELECT") {
        analyze_select(trimmed)
    } else if upper.starts_with("INSERT") {
        analyze_insert(trimmed)
    } else if upper.starts_with("UPDATE") {
        analyze_update(trimmed)
    } else if upper.starts_with("DELETE") {
        analyze_delete(trimmed)
    } else {
        SqlAnalysis {
            table: None,
            referenced_columns: Vec::new(),
            is_select: false,
            projection: Vec::new(),
        }
    }
}

fn analyze_select(sql: &str) -> SqlAnalysis {
    let upper = sql.to_uppercase();
    let from_idx = find_top_level_keyword(&upper, "FROM");
    let projection_part = match from_idx {
        Some(idx) => &sql["SELECT".len()..idx],
        None => &sql["SELECT".len()..],
    };
    let table = from_idx.and_then(|idx| first_identifier(sql[idx + "FROM".len()..].trim_start()));

    let mut referenced_columns = Vec::new();
    let mut projection = Vec::new();
    for item in split_top_level_commas(projection_part) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if item == "*" {
            referenced_columns.push("*".to_string());
            projection.push("*".to_string());
            continue;
        }
        let (expr_part, alias) = split_as_alias(item);
        let bare = strip_qualifier(expr_part.trim());
        let output_name = alias.unwrap_or_else(|| {
            if is_bare_identifier(bare) {
                bare.to_string()
            } else {
                first_identifier(expr_part.trim()).unwrap_or_else(|| expr_part.trim().to_string())
            }
        });
        projection.push(output_name);
        if is_bare_identifier(bare) {
            referenced_columns.push(bare.to_string());
        }
    }
    SqlAnalysis {
        table,
        referenced_columns,
        is_select: true,
        projection,
    }
}

fn analyze_insert(sql: &str) -> SqlAnalysis {
    let upper = sql.to_uppercase();
    let mut table = None;
    let mut referenced_columns = Vec::new();
    if let Some(idx) = find_top_level_keyword(&upper, "INTO") {
        let rest = sql[idx + "INTO".len()..].trim_start();
        if let Some(t) = first_identifier(rest) {
            let after_table = rest[t.len()..].trim_start();
            if after_table.starts_with('(') {
                if let Some(close) = find_matching_paren(after_table) {
                    referenced_columns = split_top_level_commas(&after_table[1..close])
                        .into_iter()
                        .map(|c| strip_qualifier(c.trim()).to_string())
                        .filter(|c| !c.is_empty())
                        .collect();
                }
            }
            table = Some(t);
        }
    }
    SqlAnalysis {
        table,
        referenced_columns,
        is_select: false,
        projection: Vec::new(),
    }
}

fn analyze_update(sql: &str) -> SqlAnalysis {
    let upper = sql.to_uppercase();
    let table = first_identifier(sql["UPDATE".len()..].trim_start());
    let mut referenced_columns = Vec::new();
    if let Some(set_idx) = find_top_level_keyword(&upper, "SET") {
        let set_start = set_idx + "SET".len();
        let where_idx = find_top_level_keyword(&upper[set_start..], "WHERE").map(|w| w + set_start);
        let set_clause = match where_idx {
            Some(w) => &sql[set_start..w],
            None => &sql[set_start..],
        };
        for assignment in split_top_level_commas(set_clause) {
            if let Some(eq) = assignment.find('=') {
                referenced_columns.push(strip_qualifier(assignment[..eq].trim()).to_string());
            }
        }
    }
    SqlAnalysis {
        table,
        referenced_columns,
        is_select: false,
        projection: Vec::new(),
    }
}

fn analyze_delete(sql: &str) -> SqlAnalysis {
    let upper = sql.to_uppercase();
    let table = find_top_level_keyword(&upper, "FROM")
        .and_then(|idx| first_identifier(sql[idx + "FROM".len()..].trim_start()));
    SqlAnalysis {
        table,
        referenced_columns: Vec::new(),
        is_select: false,
        projection: Vec::new(),
    }
}

/// Find `keyword` as a standalone word at paren-depth 0 (so `FROM` inside a
/// subquery's parens, or as part of a longer identifier, is not matched).
fn find_top_level_keyword(upper: &str, keyword: &str) -> Option<usize> {
    let bytes = upper.as_bytes();
    let klen = keyword.len();
    let mut depth = 0i32;
    let mut i = 0;
    while i + klen <= bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && &upper[i..i + klen] == keyword {
            let before_ok = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
            let after_ok = i + klen == bytes.len() || !bytes[i + klen].is_ascii_alphanumeric();
            if before_ok && after_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

fn split_top_level_commas(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => items.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        items.push(current);
    }
    items
}

fn find_matching_paren(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'(') {
        return None;
    }
    let mut depth = 0i32;
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn first_identifier(text: &str) -> Option<String> {
    let text = text.trim_start();
    let end = text.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).unwrap_or(text.len());
    if end == 0 {
        None
    } else {
        Some(text[..end].to_string())
    }
}

fn split_as_alias(item: &str) -> (&str, Option<String>) {
    let upper = item.to_uppercase();
    match find_top_level_keyword(&upper, "AS") {
        Some(idx) => (&item[..idx], Some(item[idx + "AS".len()..].trim().to_string())),
        None => (item, None),
    }
}

fn strip_qualifier(s: &str) -> &str {
    match s.rfind('.') {
        Some(i) => &s[i + 1..],
        None => s,
    }
}

fn is_bare_identifier(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_extracts_table_and_columns() {
        let a = analyze_select("SELECT id, name FROM users WHERE id = ?");
        assert_eq!(a.table.as_deref(), Some("users"));
        assert_eq!(a.referenced_columns, vec!["id", "name"]);
        assert_eq!(a.projection, vec!["id", "name"]);
    }

    #[test]
    fn select_star_is_tolerated() {
        let a = analyze_select("SELECT * FROM users");
        assert_eq!(a.referenced_columns, vec!["*"]);
    }

    #[test]
    fn select_tolerates_function_call_and_alias() {
        let a = analyze_select("SELECT last_insert_rowid() AS id FROM users");
        assert_eq!(a.projection, vec!["id"]);
        assert!(a.referenced_columns.is_empty());
    }

    #[test]
    fn insert_extracts_table_and_declared_columns() {
        let a = analyze_insert("INSERT INTO users (id, name) VALUES (?, ?)");
        assert_eq!(a.table.as_deref(), Some("users"));
        assert_eq!(a.referenced_columns, vec!["id", "name"]);
    }

    #[test]
    fn update_extracts_set_columns() {
        let a = analyze_update("UPDATE users SET name = ? WHERE id = ?");
        assert_eq!(a.table.as_deref(), Some("users"));
        assert_eq!(a.referenced_columns, vec!["name"]);
    }

    #[test]
    fn delete_extracts_table() {
        let a = analyze_delete("DELETE FROM users WHERE id = ?");
        assert_eq!(a.table.as_deref(), Some("users"));
    }

    #[test]
    fn select_without_from_is_a_pure_projection() {
        let a = analyze_select("SELECT 1 AS one");
        assert_eq!(a.table, None);
        assert_eq!(a.projection, vec!["one"]);
    }
}
