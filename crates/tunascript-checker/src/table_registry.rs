//! Table schemas: `{name, ordered columns (name, SQL type, textual
//! constraints)}` (data model §3). Registered into the type environment
//! (auto-generated row-object type alias) and later serialized to JSON for
//! the runtime's `register_tables` import (spec §6 "Table-registration
//! ABI").

use std::rc::Rc;
use tunascript_parser::ast::TableDecl;
use tunascript_solver::Type;

#[derive(Debug, Clone)]
pub struct TableColumnSchema {
    pub name: String,
    pub sql_type: String,
    pub constraints: String,
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<TableColumnSchema>,
}

impl TableSchema {
    #[must_use]
    pub fn from_decl(decl: &TableDecl) -> Self {
        Self {
            name: decl.name.clone(),
            columns: decl
                .columns
                .iter()
                .map(|c| TableColumnSchema {
                    name: c.name.clone(),
                    sql_type: c.sql_type.clone(),
                    constraints: c.constraints.clone(),
                })
                .collect(),
        }
    }

    /// One `string` property per column, per the row-type generation rule.
    #[must_use]
    pub fn row_type(&self) -> Type {
        Type::object(
            self.columns
                .iter()
                .map(|c| (Rc::from(c.name.as_str()), Type::String))
                .collect(),
            None,
        )
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// The JSON blob shape the runtime's `register_tables` import expects:
    /// `[{name, columns:[{name,type,constraints?}]}]`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "columns": self.columns.iter().map(|c| {
                let mut obj = serde_json::json!({
                    "name": c.name,
                    "type": c.sql_type,
                });
                if !c.constraints.is_empty() {
                    obj["constraints"] = serde_json::Value::String(c.constraints.clone());
                }
                obj
            }).collect::<Vec<_>>(),
        })
    }
}

/// Registry of every `create_table` declaration seen across the program.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: Vec<TableSchema>,
}

impl TableRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: TableSchema) {
        self.tables.push(schema);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[must_use]
    pub fn all(&self) -> &[TableSchema] {
        &self.tables
    }

    /// The JSON blob for `register_tables`: `[{name, columns:[...]}]`.
    #[must_use]
    pub fn to_json(&self) -> String {
        let array: Vec<_> = self.tables.iter().map(TableSchema::to_json).collect();
        serde_json::Value::Array(array).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_type_has_one_string_property_per_column() {
        let schema = TableSchema {
            name: "users".into(),
            columns: vec![
                TableColumnSchema {
                    name: "id".into(),
                    sql_type: "INTEGER".into(),
                    constraints: "PRIMARY KEY".into(),
                },
                TableColumnSchema {
                    name: "name".into(),
                    sql_type: "TEXT".into(),
                    constraints: String::new(),
                },
            ],
        };
        let row = schema.row_type();
        assert_eq!(row, Type::object(
            vec![
                (Rc::from("id"), Type::String),
                (Rc::from("name"), Type::String),
            ],
            None,
        ));
    }

    #[test]
    fn to_json_encodes_table_registration_shape() {
        let mut registry = TableRegistry::new();
        registry.register(TableSchema {
            name: "t".into(),
            columns: vec![TableColumnSchema {
                name: "id".into(),
                sql_type: "INTEGER".into(),
                constraints: String::new(),
            }],
        });
        let json: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(json[0]["name"], "t");
        assert_eq!(json[0]["columns"][0]["name"], "id");
    }
}
