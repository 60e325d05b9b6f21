//! The TunaScript type representation and structural assignability rules.
//!
//! This crate has no knowledge of the AST, symbol tables, or scoping — it is
//! the pure algebra of `Type` values that `tunascript-checker` builds on.

mod assignability;
mod display;
mod types;

pub use assignability::{comparable, is_assignable, literal_values_equal, types_equal};
pub use types::{FuncType, LiteralValue, ObjectProp, ObjectType, Type};
