//! Renders a `Type` back to TunaScript surface syntax for diagnostic
//! messages (e.g. "expected `integer`, found `string`").

use crate::types::{LiteralValue, Type};
use std::fmt;

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I64 => write!(f, "integer"),
            Type::F64 => write!(f, "number"),
            Type::I32 => write!(f, "i32"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Json => write!(f, "json"),
            Type::Null => write!(f, "null"),
            Type::Undefined => write!(f, "undefined"),
            Type::Void => write!(f, "void"),
            Type::Literal(_, value) => write!(f, "{value}"),
            Type::Array(elem) => write!(f, "{elem}[]"),
            Type::Tuple(elems) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            Type::Object(obj) => {
                write!(f, "{{ ")?;
                for (i, p) in obj.props.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", p.name, p.ty)?;
                }
                if let Some(index) = &obj.index_signature {
                    if !obj.props.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "[key: string]: {index}")?;
                }
                write!(f, " }}")
            }
            Type::Func(func) => {
                if !func.type_params.is_empty() {
                    write!(f, "<{}>", func.type_params.join(", "))?;
                }
                write!(f, "(")?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") => {}", func.ret)
            }
            Type::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
            Type::TypeParam(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => write!(f, "\"{s}\""),
            LiteralValue::Integer(i) => write!(f, "{i}"),
            LiteralValue::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            LiteralValue::Bool(b) => write!(f, "{b}"),
            LiteralValue::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn renders_union_with_pipes() {
        let ty = Type::union(vec![Type::I64, Type::String]);
        assert_eq!(ty.to_string(), "integer | string");
    }

    #[test]
    fn renders_array_suffix() {
        assert_eq!(Type::array(Type::I64).to_string(), "integer[]");
    }

    #[test]
    fn renders_object_with_sorted_props() {
        let ty = Type::object(
            vec![(Rc::from("b"), Type::I64), (Rc::from("a"), Type::String)],
            None,
        );
        assert_eq!(ty.to_string(), "{ a: string, b: integer }");
    }
}
