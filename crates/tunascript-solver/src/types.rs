//! The `Type` representation (data model §3): a tagged sum over primitives,
//! literal-refined primitives, arrays, tuples, objects, function types,
//! unions, and type-parameter references.
//!
//! Construction goes through the free functions below rather than the enum
//! variants directly so the invariants in the spec hold by construction:
//! object properties are sorted by name, unions are flattened and
//! deduplicated (with a single-member union collapsing to its member), and
//! arrays/tuples/objects are immutable once built (`Rc`-shared, never
//! mutated in place).

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::rc::Rc;

/// A literal value carried by a literal-refined primitive type, e.g. the
/// `"error"` in `{ type: "error" }`.
#[derive(Debug, Clone)]
pub enum LiteralValue {
    String(Rc<str>),
    Integer(i64),
    /// Compared and hashed by bit pattern; TunaScript literal float types
    /// only ever come from literal source text, never from computation, so
    /// NaN/-0.0 subtleties don't arise in practice.
    Float(u64),
    Bool(bool),
    Null,
}

impl PartialEq for LiteralValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}
impl Eq for LiteralValue {}

impl std::hash::Hash for LiteralValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            LiteralValue::String(s) => s.hash(state),
            LiteralValue::Integer(i) => i.hash(state),
            LiteralValue::Float(bits) => bits.hash(state),
            LiteralValue::Bool(b) => b.hash(state),
            LiteralValue::Null => {}
        }
    }
}

impl LiteralValue {
    #[must_use]
    pub fn float(v: f64) -> Self {
        LiteralValue::Float(v.to_bits())
    }
}

/// An object type's property, always stored name-sorted (invariant: "object
/// properties are sorted by name for structural equality").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectProp {
    pub name: Rc<str>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectType {
    pub props: Vec<ObjectProp>,
    pub index_signature: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncType {
    pub type_params: Vec<Rc<str>>,
    pub params: SmallVec<[Type; 4]>,
    pub ret: Type,
}

/// The TunaScript type sum (data model §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    I64,
    F64,
    /// Internal ABI-only 32-bit integer; never produced by the surface
    /// type-checker, only used internally by the code generator for things
    /// like the `__inited` flag and loop counters.
    I32,
    Bool,
    String,
    Json,
    Null,
    Undefined,
    Void,
    /// A literal-refined primitive, e.g. the string literal type `"error"`.
    /// The inner `Type` is always one of the primitive variants above.
    Literal(Rc<Type>, LiteralValue),
    Array(Rc<Type>),
    Tuple(Rc<[Type]>),
    Object(Rc<ObjectType>),
    Func(Rc<FuncType>),
    /// Flattened, deduplicated, insertion-ordered. Never contains a nested
    /// `Union` and never has fewer than two members (a single member
    /// collapses at construction).
    Union(Rc<[Type]>),
    TypeParam(Rc<str>),
}

impl Type {
    #[must_use]
    pub fn array(elem: Type) -> Type {
        Type::Array(Rc::new(elem))
    }

    #[must_use]
    pub fn tuple(elems: Vec<Type>) -> Type {
        Type::Tuple(Rc::from(elems))
    }

    #[must_use]
    pub fn literal_string(s: impl Into<Rc<str>>) -> Type {
        Type::Literal(Rc::new(Type::String), LiteralValue::String(s.into()))
    }

    #[must_use]
    pub fn literal_int(v: i64) -> Type {
        Type::Literal(Rc::new(Type::I64), LiteralValue::Integer(v))
    }

    #[must_use]
    pub fn literal_float(v: f64) -> Type {
        Type::Literal(Rc::new(Type::F64), LiteralValue::float(v))
    }

    #[must_use]
    pub fn literal_bool(v: bool) -> Type {
        Type::Literal(Rc::new(Type::Bool), LiteralValue::Bool(v))
    }

    #[must_use]
    pub fn literal_null() -> Type {
        Type::Literal(Rc::new(Type::Null), LiteralValue::Null)
    }

    /// Build an object type, sorting properties by name per the structural
    /// equality invariant.
    #[must_use]
    pub fn object(mut props: Vec<(Rc<str>, Type)>, index_signature: Option<Type>) -> Type {
        props.sort_by(|a, b| a.0.cmp(&b.0));
        let props = props
            .into_iter()
            .map(|(name, ty)| ObjectProp { name, ty })
            .collect();
        Type::Object(Rc::new(ObjectType {
            props,
            index_signature,
        }))
    }

    #[must_use]
    pub fn func(type_params: Vec<Rc<str>>, params: Vec<Type>, ret: Type) -> Type {
        Type::Func(Rc::new(FuncType {
            type_params,
            params: SmallVec::from_vec(params),
            ret,
        }))
    }

    /// Flatten nested unions, dedupe, and collapse a single-member result to
    /// that member. Order is first-occurrence (stable, deterministic —
    /// never depends on hash-container iteration order, per the stable-name
    /// design note).
    #[must_use]
    pub fn union(members: Vec<Type>) -> Type {
        let mut flat = Vec::with_capacity(members.len());
        flatten_union_members(members, &mut flat);
        let mut seen = FxHashSet::default();
        let mut deduped = Vec::with_capacity(flat.len());
        for ty in flat {
            if seen.insert(ty.clone()) {
                deduped.push(ty);
            }
        }
        match deduped.len() {
            0 => Type::Undefined,
            1 => deduped.into_iter().next().unwrap(),
            _ => Type::Union(Rc::from(deduped)),
        }
    }

    #[must_use]
    pub fn is_void_like(&self) -> bool {
        matches!(self, Type::Void | Type::Undefined)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::I64 | Type::F64)
            || matches!(self, Type::Literal(base, _) if matches!(**base, Type::I64 | Type::F64))
    }

    /// The unrefined base primitive of a literal type; identity for
    /// everything else.
    #[must_use]
    pub fn widen(&self) -> Type {
        match self {
            Type::Literal(base, _) => (**base).clone(),
            other => other.clone(),
        }
    }

    /// `true` for any type whose runtime representation is a boxed
    /// reference rather than a raw Wasm value on the operand stack (the
    /// reference-discipline boundary of spec.md §4.4).
    #[must_use]
    pub fn is_reference_typed(&self) -> bool {
        !matches!(self, Type::I64 | Type::F64 | Type::I32 | Type::Bool)
    }

    /// Members of this type if it is a union, or a single-element slice
    /// view otherwise. Used by code that must treat `T` and `T | U`
    /// uniformly (e.g. narrowing, assignability).
    #[must_use]
    pub fn union_members(&self) -> Vec<&Type> {
        match self {
            Type::Union(members) => members.iter().collect(),
            other => vec![other],
        }
    }

    /// The object type's "Error" shape test: `{ type: "error", message:
    /// string, ... }`. Used by `?`-propagation and SQL result typing.
    #[must_use]
    pub fn is_error_shape(&self) -> bool {
        match self {
            Type::Object(obj) => {
                let has_tag = obj.props.iter().any(|p| {
                    &*p.name == "type"
                        && matches!(&p.ty, Type::Literal(_, LiteralValue::String(s)) if &**s == "error")
                });
                let has_message = obj
                    .props
                    .iter()
                    .any(|p| &*p.name == "message" && matches!(p.ty, Type::String));
                has_tag && has_message
            }
            _ => false,
        }
    }

    /// Split `T | Error` into `(non_error_members, has_error)`, per the
    /// postfix `?` operator's success/error split.
    #[must_use]
    pub fn split_error(&self) -> (Type, bool) {
        let members = self.union_members();
        let mut success = Vec::new();
        let mut has_error = false;
        for m in members {
            if m.is_error_shape() {
                has_error = true;
            } else {
                success.push((*m).clone());
            }
        }
        (Type::union(success), has_error)
    }

    #[must_use]
    pub fn error_shape() -> Type {
        Type::object(
            vec![
                (Rc::from("type"), Type::literal_string("error")),
                (Rc::from("message"), Type::String),
            ],
            None,
        )
    }
}

fn flatten_union_members(members: Vec<Type>, out: &mut Vec<Type>) {
    for m in members {
        match m {
            Type::Union(inner) => flatten_union_members(inner.to_vec(), out),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_flattens_nested_unions() {
        let inner = Type::union(vec![Type::I64, Type::String]);
        let outer = Type::union(vec![inner, Type::Bool]);
        match outer {
            Type::Union(members) => assert_eq!(members.len(), 3),
            other => panic!("expected a union, got {other:?}"),
        }
    }

    #[test]
    fn union_dedupes_members() {
        let ty = Type::union(vec![Type::I64, Type::I64, Type::String]);
        match ty {
            Type::Union(members) => assert_eq!(members.len(), 2),
            other => panic!("expected a union, got {other:?}"),
        }
    }

    #[test]
    fn single_member_union_collapses() {
        let ty = Type::union(vec![Type::I64, Type::I64]);
        assert_eq!(ty, Type::I64);
    }

    #[test]
    fn object_properties_are_sorted_by_name() {
        let ty = Type::object(
            vec![(Rc::from("b"), Type::I64), (Rc::from("a"), Type::String)],
            None,
        );
        match ty {
            Type::Object(obj) => {
                assert_eq!(&*obj.props[0].name, "a");
                assert_eq!(&*obj.props[1].name, "b");
            }
            _ => panic!("expected an object type"),
        }
    }

    #[test]
    fn structurally_equal_objects_with_different_insertion_order_are_equal() {
        let a = Type::object(
            vec![(Rc::from("x"), Type::I64), (Rc::from("y"), Type::String)],
            None,
        );
        let b = Type::object(
            vec![(Rc::from("y"), Type::String), (Rc::from("x"), Type::I64)],
            None,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn error_shape_detection() {
        assert!(Type::error_shape().is_error_shape());
        assert!(!Type::object(vec![(Rc::from("x"), Type::I64)], None).is_error_shape());
    }

    #[test]
    fn split_error_separates_error_member() {
        let ty = Type::union(vec![Type::I64, Type::error_shape()]);
        let (success, has_error) = ty.split_error();
        assert_eq!(success, Type::I64);
        assert!(has_error);
    }
}
