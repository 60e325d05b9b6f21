//! Structural assignability: "is a value of type `from` usable where `to` is
//! expected". This is the relation the checker calls at every `const`
//! initializer, call argument, return statement, and union-branch join.

use crate::types::{LiteralValue, Type};

/// `true` if a value of type `from` may be used where `to` is expected.
#[must_use]
pub fn is_assignable(from: &Type, to: &Type) -> bool {
    if from == to {
        return true;
    }

    // void/undefined share "no success value" semantics in either direction.
    if from.is_void_like() && to.is_void_like() {
        return true;
    }

    match (from, to) {
        // A literal-refined primitive is assignable to its own base type.
        (Type::Literal(base, _), _) if is_assignable(base, to) => true,
        // Anything is assignable to `json`: it is an opaque carrier.
        (_, Type::Json) => true,

        // Source union: every member must be assignable to `to`.
        (Type::Union(members), _) => members.iter().all(|m| is_assignable(m, to)),

        // Target union: `from` must be assignable to at least one member.
        (_, Type::Union(members)) => members.iter().any(|m| is_assignable(from, m)),

        (Type::Array(a), Type::Array(b)) => is_assignable(a, b),

        (Type::Tuple(a), Type::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| is_assignable(x, y))
        }
        // A tuple is assignable to an array of its (unioned) element type.
        (Type::Tuple(a), Type::Array(elem)) => a.iter().all(|x| is_assignable(x, elem)),

        (Type::Object(a), Type::Object(b)) => {
            for target_prop in &b.props {
                let source = a
                    .props
                    .iter()
                    .find(|p| p.name == target_prop.name)
                    .map(|p| &p.ty)
                    .or_else(|| {
                        a.index_signature
                            .as_ref()
                            .filter(|_| a.index_signature.is_some())
                    });
                match source {
                    Some(source_ty) => {
                        if !is_assignable(source_ty, &target_prop.ty) {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
            if let Some(target_index) = &b.index_signature {
                for source_prop in &a.props {
                    if !is_assignable(&source_prop.ty, target_index) {
                        return false;
                    }
                }
            }
            true
        }

        (Type::Func(a), Type::Func(b)) => {
            a.params.len() == b.params.len()
                // Parameters are contravariant: the target's param must be
                // assignable to the source's param.
                && a.params
                    .iter()
                    .zip(b.params.iter())
                    .all(|(ap, bp)| is_assignable(bp, ap))
                && is_assignable(&a.ret, &b.ret)
        }

        (Type::TypeParam(a), Type::TypeParam(b)) => a == b,

        _ => false,
    }
}

/// `true` if `a` and `b` denote the exact same structural type. Because
/// every `Type` is built through the canonicalizing constructors in
/// `types.rs` (sorted object properties, flattened/deduped unions),
/// structural equality is simply `PartialEq` — no recursive comparison
/// function is needed beyond what `derive` already gives us.
#[must_use]
pub fn types_equal(a: &Type, b: &Type) -> bool {
    a == b
}

/// Structural value equality as used by the `==`/`!=` lowering for
/// reference-typed operands (objects, arrays, unions, json, strings):
/// compile-time check that the two *types* are comparable at all (the
/// checker's job), independent of the runtime structural-equality call the
/// generator emits.
#[must_use]
pub fn comparable(a: &Type, b: &Type) -> bool {
    if is_assignable(a, b) || is_assignable(b, a) {
        return true;
    }
    // Cross-type union/json equality is allowed: they compare by value at
    // runtime regardless of static type precision.
    matches!(a, Type::Json) || matches!(b, Type::Json) || matches!(a, Type::Union(_)) || matches!(b, Type::Union(_))
}

/// `true` if two literal values denote the same constant (used by `case pat
/// as T` narrowing over literal unions, and by switch exhaustiveness-free
/// matching — TunaScript's `switch` never requires exhaustiveness).
#[must_use]
pub fn literal_values_equal(a: &LiteralValue, b: &LiteralValue) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn identical_primitives_are_assignable() {
        assert!(is_assignable(&Type::I64, &Type::I64));
    }

    #[test]
    fn integer_and_float_do_not_mix() {
        assert!(!is_assignable(&Type::I64, &Type::F64));
        assert!(!is_assignable(&Type::F64, &Type::I64));
    }

    #[test]
    fn void_and_undefined_are_mutually_assignable() {
        assert!(is_assignable(&Type::Void, &Type::Undefined));
        assert!(is_assignable(&Type::Undefined, &Type::Void));
    }

    #[test]
    fn literal_is_assignable_to_its_base() {
        assert!(is_assignable(&Type::literal_string("error"), &Type::String));
        assert!(!is_assignable(&Type::String, &Type::literal_string("error")));
    }

    #[test]
    fn member_is_assignable_to_containing_union() {
        let union = Type::union(vec![Type::I64, Type::String]);
        assert!(is_assignable(&Type::I64, &union));
        assert!(!is_assignable(&Type::Bool, &union));
    }

    #[test]
    fn union_source_requires_every_member_assignable() {
        let union = Type::union(vec![Type::I64, Type::String]);
        assert!(is_assignable(&union, &Type::union(vec![Type::I64, Type::String, Type::Bool])));
        assert!(!is_assignable(&union, &Type::I64));
    }

    #[test]
    fn object_missing_required_property_is_not_assignable() {
        let source = Type::object(vec![(Rc::from("a"), Type::I64)], None);
        let target = Type::object(
            vec![(Rc::from("a"), Type::I64), (Rc::from("b"), Type::String)],
            None,
        );
        assert!(!is_assignable(&source, &target));
    }

    #[test]
    fn object_with_extra_properties_is_assignable_to_narrower_shape() {
        let source = Type::object(
            vec![(Rc::from("a"), Type::I64), (Rc::from("b"), Type::String)],
            None,
        );
        let target = Type::object(vec![(Rc::from("a"), Type::I64)], None);
        assert!(is_assignable(&source, &target));
    }

    #[test]
    fn index_signature_admits_extra_properties() {
        let target = Type::object(vec![], Some(Type::String));
        let source = Type::object(
            vec![(Rc::from("extra"), Type::String)],
            None,
        );
        assert!(is_assignable(&source, &target));
    }

    #[test]
    fn anything_is_assignable_to_json() {
        assert!(is_assignable(&Type::I64, &Type::Json));
        assert!(is_assignable(&Type::object(vec![], None), &Type::Json));
    }
}
