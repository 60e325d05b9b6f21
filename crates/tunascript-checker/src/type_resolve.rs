//! Resolves surface `TypeExpr` nodes into `tunascript_solver::Type` values,
//! including the generic named-type forms the parser folds into a single
//! synthesized string (`Array<T>`, `Map<K,V>`, user generic aliases).

use rustc_hash::FxHashMap;
use std::rc::Rc;
use tunascript_parser::ast::{LiteralTypeValue, TypeExpr};
use tunascript_solver::Type;

/// The right-hand side of a type alias: either the surface `TypeExpr` to
/// resolve lazily, or a type computed directly by the checker (e.g. a
/// table's auto-generated row type), which carries no type parameters.
#[derive(Debug, Clone)]
pub enum TypeAliasValue {
    Expr(TypeExpr),
    Resolved(Type),
}

/// A `type Name<T, U> = ...` declaration, keyed by `Name` in a
/// [`TypeEnv`]. Instantiating it substitutes `T`/`U` with the resolved type
/// arguments while resolving `value`.
#[derive(Debug, Clone)]
pub struct TypeAliasDef {
    pub type_params: Vec<String>,
    pub value: TypeAliasValue,
}

impl TypeAliasDef {
    #[must_use]
    pub fn from_expr(type_params: Vec<String>, value: TypeExpr) -> Self {
        Self {
            type_params,
            value: TypeAliasValue::Expr(value),
        }
    }

    #[must_use]
    pub fn resolved(ty: Type) -> Self {
        Self {
            type_params: Vec::new(),
            value: TypeAliasValue::Resolved(ty),
        }
    }
}

/// The set of type aliases visible while resolving a type expression:
/// prelude's built-ins merged with the current module's own imports and
/// declarations (spec §4.3 item 1).
#[derive(Debug, Default, Clone)]
pub struct TypeEnv {
    aliases: FxHashMap<String, TypeAliasDef>,
}

impl TypeEnv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, def: TypeAliasDef) {
        self.aliases.insert(name.into(), def);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeAliasDef> {
        self.aliases.get(name)
    }
}

type Bindings = FxHashMap<String, Type>;

/// Resolve a type expression to a `Type`, under the given alias
/// environment and active type-parameter bindings (populated when
/// instantiating a generic alias or entering a generic function type).
pub fn resolve_type_expr(ty: &TypeExpr, env: &TypeEnv, bindings: &Bindings) -> Result<Type, String> {
    match ty {
        TypeExpr::Named(name, _) => resolve_named(name, env, bindings),
        TypeExpr::Array(elem, _) => Ok(Type::array(resolve_type_expr(elem, env, bindings)?)),
        TypeExpr::Tuple(elems, _) => {
            let resolved: Result<Vec<_>, _> = elems.iter().map(|e| resolve_type_expr(e, env, bindings)).collect();
            Ok(Type::tuple(resolved?))
        }
        TypeExpr::Object(obj) => {
            let mut props = Vec::with_capacity(obj.props.len());
            for p in &obj.props {
                let mut resolved = resolve_type_expr(&p.type_annotation, env, bindings)?;
                if p.optional {
                    resolved = Type::union(vec![resolved, Type::Undefined]);
                }
                props.push((Rc::from(p.name.as_str()), resolved));
            }
            let index = obj
                .index_signature
                .as_ref()
                .map(|t| resolve_type_expr(t, env, bindings))
                .transpose()?;
            Ok(Type::object(props, index))
        }
        TypeExpr::Union(members, _) => {
            let resolved: Result<Vec<_>, _> = members.iter().map(|m| resolve_type_expr(m, env, bindings)).collect();
            Ok(Type::union(resolved?))
        }
        TypeExpr::Literal(value, _) => Ok(resolve_literal(value)),
        TypeExpr::Func(func) => {
            let mut inner_bindings = bindings.clone();
            for tp in &func.type_params {
                inner_bindings
                    .entry(tp.clone())
                    .or_insert_with(|| Type::TypeParam(Rc::from(tp.as_str())));
            }
            let params: Result<Vec<_>, _> = func
                .params
                .iter()
                .map(|p| resolve_type_expr(p, env, &inner_bindings))
                .collect();
            let ret = resolve_type_expr(&func.ret, env, &inner_bindings)?;
            Ok(Type::func(
                func.type_params.iter().map(|t| Rc::from(t.as_str())).collect(),
                params?,
                ret,
            ))
        }
    }
}

fn resolve_literal(value: &LiteralTypeValue) -> Type {
    match value {
        LiteralTypeValue::String(s) => Type::literal_string(s.as_str()),
        LiteralTypeValue::Integer(i) => Type::literal_int(*i),
        LiteralTypeValue::Float(f) => Type::literal_float(*f),
        LiteralTypeValue::Bool(b) => Type::literal_bool(*b),
        LiteralTypeValue::Null => Type::literal_null(),
    }
}

fn resolve_named(name: &str, env: &TypeEnv, bindings: &Bindings) -> Result<Type, String> {
    if let Some(bound) = bindings.get(name) {
        return Ok(bound.clone());
    }
    if let Some(primitive) = resolve_primitive_name(name) {
        return Ok(primitive);
    }
    if let Some((base, args)) = split_generic_name(name) {
        return resolve_generic(&base, &args, env, bindings);
    }
    if let Some(def) = env.get(name) {
        if !def.type_params.is_empty() {
            return Err(format!(
                "type `{name}` expects {} type argument(s)",
                def.type_params.len()
            ));
        }
        return resolve_alias_value(&def.value, env, bindings);
    }
    // An unbound bare identifier in type position is treated as a free type
    // parameter reference (e.g. inside a function whose own type parameter
    // list introduced it but whose body we resolve with an empty binding
    // map, such as when checking the function signature itself).
    Ok(Type::TypeParam(Rc::from(name)))
}

fn resolve_primitive_name(name: &str) -> Option<Type> {
    Some(match name {
        "integer" => Type::I64,
        "number" => Type::F64,
        "bool" => Type::Bool,
        "string" => Type::String,
        "json" => Type::Json,
        "null" => Type::Null,
        "undefined" => Type::Undefined,
        "void" => Type::Void,
        _ => return None,
    })
}

fn resolve_generic(base: &str, args: &[String], env: &TypeEnv, bindings: &Bindings) -> Result<Type, String> {
    let resolved_args: Result<Vec<_>, _> = args
        .iter()
        .map(|a| resolve_named_fragment(a, env, bindings))
        .collect();
    let resolved_args = resolved_args?;

    match base {
        "Array" if resolved_args.len() == 1 => Ok(Type::array(resolved_args[0].clone())),
        "Map" if resolved_args.len() == 1 => Ok(Type::object(vec![], Some(resolved_args[0].clone()))),
        _ => {
            let def = env
                .get(base)
                .ok_or_else(|| format!("unknown generic type `{base}`"))?
                .clone();
            if def.type_params.len() != resolved_args.len() {
                return Err(format!(
                    "type `{base}` expects {} type argument(s), found {}",
                    def.type_params.len(),
                    resolved_args.len()
                ));
            }
            let mut inner = bindings.clone();
            for (param, arg) in def.type_params.iter().zip(resolved_args.into_iter()) {
                inner.insert(param.clone(), arg);
            }
            resolve_alias_value(&def.value, env, &inner)
        }
    }
}

fn resolve_alias_value(value: &TypeAliasValue, env: &TypeEnv, bindings: &Bindings) -> Result<Type, String> {
    match value {
        TypeAliasValue::Expr(expr) => resolve_type_expr(expr, env, bindings),
        TypeAliasValue::Resolved(ty) => Ok(ty.clone()),
    }
}

/// Resolve a fragment of a synthesized generic name (a type-argument
/// string, possibly itself `T[]` or `Base<...>`, or `_` for an argument the
/// parser could not render precisely — see `synthesize_generic_name`).
fn resolve_named_fragment(fragment: &str, env: &TypeEnv, bindings: &Bindings) -> Result<Type, String> {
    if fragment == "_" {
        return Ok(Type::Json);
    }
    if let Some(stripped) = fragment.strip_suffix("[]") {
        return Ok(Type::array(resolve_named_fragment(stripped, env, bindings)?));
    }
    resolve_named(fragment, env, bindings)
}

/// Split `"Base<arg1,arg2>"` into `("Base", ["arg1", "arg2"])`, respecting
/// nested `<...>` when splitting arguments on commas. Returns `None` if
/// `name` has no top-level `<...>` suffix.
fn split_generic_name(name: &str) -> Option<(String, Vec<String>)> {
    let start = name.find('<')?;
    if !name.ends_with('>') {
        return None;
    }
    let base = name[..start].to_string();
    let inner = &name[start + 1..name.len() - 1];
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in inner.chars() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                args.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    Some((base, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunascript_common::Span;

    fn named(name: &str) -> TypeExpr {
        TypeExpr::Named(name.to_string(), Span::dummy())
    }

    #[test]
    fn resolves_primitives() {
        let env = TypeEnv::new();
        let bindings = Bindings::default();
        assert_eq!(resolve_type_expr(&named("integer"), &env, &bindings).unwrap(), Type::I64);
        assert_eq!(resolve_type_expr(&named("string"), &env, &bindings).unwrap(), Type::String);
    }

    #[test]
    fn resolves_array_generic_sugar() {
        let env = TypeEnv::new();
        let bindings = Bindings::default();
        let ty = resolve_type_expr(&named("Array<integer>"), &env, &bindings).unwrap();
        assert_eq!(ty, Type::array(Type::I64));
    }

    #[test]
    fn resolves_user_generic_alias() {
        let mut env = TypeEnv::new();
        env.insert(
            "Box",
            TypeAliasDef::from_expr(
                vec!["T".to_string()],
                TypeExpr::Object(tunascript_parser::ast::ObjectTypeExpr {
                    props: vec![tunascript_parser::ast::ObjectTypeProp {
                        name: "value".to_string(),
                        type_annotation: named("T"),
                        optional: false,
                        span: Span::dummy(),
                    }],
                    index_signature: None,
                    span: Span::dummy(),
                }),
            ),
        );
        let bindings = Bindings::default();
        let ty = resolve_type_expr(&named("Box<integer>"), &env, &bindings).unwrap();
        assert_eq!(ty, Type::object(vec![(Rc::from("value"), Type::I64)], None));
    }

    #[test]
    fn split_generic_name_handles_nested_brackets() {
        let (base, args) = split_generic_name("Box<Array<integer>,string>").unwrap();
        assert_eq!(base, "Box");
        assert_eq!(args, vec!["Array<integer>", "string"]);
    }
}
