//! JSX checking (spec §4.3 "JSX checking"). Lowercase tags and fragments are
//! HTML-like and produce the `JSX` alias (`string`); uppercase tags resolve
//! against a same-named top-level function whose single parameter is the
//! props object type, the same way [`crate::sql_check`] resolves a SQL
//! block's shape against a registered table schema.

use rustc_hash::FxHashSet;
use tunascript_parser::ast::{JsxChild, JsxElement, JsxNode};
use tunascript_solver::{is_assignable, Type};

use crate::checker::{Checker, ModuleCtx};
use crate::expr_check::func_info;

impl Checker {
    pub(crate) fn check_jsx(&mut self, ctx: &mut ModuleCtx, node: &JsxNode) -> Type {
        match node {
            JsxNode::Fragment(frag) => {
                for child in &frag.children {
                    self.check_jsx_child(ctx, child);
                }
                Type::String
            }
            JsxNode::Element(el) => self.check_jsx_element(ctx, el),
        }
    }

    fn check_jsx_child(&mut self, ctx: &mut ModuleCtx, child: &JsxChild) {
        match child {
            JsxChild::Text(_) => {}
            JsxChild::Expr(e) => {
                self.check_expr(ctx, e);
            }
            JsxChild::Node(n) => {
                self.check_jsx(ctx, n);
            }
        }
    }

    fn check_jsx_element(&mut self, ctx: &mut ModuleCtx, el: &JsxElement) -> Type {
        if !el.is_component {
            for attr in &el.attributes {
                if let Some(value) = &attr.value {
                    self.check_expr(ctx, value);
                }
            }
            for spread in &el.spread_attributes {
                self.check_expr(ctx, spread);
            }
            for child in &el.children {
                self.check_jsx_child(ctx, child);
            }
            return Type::String;
        }

        let Some(sym) = ctx.scopes.lookup(&el.tag) else {
            self.error(&ctx.path.clone(), el.span, format!("unknown component `{}`", el.tag));
            self.check_jsx_element_body_only(ctx, el);
            return Type::String;
        };
        let component_ty = self.symbols.resolved_type(sym);
        let Some((params, _ret)) = func_info(&component_ty) else {
            self.error(&ctx.path.clone(), el.span, format!("`{}` is not a component function", el.tag));
            self.check_jsx_element_body_only(ctx, el);
            return Type::String;
        };
        let Some(props_ty @ Type::Object(props)) = params.first().cloned() else {
            self.error(
                &ctx.path.clone(),
                el.span,
                format!("component `{}` must take a single object-typed props parameter", el.tag),
            );
            self.check_jsx_element_body_only(ctx, el);
            return Type::String;
        };

        let mut seen: FxHashSet<String> = FxHashSet::default();
        for attr in &el.attributes {
            let attr_ty = match &attr.value {
                Some(value) => self.check_expr(ctx, value),
                // A bare attribute name (`<Widget disabled />`) is shorthand
                // for passing `true`.
                None => Type::literal_bool(true),
            };
            match props.props.iter().find(|p| &*p.name == attr.name) {
                Some(prop) => {
                    if !is_assignable(&attr_ty, &prop.ty) {
                        self.error(
                            &ctx.path.clone(),
                            attr.span,
                            format!("prop `{}` expects `{}`, found `{attr_ty}`", attr.name, prop.ty),
                        );
                    }
                }
                None => match &props.index_signature {
                    Some(index_ty) if is_assignable(&attr_ty, index_ty) => {}
                    Some(index_ty) => {
                        self.error(
                            &ctx.path.clone(),
                            attr.span,
                            format!("prop `{}` of type `{attr_ty}` is not assignable to the index signature `{index_ty}`", attr.name),
                        );
                    }
                    None => {
                        self.error(
                            &ctx.path.clone(),
                            attr.span,
                            format!("`{}` has no prop `{}`", el.tag, attr.name),
                        );
                    }
                },
            }
            seen.insert(attr.name.clone());
        }
        for spread in &el.spread_attributes {
            self.check_expr(ctx, spread);
        }

        let has_children = !el.children.is_empty();
        for child in &el.children {
            self.check_jsx_child(ctx, child);
        }

        let children_prop = props.props.iter().find(|p| &*p.name == "children");
        if has_children {
            match children_prop {
                Some(prop) => {
                    if !is_assignable(&Type::String, &prop.ty) {
                        self.error(
                            &ctx.path.clone(),
                            el.span,
                            format!("`{}`'s `children` prop is `{}`, not assignable from `string`", el.tag, prop.ty),
                        );
                    }
                    seen.insert("children".to_string());
                }
                None if props.index_signature.is_none() => {
                    self.error(
                        &ctx.path.clone(),
                        el.span,
                        format!("`{}` was given children but declares no `children` prop", el.tag),
                    );
                }
                None => {}
            }
        }

        for prop in &props.props {
            if &*prop.name == "children" || seen.contains(prop.name.as_ref()) {
                continue;
            }
            if !allows_omission(&prop.ty) {
                self.error(
                    &ctx.path.clone(),
                    el.span,
                    format!("missing prop `{}` for `{}`", prop.name, el.tag),
                );
            }
        }

        self.jsx_components.insert((ctx.path.clone(), el.span), crate::checked_program::JsxComponentUse { component: sym, props_ty });
        Type::String
    }

    /// Shared fallback for an unresolvable component: still check every
    /// nested expression so errors elsewhere in the tree are reported too,
    /// without attempting props validation against an unknown signature.
    fn check_jsx_element_body_only(&mut self, ctx: &mut ModuleCtx, el: &JsxElement) {
        for attr in &el.attributes {
            if let Some(value) = &attr.value {
                self.check_expr(ctx, value);
            }
        }
        for spread in &el.spread_attributes {
            self.check_expr(ctx, spread);
        }
        for child in &el.children {
            self.check_jsx_child(ctx, child);
        }
    }
}

/// A prop may be omitted from a JSX call site when its declared type already
/// accepts `undefined` (a `T | undefined` prop behaves like an optional
/// field, the same convention `object` types use elsewhere in this checker).
fn allows_omission(ty: &Type) -> bool {
    ty.union_members().iter().any(|m| matches!(m, Type::Undefined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::check_program;
    use tunascript_loader::{LibraryIndex, LoaderConfig, ModuleLoader};
    use std::fs;

    fn check_source(src: &str) -> Result<crate::CheckedProgram, tunascript_common::CompileError> {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("main.tuna");
        fs::write(&entry, src).unwrap();
        let lib = LibraryIndex::discover(&LoaderConfig::default()).unwrap();
        let loaded = ModuleLoader::new(&lib).load_program(&entry).unwrap();
        check_program(&loaded)
    }

    #[test]
    fn lowercase_tag_produces_string() {
        let program = check_source(
            "export function main(): void { const x: string = <div class=\"a\">hi</div> }",
        )
        .unwrap();
        assert!(program.errors.is_empty());
    }

    #[test]
    fn uppercase_tag_resolves_against_same_named_function() {
        let program = check_source(
            "function Widget(props: { label: string }): string { return props.label }\n\
             export function main(): void { const x: string = <Widget label=\"hi\" /> }",
        )
        .unwrap();
        assert!(program.errors.is_empty());
        assert_eq!(program.jsx_components.len(), 1);
    }

    #[test]
    fn missing_required_prop_is_an_error() {
        let err = check_source(
            "function Widget(props: { label: string }): string { return props.label }\n\
             export function main(): void { const x: string = <Widget /> }",
        )
        .unwrap_err();
        assert!(matches!(err, tunascript_common::CompileError::Many(_)));
    }

    #[test]
    fn children_without_a_children_prop_is_an_error() {
        let err = check_source(
            "function Widget(props: { label: string }): string { return props.label }\n\
             export function main(): void { const x: string = <Widget label=\"hi\">child</Widget> }",
        )
        .unwrap_err();
        assert!(matches!(err, tunascript_common::CompileError::Many(_)));
    }
}
