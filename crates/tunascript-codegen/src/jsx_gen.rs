//! JSX lowering (spec §4.4 "JSX lowering"). HTML-like elements and fragments
//! compile to runtime string concatenation over [`crate::runtime_helpers`]'
//! `$str_concat`/`$html_escape`; a custom component compiles to building a
//! props object literal (the same `$obj_new`/`$val_from_object` shape
//! [`crate::expr_gen`] already uses for an object literal) and calling the
//! function [`tunascript_checker::jsx_check`] resolved it against.

use tunascript_parser::ast::{JsxAttribute, JsxChild, JsxElement, JsxNode};
use tunascript_solver::Type;

use crate::context::Codegen;
use crate::error::CodegenError;

impl Codegen<'_> {
    pub fn lower_jsx(&mut self, module_path: &str, node: &JsxNode) -> Result<String, CodegenError> {
        let raw = self.lower_jsx_node_raw(module_path, node)?;
        Ok(format!("(call $val_from_string {raw})"))
    }

    /// Like [`Self::lower_jsx`] but returns the unboxed `(ref $str)`, for
    /// splicing into a concatenation chain without an extra box/unbox pair.
    fn lower_jsx_node_raw(&mut self, module_path: &str, node: &JsxNode) -> Result<String, CodegenError> {
        match node {
            JsxNode::Fragment(frag) => self.lower_jsx_children_raw(module_path, &frag.children),
            JsxNode::Element(el) => self.lower_jsx_element_raw(module_path, el),
        }
    }

    fn lower_jsx_element_raw(&mut self, module_path: &str, el: &JsxElement) -> Result<String, CodegenError> {
        if el.is_component {
            return self.lower_jsx_component_raw(module_path, el);
        }
        let mut pieces = vec![self.str_literal_raw(&format!("<{}", el.tag))];
        for attr in &el.attributes {
            pieces.push(self.lower_jsx_attr_raw(module_path, attr)?);
        }
        pieces.push(self.str_literal_raw(">"));
        pieces.push(self.lower_jsx_children_raw(module_path, &el.children)?);
        pieces.push(self.str_literal_raw(&format!("</{}>", el.tag)));
        Ok(concat_pieces(pieces))
    }

    fn lower_jsx_attr_raw(&mut self, module_path: &str, attr: &JsxAttribute) -> Result<String, CodegenError> {
        match &attr.value {
            // A bare attribute name is shorthand for `true`, and always renders.
            None => Ok(self.str_literal_raw(&format!(" {}", attr.name))),
            Some(expr) => {
                let ty = self.expr_ty(module_path, expr);
                let value = self.lower_expr(module_path, expr)?;
                if ty.widen() == Type::Bool {
                    let cond = if ty.is_reference_typed() { format!("(call $unbox_bool {value})") } else { value };
                    let name_lit = self.str_literal_raw(&format!(" {}", attr.name));
                    Ok(format!(
                        "(if (result (ref $str)) {cond} (then {name_lit}) (else (call $str_new (i32.const 0))))"
                    ))
                } else {
                    let stringified = self.stringify_value(&value, &ty);
                    let escaped = format!("(call $html_escape (call $unbox_string {stringified}))");
                    let prefix = self.str_literal_raw(&format!(" {}=\"", attr.name));
                    let suffix = self.str_literal_raw("\"");
                    Ok(concat_pieces(vec![prefix, escaped, suffix]))
                }
            }
        }
    }

    fn lower_jsx_children_raw(&mut self, module_path: &str, children: &[JsxChild]) -> Result<String, CodegenError> {
        let mut pieces = Vec::with_capacity(children.len());
        for child in children {
            pieces.push(self.lower_jsx_child_raw(module_path, child)?);
        }
        Ok(concat_pieces(pieces))
    }

    fn lower_jsx_child_raw(&mut self, module_path: &str, child: &JsxChild) -> Result<String, CodegenError> {
        match child {
            JsxChild::Text(s) => Ok(self.str_literal_raw(s)),
            JsxChild::Node(n) => self.lower_jsx_node_raw(module_path, n),
            JsxChild::Expr(e) => {
                let ty = self.expr_ty(module_path, e);
                let value = self.lower_expr(module_path, e)?;
                match ty.widen() {
                    Type::Array(elem) => Ok(self.join_array_children_raw(&value, &elem)),
                    _ => {
                        let stringified = self.stringify_value(&value, &ty);
                        Ok(format!("(call $html_escape (call $unbox_string {stringified}))"))
                    }
                }
            }
        }
    }

    /// Join an array-typed child (e.g. `{items.map(render)}`) by stringifying
    /// and concatenating each element in order; each element is assumed
    /// already rendered (a string produced by a nested JSX expression, the
    /// common case), so unlike a scalar child this does not re-escape.
    fn join_array_children_raw(&mut self, boxed_array_value: &str, elem_ty: &Type) -> String {
        let arr_local = self.next_temp("jsx_arr");
        self.pending_locals.push((arr_local.clone(), "(ref $valarr)"));
        let idx_local = self.next_temp("jsx_idx");
        self.pending_locals.push((idx_local.clone(), "i32"));
        let len_local = self.next_temp("jsx_len");
        self.pending_locals.push((len_local.clone(), "i32"));
        let acc_local = self.next_temp("jsx_acc");
        self.pending_locals.push((acc_local.clone(), "(ref $str)"));
        let elem_local = self.next_temp("jsx_elem");
        self.pending_locals.push((elem_local.clone(), "(ref $boxed)"));
        let loop_label = self.next_temp("jsx_loop");

        let piece = self.stringify_value(&format!("(local.get {elem_local})"), elem_ty);
        let piece_raw = format!("(call $unbox_string {piece})");

        format!(
            "(block (result (ref $str))\n\
             (local.set {arr_local} (call $unbox_array {boxed_array_value}))\n\
             (local.set {len_local} (call $arr_len (local.get {arr_local})))\n\
             (local.set {acc_local} (call $str_new (i32.const 0)))\n\
             (local.set {idx_local} (i32.const 0))\n\
             (block {loop_label}_done\n\
             (loop {loop_label}\n\
             (br_if {loop_label}_done (i32.ge_u (local.get {idx_local}) (local.get {len_local})))\n\
             (local.set {elem_local} (call $arr_get (local.get {arr_local}) (local.get {idx_local})))\n\
             (local.set {acc_local} (call $str_concat (local.get {acc_local}) {piece_raw}))\n\
             (local.set {idx_local} (i32.add (local.get {idx_local}) (i32.const 1)))\n\
             (br {loop_label})\n\
             )\n)\n\
             (local.get {acc_local})\n)"
        )
    }

    fn lower_jsx_component_raw(&mut self, module_path: &str, el: &JsxElement) -> Result<String, CodegenError> {
        let Some(use_) = self.program.jsx_components.get(&(module_path.to_string(), el.span)).cloned() else {
            return Err(CodegenError::new(
                module_path,
                el.span,
                format!("JSX component `{}` has no resolved checker binding", el.tag),
            ));
        };

        let mut keys = Vec::with_capacity(el.attributes.len() + 1);
        let mut vals = Vec::with_capacity(el.attributes.len() + 1);
        for attr in &el.attributes {
            let boxed = match &attr.value {
                Some(expr) => {
                    let ty = self.expr_ty(module_path, expr);
                    let raw = self.lower_expr(module_path, expr)?;
                    if ty.is_reference_typed() { raw } else { self.box_raw(&raw, &ty.widen()) }
                }
                None => "(call $val_from_bool (i32.const 1))".to_string(),
            };
            keys.push(attr.name.clone());
            vals.push(boxed);
        }
        if !el.children.is_empty() {
            let children_raw = self.lower_jsx_children_raw(module_path, &el.children)?;
            keys.push("children".to_string());
            vals.push(format!("(call $val_from_string {children_raw})"));
        }

        let keys_arr = self.emit_string_array(&keys);
        let vals_arr = format!("(array.new_fixed $valarr {} {})", vals.len(), vals.join(" "));
        let props_obj = format!("(call $val_from_object (call $obj_new {keys_arr} {vals_arr}))");

        let wat_fn = self.symbol_wat_name(use_.component);
        Ok(format!("(call $unbox_string (call {wat_fn} {props_obj}))"))
    }

    fn str_literal_raw(&mut self, s: &str) -> String {
        let atom = self.intern(s);
        let global = self.string_global(atom);
        format!("(global.get {global})")
    }
}

fn concat_pieces(pieces: Vec<String>) -> String {
    let mut acc: Option<String> = None;
    for piece in pieces {
        acc = Some(match acc {
            None => piece,
            Some(prev) => format!("(call $str_concat {prev} {piece})"),
        });
    }
    acc.unwrap_or_else(|| "(call $str_new (i32.const 0))".to_string())
}
