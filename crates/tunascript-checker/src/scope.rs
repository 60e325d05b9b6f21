//! Scoping: "a linked environment of frames. Top frame holds module-scope
//! bindings, function bodies push one frame, each `{ … }` pushes another,
//! `switch`-case pattern bindings push a frame limited to the case body."

use crate::symbol::SymbolId;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct Frame {
    bindings: FxHashMap<String, SymbolId>,
}

/// A stack of scope frames. Shadowing an outer-scope binding with a `const`
/// introduction is a compile error (§4.1 syntactic rule); `declare` reports
/// whether the name was already visible in an *enclosing* frame so the
/// caller can raise that error without the scope stack itself knowing about
/// diagnostics.
#[derive(Debug, Default)]
pub struct Scopes {
    frames: Vec<Frame>,
}

pub struct ShadowsOuter(pub bool);

impl Scopes {
    #[must_use]
    pub fn new() -> Self {
        let mut s = Self::default();
        s.push();
        s
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Bind `name` in the current (innermost) frame. Returns whether `name`
    /// was already visible from an enclosing frame (i.e. this binding
    /// shadows something) — the caller decides whether that's an error.
    /// Re-binding the same name within the *same* frame (e.g. re-declaring a
    /// parameter) is always reported as shadowing too.
    pub fn declare(&mut self, name: &str, id: SymbolId) -> ShadowsOuter {
        let shadows = self.lookup(name).is_some();
        self.frames
            .last_mut()
            .expect("scope stack is never empty")
            .bindings
            .insert(name.to_string(), id);
        ShadowsOuter(shadows)
    }

    /// Bind `name` in the current frame without reporting shadowing. Used
    /// for narrowing re-bindings (`case x as T`, `if (x as T)`) where the
    /// "shadow" is the checker's own doing, not a user redeclaration.
    pub fn rebind(&mut self, name: &str, id: SymbolId) {
        self.frames
            .last_mut()
            .expect("scope stack is never empty")
            .bindings
            .insert(name.to_string(), id);
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        for frame in self.frames.iter().rev() {
            if let Some(id) = frame.bindings.get(name) {
                return Some(*id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_bindings_in_enclosing_frames() {
        let mut scopes = Scopes::new();
        scopes.declare("x", SymbolId(0));
        scopes.push();
        assert_eq!(scopes.lookup("x"), Some(SymbolId(0)));
        scopes.pop();
        assert_eq!(scopes.lookup("x"), Some(SymbolId(0)));
    }

    #[test]
    fn popping_a_frame_removes_its_bindings() {
        let mut scopes = Scopes::new();
        scopes.push();
        scopes.declare("y", SymbolId(1));
        scopes.pop();
        assert_eq!(scopes.lookup("y"), None);
    }

    #[test]
    fn declaring_over_an_outer_binding_reports_shadowing() {
        let mut scopes = Scopes::new();
        scopes.declare("x", SymbolId(0));
        scopes.push();
        let ShadowsOuter(shadows) = scopes.declare("x", SymbolId(1));
        assert!(shadows);
    }

    #[test]
    fn declaring_a_fresh_name_does_not_report_shadowing() {
        let mut scopes = Scopes::new();
        let ShadowsOuter(shadows) = scopes.declare("z", SymbolId(0));
        assert!(!shadows);
    }
}
