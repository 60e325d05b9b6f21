//! String interning used for identifiers and, later, for the code generator's
//! string-literal table.
//!
//! An [`Atom`] is a small `Copy` handle into an [`Interner`]; comparing two
//! atoms for equality is a single integer comparison rather than a string
//! compare. The compiler is single-threaded (see the system overview), so the
//! interner owns its table outright rather than sharing it behind a lock.

use rustc_hash::FxHashMap;
use std::fmt;

/// A handle to an interned string. Cheap to copy and compare.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(u32);

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({})", self.0)
    }
}

/// Interns strings into [`Atom`] handles, de-duplicating on insert.
///
/// Insertion order is preserved: the `n`th unique string interned gets atom
/// index `n`. Several compiler invariants (e.g. stable module ids, the code
/// generator's string table) rely on interning being order-preserving.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: FxHashMap<Box<str>, Atom>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning its atom. Interning the same text twice always
    /// yields the same atom.
    pub fn intern(&mut self, s: &str) -> Atom {
        if let Some(atom) = self.lookup.get(s) {
            return *atom;
        }
        let atom = Atom(self.strings.len() as u32);
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, atom);
        atom
    }

    /// Resolve an atom back to its string.
    ///
    /// Panics if `atom` was not produced by this interner; that would be a
    /// compiler bug (atoms never cross interner instances in this codebase).
    #[must_use]
    pub fn resolve(&self, atom: Atom) -> &str {
        &self.strings[atom.0 as usize]
    }

    /// Look up an atom for `s` without interning it.
    #[must_use]
    pub fn get(&self, s: &str) -> Option<Atom> {
        self.lookup.get(s).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate interned strings in insertion (= atom) order.
    pub fn iter(&self) -> impl Iterator<Item = (Atom, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (Atom(i as u32), s.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_string_twice_yields_the_same_atom() {
        let mut interner = Interner::new();
        let a = interner.intern("hello");
        let b = interner.intern("hello");
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn atoms_are_assigned_in_insertion_order() {
        let mut interner = Interner::new();
        let a = interner.intern("first");
        let b = interner.intern("second");
        assert_eq!(interner.resolve(a), "first");
        assert_eq!(interner.resolve(b), "second");
    }

    #[test]
    fn get_does_not_insert() {
        let mut interner = Interner::new();
        assert_eq!(interner.get("missing"), None);
        assert_eq!(interner.len(), 0);
        interner.intern("missing");
        assert!(interner.get("missing").is_some());
    }
}
