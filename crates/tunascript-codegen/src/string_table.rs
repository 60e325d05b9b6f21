//! String interning and linear-memory layout for the code generator (spec
//! §3 "Code generator state" / §4.4 "Global layout").
//!
//! Strings accumulate monotonically while the generator walks the checked
//! AST (every string literal, template static segment, JSX tag/attribute
//! text, and interned SQL query text goes through [`StringTable::intern`]).
//! Once the walk is complete, [`StringTable::finish`] freezes the table into
//! a [`MemoryLayout`]: byte offsets for the data section and a stable
//! boxed-reference global name per string, per "interning a string twice
//! yields the same stable global reference" (spec §8).

use rustc_hash::FxHashMap;
use tunascript_common::{Atom, Interner};

/// Wraps [`Interner`] with our own atom->index map, since `Atom`'s numeric
/// identity is intentionally private to `tunascript-common` (callers aren't
/// meant to depend on it) — the generator needs a stable index anyway to
/// name each string's boxed-reference global, so it tracks one itself as
/// each new atom is interned.
#[derive(Debug, Default)]
pub struct StringTable {
    interner: Interner,
    indices: FxHashMap<Atom, u32>,
    order: Vec<Atom>,
}

impl StringTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Atom {
        let atom = self.interner.intern(s);
        if let std::collections::hash_map::Entry::Vacant(e) = self.indices.entry(atom) {
            e.insert(self.order.len() as u32);
            self.order.push(atom);
        }
        atom
    }

    /// The stable global name for an interned string's boxed reference,
    /// e.g. `$str0`. Constructed from the atom's insertion index, so
    /// interning the same text twice always yields the same name (spec §8
    /// "interning a string twice yields the same stable global reference").
    #[must_use]
    pub fn global_name(&self, atom: Atom) -> String {
        format!("$str{}", self.indices[&atom])
    }

    #[must_use]
    pub fn finish(self) -> MemoryLayout {
        let mut offset = 0u32;
        let mut entries = Vec::with_capacity(self.order.len());
        for atom in &self.order {
            let text = self.interner.resolve(*atom);
            let bytes = text.as_bytes();
            entries.push(StringLayoutEntry {
                atom: *atom,
                global: format!("$str{}", self.indices[atom]),
                offset,
                len: bytes.len() as u32,
                bytes: bytes.to_vec(),
            });
            // Align each string's start to 4 bytes; harmless padding, keeps
            // every i32 load/store in the runtime helpers naturally aligned.
            offset += bytes.len() as u32;
            offset = offset.div_ceil(4) * 4;
        }
        let total_bytes = offset;
        // Wasm pages are 64 KiB; always reserve at least one page even for a
        // program with no interned strings.
        let pages = (total_bytes / (64 * 1024)) + 1;
        MemoryLayout { entries, pages }
    }
}

#[derive(Debug, Clone)]
pub struct StringLayoutEntry {
    pub atom: Atom,
    pub global: String,
    pub offset: u32,
    pub len: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct MemoryLayout {
    pub entries: Vec<StringLayoutEntry>,
    pub pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_twice_yields_the_same_global_name() {
        let mut table = StringTable::new();
        let a = table.intern("hello");
        let b = table.intern("hello");
        assert_eq!(table.global_name(a), table.global_name(b));
    }

    #[test]
    fn layout_assigns_four_byte_aligned_offsets() {
        let mut table = StringTable::new();
        table.intern("ab");
        table.intern("cdef");
        let layout = table.finish();
        assert_eq!(layout.entries[0].offset, 0);
        assert_eq!(layout.entries[1].offset, 4);
        assert!(layout.pages >= 1);
    }
}
