//! The source file registry: every file (or synthetic text module) loaded
//! during a compile session is assigned a stable [`SourceId`] and its bytes
//! are kept for the lifetime of the session so diagnostics can be rendered
//! after the fact.

use std::path::{Path, PathBuf};

/// A stable handle to a loaded source file. Indices are assigned in load
/// order and never reused within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u32);

/// A single loaded module's path and text.
///
/// `path` is an absolute OS path for user files and a bare name (e.g.
/// `"prelude"`) for built-in modules, matching the module path convention in
/// the data model.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
}

/// Owns every [`SourceFile`] loaded during a single compile.
///
/// The registry only ever grows: each file is read once (scoped
/// open-read-close, per the resource model) and its text lives until the
/// whole session is dropped.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    files: Vec<SourceFile>,
}

impl SourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, text: impl Into<String>) -> SourceId {
        let id = SourceId(self.files.len() as u32);
        self.files.push(SourceFile {
            path: path.into(),
            text: text.into(),
        });
        id
    }

    #[must_use]
    pub fn get(&self, id: SourceId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    #[must_use]
    pub fn find_by_path(&self, path: &Path) -> Option<SourceId> {
        let path_str = path.to_string_lossy();
        self.files
            .iter()
            .position(|f| f.path == path_str)
            .map(|i| SourceId(i as u32))
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<SourceId> {
        self.files
            .iter()
            .position(|f| f.path == name)
            .map(|i| SourceId(i as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &SourceFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| (SourceId(i as u32), f))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Read a file's bytes as UTF-8, rejecting a leading BOM per the input
/// format rule ("UTF-8 without BOM; BOM is an error").
pub fn read_source_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{}: byte-order mark is not permitted", path.display()),
        ));
    }
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assigns_ids_in_load_order() {
        let mut reg = SourceRegistry::new();
        let a = reg.add("a.tuna", "const x = 1");
        let b = reg.add("b.tuna", "const y = 2");
        assert_eq!(reg.get(a).text, "const x = 1");
        assert_eq!(reg.get(b).text, "const y = 2");
    }

    #[test]
    fn find_by_name_locates_builtin_modules() {
        let mut reg = SourceRegistry::new();
        reg.add("prelude", "export const x = 1");
        assert!(reg.find_by_name("prelude").is_some());
        assert!(reg.find_by_name("missing").is_none());
    }

    #[test]
    fn read_source_file_rejects_byte_order_mark() {
        let dir = std::env::temp_dir().join("tunascript_bom_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bom.tuna");
        std::fs::write(&path, [0xEF, 0xBB, 0xBF, b'1']).unwrap();
        let result = read_source_file(&path);
        assert!(result.is_err());
        let _ = std::fs::remove_file(&path);
    }
}
