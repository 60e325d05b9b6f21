//! Library directory discovery and built-in module indexing (spec §4.2,
//! §6 "Library directory").

use crate::error::LoadError;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Source files use this extension; imports that omit an extension get it
/// appended, and imports with any other extension become text modules.
pub const SOURCE_EXTENSION: &str = "tuna";

/// The one environment variable allowed to influence compiler behavior
/// (spec §6 "Environment").
pub const LIBRARY_DIR_ENV_VAR: &str = "TUNASCRIPT_LIB_DIR";

/// Built-in module names reserved as `import` specifiers (spec §6).
pub const BUILTIN_MODULE_NAMES: &[&str] = &[
    "prelude", "array", "http", "sqlite", "file", "json", "runtime", "server", "host",
];

/// Caller-supplied overrides, kept distinct from `std::env` so tests can
/// inject a library directory without mutating process-global state.
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    pub library_dir_override: Option<PathBuf>,
}

impl LoaderConfig {
    /// Read the one opt-in environment variable (§6).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            library_dir_override: std::env::var_os(LIBRARY_DIR_ENV_VAR).map(PathBuf::from),
        }
    }
}

/// The discovered library directory plus the built-in module names found in
/// it, mapped to their file paths.
#[derive(Debug, Clone)]
pub struct LibraryIndex {
    pub dir: PathBuf,
    pub modules: FxHashMap<String, PathBuf>,
}

impl LibraryIndex {
    /// Locate the library directory: (a) env override if present and a
    /// directory; (b) walking parents of the current working directory for
    /// a `lib/` folder; (c) falling back to the directory embedding the
    /// loader crate itself. Once found, enumerate its source files.
    pub fn discover(config: &LoaderConfig) -> Result<Self, LoadError> {
        let dir = Self::find_library_dir(config)?;
        let modules = Self::enumerate(&dir)?;
        Ok(Self { dir, modules })
    }

    fn find_library_dir(config: &LoaderConfig) -> Result<PathBuf, LoadError> {
        if let Some(dir) = &config.library_dir_override {
            if dir.is_dir() {
                return Ok(dir.clone());
            }
        }
        if let Ok(cwd) = std::env::current_dir() {
            for ancestor in cwd.ancestors() {
                let candidate = ancestor.join("lib");
                if candidate.is_dir() {
                    return Ok(candidate);
                }
            }
        }
        let embedded = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/lib"));
        if embedded.is_dir() {
            return Ok(embedded);
        }
        Err(LoadError::LibraryNotFound)
    }

    fn enumerate(dir: &Path) -> Result<FxHashMap<String, PathBuf>, LoadError> {
        let mut modules = FxHashMap::default();
        let entries = walkdir::WalkDir::new(dir).min_depth(1).max_depth(1);
        for entry in entries {
            let entry = entry.map_err(|e| LoadError::Io {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                modules.insert(stem.to_string(), path.to_path_buf());
            }
        }
        Ok(modules)
    }

    #[must_use]
    pub fn is_builtin(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_embedded_library_and_indexes_builtins() {
        let config = LoaderConfig::default();
        let index = LibraryIndex::discover(&config).expect("embedded lib/ must be found");
        for name in BUILTIN_MODULE_NAMES {
            assert!(index.is_builtin(name), "missing built-in module {name}");
        }
    }

    #[test]
    fn env_override_takes_priority() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("only_one.tuna"), "export const x = 1").unwrap();
        let config = LoaderConfig {
            library_dir_override: Some(dir.path().to_path_buf()),
        };
        let index = LibraryIndex::discover(&config).unwrap();
        assert_eq!(index.modules.len(), 1);
        assert!(index.is_builtin("only_one"));
    }

    #[test]
    fn non_directory_override_is_ignored_in_favor_of_fallback() {
        let config = LoaderConfig {
            library_dir_override: Some(PathBuf::from("/does/not/exist")),
        };
        let index = LibraryIndex::discover(&config).expect("falls back to embedded lib/");
        assert!(index.is_builtin("prelude"));
    }
}
