//! Module loading: recursive import resolution over built-ins and
//! relative paths, text-module synthesis, and on-demand SQL pull-in (spec
//! §4.2).

use crate::error::LoadError;
use crate::library::{LibraryIndex, SOURCE_EXTENSION};
use crate::sql_detection::module_uses_sql;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use tunascript_common::{read_source_file, Span};
use tunascript_parser::ast::{Declaration, Module};
use tunascript_parser::parse_module;

/// The result of loading an entry module and everything it transitively
/// imports.
#[derive(Debug)]
pub struct LoadedProgram {
    /// Module key (bare built-in name, or absolute-path string for user/text
    /// modules) in load order.
    pub order: Vec<String>,
    pub modules: FxHashMap<String, Module>,
    /// The entry module's key.
    pub entry: String,
    /// Whether any loaded module references SQL or `create_table`, and so
    /// `server`/`host` were pulled in.
    pub uses_sql: bool,
}

impl LoadedProgram {
    #[must_use]
    pub fn modules_in_order(&self) -> Vec<&Module> {
        self.order
            .iter()
            .map(|key| &self.modules[key])
            .collect()
    }
}

pub struct ModuleLoader<'a> {
    library: &'a LibraryIndex,
    loaded: FxHashMap<String, Module>,
    order: Vec<String>,
}

impl<'a> ModuleLoader<'a> {
    #[must_use]
    pub fn new(library: &'a LibraryIndex) -> Self {
        Self {
            library,
            loaded: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Load `entry_path` and everything it transitively imports. `prelude`
    /// is always loaded first; `server` (and transitively `host`) is loaded
    /// afterward if any loaded module uses SQL or `create_table`.
    pub fn load_program(mut self, entry_path: &Path) -> Result<LoadedProgram, LoadError> {
        self.load_builtin("prelude")?;
        let entry = self.load_user_module(entry_path)?;

        let uses_sql = self.loaded.values().any(module_uses_sql);
        if uses_sql {
            self.load_builtin("server")?;
            // `sqlite` declares `db_open`, which codegen needs to synthesize
            // the implicit default database handle every SQL block reads
            // (see DESIGN.md's "default database handle" decision) — it is
            // not imported by any built-in or user module directly.
            self.load_builtin("sqlite")?;
        }

        Ok(LoadedProgram {
            order: self.order,
            modules: self.loaded,
            entry,
            uses_sql,
        })
    }

    fn load_builtin(&mut self, name: &str) -> Result<String, LoadError> {
        if self.loaded.contains_key(name) {
            return Ok(name.to_string());
        }
        let path = self
            .library
            .modules
            .get(name)
            .ok_or_else(|| LoadError::UnknownBuiltin(name.to_string()))?
            .clone();
        tracing::debug!(module = name, path = %path.display(), "loading built-in module");
        let text = read_source_file(&path).map_err(|e| LoadError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        // Insert a placeholder before recursing so self-importing/mutually
        // importing built-ins don't loop (module graph accepts cycles).
        self.loaded
            .insert(name.to_string(), empty_module(name));
        let module = parse_module(name, &text).map_err(|e| LoadError::Parse {
            file: name.to_string(),
            span: e.span,
            message: e.message,
        })?;
        self.resolve_imports(&module)?;
        self.order.push(name.to_string());
        self.loaded.insert(name.to_string(), module);
        Ok(name.to_string())
    }

    fn load_user_module(&mut self, path: &Path) -> Result<String, LoadError> {
        let key = module_key(path);
        if self.loaded.contains_key(&key) {
            return Ok(key);
        }
        tracing::debug!(path = %key, "loading user module");
        let text = read_source_file(path).map_err(|e| LoadError::Io {
            path: key.clone(),
            message: e.to_string(),
        })?;
        self.loaded.insert(key.clone(), empty_module(&key));
        let module = parse_module(&key, &text).map_err(|e| LoadError::Parse {
            file: key.clone(),
            span: e.span,
            message: e.message,
        })?;
        self.resolve_imports(&module)?;
        self.order.push(key.clone());
        self.loaded.insert(key.clone(), module);
        Ok(key)
    }

    fn load_text_module(&mut self, path: &Path) -> Result<String, LoadError> {
        let key = module_key(path);
        if self.loaded.contains_key(&key) {
            return Ok(key);
        }
        let text = read_source_file(path).map_err(|e| LoadError::Io {
            path: key.clone(),
            message: e.to_string(),
        })?;
        let module = synthesize_text_module(&key, text);
        self.order.push(key.clone());
        self.loaded.insert(key.clone(), module);
        Ok(key)
    }

    fn resolve_imports(&mut self, module: &Module) -> Result<(), LoadError> {
        // Collect first: `module` is a snapshot already moved out of
        // `self.loaded` conceptually (it lives on the caller's stack), so
        // recursing through `self` here is fine.
        for import in &module.imports {
            self.resolve_specifier(&import.specifier, &module.path, import.span)?;
        }
        Ok(())
    }

    fn resolve_specifier(
        &mut self,
        specifier: &str,
        importing_file: &str,
        span: Span,
    ) -> Result<(), LoadError> {
        if self.library.is_builtin(specifier) {
            self.load_builtin(specifier)?;
            return Ok(());
        }
        if specifier.starts_with("./") || specifier.starts_with("../") {
            let base_dir = Path::new(importing_file)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let resolved = resolve_relative_specifier(&base_dir, specifier);
            if resolved
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext == SOURCE_EXTENSION)
            {
                self.load_user_module(&resolved)?;
            } else {
                self.load_text_module(&resolved)?;
            }
            return Ok(());
        }
        Err(LoadError::UnsupportedSpecifier {
            specifier: specifier.to_string(),
            file: importing_file.to_string(),
            span,
        })
    }
}

/// Append the default source extension if `specifier` names no extension,
/// then join onto `base_dir`. Exposed so the checker can re-derive the same
/// module key for a relative import specifier without re-walking the
/// filesystem.
#[must_use]
pub fn resolve_relative_specifier(base_dir: &Path, specifier: &str) -> PathBuf {
    let joined = base_dir.join(specifier);
    let has_extension = Path::new(specifier)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.rsplit_once('.').is_some_and(|(stem, _)| !stem.is_empty()));
    if has_extension {
        joined
    } else {
        joined.with_extension(SOURCE_EXTENSION)
    }
}

fn module_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Re-derive the module key a relative import specifier resolves to from
/// the importing module's own key, matching `ModuleLoader`'s own
/// resolution exactly. Used by the checker to look up a relative import's
/// exported symbols without re-walking the filesystem.
#[must_use]
pub fn relative_import_key(importing_file: &str, specifier: &str) -> String {
    let base_dir = Path::new(importing_file)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    module_key(&resolve_relative_specifier(&base_dir, specifier))
}

fn empty_module(path: &str) -> Module {
    Module {
        path: path.to_string(),
        imports: Vec::new(),
        declarations: Vec::new(),
    }
}

/// A non-source-extension import becomes a synthetic module exporting
/// `default: string` carrying the file's raw contents (spec §4.2, §6).
fn synthesize_text_module(path: &str, contents: String) -> Module {
    use tunascript_parser::ast::{ConstDecl, Expr, ExprKind, TypeExpr};

    Module {
        path: path.to_string(),
        imports: Vec::new(),
        declarations: vec![Declaration::Const(ConstDecl {
            name: "default".to_string(),
            exported: true,
            type_annotation: Some(TypeExpr::Named("string".to_string(), Span::dummy())),
            init: Expr {
                kind: ExprKind::StringLiteral(contents),
                span: Span::dummy(),
            },
            span: Span::dummy(),
        })],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LoaderConfig;
    use std::fs;

    fn library() -> LibraryIndex {
        LibraryIndex::discover(&LoaderConfig::default()).unwrap()
    }

    #[test]
    fn loads_prelude_and_entry_module() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("main.tuna");
        fs::write(&entry, "export function main(): void { log(\"hi\") }").unwrap();
        let lib = library();
        let program = ModuleLoader::new(&lib).load_program(&entry).unwrap();
        assert!(program.modules.contains_key("prelude"));
        assert!(program.modules.contains_key(&module_key(&entry)));
        assert!(!program.uses_sql);
    }

    #[test]
    fn resolves_relative_import_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("util.tuna"), "export const x: integer = 1").unwrap();
        let entry = dir.path().join("main.tuna");
        fs::write(&entry, "import { x } from \"./util\"\nexport function main(): void { log(to_string(x)) }").unwrap();
        let lib = library();
        let program = ModuleLoader::new(&lib).load_program(&entry).unwrap();
        assert!(program.modules.contains_key(&module_key(&dir.path().join("util.tuna"))));
    }

    #[test]
    fn non_source_extension_becomes_text_module() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.txt"), "hello world").unwrap();
        let entry = dir.path().join("main.tuna");
        fs::write(
            &entry,
            "import { default } from \"./data.txt\"\nexport function main(): void { log(default) }",
        )
        .unwrap();
        let lib = library();
        let program = ModuleLoader::new(&lib).load_program(&entry).unwrap();
        let text_module = &program.modules[&module_key(&dir.path().join("data.txt"))];
        match &text_module.declarations[0] {
            Declaration::Const(c) => {
                assert_eq!(c.name, "default");
                assert!(matches!(
                    c.init.kind,
                    tunascript_parser::ast::ExprKind::StringLiteral(ref s) if s == "hello world"
                ));
            }
            _ => panic!("expected a const declaration"),
        }
    }

    #[test]
    fn sql_usage_pulls_in_server_and_host() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("main.tuna");
        fs::write(
            &entry,
            "export function main(): void | error { execute { DELETE FROM t } }",
        )
        .unwrap();
        let lib = library();
        let program = ModuleLoader::new(&lib).load_program(&entry).unwrap();
        assert!(program.uses_sql);
        assert!(program.modules.contains_key("server"));
        assert!(program.modules.contains_key("host"));
        assert!(program.modules.contains_key("sqlite"));
    }

    #[test]
    fn unsupported_specifier_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("main.tuna");
        fs::write(
            &entry,
            "import { x } from \"some_package\"\nexport function main(): void {}",
        )
        .unwrap();
        let lib = library();
        let err = ModuleLoader::new(&lib).load_program(&entry).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedSpecifier { .. }));
    }

    #[test]
    fn cyclic_relative_imports_do_not_loop() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.tuna"),
            "import { b } from \"./b\"\nexport const a: integer = 1",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.tuna"),
            "import { a } from \"./a\"\nexport const b: integer = 2",
        )
        .unwrap();
        let entry = dir.path().join("a.tuna");
        let lib = library();
        let program = ModuleLoader::new(&lib).load_program(&entry).unwrap();
        assert!(program.modules.contains_key(&module_key(&dir.path().join("b.tuna"))));
    }
}
