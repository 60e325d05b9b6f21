//! Library directory discovery and module loading for the TunaScript
//! compiler (spec §4.2).

mod error;
mod library;
mod loader;
mod sql_detection;

pub use error::LoadError;
pub use library::{
    LibraryIndex, LoaderConfig, BUILTIN_MODULE_NAMES, LIBRARY_DIR_ENV_VAR, SOURCE_EXTENSION,
};
pub use loader::{relative_import_key, resolve_relative_specifier, LoadedProgram, ModuleLoader};
pub use sql_detection::module_uses_sql;
