//! The `Checker`: per-compile state shared by every checking pass
//! (symbols, tables, accumulated diagnostics, per-module type environments
//! and export tables). `module_check` processes one module at a time in
//! the loader's topological order (spec §4.3 "Order of operations").

use rustc_hash::FxHashMap;
use std::rc::Rc;
use tunascript_common::{CompileError, Diagnostic, Span};
use tunascript_loader::{relative_import_key, LoadedProgram};
use tunascript_parser::ast::{Declaration, Module};
use tunascript_solver::Type;

use crate::checked_program::{CheckedProgram, JsxComponentUse, ModuleInfo};
use crate::scope::{ShadowsOuter, Scopes};
use crate::symbol::{Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::table_registry::{TableRegistry, TableSchema};
use crate::type_resolve::{TypeAliasDef, TypeEnv};

/// Per-module checking context: the bits of state that are specific to the
/// module currently being processed, as opposed to `Checker`'s
/// whole-compile state.
pub(crate) struct ModuleCtx {
    pub path: String,
    pub type_env: TypeEnv,
    pub scopes: Scopes,
    /// `Some` while checking a function body; used to validate `return` and
    /// the postfix `?` operator against the enclosing function's declared
    /// return type.
    pub return_type: Option<Type>,
}

pub struct Checker {
    pub symbols: SymbolTable,
    pub tables: TableRegistry,
    pub diagnostics: Vec<Diagnostic>,
    pub(crate) module_exports: FxHashMap<String, FxHashMap<String, SymbolId>>,
    pub(crate) module_top_level: FxHashMap<String, FxHashMap<String, SymbolId>>,
    pub(crate) module_type_envs: FxHashMap<String, TypeEnv>,
    pub(crate) expr_types: FxHashMap<(String, Span), Type>,
    pub(crate) identifier_symbols: FxHashMap<(String, Span), SymbolId>,
    pub(crate) jsx_components: FxHashMap<(String, Span), JsxComponentUse>,
}

impl Default for Checker {
    fn default() -> Self {
        Self {
            symbols: SymbolTable::new(),
            tables: TableRegistry::new(),
            diagnostics: Vec::new(),
            module_exports: FxHashMap::default(),
            module_top_level: FxHashMap::default(),
            module_type_envs: FxHashMap::default(),
            expr_types: FxHashMap::default(),
            identifier_symbols: FxHashMap::default(),
            jsx_components: FxHashMap::default(),
        }
    }
}

/// Check every module in `loaded.order`, accumulating diagnostics across
/// the whole program (spec §4.3, §7 propagation policy).
pub fn check_program(loaded: &LoadedProgram) -> Result<CheckedProgram, CompileError> {
    let mut checker = Checker::default();
    for path in &loaded.order {
        let module = &loaded.modules[path];
        checker.check_module(path, module);
    }

    let mut modules = FxHashMap::default();
    for path in &loaded.order {
        let module = loaded.modules[path].clone();
        modules.insert(
            path.clone(),
            ModuleInfo {
                path: path.clone(),
                module,
                exports: checker.module_exports.remove(path).unwrap_or_default(),
                top_level: checker.module_top_level.remove(path).unwrap_or_default(),
            },
        );
    }

    let program = CheckedProgram {
        modules,
        symbols: checker.symbols,
        tables: checker.tables,
        expr_types: checker.expr_types,
        identifier_symbols: checker.identifier_symbols,
        jsx_components: checker.jsx_components,
        errors: checker.diagnostics.clone(),
        entry: loaded.entry.clone(),
    };

    if checker.diagnostics.is_empty() {
        Ok(program)
    } else {
        Err(CompileError::Many(checker.diagnostics))
    }
}

impl Checker {
    pub(crate) fn error(&mut self, file: &str, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(file, span, message));
    }

    fn check_module(&mut self, path: &str, module: &Module) {
        let mut type_env = if path == "prelude" {
            TypeEnv::new()
        } else {
            self.module_type_envs.get("prelude").cloned().unwrap_or_default()
        };

        self.collect_imports(path, module, &mut type_env);

        // Pass 1: type aliases, so later declarations (and each other, for
        // non-recursive aliases) can see them.
        for decl in &module.declarations {
            if let Declaration::TypeAlias(alias) = decl {
                type_env.insert(
                    alias.name.clone(),
                    TypeAliasDef::from_expr(alias.type_params.clone(), alias.value.clone()),
                );
            }
        }

        // Pass 2: tables (register schema + auto row-type alias).
        for decl in &module.declarations {
            if let Declaration::Table(table) = decl {
                let schema = TableSchema::from_decl(table);
                let row_ty = schema.row_type();
                let alias_name = format!("{}Row", capitalize(&table.name));
                type_env.insert(alias_name, TypeAliasDef::resolved(row_ty.clone()));
                self.tables.register(schema);
                let sym = self.symbols.insert(Symbol {
                    name: table.name.clone(),
                    kind: SymbolKind::Type,
                    ty: row_ty,
                    decl_span: table.span,
                    owner_module: path.to_string(),
                    alias: None,
                    storage_ty: None,
                });
                self.declare_top_level(path, &table.name, table.exported, sym);
            }
        }

        // Pass 3: signatures for consts/functions/externs (bodies checked
        // after every top-level signature is visible).
        let mut ctx = ModuleCtx {
            path: path.to_string(),
            type_env,
            scopes: Scopes::new(),
            return_type: None,
        };
        for decl in &module.declarations {
            match decl {
                Declaration::Function(f) => {
                    let params: Vec<Type> = f
                        .params
                        .iter()
                        .map(|p| self.resolve_param_type(&mut ctx, p))
                        .collect();
                    let ret = f
                        .ret
                        .as_ref()
                        .map(|t| self.resolve_type(&mut ctx, t))
                        .unwrap_or(Type::Void);
                    let func_ty = Type::func(
                        f.type_params.iter().map(|t| Rc::from(t.as_str())).collect(),
                        params,
                        ret,
                    );
                    let sym = self.symbols.insert(Symbol {
                        name: f.name.clone(),
                        kind: SymbolKind::Func,
                        ty: func_ty,
                        decl_span: f.span,
                        owner_module: path.to_string(),
                        alias: None,
                        storage_ty: None,
                    });
                    self.declare_top_level(path, &f.name, f.exported, sym);
                }
                Declaration::ExternFunction(f) => {
                    let params: Vec<Type> = f
                        .params
                        .iter()
                        .map(|p| self.resolve_param_type(&mut ctx, p))
                        .collect();
                    let ret = f
                        .ret
                        .as_ref()
                        .map(|t| self.resolve_type(&mut ctx, t))
                        .unwrap_or(Type::Void);
                    let func_ty = Type::func(Vec::new(), params, ret);
                    let sym = self.symbols.insert(Symbol {
                        name: f.name.clone(),
                        kind: SymbolKind::Builtin,
                        ty: func_ty,
                        decl_span: f.span,
                        owner_module: path.to_string(),
                        alias: None,
                        storage_ty: None,
                    });
                    self.declare_top_level(path, &f.name, f.exported, sym);
                }
                Declaration::Const(c) => {
                    let declared = c.type_annotation.as_ref().map(|t| self.resolve_type(&mut ctx, t));
                    let placeholder = declared.clone().unwrap_or(Type::Json);
                    let sym = self.symbols.insert(Symbol {
                        name: c.name.clone(),
                        kind: SymbolKind::Var,
                        ty: placeholder,
                        decl_span: c.span,
                        owner_module: path.to_string(),
                        alias: None,
                        storage_ty: None,
                    });
                    self.declare_top_level(path, &c.name, c.exported, sym);
                }
                Declaration::TypeAlias(_) | Declaration::Table(_) => {}
            }
        }

        // Seed the module's base scope frame with every top-level binding
        // (imports, tables, consts/functions/externs) collected in passes
        // 1-3, so bodies can resolve them by plain identifier lookup.
        if let Some(top_level) = self.module_top_level.get(path) {
            for (name, sym) in top_level.clone() {
                ctx.scopes.rebind(&name, sym);
            }
        }

        // Pass 4: bodies, now that every top-level signature is resolvable.
        for decl in &module.declarations {
            match decl {
                Declaration::Function(f) => self.check_function_body(&mut ctx, f),
                Declaration::Const(c) => self.check_const_body(&mut ctx, c),
                Declaration::ExternFunction(_) | Declaration::TypeAlias(_) | Declaration::Table(_) => {}
            }
        }

        self.module_type_envs.insert(path.to_string(), ctx.type_env);
    }

    fn collect_imports(&mut self, path: &str, module: &Module, type_env: &mut TypeEnv) {
        for import in &module.imports {
            let key = self.resolve_import_key(path, &import.specifier);
            for binding in &import.bindings {
                if binding.is_type {
                    match self
                        .module_type_envs
                        .get(&key)
                        .and_then(|env| env.get(&binding.name))
                        .cloned()
                    {
                        Some(def) => type_env.insert(binding.name.clone(), def),
                        None => self.error(
                            path,
                            binding.span,
                            format!("module `{key}` has no exported type `{}`", binding.name),
                        ),
                    }
                } else {
                    match self.module_exports.get(&key).and_then(|exports| exports.get(&binding.name)).copied() {
                        Some(original) => {
                            let ty = self.symbols.resolved_type(original);
                            let sym = self.symbols.insert(Symbol {
                                name: binding.name.clone(),
                                kind: self.symbols.get(original).kind,
                                ty,
                                decl_span: binding.span,
                                owner_module: path.to_string(),
                                alias: Some(original),
                                storage_ty: None,
                            });
                            self.module_top_level.entry(path.to_string()).or_default().insert(binding.name.clone(), sym);
                        }
                        None => self.error(
                            path,
                            binding.span,
                            format!("module `{key}` has no export `{}`", binding.name),
                        ),
                    }
                }
            }
        }
    }

    fn resolve_import_key(&self, importing_path: &str, specifier: &str) -> String {
        if specifier.starts_with("./") || specifier.starts_with("../") {
            relative_import_key(importing_path, specifier)
        } else {
            specifier.to_string()
        }
    }

    fn declare_top_level(&mut self, path: &str, name: &str, exported: bool, sym: SymbolId) {
        self.module_top_level.entry(path.to_string()).or_default().insert(name.to_string(), sym);
        if exported {
            self.module_exports.entry(path.to_string()).or_default().insert(name.to_string(), sym);
        }
    }

    fn resolve_param_type(&mut self, ctx: &mut ModuleCtx, param: &tunascript_parser::ast::Param) -> Type {
        match &param.type_annotation {
            Some(t) => self.resolve_type(ctx, t),
            None => {
                self.error(&ctx.path, param.span, format!("parameter `{}` requires a type annotation", param.name));
                Type::Json
            }
        }
    }

    pub(crate) fn resolve_type(&mut self, ctx: &mut ModuleCtx, type_expr: &tunascript_parser::ast::TypeExpr) -> Type {
        match crate::type_resolve::resolve_type_expr(type_expr, &ctx.type_env, &FxHashMap::default()) {
            Ok(ty) => ty,
            Err(message) => {
                self.error(&ctx.path, type_expr.span(), message);
                Type::Json
            }
        }
    }

    /// Declare a fresh local binding (function param, `const`, destructured
    /// element) in the current scope frame, reporting a shadowing error if
    /// it hides an enclosing binding (spec §4.1 syntactic rule).
    pub(crate) fn declare_local(&mut self, ctx: &mut ModuleCtx, name: &str, ty: Type, span: Span) -> SymbolId {
        let sym = self.symbols.insert(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Var,
            ty,
            decl_span: span,
            owner_module: ctx.path.clone(),
            alias: None,
            storage_ty: None,
        });
        let ShadowsOuter(shadows) = ctx.scopes.declare(name, sym);
        if shadows {
            self.error(&ctx.path, span, format!("`{name}` shadows an outer-scope binding"));
        }
        sym
    }

    /// Rebind `name` at a narrowed type without a shadow check — used by
    /// `case x as T` and `if (x as T)` where the narrowing frame
    /// intentionally hides the outer binding.
    pub(crate) fn rebind_local(&mut self, ctx: &mut ModuleCtx, name: &str, ty: Type, span: Span) -> SymbolId {
        let sym = self.symbols.insert(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Var,
            ty,
            decl_span: span,
            owner_module: ctx.path.clone(),
            alias: None,
            storage_ty: None,
        });
        ctx.scopes.rebind(name, sym);
        sym
    }

    pub(crate) fn record_expr_type(&mut self, ctx: &ModuleCtx, span: Span, ty: Type) {
        self.expr_types.insert((ctx.path.clone(), span), ty);
    }

    fn check_function_body(&mut self, ctx: &mut ModuleCtx, f: &tunascript_parser::ast::FunctionDecl) {
        let sym = self.module_top_level[&ctx.path][&f.name];
        let ret_ty = match self.symbols.get(sym).ty.clone() {
            Type::Func(func) => func.ret.clone(),
            _ => Type::Void,
        };
        ctx.scopes.push();
        for param in &f.params {
            let ty = param
                .type_annotation
                .as_ref()
                .map(|t| self.resolve_type(ctx, t))
                .unwrap_or(Type::Json);
            self.declare_local(ctx, &param.name, ty, param.span);
        }
        let previous_return = ctx.return_type.replace(ret_ty);
        self.check_function_body_block(ctx, &f.body);
        ctx.return_type = previous_return;
        ctx.scopes.pop();
    }

    fn check_const_body(&mut self, ctx: &mut ModuleCtx, c: &tunascript_parser::ast::ConstDecl) {
        let inferred = self.check_expr(ctx, &c.init);
        let sym = self.module_top_level[&ctx.path][&c.name];
        match &c.type_annotation {
            Some(annotation) => {
                let declared = self.resolve_type(ctx, annotation);
                if !tunascript_solver::is_assignable(&inferred, &declared) {
                    self.error(
                        &ctx.path,
                        c.init.span,
                        format!(
                            "cannot assign `{inferred}` to `{}` of declared type `{declared}`",
                            c.name
                        ),
                    );
                }
                self.symbols.get_mut(sym).ty = declared;
            }
            None => {
                self.symbols.get_mut(sym).ty = inferred;
            }
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
