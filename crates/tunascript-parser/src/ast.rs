//! AST node definitions produced by the parser and consumed by the loader,
//! checker, and code generator.

use tunascript_common::Span;

#[derive(Debug, Clone)]
pub struct Module {
    /// Absolute OS path for user files; a bare name (`"prelude"`) for
    /// built-in modules.
    pub path: String,
    pub imports: Vec<Import>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub specifier: String,
    pub bindings: Vec<ImportBinding>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ImportBinding {
    pub name: String,
    pub is_type: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Declaration {
    Const(ConstDecl),
    Function(FunctionDecl),
    /// `extern function` — body supplied by the runtime; only legal in
    /// built-in modules, enforced by the loader/checker rather than the
    /// grammar.
    ExternFunction(ExternFunctionDecl),
    TypeAlias(TypeAliasDecl),
    Table(TableDecl),
}

impl Declaration {
    #[must_use]
    pub fn is_exported(&self) -> bool {
        match self {
            Declaration::Const(d) => d.exported,
            Declaration::Function(d) => d.exported,
            Declaration::ExternFunction(d) => d.exported,
            Declaration::TypeAlias(d) => d.exported,
            Declaration::Table(d) => d.exported,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Declaration::Const(d) => &d.name,
            Declaration::Function(d) => &d.name,
            Declaration::ExternFunction(d) => &d.name,
            Declaration::TypeAlias(d) => &d.name,
            Declaration::Table(d) => &d.name,
        }
    }

    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Declaration::Const(d) => d.span,
            Declaration::Function(d) => d.span,
            Declaration::ExternFunction(d) => d.span,
            Declaration::TypeAlias(d) => d.span,
            Declaration::Table(d) => d.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstDecl {
    pub name: String,
    pub exported: bool,
    pub type_annotation: Option<TypeExpr>,
    pub init: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_annotation: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub exported: bool,
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExternFunctionDecl {
    pub name: String,
    pub exported: bool,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeAliasDecl {
    pub name: String,
    pub exported: bool,
    pub type_params: Vec<String>,
    pub value: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TableColumn {
    pub name: String,
    pub sql_type: String,
    pub constraints: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TableDecl {
    pub name: String,
    pub exported: bool,
    pub columns: Vec<TableColumn>,
    pub span: Span,
}

// ---------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum TypeExpr {
    Named(String, Span),
    Array(Box<TypeExpr>, Span),
    Tuple(Vec<TypeExpr>, Span),
    Object(ObjectTypeExpr),
    Union(Vec<TypeExpr>, Span),
    Literal(LiteralTypeValue, Span),
    Func(FuncTypeExpr),
}

impl TypeExpr {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named(_, s)
            | TypeExpr::Array(_, s)
            | TypeExpr::Tuple(_, s)
            | TypeExpr::Union(_, s)
            | TypeExpr::Literal(_, s) => *s,
            TypeExpr::Object(o) => o.span,
            TypeExpr::Func(f) => f.span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum LiteralTypeValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub struct ObjectTypeProp {
    pub name: String,
    pub type_annotation: TypeExpr,
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectTypeExpr {
    pub props: Vec<ObjectTypeProp>,
    pub index_signature: Option<Box<TypeExpr>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FuncTypeExpr {
    pub type_params: Vec<String>,
    pub params: Vec<TypeExpr>,
    pub ret: Box<TypeExpr>,
    pub span: Span,
}

// ---------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Const(LocalConstStmt),
    If(IfStmt),
    For(ForStmt),
    Return(ReturnStmt),
    Expr(ExprStmt),
    Block(Block),
}

impl Stmt {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Stmt::Const(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::Block(s) => s.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalConstStmt {
    pub name: String,
    pub type_annotation: Option<TypeExpr>,
    pub init: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_branch: Block,
    pub else_branch: Option<Box<Stmt>>,
    pub span: Span,
}

/// `for (const pat of expr) { ... }`
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub pattern: Pattern,
    pub iterable: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

// ---------------------------------------------------------------------
// Destructuring patterns
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Pattern {
    Identifier {
        name: String,
        type_annotation: Option<TypeExpr>,
        span: Span,
    },
    Array {
        elements: Vec<Pattern>,
        span: Span,
    },
    Object {
        props: Vec<ObjectPatternProp>,
        span: Span,
    },
}

impl Pattern {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier { span, .. } | Pattern::Array { span, .. } | Pattern::Object { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectPatternProp {
    pub key: String,
    /// `{ key: binding }`; equal to `key` for shorthand `{ key }`.
    pub binding: String,
    pub span: Span,
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntegerLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    BoolLiteral(bool),
    NullLiteral,
    UndefinedLiteral,
    TemplateLiteral(Vec<TemplatePart>),
    Identifier(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    /// `obj.func(args)` sugar recorded distinctly so the checker/codegen can
    /// desugar it to `func(obj, args)` once `func` is resolved.
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    FunctionLiteral {
        type_params: Vec<String>,
        params: Vec<Param>,
        ret: Option<TypeExpr>,
        body: FunctionLiteralBody,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    Switch {
        scrutinee: Box<Expr>,
        cases: Vec<SwitchCase>,
    },
    Block(Box<Block>, Box<Expr>),
    Try(Box<Expr>),
    Object(ObjectLiteral),
    Array(ArrayLiteral),
    Jsx(JsxNode),
    Sql(SqlBlock),
    /// `expr as T` — narrowing assertion used as an expression (e.g. inside
    /// `if (x as T)`), distinct from a `case pat as T` arm.
    As {
        expr: Box<Expr>,
        type_annotation: Box<TypeExpr>,
    },
    Paren(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum TemplatePart {
    Literal(String),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
}

#[derive(Debug, Clone)]
pub enum FunctionLiteralBody {
    Block(Block),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub pattern: Option<CasePattern>,
    pub body: SwitchCaseBody,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum SwitchCaseBody {
    /// `case pat: expr` contributes `expr`'s type to the switch result.
    Value(Expr),
    /// `case pat: return expr` returns from the enclosing function.
    Return(Option<Expr>),
}

#[derive(Debug, Clone)]
pub struct CasePattern {
    pub pattern: Pattern,
    /// `case pat as T`.
    pub narrow_type: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectProp {
    pub key: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ObjectLiteralItem {
    Prop(ObjectProp),
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub struct ObjectLiteral {
    pub items: Vec<ObjectLiteralItem>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ArrayLiteralItem {
    Element(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub struct ArrayLiteral {
    pub items: Vec<ArrayLiteralItem>,
    pub span: Span,
}

// ---------------------------------------------------------------------
// JSX
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum JsxNode {
    Element(JsxElement),
    Fragment(JsxFragment),
}

impl JsxNode {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            JsxNode::Element(e) => e.span,
            JsxNode::Fragment(f) => f.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsxElement {
    pub tag: String,
    /// Uppercase first letter: a custom component resolved against a
    /// same-named top-level function. Lowercase: treated as HTML.
    pub is_component: bool,
    pub attributes: Vec<JsxAttribute>,
    pub spread_attributes: Vec<Expr>,
    pub children: Vec<JsxChild>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct JsxAttribute {
    pub name: String,
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct JsxFragment {
    pub children: Vec<JsxChild>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum JsxChild {
    Text(String),
    Expr(Expr),
    Node(Box<JsxNode>),
}

// ---------------------------------------------------------------------
// Inline SQL
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlForm {
    Execute,
    FetchOne,
    FetchOptional,
    Fetch,
    FetchAll,
}

#[derive(Debug, Clone)]
pub enum SqlSegment {
    Text(String),
    Param(Expr),
}

#[derive(Debug, Clone)]
pub struct SqlBlock {
    pub form: SqlForm,
    pub segments: Vec<SqlSegment>,
    pub span: Span,
}
