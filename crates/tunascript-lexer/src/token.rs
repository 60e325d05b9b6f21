//! Token kinds produced by the lexer.

use tunascript_common::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    Identifier,
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    /// A template-literal chunk that is followed by `${`; text excludes the
    /// surrounding backtick/`${`/`}` delimiters.
    TemplateHead,
    /// A template-literal chunk between two `${ ... }` holes.
    TemplateMiddle,
    /// The final chunk of a template literal, ending at the closing backtick.
    TemplateTail,
    /// A template literal with no interpolation at all.
    TemplateFull,

    // Keywords
    Const,
    Function,
    Extern,
    Export,
    Import,
    From,
    Type,
    CreateTable,
    If,
    Else,
    For,
    Of,
    Return,
    Switch,
    Case,
    Default,
    As,
    Null,
    Undefined,
    True,
    False,
    Execute,
    FetchOne,
    FetchOptional,
    Fetch,
    FetchAll,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Arrow,    // =>
    Dot,
    DotDotDot, // ...
    Question,
    QuestionDot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    Eq,
    Bang,
    LAngleBracket, // disambiguated from Lt in type-argument position by the parser

    // JSX-only tokens, produced by re-lexing in JSX text/attribute mode
    JsxText,
    JsxSlash, // `/` immediately before `>` in a self-closing tag

    Eof,
    Unknown,
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// The token's source text, already unescaped for string/template
    /// literals.
    pub text: String,
    /// Whether a line break occurred between this token and the previous
    /// one. The parser uses this to resolve `(`/`[` ambiguity at statement
    /// start and to implement automatic statement separation.
    pub had_newline_before: bool,
}

pub fn keyword_kind(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "const" => TokenKind::Const,
        "function" => TokenKind::Function,
        "extern" => TokenKind::Extern,
        "export" => TokenKind::Export,
        "import" => TokenKind::Import,
        "from" => TokenKind::From,
        "type" => TokenKind::Type,
        "create_table" => TokenKind::CreateTable,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "of" => TokenKind::Of,
        "return" => TokenKind::Return,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        "as" => TokenKind::As,
        "null" => TokenKind::Null,
        "undefined" => TokenKind::Undefined,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "execute" => TokenKind::Execute,
        "fetch_one" => TokenKind::FetchOne,
        "fetch_optional" => TokenKind::FetchOptional,
        "fetch_all" => TokenKind::FetchAll,
        "fetch" => TokenKind::Fetch,
        _ => return None,
    })
}
