//! Recursive-descent parser with Pratt-style expression parsing.

use crate::ast::*;
use tunascript_common::Span;
use tunascript_lexer::{LexError, Lexer, Token, TokenKind};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    source: &'a str,
    current: Token,
    /// One token of lookahead beyond `current`, filled lazily.
    peeked: Option<Token>,
}

/// Parse a complete module from `source`. `path` is recorded on the
/// resulting [`Module`] verbatim (caller resolves built-in vs. on-disk
/// naming).
pub fn parse_module(path: &str, source: &str) -> ParseResult<Module> {
    let mut parser = Parser::new(source)?;
    parser.parse_module(path)
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.scan().map_err(|e| lex_err(&e, &lexer))?;
        Ok(Self {
            lexer,
            source,
            current,
            peeked: None,
        })
    }

    fn bump(&mut self) -> ParseResult<Token> {
        let next = match self.peeked.take() {
            Some(t) => t,
            None => self.lexer.scan().map_err(|e| lex_err(&e, &self.lexer))?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn peek2(&mut self) -> ParseResult<&Token> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.scan().map_err(|e| lex_err(&e, &self.lexer))?);
        }
        Ok(self.peeked.as_ref().unwrap())
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> ParseResult<bool> {
        if self.at(kind) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.current.kind == kind {
            self.bump()
        } else {
            Err(self.error(format!(
                "expected {what}, found `{}`",
                self.current.text
            )))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<(String, Span)> {
        if self.current.kind == TokenKind::Identifier {
            let tok = self.bump()?;
            Ok((tok.text, tok.span))
        } else {
            Err(self.error(format!("expected an identifier, found `{}`", self.current.text)))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            span: self.current.span,
            message: message.into(),
        }
    }

    fn span_from(&self, start: Span) -> Span {
        start.merge(&self.current.span)
    }

    // -----------------------------------------------------------------
    // Module
    // -----------------------------------------------------------------

    fn parse_module(&mut self, path: &str) -> ParseResult<Module> {
        let mut imports = Vec::new();
        let mut declarations = Vec::new();

        while self.at(TokenKind::Import) {
            imports.push(self.parse_import()?);
        }

        while !self.at(TokenKind::Eof) {
            declarations.push(self.parse_declaration()?);
        }

        Ok(Module {
            path: path.to_string(),
            imports,
            declarations,
        })
    }

    fn parse_import(&mut self) -> ParseResult<Import> {
        let start = self.current.span;
        self.expect(TokenKind::Import, "`import`")?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut bindings = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let is_type = self.eat(TokenKind::Type)?;
            let (name, span) = self.expect_identifier()?;
            bindings.push(ImportBinding { name, is_type, span });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        self.expect(TokenKind::From, "`from`")?;
        let specifier_tok = self.expect(TokenKind::StringLiteral, "a module specifier string")?;
        Ok(Import {
            specifier: specifier_tok.text,
            bindings,
            span: self.span_from(start),
        })
    }

    fn parse_declaration(&mut self) -> ParseResult<Declaration> {
        let start = self.current.span;
        let exported = self.eat(TokenKind::Export)?;

        if self.at(TokenKind::Const) {
            return Ok(Declaration::Const(self.parse_const_decl(start, exported)?));
        }
        if self.at(TokenKind::Extern) {
            self.bump()?;
            return Ok(Declaration::ExternFunction(
                self.parse_extern_function_decl(start, exported)?,
            ));
        }
        if self.at(TokenKind::Function) {
            return Ok(Declaration::Function(self.parse_function_decl(start, exported)?));
        }
        if self.at(TokenKind::Type) {
            return Ok(Declaration::TypeAlias(self.parse_type_alias_decl(start, exported)?));
        }
        if self.at(TokenKind::CreateTable) {
            return Ok(Declaration::Table(self.parse_table_decl(start, exported)?));
        }

        Err(self.error(format!(
            "expected a top-level declaration, found `{}`",
            self.current.text
        )))
    }

    fn parse_const_decl(&mut self, start: Span, exported: bool) -> ParseResult<ConstDecl> {
        self.expect(TokenKind::Const, "`const`")?;
        let (name, _) = self.expect_identifier()?;
        let type_annotation = if self.eat(TokenKind::Colon)? {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq, "`=`")?;
        let init = self.parse_expr()?;
        Ok(ConstDecl {
            name,
            exported,
            type_annotation,
            init,
            span: self.span_from(start),
        })
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(TokenKind::LParen, "`(`")?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            let pstart = self.current.span;
            let (name, _) = self.expect_identifier()?;
            let type_annotation = if self.eat(TokenKind::Colon)? {
                Some(self.parse_type()?)
            } else {
                None
            };
            params.push(Param {
                name,
                type_annotation,
                span: self.span_from(pstart),
            });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(params)
    }

    fn parse_type_params(&mut self) -> ParseResult<Vec<String>> {
        if !self.eat(TokenKind::Lt)? {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        while !self.at(TokenKind::Gt) {
            let (name, _) = self.expect_identifier()?;
            names.push(name);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::Gt, "`>`")?;
        Ok(names)
    }

    fn parse_function_decl(&mut self, start: Span, exported: bool) -> ParseResult<FunctionDecl> {
        self.expect(TokenKind::Function, "`function`")?;
        let (name, _) = self.expect_identifier()?;
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        let ret = if self.eat(TokenKind::Colon)? {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(FunctionDecl {
            name,
            exported,
            type_params,
            params,
            ret,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_extern_function_decl(
        &mut self,
        start: Span,
        exported: bool,
    ) -> ParseResult<ExternFunctionDecl> {
        self.expect(TokenKind::Function, "`function`")?;
        let (name, _) = self.expect_identifier()?;
        let params = self.parse_params()?;
        let ret = if self.eat(TokenKind::Colon)? {
            Some(self.parse_type()?)
        } else {
            None
        };
        Ok(ExternFunctionDecl {
            name,
            exported,
            params,
            ret,
            span: self.span_from(start),
        })
    }

    fn parse_type_alias_decl(&mut self, start: Span, exported: bool) -> ParseResult<TypeAliasDecl> {
        self.expect(TokenKind::Type, "`type`")?;
        let (name, _) = self.expect_identifier()?;
        let type_params = self.parse_type_params()?;
        self.expect(TokenKind::Eq, "`=`")?;
        let value = self.parse_type()?;
        Ok(TypeAliasDecl {
            name,
            exported,
            type_params,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_table_decl(&mut self, start: Span, exported: bool) -> ParseResult<TableDecl> {
        self.expect(TokenKind::CreateTable, "`create_table`")?;
        let (name, _) = self.expect_identifier()?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut columns = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let cstart = self.current.span;
            let (col_name, _) = self.expect_identifier()?;
            let (sql_type, _) = self.expect_identifier()?;
            let mut constraints = String::new();
            while !self.at(TokenKind::Comma) && !self.at(TokenKind::RBrace) {
                if !constraints.is_empty() {
                    constraints.push(' ');
                }
                constraints.push_str(&self.bump()?.text);
            }
            columns.push(TableColumn {
                name: col_name,
                sql_type,
                constraints,
                span: self.span_from(cstart),
            });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(TableDecl {
            name,
            exported,
            columns,
            span: self.span_from(start),
        })
    }

    // -----------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------

    pub fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        let start = self.current.span;
        let mut first = self.parse_type_postfix()?;
        if self.at(TokenKind::Pipe) {
            let mut members = vec![first];
            while self.eat(TokenKind::Pipe)? {
                members.push(self.parse_type_postfix()?);
            }
            first = TypeExpr::Union(members, self.span_from(start));
        }
        Ok(first)
    }

    fn parse_type_postfix(&mut self) -> ParseResult<TypeExpr> {
        let start = self.current.span;
        let mut ty = self.parse_type_primary()?;
        while self.at(TokenKind::LBracket) {
            self.bump()?;
            self.expect(TokenKind::RBracket, "`]`")?;
            ty = TypeExpr::Array(Box::new(ty), self.span_from(start));
        }
        Ok(ty)
    }

    fn parse_type_primary(&mut self) -> ParseResult<TypeExpr> {
        let start = self.current.span;
        match self.current.kind {
            TokenKind::LBracket => {
                self.bump()?;
                let mut elements = Vec::new();
                while !self.at(TokenKind::RBracket) {
                    elements.push(self.parse_type()?);
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "`]`")?;
                Ok(TypeExpr::Tuple(elements, self.span_from(start)))
            }
            TokenKind::LBrace => self.parse_object_type(),
            TokenKind::StringLiteral => {
                let tok = self.bump()?;
                Ok(TypeExpr::Literal(LiteralTypeValue::String(tok.text), self.span_from(start)))
            }
            TokenKind::IntegerLiteral => {
                let tok = self.bump()?;
                let value = tunascript_common::numeric::parse_integer_literal_value(&tok.text)
                    .ok_or_else(|| ParseError {
                        span: tok.span,
                        message: format!("invalid integer literal `{}`", tok.text),
                    })?;
                Ok(TypeExpr::Literal(LiteralTypeValue::Integer(value), self.span_from(start)))
            }
            TokenKind::FloatLiteral => {
                let tok = self.bump()?;
                let value = tunascript_common::numeric::parse_numeric_literal_value(&tok.text)
                    .ok_or_else(|| ParseError {
                        span: tok.span,
                        message: format!("invalid float literal `{}`", tok.text),
                    })?;
                Ok(TypeExpr::Literal(LiteralTypeValue::Float(value), self.span_from(start)))
            }
            TokenKind::True => {
                self.bump()?;
                Ok(TypeExpr::Literal(LiteralTypeValue::Bool(true), self.span_from(start)))
            }
            TokenKind::False => {
                self.bump()?;
                Ok(TypeExpr::Literal(LiteralTypeValue::Bool(false), self.span_from(start)))
            }
            TokenKind::Null => {
                self.bump()?;
                Ok(TypeExpr::Literal(LiteralTypeValue::Null, self.span_from(start)))
            }
            TokenKind::Lt => self.parse_func_type(),
            TokenKind::LParen => {
                // Disambiguate `(params) => T` from a parenthesized type by
                // always treating a leading `(` in type position as a
                // function type; TunaScript has no parenthesized-type form.
                self.parse_func_type()
            }
            TokenKind::Identifier => {
                let (name, _) = self.expect_identifier()?;
                let mut ty = TypeExpr::Named(name, self.span_from(start));
                if self.at(TokenKind::Lt) {
                    // `Array<T>`/`Map<K,V>`-style generic named type.
                    self.bump()?;
                    let mut args = Vec::new();
                    while !self.at(TokenKind::Gt) {
                        args.push(self.parse_type()?);
                        if !self.eat(TokenKind::Comma)? {
                            break;
                        }
                    }
                    self.expect(TokenKind::Gt, "`>`")?;
                    // Generic named types are represented by folding the
                    // base name and its arguments into a single synthetic
                    // name; the checker resolves well-known ones (`Array`,
                    // `Map`) specially.
                    let TypeExpr::Named(base, span) = ty else { unreachable!() };
                    ty = TypeExpr::Named(synthesize_generic_name(&base, &args), span);
                }
                Ok(ty)
            }
            _ => Err(self.error(format!("expected a type, found `{}`", self.current.text))),
        }
    }

    fn parse_func_type(&mut self) -> ParseResult<TypeExpr> {
        let start = self.current.span;
        let type_params = self.parse_type_params()?;
        self.expect(TokenKind::LParen, "`(`")?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            // Parameter types may optionally be named (`name: T`); the name
            // is not retained on `TypeExpr::Func`, only its type matters.
            if self.at(TokenKind::Identifier) {
                let saved = self.current.clone();
                let (_, _) = self.expect_identifier()?;
                if self.eat(TokenKind::Colon)? {
                    params.push(self.parse_type()?);
                } else {
                    params.push(TypeExpr::Named(saved.text, saved.span));
                }
            } else {
                params.push(self.parse_type()?);
            }
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::Arrow, "`=>`")?;
        let ret = self.parse_type()?;
        Ok(TypeExpr::Func(FuncTypeExpr {
            type_params,
            params,
            ret: Box::new(ret),
            span: self.span_from(start),
        }))
    }

    fn parse_object_type(&mut self) -> ParseResult<TypeExpr> {
        let start = self.current.span;
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut props = Vec::new();
        let mut index_signature = None;
        while !self.at(TokenKind::RBrace) {
            let pstart = self.current.span;
            if self.at(TokenKind::LBracket) {
                self.bump()?;
                let _ = self.expect_identifier()?;
                self.expect(TokenKind::Colon, "`:`")?;
                self.parse_type()?; // index key type, always `string` in practice
                self.expect(TokenKind::RBracket, "`]`")?;
                self.expect(TokenKind::Colon, "`:`")?;
                index_signature = Some(Box::new(self.parse_type()?));
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
                continue;
            }
            let name = if self.at(TokenKind::StringLiteral) {
                self.bump()?.text
            } else {
                self.expect_identifier()?.0
            };
            let optional = self.eat(TokenKind::Question)?;
            self.expect(TokenKind::Colon, "`:`")?;
            let type_annotation = self.parse_type()?;
            props.push(ObjectTypeProp {
                name,
                type_annotation,
                optional,
                span: self.span_from(pstart),
            });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(TypeExpr::Object(ObjectTypeExpr {
            props,
            index_signature,
            span: self.span_from(start),
        }))
    }

    // -----------------------------------------------------------------
    // Patterns
    // -----------------------------------------------------------------

    fn parse_pattern(&mut self) -> ParseResult<Pattern> {
        let start = self.current.span;
        match self.current.kind {
            TokenKind::LBracket => {
                self.bump()?;
                let mut elements = Vec::new();
                while !self.at(TokenKind::RBracket) {
                    elements.push(self.parse_pattern()?);
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "`]`")?;
                Ok(Pattern::Array {
                    elements,
                    span: self.span_from(start),
                })
            }
            TokenKind::LBrace => {
                self.bump()?;
                let mut props = Vec::new();
                while !self.at(TokenKind::RBrace) {
                    let pstart = self.current.span;
                    let (key, _) = self.expect_identifier()?;
                    let binding = if self.eat(TokenKind::Colon)? {
                        self.expect_identifier()?.0
                    } else {
                        key.clone()
                    };
                    props.push(ObjectPatternProp {
                        key,
                        binding,
                        span: self.span_from(pstart),
                    });
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "`}`")?;
                Ok(Pattern::Object {
                    props,
                    span: self.span_from(start),
                })
            }
            _ => {
                let (name, _) = self.expect_identifier()?;
                let type_annotation = if self.eat(TokenKind::Colon)? {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                Ok(Pattern::Identifier {
                    name,
                    type_annotation,
                    span: self.span_from(start),
                })
            }
        }
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.current.span;
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut statements = Vec::new();
        while !self.at(TokenKind::RBrace) {
            statements.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(Block {
            statements,
            span: self.span_from(start),
        })
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.current.span;
        match self.current.kind {
            TokenKind::Const => {
                self.bump()?;
                let (name, _) = self.expect_identifier()?;
                let type_annotation = if self.eat(TokenKind::Colon)? {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                self.expect(TokenKind::Eq, "`=`")?;
                let init = self.parse_expr()?;
                Ok(Stmt::Const(LocalConstStmt {
                    name,
                    type_annotation,
                    init,
                    span: self.span_from(start),
                }))
            }
            TokenKind::If => self.parse_if_stmt(start),
            TokenKind::For => self.parse_for_stmt(start),
            TokenKind::Return => {
                self.bump()?;
                let value = if self.stmt_ends_here() {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                Ok(Stmt::Return(ReturnStmt {
                    value,
                    span: self.span_from(start),
                }))
            }
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            _ => {
                let expr = self.parse_expr()?;
                Ok(Stmt::Expr(ExprStmt {
                    span: self.span_from(start),
                    expr,
                }))
            }
        }
    }

    /// A statement such as a bare `return` ends when the next token starts a
    /// new statement on a fresh line, or we hit a block/program terminator.
    fn stmt_ends_here(&self) -> bool {
        self.current.had_newline_before
            || matches!(self.current.kind, TokenKind::RBrace | TokenKind::Eof)
    }

    fn parse_if_stmt(&mut self, start: Span) -> ParseResult<Stmt> {
        self.expect(TokenKind::If, "`if`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.eat(TokenKind::Else)? {
            if self.at(TokenKind::If) {
                let estart = self.current.span;
                Some(Box::new(self.parse_if_stmt(estart)?))
            } else {
                Some(Box::new(Stmt::Block(self.parse_block()?)))
            }
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            cond,
            then_branch,
            else_branch,
            span: self.span_from(start),
        }))
    }

    fn parse_for_stmt(&mut self, start: Span) -> ParseResult<Stmt> {
        self.expect(TokenKind::For, "`for`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        self.expect(TokenKind::Const, "`const`")?;
        let pattern = self.parse_pattern()?;
        self.expect(TokenKind::Of, "`of`")?;
        let iterable = self.parse_expr()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let body = self.parse_block()?;
        Ok(Stmt::For(ForStmt {
            pattern,
            iterable,
            body,
            span: self.span_from(start),
        }))
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_binary_expr(0)
    }

    fn binary_op_for(kind: TokenKind) -> Option<(BinaryOp, u8)> {
        Some(match kind {
            TokenKind::Pipe => (BinaryOp::Or, 1),
            TokenKind::Amp => (BinaryOp::And, 2),
            TokenKind::EqEq => (BinaryOp::Eq, 3),
            TokenKind::NotEq => (BinaryOp::NotEq, 3),
            TokenKind::Lt => (BinaryOp::Lt, 4),
            TokenKind::Le => (BinaryOp::Le, 4),
            TokenKind::Gt => (BinaryOp::Gt, 4),
            TokenKind::Ge => (BinaryOp::Ge, 4),
            TokenKind::Plus => (BinaryOp::Add, 5),
            TokenKind::Minus => (BinaryOp::Sub, 5),
            TokenKind::Star => (BinaryOp::Mul, 6),
            TokenKind::Slash => (BinaryOp::Div, 6),
            TokenKind::Percent => (BinaryOp::Mod, 6),
            _ => return None,
        })
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let start = self.current.span;
        let mut left = self.parse_as_expr()?;
        loop {
            let Some((op, prec)) = Self::binary_op_for(self.current.kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.bump()?;
            let right = self.parse_binary_expr(prec + 1)?;
            left = Expr {
                span: self.span_from(start),
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    fn parse_as_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current.span;
        let expr = self.parse_unary_expr()?;
        if self.eat(TokenKind::As)? {
            let type_annotation = self.parse_type()?;
            return Ok(Expr {
                span: self.span_from(start),
                kind: ExprKind::As {
                    expr: Box::new(expr),
                    type_annotation: Box::new(type_annotation),
                },
            });
        }
        Ok(expr)
    }

    fn parse_unary_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current.span;
        let op = match self.current.kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let operand = self.parse_unary_expr()?;
            return Ok(Expr {
                span: self.span_from(start),
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
            });
        }
        self.parse_postfix_expr()
    }

    fn parse_postfix_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current.span;
        let mut expr = self.parse_primary_expr()?;
        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.bump()?;
                    let (name, _) = self.expect_identifier()?;
                    if self.at(TokenKind::LParen) || self.at(TokenKind::Lt) {
                        let type_args = self.maybe_parse_call_type_args()?;
                        if self.at(TokenKind::LParen) {
                            let args = self.parse_call_args()?;
                            expr = Expr {
                                span: self.span_from(start),
                                kind: ExprKind::MethodCall {
                                    receiver: Box::new(expr),
                                    method: name,
                                    type_args,
                                    args,
                                },
                            };
                            continue;
                        }
                    }
                    expr = Expr {
                        span: self.span_from(start),
                        kind: ExprKind::Member {
                            object: Box::new(expr),
                            property: name,
                            optional: false,
                        },
                    };
                }
                TokenKind::QuestionDot => {
                    self.bump()?;
                    let (name, _) = self.expect_identifier()?;
                    expr = Expr {
                        span: self.span_from(start),
                        kind: ExprKind::Member {
                            object: Box::new(expr),
                            property: name,
                            optional: true,
                        },
                    };
                }
                // A newline before `[` or `(` is never a continuation of the
                // expression above it (spec §4.1: those tokens start a new
                // grouped-expression or array literal instead) — break the
                // postfix chain and let the caller start a fresh statement.
                TokenKind::LBracket if !self.current.had_newline_before => {
                    self.bump()?;
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "`]`")?;
                    expr = Expr {
                        span: self.span_from(start),
                        kind: ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                            optional: false,
                        },
                    };
                }
                TokenKind::LParen if !self.current.had_newline_before => {
                    let args = self.parse_call_args()?;
                    expr = Expr {
                        span: self.span_from(start),
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            type_args: Vec::new(),
                            args,
                        },
                    };
                }
                TokenKind::Question => {
                    self.bump()?;
                    expr = Expr {
                        span: self.span_from(start),
                        kind: ExprKind::Try(Box::new(expr)),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Attempts `<T, U>` type-argument lookahead before a call; rolls back
    /// (by simply not consuming) if what follows isn't a call, since TunaScript
    /// always requires type arguments to be immediately followed by `(`.
    fn maybe_parse_call_type_args(&mut self) -> ParseResult<Vec<TypeExpr>> {
        if !self.at(TokenKind::Lt) {
            return Ok(Vec::new());
        }
        self.bump()?;
        let mut args = Vec::new();
        while !self.at(TokenKind::Gt) {
            args.push(self.parse_type()?);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::Gt, "`>`")?;
        Ok(args)
    }

    fn parse_call_args(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(args)
    }

    fn parse_primary_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current.span;
        match self.current.kind {
            TokenKind::IntegerLiteral => {
                let tok = self.bump()?;
                let value = tunascript_common::numeric::parse_integer_literal_value(&tok.text)
                    .ok_or_else(|| ParseError {
                        span: tok.span,
                        message: format!("invalid integer literal `{}`", tok.text),
                    })?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::IntegerLiteral(value),
                })
            }
            TokenKind::FloatLiteral => {
                let tok = self.bump()?;
                let value = tunascript_common::numeric::parse_numeric_literal_value(&tok.text)
                    .ok_or_else(|| ParseError {
                        span: tok.span,
                        message: format!("invalid float literal `{}`", tok.text),
                    })?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::FloatLiteral(value),
                })
            }
            TokenKind::StringLiteral => {
                let tok = self.bump()?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::StringLiteral(tok.text),
                })
            }
            TokenKind::TemplateFull => {
                let tok = self.bump()?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::TemplateLiteral(vec![TemplatePart::Literal(tok.text)]),
                })
            }
            TokenKind::TemplateHead => self.parse_template_literal(start),
            TokenKind::True => {
                self.bump()?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::BoolLiteral(true),
                })
            }
            TokenKind::False => {
                self.bump()?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::BoolLiteral(false),
                })
            }
            TokenKind::Null => {
                self.bump()?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::NullLiteral,
                })
            }
            TokenKind::Undefined => {
                self.bump()?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::UndefinedLiteral,
                })
            }
            TokenKind::Identifier => {
                let (name, _) = self.expect_identifier()?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Identifier(name),
                })
            }
            TokenKind::LParen => {
                self.bump()?;
                // Lookahead-free disambiguation between a parenthesized
                // expression and a function literal's parameter list: a
                // function literal is only introduced by the `function`
                // keyword or by a bare `(...) => ...` arrow form, which we
                // detect by trying to parse params and checking for `=>`.
                if self.at(TokenKind::RParen) {
                    self.bump()?; // `()`
                    self.expect(TokenKind::Arrow, "`=>`")?;
                    let body = self.parse_arrow_body()?;
                    return Ok(Expr {
                        span: self.span_from(start),
                        kind: ExprKind::FunctionLiteral {
                            type_params: Vec::new(),
                            params: Vec::new(),
                            ret: None,
                            body,
                        },
                    });
                }
                let inner = self.parse_expr()?;
                if self.at(TokenKind::Colon) || self.peek_is_arrow_after_paren() {
                    return self.parse_arrow_from_single_param(start, inner);
                }
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Paren(Box::new(inner)),
                })
            }
            TokenKind::Function => self.parse_function_literal(start),
            TokenKind::If => self.parse_if_expr(start),
            TokenKind::Switch => self.parse_switch_expr(start),
            TokenKind::LBrace => self.parse_brace_expr(start),
            TokenKind::LBracket => self.parse_array_literal(start),
            TokenKind::Lt => self.parse_jsx(start),
            TokenKind::Execute
            | TokenKind::FetchOne
            | TokenKind::FetchOptional
            | TokenKind::Fetch
            | TokenKind::FetchAll => self.parse_sql_block(start),
            _ => Err(self.error(format!(
                "expected an expression, found `{}`",
                self.current.text
            ))),
        }
    }

    /// A single identifier inside `(...)` followed by `:` means this is an
    /// arrow function parameter list, not a parenthesized expression; this
    /// helper re-parses the already-consumed identifier as such.
    fn parse_arrow_from_single_param(&mut self, start: Span, first: Expr) -> ParseResult<Expr> {
        let ExprKind::Identifier(name) = first.kind else {
            return Err(self.error("expected a parameter name before `:`"));
        };
        let type_annotation = if self.eat(TokenKind::Colon)? {
            Some(self.parse_type()?)
        } else {
            None
        };
        let mut params = vec![Param {
            name,
            type_annotation,
            span: first.span,
        }];
        while self.eat(TokenKind::Comma)? {
            let pstart = self.current.span;
            let (name, _) = self.expect_identifier()?;
            let type_annotation = if self.eat(TokenKind::Colon)? {
                Some(self.parse_type()?)
            } else {
                None
            };
            params.push(Param {
                name,
                type_annotation,
                span: self.span_from(pstart),
            });
        }
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::Arrow, "`=>`")?;
        let body = self.parse_arrow_body()?;
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::FunctionLiteral {
                type_params: Vec::new(),
                params,
                ret: None,
                body,
            },
        })
    }

    fn peek_is_arrow_after_paren(&mut self) -> bool {
        // Conservative: only used after a bare identifier has been parsed as
        // `inner`, and RParen hasn't been consumed yet. If the next token
        // (after the still-pending RParen) is `=>`, this is an arrow.
        self.at(TokenKind::RParen)
            && self
                .peek2()
                .map(|t| t.kind == TokenKind::Arrow)
                .unwrap_or(false)
    }

    fn parse_arrow_body(&mut self) -> ParseResult<FunctionLiteralBody> {
        if self.at(TokenKind::LBrace) {
            Ok(FunctionLiteralBody::Block(self.parse_block()?))
        } else {
            Ok(FunctionLiteralBody::Expr(Box::new(self.parse_expr()?)))
        }
    }

    fn parse_function_literal(&mut self, start: Span) -> ParseResult<Expr> {
        self.expect(TokenKind::Function, "`function`")?;
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        let ret = if self.eat(TokenKind::Colon)? {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = FunctionLiteralBody::Block(self.parse_block()?);
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::FunctionLiteral {
                type_params,
                params,
                ret,
                body,
            },
        })
    }

    fn parse_if_expr(&mut self, start: Span) -> ParseResult<Expr> {
        self.expect(TokenKind::If, "`if`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let then_branch = self.parse_block_expr(self.current.span)?;
        let else_branch = if self.eat(TokenKind::Else)? {
            if self.at(TokenKind::If) {
                let estart = self.current.span;
                Some(Box::new(self.parse_if_expr(estart)?))
            } else {
                Some(Box::new(self.parse_block_expr(self.current.span)?))
            }
        } else {
            None
        };
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: else_branch.map(Box::new).map(|b| *b),
            },
        })
    }

    fn parse_block_expr(&mut self, start: Span) -> ParseResult<Expr> {
        let block = self.parse_block()?;
        // A block expression's value is its last statement if that
        // statement is a bare expression statement; otherwise the block has
        // no value (typed `void`/`undefined` by the checker).
        let value = match block.statements.last() {
            Some(Stmt::Expr(e)) => e.expr.clone(),
            _ => Expr {
                span: block.span,
                kind: ExprKind::UndefinedLiteral,
            },
        };
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Block(Box::new(block), Box::new(value)),
        })
    }

    fn parse_switch_expr(&mut self, start: Span) -> ParseResult<Expr> {
        self.expect(TokenKind::Switch, "`switch`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let scrutinee = self.parse_expr()?;
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut cases = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let cstart = self.current.span;
            let pattern = if self.eat(TokenKind::Default)? {
                None
            } else {
                self.expect(TokenKind::Case, "`case`")?;
                let pat = self.parse_pattern()?;
                let narrow_type = if self.eat(TokenKind::As)? {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                Some(CasePattern {
                    span: self.span_from(cstart),
                    pattern: pat,
                    narrow_type,
                })
            };
            self.expect(TokenKind::Colon, "`:`")?;
            let body = if self.eat(TokenKind::Return)? {
                let value = if self.stmt_ends_here() {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                SwitchCaseBody::Return(value)
            } else {
                SwitchCaseBody::Value(self.parse_expr()?)
            };
            cases.push(SwitchCase {
                pattern,
                body,
                span: self.span_from(cstart),
            });
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Switch {
                scrutinee: Box::new(scrutinee),
                cases,
            },
        })
    }

    fn parse_template_literal(&mut self, start: Span) -> ParseResult<Expr> {
        let head = self.bump()?;
        let mut parts = vec![TemplatePart::Literal(head.text)];
        loop {
            let expr = self.parse_expr()?;
            parts.push(TemplatePart::Expr(expr));
            if !self.lexer.at_template_hole_close() {
                return Err(self.error("unterminated template interpolation"));
            }
            // Consume the `}` that closes the hole, then resume scanning
            // literal text from the lexer's raw position.
            self.expect(TokenKind::RBrace, "`}`")?;
            let tail = self.lexer.rescan_template_continuation().map_err(|e| lex_err(&e, &self.lexer))?;
            let is_tail = tail.kind == TokenKind::TemplateTail;
            parts.push(TemplatePart::Literal(tail.text));
            // Refill `current`/`peeked` since we bypassed the normal scan
            // path for this one token.
            self.current = if let Some(p) = self.peeked.take() {
                p
            } else {
                self.lexer.scan().map_err(|e| lex_err(&e, &self.lexer))?
            };
            if is_tail {
                break;
            }
        }
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::TemplateLiteral(parts),
        })
    }

    fn parse_array_literal(&mut self, start: Span) -> ParseResult<Expr> {
        self.expect(TokenKind::LBracket, "`[`")?;
        let mut items = Vec::new();
        while !self.at(TokenKind::RBracket) {
            if self.eat(TokenKind::DotDotDot)? {
                items.push(ArrayLiteralItem::Spread(self.parse_expr()?));
            } else {
                items.push(ArrayLiteralItem::Element(self.parse_expr()?));
            }
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "`]`")?;
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Array(ArrayLiteral {
                items,
                span: self.span_from(start),
            }),
        })
    }

    /// `{` at expression-start position is ambiguous between an object
    /// literal and a block expression; disambiguate with one token of
    /// lookahead past the brace (an identifier/string key immediately
    /// followed by `:`, `,`, or `}`, or a leading `...` spread, reads as an
    /// object).
    fn parse_brace_expr(&mut self, start: Span) -> ParseResult<Expr> {
        self.expect(TokenKind::LBrace, "`{`")?;
        if self.at(TokenKind::RBrace) {
            self.bump()?;
            return Ok(Expr {
                span: self.span_from(start),
                kind: ExprKind::Object(ObjectLiteral {
                    items: Vec::new(),
                    span: self.span_from(start),
                }),
            });
        }
        let looks_like_object = self.at(TokenKind::DotDotDot)
            || ((self.at(TokenKind::Identifier) || self.at(TokenKind::StringLiteral))
                && matches!(
                    self.peek2()?.kind,
                    TokenKind::Colon | TokenKind::Comma | TokenKind::RBrace
                ));
        if looks_like_object {
            self.parse_object_literal_body(start)
        } else {
            self.parse_block_expr_body(start)
        }
    }

    fn parse_block_expr_body(&mut self, start: Span) -> ParseResult<Expr> {
        let mut statements = Vec::new();
        while !self.at(TokenKind::RBrace) {
            statements.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        let block = Block {
            statements,
            span: self.span_from(start),
        };
        let value = match block.statements.last() {
            Some(Stmt::Expr(e)) => e.expr.clone(),
            _ => Expr {
                span: block.span,
                kind: ExprKind::UndefinedLiteral,
            },
        };
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Block(Box::new(block), Box::new(value)),
        })
    }

    fn parse_object_literal_body(&mut self, start: Span) -> ParseResult<Expr> {
        let mut items = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.eat(TokenKind::DotDotDot)? {
                items.push(ObjectLiteralItem::Spread(self.parse_expr()?));
            } else {
                let pstart = self.current.span;
                let key = if self.at(TokenKind::StringLiteral) {
                    self.bump()?.text
                } else {
                    self.expect_identifier()?.0
                };
                let value = if self.eat(TokenKind::Colon)? {
                    self.parse_expr()?
                } else {
                    Expr {
                        span: self.span_from(pstart),
                        kind: ExprKind::Identifier(key.clone()),
                    }
                };
                items.push(ObjectLiteralItem::Prop(ObjectProp {
                    key,
                    value,
                    span: self.span_from(pstart),
                }));
            }
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Object(ObjectLiteral {
                items,
                span: self.span_from(start),
            }),
        })
    }

    #[allow(dead_code)]
    fn parse_object_literal(&mut self, start: Span) -> ParseResult<Expr> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut items = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.eat(TokenKind::DotDotDot)? {
                items.push(ObjectLiteralItem::Spread(self.parse_expr()?));
            } else {
                let pstart = self.current.span;
                let key = if self.at(TokenKind::StringLiteral) {
                    self.bump()?.text
                } else {
                    self.expect_identifier()?.0
                };
                let value = if self.eat(TokenKind::Colon)? {
                    self.parse_expr()?
                } else {
                    // Shorthand `{ key }`.
                    Expr {
                        span: self.span_from(pstart),
                        kind: ExprKind::Identifier(key.clone()),
                    }
                };
                items.push(ObjectLiteralItem::Prop(ObjectProp {
                    key,
                    value,
                    span: self.span_from(pstart),
                }));
            }
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Object(ObjectLiteral {
                items,
                span: self.span_from(start),
            }),
        })
    }

    // -----------------------------------------------------------------
    // JSX
    // -----------------------------------------------------------------

    fn parse_jsx(&mut self, start: Span) -> ParseResult<Expr> {
        let node = self.parse_jsx_node()?;
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Jsx(node),
        })
    }

    fn parse_jsx_node(&mut self) -> ParseResult<JsxNode> {
        let start = self.current.span;
        self.expect(TokenKind::Lt, "`<`")?;
        if self.eat(TokenKind::Gt)? {
            let children = self.parse_jsx_children()?;
            self.expect(TokenKind::Lt, "`<`")?;
            self.expect(TokenKind::Slash, "`/`")?;
            self.expect(TokenKind::Gt, "`>`")?;
            return Ok(JsxNode::Fragment(JsxFragment {
                children,
                span: self.span_from(start),
            }));
        }

        let (tag, _) = self.expect_identifier()?;
        let is_component = tag.chars().next().is_some_and(|c| c.is_ascii_uppercase());
        let mut attributes = Vec::new();
        let mut spread_attributes = Vec::new();
        while !self.at(TokenKind::Gt) && !self.at(TokenKind::Slash) {
            if self.eat(TokenKind::DotDotDot)? {
                spread_attributes.push(self.parse_expr()?);
                continue;
            }
            let astart = self.current.span;
            let (name, _) = self.expect_identifier()?;
            let value = if self.eat(TokenKind::Eq)? {
                if self.at(TokenKind::LBrace) {
                    self.bump()?;
                    let e = self.parse_expr()?;
                    self.expect(TokenKind::RBrace, "`}`")?;
                    Some(e)
                } else {
                    let tok = self.expect(TokenKind::StringLiteral, "an attribute value")?;
                    Some(Expr {
                        span: tok.span,
                        kind: ExprKind::StringLiteral(tok.text),
                    })
                }
            } else {
                None
            };
            attributes.push(JsxAttribute {
                name,
                value,
                span: self.span_from(astart),
            });
        }

        if self.eat(TokenKind::Slash)? {
            self.expect(TokenKind::Gt, "`>`")?;
            return Ok(JsxNode::Element(JsxElement {
                tag,
                is_component,
                attributes,
                spread_attributes,
                children: Vec::new(),
                span: self.span_from(start),
            }));
        }

        self.expect(TokenKind::Gt, "`>`")?;
        let children = self.parse_jsx_children()?;
        self.expect(TokenKind::Lt, "`<`")?;
        self.expect(TokenKind::Slash, "`/`")?;
        let (close_tag, close_span) = self.expect_identifier()?;
        if close_tag != tag {
            return Err(ParseError {
                span: close_span,
                message: format!("mismatched closing tag: expected `</{tag}>`, found `</{close_tag}>`"),
            });
        }
        self.expect(TokenKind::Gt, "`>`")?;

        Ok(JsxNode::Element(JsxElement {
            tag,
            is_component,
            attributes,
            spread_attributes,
            children,
            span: self.span_from(start),
        }))
    }

    fn parse_jsx_children(&mut self) -> ParseResult<Vec<JsxChild>> {
        let mut children = Vec::new();
        loop {
            let text = self.lexer.rescan_jsx_text();
            if !text.text.is_empty() {
                children.push(JsxChild::Text(text.text));
            }
            // Resync `current`/`peeked` after the out-of-band scan.
            self.current = self.lexer.scan().map_err(|e| lex_err(&e, &self.lexer))?;
            self.peeked = None;

            if self.at(TokenKind::Lt) {
                if self.peek2()?.kind == TokenKind::Slash {
                    break;
                }
                children.push(JsxChild::Node(Box::new(self.parse_jsx_node()?)));
            } else if self.at(TokenKind::LBrace) {
                self.bump()?;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RBrace, "`}`")?;
                children.push(JsxChild::Expr(expr));
            } else {
                break;
            }
        }
        Ok(children)
    }

    // -----------------------------------------------------------------
    // SQL
    // -----------------------------------------------------------------

    fn parse_sql_block(&mut self, start: Span) -> ParseResult<Expr> {
        let form = match self.current.kind {
            TokenKind::Execute => SqlForm::Execute,
            TokenKind::FetchOne => SqlForm::FetchOne,
            TokenKind::FetchOptional => SqlForm::FetchOptional,
            TokenKind::Fetch => SqlForm::Fetch,
            TokenKind::FetchAll => SqlForm::FetchAll,
            _ => unreachable!(),
        };
        self.bump()?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut segments = Vec::new();
        let mut text = String::new();
        loop {
            match self.lexer.peek_byte_for_sql() {
                None => return Err(self.error("unterminated SQL block")),
                Some(b'}') => {
                    self.lexer.advance_one_byte();
                    break;
                }
                Some(b'{') => {
                    self.lexer.advance_one_byte();
                    if !text.is_empty() {
                        segments.push(SqlSegment::Text(std::mem::take(&mut text)));
                    }
                    self.current = self.lexer.scan().map_err(|e| lex_err(&e, &self.lexer))?;
                    self.peeked = None;
                    let expr = self.parse_expr()?;
                    let closing = self.expect(TokenKind::RBrace, "`}`")?;
                    segments.push(SqlSegment::Param(expr));
                    self.lexer.resume_at(closing.span.end() as usize);
                    self.peeked = None;
                }
                Some(b) => {
                    text.push(b as char);
                    self.lexer.advance_one_byte();
                }
            }
        }
        if !text.is_empty() {
            segments.push(SqlSegment::Text(text));
        }
        self.current = self.lexer.scan().map_err(|e| lex_err(&e, &self.lexer))?;
        self.peeked = None;
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Sql(SqlBlock {
                form,
                segments,
                span: self.span_from(start),
            }),
        })
    }
}

fn synthesize_generic_name(base: &str, args: &[TypeExpr]) -> String {
    if args.is_empty() {
        return base.to_string();
    }
    let rendered: Vec<String> = args.iter().map(render_type_for_name).collect();
    format!("{base}<{}>", rendered.join(","))
}

fn render_type_for_name(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Named(name, _) => name.clone(),
        TypeExpr::Array(inner, _) => format!("{}[]", render_type_for_name(inner)),
        _ => "_".to_string(),
    }
}

fn lex_err(err: &LexError, lexer: &Lexer) -> ParseError {
    let pos = lexer.pos() as u32;
    ParseError {
        span: Span::new(pos, pos),
        message: err.to_string(),
    }
}
