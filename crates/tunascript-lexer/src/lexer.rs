//! The lexer.
//!
//! `Lexer::scan` produces ordinary tokens. Two constructs need contextual
//! re-lexing because they don't tokenize cleanly in isolation:
//!
//! - Template literals: after an interpolation hole's expression has been
//!   parsed, the parser calls [`Lexer::rescan_template_continuation`] to
//!   resume scanning literal text from the `}` that closed the hole.
//! - JSX children: between a JSX opening tag and the next `<` or `{`,
//!   [`Lexer::rescan_jsx_text`] consumes raw text instead of tokens.
//!
//! This mirrors the re-scan pattern familiar from TypeScript-family
//! scanners (e.g. re-lexing `/` as the start of a regex only once the
//! parser knows an expression was expected).

use crate::token::{keyword_kind, Token, TokenKind};
use tunascript_common::Span;

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// Tracks `{`/`}` nesting since the last template hole was opened, so a
    /// `}` can be told apart from one that closes an ordinary block.
    template_brace_stack: Vec<u32>,
    brace_depth: u32,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated template literal")]
    UnterminatedTemplate,
    #[error("semicolons are not permitted in TunaScript")]
    ForbiddenSemicolon,
    #[error("unexpected character")]
    UnexpectedChar,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            template_brace_stack: Vec::new(),
            brace_depth: 0,
        }
    }

    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Raw next byte, for the parser's SQL-block scanner, which reads the
    /// source directly rather than through [`Self::scan`] since SQL text
    /// isn't TunaScript syntax.
    #[must_use]
    pub fn peek_byte_for_sql(&self) -> Option<u8> {
        self.peek()
    }

    /// Advance the raw cursor by one byte (SQL-block scanner only).
    pub fn advance_one_byte(&mut self) {
        self.pos += 1;
    }

    /// Reset the raw cursor to `pos` (SQL-block scanner only), used after an
    /// embedded `{expr}` interpolation has been parsed via the normal token
    /// stream to hand control back to raw-byte scanning.
    pub fn resume_at(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.source[self.pos..].starts_with(s)
    }

    /// Skip whitespace and comments, reporting whether a newline was
    /// crossed. The parser needs this to decide whether a `(`/`[` at
    /// statement start continues the previous expression.
    fn skip_trivia(&mut self) -> bool {
        let mut saw_newline = false;
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.pos += 1;
                }
                Some(b'\n') => {
                    saw_newline = true;
                    self.pos += 1;
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.pos += 2;
                    while self.pos < self.bytes.len() && !self.starts_with("*/") {
                        if self.peek() == Some(b'\n') {
                            saw_newline = true;
                        }
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.bytes.len());
                }
                _ => break,
            }
        }
        saw_newline
    }

    fn is_ident_start(b: u8) -> bool {
        b.is_ascii_alphabetic() || b == b'_' || b == b'$'
    }

    fn is_ident_continue(b: u8) -> bool {
        b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
    }

    /// Scan the next ordinary token.
    pub fn scan(&mut self) -> Result<Token, LexError> {
        let had_newline_before = self.skip_trivia();
        let start = self.pos;

        let Some(b) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(start as u32, start as u32),
                text: String::new(),
                had_newline_before,
            });
        };

        if Self::is_ident_start(b) {
            return Ok(self.scan_identifier_or_keyword(start, had_newline_before));
        }

        if b.is_ascii_digit() {
            return self.scan_number(start, had_newline_before);
        }

        match b {
            b'"' | b'\'' => self.scan_string(start, had_newline_before, b),
            b'`' => self.scan_template_head(start, had_newline_before),
            b';' => Err(LexError::ForbiddenSemicolon),
            _ => self.scan_punctuation(start, had_newline_before),
        }
    }

    fn scan_identifier_or_keyword(&mut self, start: usize, had_newline_before: bool) -> Token {
        while let Some(b) = self.peek() {
            if Self::is_ident_continue(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.source[start..self.pos].to_string();
        let kind = keyword_kind(&text).unwrap_or(TokenKind::Identifier);
        Token {
            kind,
            span: Span::new(start as u32, self.pos as u32),
            text,
            had_newline_before,
        }
    }

    fn scan_number(&mut self, start: usize, had_newline_before: bool) -> Result<Token, LexError> {
        if self.peek() == Some(b'0')
            && matches!(
                self.peek_at(1),
                Some(b'x') | Some(b'X') | Some(b'b') | Some(b'B') | Some(b'o') | Some(b'O')
            )
        {
            self.pos += 2;
            while let Some(b) = self.peek() {
                if b.is_ascii_alphanumeric() || b == b'_' {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            let text = self.source[start..self.pos].to_string();
            return Ok(Token {
                kind: TokenKind::IntegerLiteral,
                span: Span::new(start as u32, self.pos as u32),
                text,
                had_newline_before,
            });
        }

        let mut is_float = false;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'_') {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b) if b.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'_') {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                is_float = true;
                while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }

        let text = self.source[start..self.pos].to_string();
        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntegerLiteral
        };
        Ok(Token {
            kind,
            span: Span::new(start as u32, self.pos as u32),
            text,
            had_newline_before,
        })
    }

    fn scan_string(
        &mut self,
        start: usize,
        had_newline_before: bool,
        quote: u8,
    ) -> Result<Token, LexError> {
        self.pos += 1; // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => return Err(LexError::UnterminatedString),
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    value.push(self.scan_escape());
                }
                _ => {
                    let ch_start = self.pos;
                    let ch = self.source[ch_start..].chars().next().unwrap();
                    self.pos += ch.len_utf8();
                    value.push(ch);
                }
            }
        }
        Ok(Token {
            kind: TokenKind::StringLiteral,
            span: Span::new(start as u32, self.pos as u32),
            text: value,
            had_newline_before,
        })
    }

    fn scan_escape(&mut self) -> char {
        match self.bump() {
            Some(b'n') => '\n',
            Some(b't') => '\t',
            Some(b'r') => '\r',
            Some(b'0') => '\0',
            Some(b'\\') => '\\',
            Some(b'`') => '`',
            Some(b'$') => '$',
            Some(b) if b == b'"' || b == b'\'' => b as char,
            Some(other) => other as char,
            None => '\\',
        }
    }

    /// Scan the opening of a template literal (after the leading backtick).
    /// Returns `TemplateFull` if it closes without a `${`, or `TemplateHead`
    /// if an interpolation hole follows.
    fn scan_template_head(&mut self, start: usize, had_newline_before: bool) -> Result<Token, LexError> {
        self.pos += 1; // consume `
        self.scan_template_chunk(start, had_newline_before, TokenKind::TemplateFull, TokenKind::TemplateHead)
    }

    /// Resume scanning a template literal's text from the `}` that closed an
    /// interpolation hole. The caller must have already consumed that `}`.
    pub fn rescan_template_continuation(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        self.scan_template_chunk(
            start,
            false,
            TokenKind::TemplateTail,
            TokenKind::TemplateMiddle,
        )
    }

    fn scan_template_chunk(
        &mut self,
        start: usize,
        had_newline_before: bool,
        end_kind: TokenKind,
        hole_kind: TokenKind,
    ) -> Result<Token, LexError> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::UnterminatedTemplate),
                Some(b'`') => {
                    self.pos += 1;
                    return Ok(Token {
                        kind: end_kind,
                        span: Span::new(start as u32, self.pos as u32),
                        text: value,
                        had_newline_before,
                    });
                }
                Some(b'$') if self.peek_at(1) == Some(b'{') => {
                    self.pos += 2;
                    self.template_brace_stack.push(self.brace_depth);
                    self.brace_depth = 0;
                    return Ok(Token {
                        kind: hole_kind,
                        span: Span::new(start as u32, self.pos as u32),
                        text: value,
                        had_newline_before,
                    });
                }
                Some(b'\\') => {
                    self.pos += 1;
                    value.push(self.scan_escape());
                }
                _ => {
                    let ch_start = self.pos;
                    let ch = self.source[ch_start..].chars().next().unwrap();
                    self.pos += ch.len_utf8();
                    value.push(ch);
                }
            }
        }
    }

    /// Is the upcoming `}` the one that closes the current interpolation
    /// hole (as opposed to a nested block inside it)? The parser checks this
    /// before deciding to call [`Self::rescan_template_continuation`].
    #[must_use]
    pub fn at_template_hole_close(&self) -> bool {
        self.brace_depth == 0 && !self.template_brace_stack.is_empty()
    }

    /// Scan raw JSX text up to the next `<` or `{`.
    pub fn rescan_jsx_text(&mut self) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'<' || b == b'{' {
                break;
            }
            self.pos += 1;
        }
        let text = self.source[start..self.pos].to_string();
        Token {
            kind: TokenKind::JsxText,
            span: Span::new(start as u32, self.pos as u32),
            text,
            had_newline_before: false,
        }
    }

    fn scan_punctuation(&mut self, start: usize, had_newline_before: bool) -> Result<Token, LexError> {
        macro_rules! tok {
            ($kind:expr, $len:expr) => {{
                self.pos += $len;
                return Ok(Token {
                    kind: $kind,
                    span: Span::new(start as u32, self.pos as u32),
                    text: self.source[start..self.pos].to_string(),
                    had_newline_before,
                });
            }};
        }

        if self.starts_with("...") {
            tok!(TokenKind::DotDotDot, 3);
        }
        if self.starts_with("=>") {
            tok!(TokenKind::Arrow, 2);
        }
        if self.starts_with("==") {
            tok!(TokenKind::EqEq, 2);
        }
        if self.starts_with("!=") {
            tok!(TokenKind::NotEq, 2);
        }
        if self.starts_with("<=") {
            tok!(TokenKind::Le, 2);
        }
        if self.starts_with(">=") {
            tok!(TokenKind::Ge, 2);
        }
        if self.starts_with("?.") {
            tok!(TokenKind::QuestionDot, 2);
        }

        let b = self.peek().ok_or(LexError::UnexpectedChar)?;
        match b {
            b'(' => tok!(TokenKind::LParen, 1),
            b')' => tok!(TokenKind::RParen, 1),
            b'{' => {
                self.brace_depth += 1;
                tok!(TokenKind::LBrace, 1)
            }
            b'}' => {
                if self.brace_depth == 0 {
                    if let Some(saved) = self.template_brace_stack.pop() {
                        self.brace_depth = saved;
                    }
                } else {
                    self.brace_depth -= 1;
                }
                tok!(TokenKind::RBrace, 1)
            }
            b'[' => tok!(TokenKind::LBracket, 1),
            b']' => tok!(TokenKind::RBracket, 1),
            b',' => tok!(TokenKind::Comma, 1),
            b':' => tok!(TokenKind::Colon, 1),
            b'.' => tok!(TokenKind::Dot, 1),
            b'?' => tok!(TokenKind::Question, 1),
            b'+' => tok!(TokenKind::Plus, 1),
            b'-' => tok!(TokenKind::Minus, 1),
            b'*' => tok!(TokenKind::Star, 1),
            b'/' => tok!(TokenKind::Slash, 1),
            b'%' => tok!(TokenKind::Percent, 1),
            b'&' => tok!(TokenKind::Amp, 1),
            b'|' => tok!(TokenKind::Pipe, 1),
            b'<' => tok!(TokenKind::Lt, 1),
            b'>' => tok!(TokenKind::Gt, 1),
            b'=' => tok!(TokenKind::Eq, 1),
            b'!' => tok!(TokenKind::Bang, 1),
            _ => Err(LexError::UnexpectedChar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.scan().expect("lex error");
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn lexes_a_const_declaration() {
        let kinds = kinds("const a: integer = 40 + 2");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Const,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Eq,
                TokenKind::IntegerLiteral,
                TokenKind::Plus,
                TokenKind::IntegerLiteral,
            ]
        );
    }

    #[test]
    fn semicolons_are_rejected() {
        let mut lexer = Lexer::new("const a = 1;");
        for _ in 0..5 {
            if lexer.scan().is_err() {
                return;
            }
        }
        panic!("expected a forbidden-semicolon error");
    }

    #[test]
    fn float_literals_require_a_dot_or_exponent() {
        let mut lexer = Lexer::new("42 42.0 4e2");
        let a = lexer.scan().unwrap();
        assert_eq!(a.kind, TokenKind::IntegerLiteral);
        let b = lexer.scan().unwrap();
        assert_eq!(b.kind, TokenKind::FloatLiteral);
        let c = lexer.scan().unwrap();
        assert_eq!(c.kind, TokenKind::FloatLiteral);
    }

    #[test]
    fn newline_before_token_is_tracked() {
        let mut lexer = Lexer::new("a\n(b)");
        let a = lexer.scan().unwrap();
        assert!(!a.had_newline_before);
        let paren = lexer.scan().unwrap();
        assert!(paren.had_newline_before);
    }

    #[test]
    fn template_literal_without_interpolation_is_a_single_token() {
        let mut lexer = Lexer::new("`hello world`");
        let tok = lexer.scan().unwrap();
        assert_eq!(tok.kind, TokenKind::TemplateFull);
        assert_eq!(tok.text, "hello world");
    }

    #[test]
    fn template_literal_head_stops_at_interpolation() {
        let mut lexer = Lexer::new("`a${b}c`");
        let head = lexer.scan().unwrap();
        assert_eq!(head.kind, TokenKind::TemplateHead);
        assert_eq!(head.text, "a");
        let ident = lexer.scan().unwrap();
        assert_eq!(ident.kind, TokenKind::Identifier);
        assert!(lexer.at_template_hole_close());
        let brace = lexer.scan().unwrap();
        assert_eq!(brace.kind, TokenKind::RBrace);
        let tail = lexer.rescan_template_continuation().unwrap();
        assert_eq!(tail.kind, TokenKind::TemplateTail);
        assert_eq!(tail.text, "c");
    }

    #[test]
    fn jsx_text_stops_at_the_next_tag_or_brace() {
        let mut lexer = Lexer::new("hello <b>");
        let text = lexer.rescan_jsx_text();
        assert_eq!(text.text, "hello ");
        let lt = lexer.scan().unwrap();
        assert_eq!(lt.kind, TokenKind::Lt);
    }
}
