//! Parsing (tokens to AST)
//!
//! The parser converts a stream of tokens into an Abstract Syntax Tree (AST).
//! Uses recursive descent for statements and Pratt parsing for expressions.
//!
//! A statement that fails to parse is reported once and replaced by an
//! `Error` statement; parsing resumes at the next logical line.

mod expr;
mod stmt;

use crate::ast::*;
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::lexer;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Deepest statement/expression nesting the parser recurses into
pub const MAX_NESTING_DEPTH: usize = 100;

/// Longest chain of binary operators folded into one expression
const MAX_OPERATOR_CHAIN: usize = 1000;

/// Parser state for building AST from tokens
pub struct Parser {
    pub(super) tokens: Vec<Token>,
    pub(super) current: usize,
    pub(super) diagnostics: Vec<Diagnostic>,
    pub(super) depth: usize,
}

/// Operator precedence levels for Pratt parsing, loosest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Precedence {
    Lowest,
    Ternary,    // x if c else y
    Or,         // or
    And,        // and
    Not,        // not
    Comparison, // < > == != in is ...
    BitOr,      // |
    BitXor,     // ^
    BitAnd,     // &
    Shift,      // << >>
    Term,       // + -
    Factor,     // * / // % @
    Unary,      // -x +x ~x
    Power,      // **
}

impl Parser {
    /// Create a new parser for the given tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens = tokens;
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token::new(TokenKind::Eof, "", Span::empty(end)));
        }
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    /// Parse tokens into a module
    pub fn parse(&mut self) -> (Module, Vec<Diagnostic>) {
        let body = self.parse_block_body(true);
        let end = self.tokens.last().map(|t| t.span.end).unwrap_or(0);
        let module = Module {
            body,
            span: Span::new(0, end),
        };
        (module, std::mem::take(&mut self.diagnostics))
    }

    // === Blocks and recovery ===

    /// Parse statements until a `Dedent` (left for the caller) or end of input.
    ///
    /// At top level a stray `Dedent` is skipped instead of ending the block.
    pub(super) fn parse_block_body(&mut self, top_level: bool) -> Vec<Stmt> {
        let mut body = Vec::new();

        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Dedent if top_level => {
                    self.advance();
                    continue;
                }
                TokenKind::Dedent => break,
                TokenKind::Newline => {
                    self.advance();
                    continue;
                }
                TokenKind::Indent => {
                    body.push(self.parse_unexpected_indent());
                    continue;
                }
                _ => {}
            }

            let start = self.current;
            match self.parse_statement() {
                Ok(stmts) => body.extend(stmts),
                Err(()) => body.push(self.recover(start)),
            }
        }

        body
    }

    /// Turn the statement that began at token `start` into an `Error` node
    pub(super) fn recover(&mut self, start: usize) -> Stmt {
        self.synchronize(start);

        let mut body = Vec::new();
        if self.check(TokenKind::Indent) {
            // The block that belonged to the broken header
            self.advance();
            body = self.parse_block_body(false);
            self.match_token(TokenKind::Dedent);
        }

        let start_offset = self.tokens[start].span.start;
        Stmt::Error(ErrorStmt {
            body,
            span: Span::new(start_offset, self.prev_end().max(start_offset)),
        })
    }

    /// Skip to the start of the next logical line
    pub(super) fn synchronize(&mut self, start: usize) {
        if self.current > start
            && matches!(
                self.tokens[self.current - 1].kind,
                TokenKind::Newline | TokenKind::Dedent
            )
        {
            return;
        }

        while !matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Eof | TokenKind::Indent | TokenKind::Dedent
        ) {
            self.advance();
        }
        self.match_token(TokenKind::Newline);

        if self.current == start && !self.is_at_end() {
            self.advance();
        }
    }

    fn parse_unexpected_indent(&mut self) -> Stmt {
        let indent_span = self.advance().span;
        self.diagnostics.push(Diagnostic::error(
            DiagnosticCode::UnexpectedIndent,
            "unexpected indent",
            indent_span,
        ));

        let body = self.parse_block_body(false);
        self.match_token(TokenKind::Dedent);

        let end = self.prev_end().max(indent_span.end);
        Stmt::Error(ErrorStmt {
            body,
            span: Span::new(indent_span.start, end),
        })
    }

    /// Run `f` one nesting level deeper, failing once the limit is reached
    pub(super) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ()>,
    ) -> Result<T, ()> {
        if self.depth >= MAX_NESTING_DEPTH {
            self.error("too many nested blocks or expressions");
            return Err(());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(super) fn check_chain_length(&mut self, folds: usize) -> Result<(), ()> {
        if folds > MAX_OPERATOR_CHAIN {
            self.error("expression has too many operators");
            return Err(());
        }
        Ok(())
    }

    // === Helper methods ===

    /// Advance to next token and return reference to previous
    pub(super) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Peek at current token
    pub(super) fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    /// Peek `n` tokens ahead; clamps to the final `Eof`
    pub(super) fn peek_at(&self, n: usize) -> &Token {
        &self.tokens[(self.current + n).min(self.tokens.len() - 1)]
    }

    /// Check if current token matches kind
    pub(super) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Current token is a `Name` spelled `word` (soft keywords)
    pub(super) fn check_soft_keyword(&self, word: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Name && token.lexeme == word
    }

    /// Match and consume token if it matches
    pub(super) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume token of given kind or error
    pub(super) fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Span, ()> {
        if self.check(kind) {
            Ok(self.advance().span)
        } else {
            self.error(message);
            Err(())
        }
    }

    /// Consume a `Name` token as an identifier
    pub(super) fn consume_name(&mut self, context: &str) -> Result<Identifier, ()> {
        let token = self.peek();
        if token.kind == TokenKind::Name {
            let ident = Identifier {
                name: token.lexeme.clone(),
                span: token.span,
            };
            self.advance();
            return Ok(ident);
        }

        let message = if TokenKind::keyword(&token.lexeme).is_some() {
            format!("expected {}, found keyword '{}'", context, token.lexeme)
        } else {
            format!("expected {}, found {}", context, describe(token))
        };
        self.error(&message);
        Err(())
    }

    /// Consume the end of a logical line
    pub(super) fn expect_line_end(&mut self) -> Result<(), ()> {
        if self.match_token(TokenKind::Newline) || self.is_at_end() {
            Ok(())
        } else {
            let message = format!("expected end of statement, found {}", describe(self.peek()));
            self.error(&message);
            Err(())
        }
    }

    /// Check if at end of token stream
    pub(super) fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// End offset of the last consumed token that is not layout
    pub(super) fn prev_end(&self) -> usize {
        self.tokens[..self.current]
            .iter()
            .rev()
            .find(|t| {
                !matches!(
                    t.kind,
                    TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
                )
            })
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    /// Span from `start` to the last consumed non-layout token
    pub(super) fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end().max(start))
    }

    /// Record a syntax error at the current token
    pub(super) fn error(&mut self, message: &str) {
        let span = self.peek().span;
        self.error_at(span, message);
    }

    pub(super) fn error_at(&mut self, span: Span, message: &str) {
        self.diagnostics.push(Diagnostic::syntax(message, span));
    }
}

/// Human-readable token description for error messages
pub(super) fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Eof => "end of file".to_string(),
        TokenKind::Indent => "indent".to_string(),
        TokenKind::Dedent => "dedent".to_string(),
        _ => format!("'{}'", token.lexeme),
    }
}

/// Tokenize and parse `source`; lexer diagnostics come first
pub fn parse(source: &str) -> (Module, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = lexer::tokenize(source);
    let (module, parse_diagnostics) = Parser::new(tokens).parse();
    diagnostics.extend(parse_diagnostics);
    (module, diagnostics)
}
