//! Lexical analysis (tokenization)
//!
//! The lexer converts Python source code into a stream of tokens with byte
//! spans. Indentation is turned into `Indent` / `Dedent` tokens and logical
//! line ends into `Newline`, so the parser never looks at whitespace.

mod literals;

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Column width a tab advances to, as in CPython's tokenizer
const TAB_SIZE: usize = 8;

/// Lexer state for tokenizing source code
pub struct Lexer {
    /// Characters of source code
    chars: Vec<char>,
    /// Byte offset of each char; one extra entry holds the source length
    offsets: Vec<usize>,
    /// Current position in chars
    current: usize,
    /// Start position of current token
    start: usize,
    /// Indentation widths of enclosing blocks; bottom is always 0
    indent_stack: Vec<usize>,
    /// Open brackets with the char index they were opened at
    brackets: Vec<(char, usize)>,
    /// Next token begins a physical line outside brackets
    at_line_start: bool,
    /// Char index where the current physical line began while inside brackets
    bracket_line_start: Option<usize>,
    /// Emitted tokens
    tokens: Vec<Token>,
    /// Collected diagnostics
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        let mut chars = Vec::with_capacity(source.len());
        let mut offsets = Vec::with_capacity(source.len() + 1);
        for (offset, c) in source.char_indices() {
            chars.push(c);
            offsets.push(offset);
        }
        offsets.push(source.len());

        Self {
            chars,
            offsets,
            current: 0,
            start: 0,
            indent_stack: vec![0],
            brackets: Vec::new(),
            at_line_start: true,
            bracket_line_start: None,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the source code, returning tokens and any diagnostics
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        loop {
            if self.at_line_start {
                self.at_line_start = false;
                self.handle_indentation();
            }

            self.skip_inline_whitespace();
            if self.is_at_end() {
                break;
            }

            if let Some(line_start) = self.bracket_line_start.take() {
                if self.next_word_starts_statement() {
                    // An unclosed bracket would otherwise swallow the rest of the
                    // file; give the line back to the statement parser.
                    self.brackets.clear();
                    self.push_newline(self.offsets[line_start]);
                    self.current = line_start;
                    self.at_line_start = true;
                    continue;
                }
            }

            self.start = self.current;
            let c = self.advance();
            match c {
                '#' => {
                    while !self.is_at_end() && !matches!(self.peek(), '\n' | '\r') {
                        self.advance();
                    }
                }
                '\\' if matches!(self.peek(), '\n' | '\r') => {
                    self.consume_line_break();
                }
                '\n' | '\r' => {
                    if c == '\r' && self.peek() == '\n' {
                        self.advance();
                    }
                    self.end_physical_line();
                }
                _ => self.scan_token(c),
            }
        }

        let end = self.offsets[self.chars.len()];
        if self.needs_newline() {
            self.push_newline(end);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.tokens.push(Token::new(TokenKind::Dedent, "", Span::empty(end)));
        }
        self.tokens.push(Token::new(TokenKind::Eof, "", Span::empty(end)));

        (self.tokens, self.diagnostics)
    }

    /// Scan one non-whitespace token starting with `c`
    fn scan_token(&mut self, c: char) {
        match c {
            '(' | '[' | '{' => {
                self.brackets.push((c, self.start));
                let kind = match c {
                    '(' => TokenKind::LeftParen,
                    '[' => TokenKind::LeftBracket,
                    _ => TokenKind::LeftBrace,
                };
                self.push_token(kind);
            }
            ')' | ']' | '}' => {
                self.brackets.pop();
                let kind = match c {
                    ')' => TokenKind::RightParen,
                    ']' => TokenKind::RightBracket,
                    _ => TokenKind::RightBrace,
                };
                self.push_token(kind);
            }
            ':' => {
                let kind = if self.match_char('=') {
                    TokenKind::ColonEqual
                } else {
                    TokenKind::Colon
                };
                self.push_token(kind);
            }
            ',' => self.push_token(TokenKind::Comma),
            ';' => self.push_token(TokenKind::Semicolon),
            '~' => self.push_token(TokenKind::Tilde),
            '.' => {
                if self.peek().is_ascii_digit() {
                    self.number();
                } else if self.peek() == '.' && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    self.push_token(TokenKind::Ellipsis);
                } else {
                    self.push_token(TokenKind::Dot);
                }
            }
            '-' => {
                let kind = if self.match_char('>') {
                    TokenKind::Arrow
                } else if self.match_char('=') {
                    TokenKind::MinusEqual
                } else {
                    TokenKind::Minus
                };
                self.push_token(kind);
            }
            '+' => self.operator_or_assign(TokenKind::Plus, TokenKind::PlusEqual),
            '%' => self.operator_or_assign(TokenKind::Percent, TokenKind::PercentEqual),
            '@' => self.operator_or_assign(TokenKind::At, TokenKind::AtEqual),
            '&' => self.operator_or_assign(TokenKind::Amp, TokenKind::AmpEqual),
            '|' => self.operator_or_assign(TokenKind::Pipe, TokenKind::PipeEqual),
            '^' => self.operator_or_assign(TokenKind::Caret, TokenKind::CaretEqual),
            '=' => self.operator_or_assign(TokenKind::Equal, TokenKind::EqualEqual),
            '*' => {
                if self.match_char('*') {
                    self.operator_or_assign(TokenKind::DoubleStar, TokenKind::DoubleStarEqual);
                } else {
                    self.operator_or_assign(TokenKind::Star, TokenKind::StarEqual);
                }
            }
            '/' => {
                if self.match_char('/') {
                    self.operator_or_assign(TokenKind::DoubleSlash, TokenKind::DoubleSlashEqual);
                } else {
                    self.operator_or_assign(TokenKind::Slash, TokenKind::SlashEqual);
                }
            }
            '<' => {
                if self.match_char('<') {
                    self.operator_or_assign(TokenKind::LeftShift, TokenKind::LeftShiftEqual);
                } else {
                    self.operator_or_assign(TokenKind::Less, TokenKind::LessEqual);
                }
            }
            '>' => {
                if self.match_char('>') {
                    self.operator_or_assign(TokenKind::RightShift, TokenKind::RightShiftEqual);
                } else {
                    self.operator_or_assign(TokenKind::Greater, TokenKind::GreaterEqual);
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.push_token(TokenKind::NotEqual);
                } else {
                    self.invalid_character(c);
                }
            }
            '"' | '\'' => self.string(c),
            c if c.is_ascii_digit() => self.number(),
            c if is_identifier_start(c) => self.identifier(),
            _ => self.invalid_character(c),
        }
    }

    /// Scan an identifier, keyword, or prefixed string literal
    fn identifier(&mut self) {
        while !self.is_at_end() && is_identifier_continue(self.peek()) {
            self.advance();
        }

        let lexeme = self.lexeme();
        if matches!(self.peek(), '"' | '\'') && is_string_prefix(&lexeme) {
            let quote = self.advance();
            self.string(quote);
            return;
        }

        let kind = TokenKind::keyword(&lexeme).unwrap_or(TokenKind::Name);
        self.push_token(kind);
    }

    /// Compute the indentation of a fresh physical line and emit layout tokens
    fn handle_indentation(&mut self) {
        let line_start = self.current;
        let mut width = 0;
        while !self.is_at_end() {
            match self.peek() {
                ' ' => width += 1,
                '\t' => width = (width / TAB_SIZE + 1) * TAB_SIZE,
                '\x0c' => width = 0,
                _ => break,
            }
            self.advance();
        }

        // Blank and comment-only lines never affect indentation
        if self.is_at_end() || matches!(self.peek(), '#' | '\n' | '\r') {
            return;
        }
        if self.peek() == '\\' && matches!(self.peek_next(), Some('\n') | Some('\r')) {
            return;
        }

        let top = self.current_indent();
        if width > top {
            self.indent_stack.push(width);
            let span = Span::new(self.offsets[line_start], self.offsets[self.current]);
            self.tokens.push(Token::new(TokenKind::Indent, "", span));
        } else if width < top {
            let here = Span::empty(self.offsets[self.current]);
            while self.current_indent() > width {
                self.indent_stack.pop();
                self.tokens.push(Token::new(TokenKind::Dedent, "", here));
            }
            if self.current_indent() != width {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::InconsistentDedent,
                    "unindent does not match any outer indentation level",
                    Span::new(self.offsets[line_start], self.offsets[self.current]),
                ));
            }
        }
    }

    /// A line break outside of a string or comment was consumed
    fn end_physical_line(&mut self) {
        if self.brackets.is_empty() {
            if self.needs_newline() {
                self.push_newline(self.offsets[self.start]);
            }
            self.at_line_start = true;
        } else {
            self.bracket_line_start = Some(self.current);
        }
    }

    /// Consume the line break after a `\` continuation
    fn consume_line_break(&mut self) {
        if self.advance() == '\r' && self.peek() == '\n' {
            self.advance();
        }
    }

    /// Whether the next word is a keyword that only ever starts a statement
    fn next_word_starts_statement(&self) -> bool {
        let mut end = self.current;
        while end < self.chars.len() && is_identifier_continue(self.chars[end]) {
            end += 1;
        }
        if end == self.current || !is_identifier_start(self.chars[self.current]) {
            return false;
        }
        let word: String = self.chars[self.current..end].iter().collect();
        TokenKind::keyword(&word).is_some_and(TokenKind::starts_statement_only)
    }

    /// A `Newline` is only emitted after a line that produced real tokens
    fn needs_newline(&self) -> bool {
        match self.tokens.last() {
            None => false,
            Some(token) => !matches!(
                token.kind,
                TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
            ),
        }
    }

    fn push_newline(&mut self, offset: usize) {
        let end = (offset + 1).min(self.offsets[self.chars.len()]);
        self.tokens.push(Token::new(TokenKind::Newline, "", Span::new(offset, end)));
    }

    fn current_indent(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    fn skip_inline_whitespace(&mut self) {
        while !self.is_at_end() && matches!(self.peek(), ' ' | '\t' | '\x0c') {
            self.advance();
        }
    }

    fn operator_or_assign(&mut self, plain: TokenKind, with_equal: TokenKind) {
        let kind = if self.match_char('=') { with_equal } else { plain };
        self.push_token(kind);
    }

    fn invalid_character(&mut self, c: char) {
        let span = self.current_span();
        self.diagnostics.push(Diagnostic::syntax(format!("invalid character '{}'", c), span));
    }

    // === Character navigation ===

    pub(super) fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        c
    }

    pub(super) fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    pub(super) fn peek_next(&self) -> Option<char> {
        self.chars.get(self.current + 1).copied()
    }

    pub(super) fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    pub(super) fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    pub(super) fn lexeme(&self) -> String {
        self.chars[self.start..self.current].iter().collect()
    }

    pub(super) fn current_span(&self) -> Span {
        Span::new(self.offsets[self.start], self.offsets[self.current])
    }

    pub(super) fn push_token(&mut self, kind: TokenKind) {
        let token = Token::new(kind, self.lexeme(), self.current_span());
        self.tokens.push(token);
    }

    pub(super) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_string_prefix(prefix: &str) -> bool {
    matches!(
        prefix.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

/// Convenience wrapper used by the parser and tests
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Lexer::new(source).tokenize()
}
