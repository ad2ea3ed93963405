//! Literal scanning for the lexer

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::lexer::Lexer;
use crate::token::TokenKind;

impl Lexer {
    /// Scan a string literal whose opening `quote` was already consumed.
    ///
    /// The token lexeme keeps prefix and quotes; unescaping is left to
    /// consumers that need the value (docstrings, import paths).
    pub(super) fn string(&mut self, quote: char) {
        let triple = self.peek() == quote && self.peek_next() == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        loop {
            if self.is_at_end() {
                self.unterminated_string(triple);
                break;
            }

            let c = self.peek();
            if c == '\\' {
                self.advance();
                if !self.is_at_end() {
                    // escaped quote, backslash, or line continuation
                    if self.advance() == '\r' && self.peek() == '\n' {
                        self.advance();
                    }
                }
                continue;
            }

            if !triple && matches!(c, '\n' | '\r') {
                self.unterminated_string(false);
                break;
            }

            self.advance();
            if c == quote {
                if !triple {
                    break;
                }
                if self.peek() == quote && self.peek_next() == Some(quote) {
                    self.advance();
                    self.advance();
                    break;
                }
            }
        }

        self.push_token(TokenKind::String);
    }

    fn unterminated_string(&mut self, triple: bool) {
        let message = if triple {
            "unterminated triple-quoted string literal"
        } else {
            "unterminated string literal"
        };
        let span = self.current_span();
        self.report(Diagnostic::error(DiagnosticCode::UnterminatedString, message, span));
    }

    /// Scan a number literal; the first char (digit or `.`) was already consumed
    pub(super) fn number(&mut self) {
        let first = self.lexeme();

        if first == "0" && matches!(self.peek(), 'x' | 'X' | 'o' | 'O' | 'b' | 'B') {
            self.advance();
            while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
                self.advance();
            }
            self.push_token(TokenKind::Number);
            return;
        }

        self.digits();
        if first != "." && self.peek() == '.' {
            self.advance();
            self.digits();
        }

        if matches!(self.peek(), 'e' | 'E') {
            let sign_then_digit = matches!(self.peek_next(), Some('+') | Some('-'))
                && self
                    .chars_after(2)
                    .is_some_and(|c| c.is_ascii_digit());
            if self.peek_next().is_some_and(|c| c.is_ascii_digit()) || sign_then_digit {
                self.advance();
                if matches!(self.peek(), '+' | '-') {
                    self.advance();
                }
                self.digits();
            }
        }

        if matches!(self.peek(), 'j' | 'J') {
            self.advance();
        }

        self.push_token(TokenKind::Number);
    }

    fn digits(&mut self) {
        while self.peek().is_ascii_digit() || self.peek() == '_' {
            self.advance();
        }
    }

    fn chars_after(&self, n: usize) -> Option<char> {
        self.chars.get(self.current + n).copied()
    }
}
