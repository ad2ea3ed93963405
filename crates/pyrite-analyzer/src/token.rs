//! Token types for lexical analysis
//!
//! Defines all token types recognized by the Python lexer.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The source text of this token
    pub lexeme: String,
    /// Source location
    pub span: Span,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }
}

/// Classification of token types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    /// Identifier (`foo`, `_bar`, unicode names)
    Name,
    /// Number literal (`42`, `3.14`, `0xff`, `1_000`, `2j`)
    Number,
    /// String or bytes literal, including prefixes and f-strings
    String,

    // Layout
    /// End of a logical line
    Newline,
    /// Indentation increase
    Indent,
    /// Indentation decrease
    Dedent,
    /// End of input
    Eof,

    // Keywords
    False,
    None,
    True,
    And,
    As,
    Assert,
    Async,
    Await,
    Break,
    Class,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    Nonlocal,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    Try,
    While,
    With,
    Yield,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Colon,
    Comma,
    Semicolon,
    Dot,
    /// `...`
    Ellipsis,
    /// `->`
    Arrow,
    /// `@` (decorator or matrix multiplication)
    At,
    /// `=`
    Equal,
    /// `:=`
    ColonEqual,

    // Operators
    Plus,
    Minus,
    Star,
    /// `**`
    DoubleStar,
    Slash,
    /// `//`
    DoubleSlash,
    Percent,
    Tilde,
    Amp,
    Pipe,
    Caret,
    /// `<<`
    LeftShift,
    /// `>>`
    RightShift,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    EqualEqual,
    /// `!=`
    NotEqual,

    // Augmented assignment
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    DoubleSlashEqual,
    PercentEqual,
    AtEqual,
    AmpEqual,
    PipeEqual,
    CaretEqual,
    LeftShiftEqual,
    RightShiftEqual,
    DoubleStarEqual,
}

impl TokenKind {
    /// Check if a string is a hard keyword and return the corresponding token kind
    pub fn keyword(s: &str) -> Option<TokenKind> {
        let kind = match s {
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "and" => TokenKind::And,
            "as" => TokenKind::As,
            "assert" => TokenKind::Assert,
            "async" => TokenKind::Async,
            "await" => TokenKind::Await,
            "break" => TokenKind::Break,
            "class" => TokenKind::Class,
            "continue" => TokenKind::Continue,
            "def" => TokenKind::Def,
            "del" => TokenKind::Del,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "except" => TokenKind::Except,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "from" => TokenKind::From,
            "global" => TokenKind::Global,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "lambda" => TokenKind::Lambda,
            "nonlocal" => TokenKind::Nonlocal,
            "not" => TokenKind::Not,
            "or" => TokenKind::Or,
            "pass" => TokenKind::Pass,
            "raise" => TokenKind::Raise,
            "return" => TokenKind::Return,
            "try" => TokenKind::Try,
            "while" => TokenKind::While,
            "with" => TokenKind::With,
            "yield" => TokenKind::Yield,
            _ => return None,
        };
        Some(kind)
    }

    /// Every hard keyword spelling, in source order of the language reference
    pub const KEYWORDS: &'static [&'static str] = &[
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
        "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
        "try", "while", "with", "yield",
    ];

    /// Whether this token can only begin a statement, never continue an expression.
    ///
    /// The lexer uses this to stop swallowing lines when a bracket was left open.
    pub fn starts_statement_only(self) -> bool {
        matches!(
            self,
            TokenKind::Def
                | TokenKind::Class
                | TokenKind::Import
                | TokenKind::Return
                | TokenKind::Pass
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Raise
                | TokenKind::Global
                | TokenKind::Nonlocal
                | TokenKind::Del
                | TokenKind::Assert
                | TokenKind::Try
                | TokenKind::Except
                | TokenKind::Finally
                | TokenKind::While
                | TokenKind::With
                | TokenKind::Elif
        )
    }

    /// Augmented assignment operators (`+=`, `-=`, ...)
    pub fn is_augmented_assign(self) -> bool {
        matches!(
            self,
            TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::SlashEqual
                | TokenKind::DoubleSlashEqual
                | TokenKind::PercentEqual
                | TokenKind::AtEqual
                | TokenKind::AmpEqual
                | TokenKind::PipeEqual
                | TokenKind::CaretEqual
                | TokenKind::LeftShiftEqual
                | TokenKind::RightShiftEqual
                | TokenKind::DoubleStarEqual
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_spelling_maps_to_a_kind() {
        for kw in TokenKind::KEYWORDS {
            assert!(TokenKind::keyword(kw).is_some(), "{kw} should be a keyword");
        }
    }

    #[test]
    fn test_soft_keywords_are_names() {
        assert_eq!(TokenKind::keyword("match"), None);
        assert_eq!(TokenKind::keyword("case"), None);
        assert_eq!(TokenKind::keyword("type"), None);
    }
}
