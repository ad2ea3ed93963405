//! Diagnostic system for errors and warnings
//!
//! Lexer, parser, and binder all report through the same [`Diagnostic`] type so
//! a document's diagnostic set can be published as one list.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Information => write!(f, "information"),
            Severity::Hint => write!(f, "hint"),
        }
    }
}

/// Stable diagnostic codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Malformed token or statement
    SyntaxError,
    /// Indented block where none was expected
    UnexpectedIndent,
    /// Dedent to a column that matches no enclosing block
    InconsistentDedent,
    /// String literal without its closing quote
    UnterminatedString,
    /// Name used without any visible binding
    UnresolvedName,
    /// `return` outside a function body
    ReturnOutsideFunction,
    /// `yield` outside a function body
    YieldOutsideFunction,
    /// `break` outside a loop
    BreakOutsideLoop,
    /// `continue` outside a loop
    ContinueOutsideLoop,
    /// `nonlocal` at module level
    NonlocalAtModuleLevel,
    /// The same parameter name appears twice in one signature
    DuplicateParameter,
    /// The analyzer itself failed on this input
    AnalysisFailed,
}

impl DiagnosticCode {
    /// Code string sent to clients
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::SyntaxError => "syntax-error",
            DiagnosticCode::UnexpectedIndent => "unexpected-indent",
            DiagnosticCode::InconsistentDedent => "inconsistent-dedent",
            DiagnosticCode::UnterminatedString => "unterminated-string",
            DiagnosticCode::UnresolvedName => "unresolved-name",
            DiagnosticCode::ReturnOutsideFunction => "return-outside-function",
            DiagnosticCode::YieldOutsideFunction => "yield-outside-function",
            DiagnosticCode::BreakOutsideLoop => "break-outside-loop",
            DiagnosticCode::ContinueOutsideLoop => "continue-outside-loop",
            DiagnosticCode::NonlocalAtModuleLevel => "nonlocal-at-module-level",
            DiagnosticCode::DuplicateParameter => "duplicate-parameter",
            DiagnosticCode::AnalysisFailed => "analysis-failed",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagnostic message attached to a source span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Stable code
    pub code: DiagnosticCode,
    /// Main diagnostic message
    pub message: String,
    /// Byte range the diagnostic points at
    pub span: Span,
}

impl Diagnostic {
    /// Create a diagnostic with explicit severity
    pub fn new(
        severity: Severity,
        code: DiagnosticCode,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            span,
        }
    }

    /// Create an error diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Error, code, message, span)
    }

    /// Create a warning diagnostic
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Warning, code, message, span)
    }

    /// Syntax error shorthand used by the lexer and parser
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::error(DiagnosticCode::SyntaxError, message, span)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} at {}..{}",
            self.severity, self.code, self.message, self.span.start, self.span.end
        )
    }
}

/// Sort diagnostics by position, then severity, then code.
///
/// Output order must not depend on which pass produced a diagnostic.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(a.span.end.cmp(&b.span.end))
            .then(a.severity.cmp(&b.severity))
            .then(a.code.cmp(&b.code))
            .then(a.message.cmp(&b.message))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let diag = Diagnostic::error(DiagnosticCode::SyntaxError, "expected ':'", Span::new(3, 4));
        assert_eq!(diag.to_string(), "error[syntax-error]: expected ':' at 3..4");
    }

    #[test]
    fn test_sort_orders_by_position_first() {
        let mut diags = vec![
            Diagnostic::new(Severity::Hint, DiagnosticCode::UnresolvedName, "b", Span::new(10, 11)),
            Diagnostic::syntax("a", Span::new(2, 3)),
        ];
        sort_diagnostics(&mut diags);
        assert_eq!(diags[0].message, "a");
        assert_eq!(diags[1].message, "b");
    }
}
