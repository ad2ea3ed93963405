//! Pyrite Analyzer - Python source analysis
//!
//! This library turns Python source text into:
//! - A token stream with layout tokens (NEWLINE / INDENT / DEDENT)
//! - A syntax tree that survives malformed input
//! - A scope tree binding every identifier to its definition
//! - A sorted diagnostic list

/// Analyzer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod analysis;
pub mod ast;
pub mod binder;
pub mod builtins;
pub mod diagnostic;
pub mod lexer;
pub mod line_index;
pub mod parser;
pub mod span;
pub mod symbol;
pub mod token;

// Re-export commonly used types
pub use analysis::{
    analyze, analyze_with, AnalysisOptions, AnalysisSnapshot, Cancelled, StarImportPolicy,
};
pub use binder::Binder;
pub use diagnostic::{sort_diagnostics, Diagnostic, DiagnosticCode, Severity};
pub use lexer::Lexer;
pub use line_index::{LineCol, LineIndex};
pub use parser::Parser;
pub use span::Span;
pub use symbol::{
    ImportEdge, ImportTarget, Reference, Resolution, Scope, ScopeId, ScopeKind, ScopeTree, Symbol,
    SymbolId, SymbolKind,
};
pub use token::{Token, TokenKind};
