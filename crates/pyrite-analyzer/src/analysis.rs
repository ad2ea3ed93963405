//! Whole-document analysis
//!
//! [`analyze`] is a pure function of its inputs: the same text, version, and
//! options always produce an equal [`AnalysisSnapshot`].

use crate::ast::Module;
use crate::binder::Binder;
use crate::diagnostic::{sort_diagnostics, Diagnostic, DiagnosticCode, Severity};
use crate::lexer::Lexer;
use crate::line_index::{LineCol, LineIndex};
use crate::parser::Parser;
use crate::span::Span;
use crate::symbol::ScopeTree;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// How unresolved names are reported in modules containing `from m import *`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StarImportPolicy {
    /// Star imports may define anything; report nothing
    #[default]
    Suppress,
    Report,
}

/// Analysis policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub unresolved_severity: Severity,
    pub star_imports: StarImportPolicy,
    /// Names treated as builtins in addition to the standard set
    pub extra_builtins: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            unresolved_severity: Severity::Hint,
            star_imports: StarImportPolicy::Suppress,
            extra_builtins: Vec::new(),
        }
    }
}

/// Analysis stopped at a checkpoint because its caller gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("analysis cancelled")]
pub struct Cancelled;

/// Immutable result of analyzing one document version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSnapshot {
    pub uri: String,
    pub version: i32,
    pub text: Arc<str>,
    pub tree: Arc<Module>,
    pub scopes: ScopeTree,
    /// Sorted by position
    pub diagnostics: Vec<Diagnostic>,
    pub line_index: LineIndex,
    /// The analyzer failed; tree and scopes are empty
    pub degraded: bool,
}

impl AnalysisSnapshot {
    pub fn line_col(&self, offset: usize) -> LineCol {
        self.line_index.line_col(&self.text, offset)
    }

    pub fn offset(&self, position: LineCol) -> Option<usize> {
        self.line_index.offset(&self.text, position)
    }

    pub fn range(&self, span: Span) -> (LineCol, LineCol) {
        self.line_index.range(&self.text, span)
    }

    /// Source text of `span`, empty if it does not fall on char boundaries
    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }
}

/// Analyze one document version
pub fn analyze(uri: &str, text: &str, version: i32, options: &AnalysisOptions) -> AnalysisSnapshot {
    match analyze_with(uri, text, version, options, &|| false) {
        Ok(snapshot) => snapshot,
        // the checkpoint above never fires
        Err(Cancelled) => degraded(uri, text, version, options, "analysis cancelled".to_string()),
    }
}

/// Analyze with a cancellation checkpoint.
///
/// `is_cancelled` is polled after lexing, after parsing, and after binding.
/// A panic anywhere in the analyzer yields a degraded snapshot instead of
/// unwinding into the caller.
pub fn analyze_with(
    uri: &str,
    text: &str,
    version: i32,
    options: &AnalysisOptions,
    is_cancelled: &dyn Fn() -> bool,
) -> Result<AnalysisSnapshot, Cancelled> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        run(uri, text, version, options, is_cancelled)
    }));

    match result {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(uri, version, "analyzer panicked: {}", message);
            Ok(degraded(uri, text, version, options, message))
        }
    }
}

fn run(
    uri: &str,
    text: &str,
    version: i32,
    options: &AnalysisOptions,
    is_cancelled: &dyn Fn() -> bool,
) -> Result<AnalysisSnapshot, Cancelled> {
    let (tokens, mut diagnostics) = Lexer::new(text).tokenize();
    if is_cancelled() {
        return Err(Cancelled);
    }

    let (module, parse_diagnostics) = Parser::new(tokens).parse();
    diagnostics.extend(parse_diagnostics);
    if is_cancelled() {
        return Err(Cancelled);
    }

    let (scopes, bind_diagnostics) = Binder::new(text, options).bind(&module);
    diagnostics.extend(bind_diagnostics);
    if is_cancelled() {
        return Err(Cancelled);
    }

    sort_diagnostics(&mut diagnostics);
    debug!(
        uri,
        version,
        diagnostics = diagnostics.len(),
        symbols = scopes.symbols().count(),
        "analyzed document"
    );

    Ok(AnalysisSnapshot {
        uri: uri.to_string(),
        version,
        text: Arc::from(text),
        tree: Arc::new(module),
        scopes,
        diagnostics,
        line_index: LineIndex::new(text),
        degraded: false,
    })
}

fn degraded(
    uri: &str,
    text: &str,
    version: i32,
    options: &AnalysisOptions,
    message: String,
) -> AnalysisSnapshot {
    let module = Module {
        body: Vec::new(),
        span: Span::new(0, text.len()),
    };
    let (scopes, _) = Binder::new("", options).bind(&module);
    AnalysisSnapshot {
        uri: uri.to_string(),
        version,
        text: Arc::from(text),
        tree: Arc::new(module),
        scopes,
        diagnostics: vec![Diagnostic::warning(
            DiagnosticCode::AnalysisFailed,
            format!("analysis failed: {}", message),
            Span::empty(0),
        )],
        line_index: LineIndex::new(text),
        degraded: true,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
