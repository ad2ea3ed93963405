//! Type conversions between analyzer and LSP types

use lsp_types::{self, Position, Range, Url};
use pyrite_analyzer::{
    AnalysisSnapshot, Diagnostic, ImportTarget, LineCol, Severity, Span, SymbolKind,
};
use std::path::Path;

pub fn to_position(line_col: LineCol) -> Position {
    Position::new(line_col.line, line_col.col)
}

pub fn to_line_col(position: Position) -> LineCol {
    LineCol::new(position.line, position.character)
}

/// LSP range of a byte span in `snapshot`
pub fn span_to_range(snapshot: &AnalysisSnapshot, span: Span) -> Range {
    let (start, end) = snapshot.range(span);
    Range::new(to_position(start), to_position(end))
}

/// Byte offset of an LSP position, `None` if it lies outside the text
pub fn position_to_offset(snapshot: &AnalysisSnapshot, position: Position) -> Option<usize> {
    snapshot.offset(to_line_col(position))
}

pub fn severity_to_lsp(severity: Severity) -> lsp_types::DiagnosticSeverity {
    match severity {
        Severity::Error => lsp_types::DiagnosticSeverity::ERROR,
        Severity::Warning => lsp_types::DiagnosticSeverity::WARNING,
        Severity::Information => lsp_types::DiagnosticSeverity::INFORMATION,
        Severity::Hint => lsp_types::DiagnosticSeverity::HINT,
    }
}

/// Convert an analyzer diagnostic to an LSP diagnostic
pub fn diagnostic_to_lsp(snapshot: &AnalysisSnapshot, diag: &Diagnostic) -> lsp_types::Diagnostic {
    lsp_types::Diagnostic {
        range: span_to_range(snapshot, diag.span),
        severity: Some(severity_to_lsp(diag.severity)),
        code: Some(lsp_types::NumberOrString::String(diag.code.as_str().to_string())),
        source: Some("pyrite".to_string()),
        message: diag.message.clone(),
        ..Default::default()
    }
}

/// All diagnostics of a snapshot, in order
pub fn diagnostics_to_lsp(snapshot: &AnalysisSnapshot) -> Vec<lsp_types::Diagnostic> {
    snapshot
        .diagnostics
        .iter()
        .map(|diag| diagnostic_to_lsp(snapshot, diag))
        .collect()
}

pub fn symbol_kind_to_lsp(kind: SymbolKind, is_member: bool) -> lsp_types::SymbolKind {
    match kind {
        SymbolKind::Function if is_member => lsp_types::SymbolKind::METHOD,
        SymbolKind::Function => lsp_types::SymbolKind::FUNCTION,
        SymbolKind::Class => lsp_types::SymbolKind::CLASS,
        SymbolKind::Variable if is_member => lsp_types::SymbolKind::FIELD,
        SymbolKind::Variable | SymbolKind::Parameter => lsp_types::SymbolKind::VARIABLE,
        SymbolKind::Import => lsp_types::SymbolKind::MODULE,
    }
}

pub fn completion_kind(kind: SymbolKind, is_member: bool) -> lsp_types::CompletionItemKind {
    match kind {
        SymbolKind::Function if is_member => lsp_types::CompletionItemKind::METHOD,
        SymbolKind::Function => lsp_types::CompletionItemKind::FUNCTION,
        SymbolKind::Class => lsp_types::CompletionItemKind::CLASS,
        SymbolKind::Variable if is_member => lsp_types::CompletionItemKind::FIELD,
        SymbolKind::Variable | SymbolKind::Parameter => lsp_types::CompletionItemKind::VARIABLE,
        SymbolKind::Import => lsp_types::CompletionItemKind::MODULE,
    }
}

/// Whether the document is a package's `__init__` module
pub fn is_package_init(uri: &Url) -> bool {
    file_stem(uri).as_deref() == Some("__init__")
}

/// Dotted module name of a document.
///
/// Paths under `root` map to their package path (`pkg/mod.py` is `pkg.mod`,
/// `pkg/__init__.py` is `pkg`); anything else is named by its file stem.
pub fn module_name(root: Option<&Path>, uri: &Url) -> Option<String> {
    let stem = file_stem(uri)?;
    let path = uri.to_file_path().ok();
    let relative = match (root, path.as_deref()) {
        (Some(root), Some(path)) => path.strip_prefix(root).ok(),
        _ => None,
    };

    let mut parts: Vec<String> = match relative.and_then(Path::parent) {
        Some(parent) => parent
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect(),
        None if stem == "__init__" => path
            .as_deref()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .map(|name| vec![name.to_string_lossy().into_owned()])
            .unwrap_or_default(),
        None => Vec::new(),
    };
    if stem != "__init__" {
        parts.push(stem);
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

/// Absolute module path an import refers to, seen from `importer`.
///
/// Relative imports climb one package per extra leading dot; `None` when they
/// climb above the top-level package.
pub fn absolute_module(
    importer: &str,
    importer_is_package: bool,
    target: &ImportTarget,
) -> Option<String> {
    if target.level == 0 {
        return Some(target.module.clone());
    }

    let mut base: Vec<&str> = importer.split('.').filter(|p| !p.is_empty()).collect();
    if !importer_is_package {
        base.pop()?;
    }
    for _ in 1..target.level {
        base.pop()?;
    }
    if !target.module.is_empty() {
        base.push(&target.module);
    }

    if base.is_empty() {
        None
    } else {
        Some(base.join("."))
    }
}

fn file_stem(uri: &Url) -> Option<String> {
    let last = uri.path_segments()?.last()?;
    let stem = last
        .strip_suffix(".pyi")
        .or_else(|| last.strip_suffix(".py"))
        .unwrap_or(last);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::path::PathBuf;

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file://{}", path)).unwrap()
    }

    #[rstest]
    #[case("/ws/a.py", Some("a"))]
    #[case("/ws/pkg/mod.py", Some("pkg.mod"))]
    #[case("/ws/pkg/__init__.py", Some("pkg"))]
    #[case("/ws/pkg/sub/__init__.py", Some("pkg.sub"))]
    #[case("/ws/stubs.pyi", Some("stubs"))]
    #[case("/elsewhere/tool.py", Some("tool"))]
    fn test_module_name_under_root(#[case] path: &str, #[case] expected: Option<&str>) {
        let root = PathBuf::from("/ws");
        assert_eq!(module_name(Some(&root), &uri(path)).as_deref(), expected);
    }

    #[test]
    fn test_module_name_without_root() {
        assert_eq!(module_name(None, &uri("/ws/pkg/mod.py")).as_deref(), Some("mod"));
        assert_eq!(module_name(None, &uri("/ws/pkg/__init__.py")).as_deref(), Some("pkg"));
        let untitled = Url::parse("untitled:Untitled-1").unwrap();
        assert_eq!(module_name(None, &untitled), None);
    }

    #[rstest]
    #[case("pkg.mod", false, 1, "util", Some("pkg.util"))]
    #[case("pkg.mod", false, 1, "", Some("pkg"))]
    #[case("pkg.sub.mod", false, 2, "util", Some("pkg.util"))]
    #[case("pkg", true, 1, "util", Some("pkg.util"))]
    #[case("mod", false, 1, "util", Some("util"))]
    #[case("mod", false, 2, "util", None)]
    #[case("pkg.mod", false, 0, "os.path", Some("os.path"))]
    fn test_absolute_module(
        #[case] importer: &str,
        #[case] is_package: bool,
        #[case] level: u32,
        #[case] module: &str,
        #[case] expected: Option<&str>,
    ) {
        let target = ImportTarget {
            module: module.to_string(),
            level,
            name: None,
        };
        assert_eq!(absolute_module(importer, is_package, &target).as_deref(), expected);
    }

    #[test]
    fn test_diagnostic_conversion() {
        let snapshot = pyrite_analyzer::analyze(
            "file:///ws/a.py",
            "def f():\n    return x\n",
            1,
            &Default::default(),
        );
        let diagnostics = diagnostics_to_lsp(&snapshot);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range, Range::new(Position::new(1, 11), Position::new(1, 12)));
        assert_eq!(diagnostics[0].severity, Some(lsp_types::DiagnosticSeverity::HINT));
        assert_eq!(
            diagnostics[0].code,
            Some(lsp_types::NumberOrString::String("unresolved-name".to_string()))
        );
    }
}
