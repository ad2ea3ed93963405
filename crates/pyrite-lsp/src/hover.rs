//! Hover information provider for LSP
//!
//! Provides:
//! - Kind label and rendered signature for functions and classes
//! - The first paragraph of the docstring
//! - For imports, the hover of whatever the import resolves to

use crate::convert;
use crate::index::IndexedSymbol;
use crate::resolver::Resolved;
use crate::session::Session;
use lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Url};
use pyrite_analyzer::{AnalysisSnapshot, Resolution, ScopeKind, Symbol, SymbolKind};

/// Generate hover information for a position in the document
pub fn generate_hover(
    session: &Session,
    uri: &Url,
    snapshot: &AnalysisSnapshot,
    position: Position,
) -> Option<Hover> {
    let offset = convert::position_to_offset(snapshot, position)?;
    let reference = snapshot.scopes.reference_at(offset)?;

    let text = match reference.resolution {
        Resolution::Symbol(id) => {
            let symbol = snapshot.scopes.symbol(id);
            match &symbol.import {
                Some(target) => match session.resolve_import(uri, snapshot, target) {
                    Some(Resolved::Symbol(indexed)) => indexed_hover(&indexed),
                    Some(Resolved::Module(_)) => {
                        code_block(&format!("(module) {}", target.module_path()))
                    }
                    None => code_block(&format!("(import) {}", import_statement(symbol))),
                },
                None => symbol_hover(snapshot, symbol),
            }
        }
        Resolution::Builtin => code_block(&format!("(builtin) {}", reference.name)),
        Resolution::Unresolved => return None,
    };

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: text,
        }),
        range: Some(convert::span_to_range(snapshot, reference.span)),
    })
}

/// Hover text for a symbol bound in this document
pub fn symbol_hover(snapshot: &AnalysisSnapshot, symbol: &Symbol) -> String {
    let in_class = snapshot.scopes.scope(symbol.scope).kind == ScopeKind::Class;
    render(
        kind_label(symbol.kind, in_class),
        &symbol.name,
        symbol.detail.as_deref(),
        symbol.docstring.as_deref(),
    )
}

/// Hover text for a definition found through the workspace index
pub fn indexed_hover(symbol: &IndexedSymbol) -> String {
    render(
        kind_label(symbol.kind, symbol.container.is_some()),
        &symbol.name,
        symbol.detail.as_deref(),
        symbol.docstring.as_deref(),
    )
}

fn kind_label(kind: SymbolKind, in_class: bool) -> &'static str {
    match kind {
        SymbolKind::Function if in_class => "method",
        kind => kind.label(),
    }
}

fn render(label: &str, name: &str, detail: Option<&str>, docstring: Option<&str>) -> String {
    let mut text = code_block(&format!("({}) {}", label, detail.unwrap_or(name)));
    if let Some(doc) = docstring.and_then(first_paragraph) {
        text.push_str("\n\n");
        text.push_str(&doc);
    }
    text
}

fn code_block(line: &str) -> String {
    format!("```python\n{}\n```", line)
}

fn import_statement(symbol: &Symbol) -> String {
    let Some(target) = &symbol.import else {
        return symbol.name.clone();
    };
    let mut statement = match &target.name {
        Some(name) => format!("from {} import {}", target.module_path(), name),
        None => format!("import {}", target.module_path()),
    };
    let bound = target.name.as_deref().unwrap_or(&target.module);
    if bound != symbol.name {
        statement.push_str(" as ");
        statement.push_str(&symbol.name);
    }
    statement
}

/// First block of docstring lines, with indentation stripped
fn first_paragraph(doc: &str) -> Option<String> {
    let lines: Vec<&str> = doc
        .lines()
        .map(str::trim)
        .skip_while(|line| line.is_empty())
        .take_while(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use pyrite_analyzer::{analyze, AnalysisOptions};
    use pyrite_config::Settings;

    fn session() -> Session {
        Session::new(None, Settings::default(), Client::channel().0)
    }

    fn hover_at(session: &Session, source: &str, line: u32, character: u32) -> Option<String> {
        let uri = Url::parse("file:///ws/main.py").unwrap();
        let snapshot = analyze(uri.as_str(), source, 1, &AnalysisOptions::default());
        let hover = generate_hover(session, &uri, &snapshot, Position::new(line, character))?;
        match hover.contents {
            HoverContents::Markup(markup) => Some(markup.value),
            other => panic!("unexpected hover contents: {:?}", other),
        }
    }

    #[test]
    fn test_function_hover_with_docstring() {
        let source = concat!(
            "def area(w, h=1):\n    \"\"\"\n    Compute the area.\n\n    Details follow.\n",
            "    \"\"\"\n    return w * h\n\narea(2)\n",
        );
        let text = hover_at(&session(), source, 8, 1).unwrap();
        insta::assert_snapshot!(text, @r#"
        ```python
        (function) def area(w, h=…)
        ```

        Compute the area.
        "#);
    }

    #[test]
    fn test_class_and_method_hover() {
        let source = concat!(
            "class Shape(object):\n    def scale(self, k):\n        return self\n\n",
            "Shape().scale(2)\n",
        );
        let session = session();
        insta::assert_snapshot!(hover_at(&session, source, 0, 7).unwrap(), @r#"
        ```python
        (class) class Shape(object)
        ```
        "#);
        insta::assert_snapshot!(hover_at(&session, source, 1, 9).unwrap(), @r#"
        ```python
        (method) def scale(self, k)
        ```
        "#);
    }

    #[test]
    fn test_variable_parameter_and_builtin_hover() {
        let source = "limit = 3\ndef f(n):\n    return len(n) + limit\n";
        let session = session();
        assert_eq!(hover_at(&session, source, 0, 2).unwrap(), "```python\n(variable) limit\n```");
        assert_eq!(hover_at(&session, source, 1, 6).unwrap(), "```python\n(parameter) n\n```");
        assert_eq!(hover_at(&session, source, 2, 12).unwrap(), "```python\n(builtin) len\n```");
    }

    #[test]
    fn test_unresolved_import_and_name() {
        let source = "from .models import User as U\nprint(U, missing)\n";
        let session = session();
        assert_eq!(
            hover_at(&session, source, 1, 6).unwrap(),
            "```python\n(import) from .models import User as U\n```"
        );
        assert_eq!(hover_at(&session, source, 1, 10), None);
    }

    #[test]
    fn test_no_hover_outside_identifiers() {
        assert_eq!(hover_at(&session(), "x = 1\n", 0, 4), None);
        assert_eq!(hover_at(&session(), "x = 1\n", 9, 0), None);
    }
}
