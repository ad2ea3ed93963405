//! End-to-end analysis of whole documents

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use pyrite_analyzer::{
    analyze, AnalysisOptions, DiagnosticCode, LineCol, Resolution, ScopeKind, Severity, SymbolKind,
};
use rstest::rstest;

fn analyze_source(text: &str) -> pyrite_analyzer::AnalysisSnapshot {
    analyze("file:///workspace/main.py", text, 1, &AnalysisOptions::default())
}

// ============================================================================
// Name resolution
// ============================================================================

#[test]
fn unresolved_name_in_function_body() {
    let snapshot = analyze_source("def f(): return x");
    assert_eq!(snapshot.diagnostics.len(), 1);

    let diagnostic = &snapshot.diagnostics[0];
    assert_eq!(diagnostic.code, DiagnosticCode::UnresolvedName);
    assert_eq!(diagnostic.severity, Severity::Hint);
    assert_eq!(snapshot.line_col(diagnostic.span.start), LineCol::new(0, 16));
    assert_eq!(snapshot.slice(diagnostic.span), "x");
}

#[test]
fn lone_carriage_return_positions_match_the_editor() {
    let snapshot = analyze_source("x = 1\rprint(y)\r\nz\n");
    let lines: Vec<LineCol> = snapshot
        .diagnostics
        .iter()
        .map(|d| snapshot.line_col(d.span.start))
        .collect();
    assert_eq!(lines, vec![LineCol::new(1, 6), LineCol::new(2, 0)]);
}

#[test]
fn local_assignment_resolves() {
    let snapshot = analyze_source("def f():\n    x = 1\n    return x\n");
    assert!(snapshot.diagnostics.is_empty(), "{:?}", snapshot.diagnostics);
}

#[test]
fn realistic_module_is_clean() {
    let text = r#"
"""Inventory helpers."""
from __future__ import annotations

import json
from dataclasses import dataclass, field
from typing import Iterable

DEFAULT_LIMIT = 10


@dataclass
class Item:
    """A stocked item."""

    name: str
    quantity: int = 0
    tags: list[str] = field(default_factory=list)

    def restock(self, amount: int = 1) -> "Item":
        if amount <= 0:
            raise ValueError(f"bad amount {amount}")
        self.quantity += amount
        return self


async def load(paths: Iterable[str], *, limit=DEFAULT_LIMIT):
    items = {}
    for index, path in enumerate(paths):
        if index >= limit:
            break
        with open(path) as handle:
            data = json.load(handle)
        try:
            items[data["name"]] = Item(**data)
        except (KeyError, TypeError) as exc:
            print(exc)
            continue
    return [item for item in items.values() if (count := item.quantity) > 0 and count]


def total(items):
    return sum(i.quantity for i in items), lambda x, *rest: x
"#;
    let snapshot = analyze_source(text);
    assert!(snapshot.diagnostics.is_empty(), "{:?}", snapshot.diagnostics);

    let names: Vec<&str> = snapshot
        .scopes
        .module_symbols()
        .into_iter()
        .map(|id| snapshot.scopes.symbol(id).name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "annotations",
            "json",
            "dataclass",
            "field",
            "Iterable",
            "DEFAULT_LIMIT",
            "Item",
            "load",
            "total"
        ]
    );
}

#[test]
fn every_use_has_a_reference() {
    let text = "import os\nvalue = os.getcwd()\nprint(value, unknown)\n";
    let snapshot = analyze_source(text);
    let uses: Vec<(&str, bool)> = snapshot
        .scopes
        .references()
        .iter()
        .filter(|r| !r.is_binding)
        .map(|r| (r.name.as_str(), matches!(r.resolution, Resolution::Symbol(_))))
        .collect();
    assert_eq!(
        uses,
        vec![("os", true), ("print", false), ("value", true), ("unknown", false)]
    );
}

#[test]
fn symbols_carry_definitions_and_signatures() {
    let text = concat!(
        "class Base:\n    pass\n\nclass Child(Base):\n    \"\"\"Child docs.\"\"\"\n",
        "    def run(self, n=3):\n        return n\n",
    );
    let snapshot = analyze_source(text);
    let scopes = &snapshot.scopes;

    let child = scopes.symbol(scopes.module_symbol("Child").unwrap());
    assert_eq!(child.kind, SymbolKind::Class);
    assert_eq!(child.detail.as_deref(), Some("class Child(Base)"));
    assert_eq!(child.docstring.as_deref(), Some("Child docs."));
    assert_eq!(snapshot.slice(child.span), "Child");

    let body = child.body_scope.unwrap();
    assert_eq!(scopes.scope(body).kind, ScopeKind::Class);
    let run = scopes.symbol(scopes.lookup_local(body, "run").unwrap());
    assert_eq!(run.detail.as_deref(), Some("def run(self, n=…)"));
}

// ============================================================================
// Recovery
// ============================================================================

#[rstest]
#[case("def f(:\n    pass\n")]
#[case("x = (1,\n")]
#[case("class\n")]
#[case("if x\n    y = 1\n")]
#[case("  indented = 1\n")]
#[case("s = 'unterminated\n")]
#[case("for in range(3):\n    pass\n")]
fn malformed_input_still_produces_a_snapshot(#[case] text: &str) {
    let snapshot = analyze_source(text);
    assert!(!snapshot.degraded);
    assert!(snapshot.diagnostics.iter().any(|d| d.is_error()));
}

#[test]
fn one_bad_statement_does_not_hide_later_definitions() {
    let text = "def broken(:\n    pass\n\ndef fine():\n    return 1\n";
    let snapshot = analyze_source(text);
    let syntax_errors = snapshot
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::SyntaxError)
        .count();
    assert_eq!(syntax_errors, 1);
    assert!(snapshot.scopes.module_symbol("fine").is_some());
}

#[rstest]
#[case::elif_chain(format!(
    "a = 1\nif a:\n    pass\n{}",
    "elif a:\n    b = a\n".repeat(20_000)
))]
#[case::call_chain(format!("f = 1\nf{}\n", "()".repeat(20_000)))]
#[case::walrus_chain(format!("({}1)\n", "x := ".repeat(20_000)))]
#[case::subscript_chain(format!("v = 1\nv{}\n", "[0]".repeat(20_000)))]
fn pathological_input_is_analyzed_without_overflow(#[case] text: String) {
    let snapshot = analyze_source(&text);
    assert!(!snapshot.degraded);
}

#[test]
fn names_bound_in_elif_clauses_resolve() {
    let text = concat!(
        "def f(a):\n    if a:\n        pass\n    elif a > 1:\n        b = 2\n    else:\n",
        "        b = 3\n    return b\n",
    );
    let snapshot = analyze_source(text);
    assert!(snapshot.diagnostics.is_empty(), "{:?}", snapshot.diagnostics);
}

#[test]
fn unresolved_severity_follows_options() {
    let options = AnalysisOptions {
        unresolved_severity: Severity::Error,
        ..AnalysisOptions::default()
    };
    let snapshot = analyze("file:///a.py", "nothing_here\n", 1, &options);
    assert_eq!(snapshot.diagnostics[0].severity, Severity::Error);
}

// ============================================================================
// Properties
// ============================================================================

fn python_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6} = [a-z0-9]{1,6}".prop_map(|s| s),
        "def [a-z]{1,6}\\([a-z, ]{0,8}\\):".prop_map(|s| s),
        "    return [a-z]{1,4}".prop_map(|s| s),
        "class [A-Z][a-z]{0,5}:".prop_map(|s| s),
        "import [a-z]{1,6}".prop_map(|s| s),
        "from \\.{0,2}[a-z]{1,5} import [a-z*]{1,4}".prop_map(|s| s),
        "    [a-z]{1,5}\\([a-z0-9, ]{0,8}\\)".prop_map(|s| s),
        Just("    pass".to_string()),
        Just("if x:".to_string()),
        Just("        ".to_string()),
        Just("[y for y in z]".to_string()),
        Just("lambda: (".to_string()),
    ]
}

proptest! {
    #[test]
    fn analysis_never_panics(text in "\\PC*") {
        let snapshot = analyze_source(&text);
        prop_assert!(!snapshot.degraded);
    }

    #[test]
    fn analysis_is_deterministic(lines in prop::collection::vec(python_line(), 0..20)) {
        let text = lines.join("\n");
        let options = AnalysisOptions::default();
        let first = analyze("file:///p.py", &text, 4, &options);
        let second = analyze("file:///p.py", &text, 4, &options);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn diagnostic_spans_stay_in_bounds(lines in prop::collection::vec(python_line(), 0..20)) {
        let text = lines.join("\n");
        let snapshot = analyze_source(&text);
        for diagnostic in &snapshot.diagnostics {
            prop_assert!(diagnostic.span.start <= diagnostic.span.end);
            prop_assert!(diagnostic.span.end <= text.len());
        }
    }
}
