//! Document outline and workspace symbol search

use crate::convert;
use crate::index::WorkspaceIndex;
use lsp_types::{DocumentSymbol, SymbolInformation};
use pyrite_analyzer::{AnalysisSnapshot, SymbolId, SymbolKind};

/// Most results returned for one workspace symbol query
pub const MAX_WORKSPACE_SYMBOLS: usize = 500;

/// Hierarchical outline: module-level definitions, class members under their
/// class, nested functions and classes under their function
pub fn document_symbols(snapshot: &AnalysisSnapshot) -> Vec<DocumentSymbol> {
    let scopes = &snapshot.scopes;
    if scopes.is_empty() {
        return Vec::new();
    }
    scopes
        .module_symbols()
        .into_iter()
        .filter(|&id| !matches!(scopes.symbol(id).kind, SymbolKind::Import | SymbolKind::Parameter))
        .map(|id| outline_entry(snapshot, id, false))
        .collect()
}

fn outline_entry(snapshot: &AnalysisSnapshot, id: SymbolId, is_member: bool) -> DocumentSymbol {
    let scopes = &snapshot.scopes;
    let symbol = scopes.symbol(id);

    let children: Vec<DocumentSymbol> = match symbol.kind {
        SymbolKind::Class => scopes
            .children(id)
            .into_iter()
            .filter(|&child| scopes.symbol(child).kind != SymbolKind::Import)
            .map(|child| outline_entry(snapshot, child, true))
            .collect(),
        SymbolKind::Function => scopes
            .children(id)
            .into_iter()
            .filter(|&child| {
                matches!(
                    scopes.symbol(child).kind,
                    SymbolKind::Function | SymbolKind::Class
                )
            })
            .map(|child| outline_entry(snapshot, child, false))
            .collect(),
        _ => Vec::new(),
    };

    let selection_range = convert::span_to_range(snapshot, symbol.span);
    let mut range = convert::span_to_range(snapshot, symbol.definition_span);
    if !symbol.definition_span.covers(symbol.span) {
        range = selection_range;
    }

    #[allow(deprecated)]
    let entry = DocumentSymbol {
        name: symbol.name.clone(),
        detail: symbol.detail.clone(),
        kind: convert::symbol_kind_to_lsp(symbol.kind, is_member),
        tags: None,
        deprecated: None,
        range,
        selection_range,
        children: if children.is_empty() { None } else { Some(children) },
    };
    entry
}

/// Indexed definitions matching `query`
pub fn workspace_symbols(index: &WorkspaceIndex, query: &str) -> Vec<SymbolInformation> {
    index
        .workspace_symbols(query)
        .into_iter()
        .take(MAX_WORKSPACE_SYMBOLS)
        .map(|symbol| {
            #[allow(deprecated)]
            let info = SymbolInformation {
                name: symbol.name.clone(),
                kind: convert::symbol_kind_to_lsp(symbol.kind, symbol.container.is_some()),
                tags: None,
                deprecated: None,
                location: symbol.location(),
                container_name: Some(
                    symbol
                        .container
                        .clone()
                        .unwrap_or_else(|| symbol.module.clone()),
                ),
            };
            info
        })
        .collect()
}
