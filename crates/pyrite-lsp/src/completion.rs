//! Code completion provider
//!
//! Candidates come from the scopes visible at the cursor (nearest first),
//! then builtins, then keywords. After `name.` the candidates are the members
//! of whatever `name` denotes: an indexed module or a class of this document.

use crate::convert;
use crate::resolver::Resolved;
use crate::session::Session;
use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionList, CompletionResponse, Position, Url,
};
use pyrite_analyzer::builtins::BUILTINS;
use pyrite_analyzer::{AnalysisSnapshot, ScopeKind, SymbolKind, TokenKind};
use pyrite_config::Ranking;
use std::collections::HashSet;

/// Generate completions at a position
pub fn generate_completions(
    session: &Session,
    uri: &Url,
    snapshot: &AnalysisSnapshot,
    position: Position,
) -> CompletionResponse {
    let Some(offset) = convert::position_to_offset(snapshot, position) else {
        return CompletionResponse::List(CompletionList::default());
    };
    let text = &snapshot.text[..offset];
    let start = identifier_start(text);
    let prefix = &text[start..];

    let candidates = match text[..start].strip_suffix('.') {
        Some(before_dot) => {
            member_candidates(session, uri, snapshot, offset, receiver_chain(before_dot))
        }
        None => scope_candidates(session, snapshot, offset),
    };

    let settings = &session.settings().completion;
    let mut seen = HashSet::new();
    let mut items: Vec<CompletionItem> = candidates
        .into_iter()
        .filter(|item| starts_with_ignore_case(&item.label, prefix))
        .filter(|item| seen.insert(item.label.clone()))
        .collect();

    if settings.ranking == Ranking::Alphabetical {
        items.sort_by(|a, b| {
            a.label
                .to_lowercase()
                .cmp(&b.label.to_lowercase())
                .then_with(|| a.label.cmp(&b.label))
        });
    }

    let is_incomplete = items.len() > settings.max_items;
    items.truncate(settings.max_items);
    for (rank, item) in items.iter_mut().enumerate() {
        item.sort_text = Some(format!("{:05}", rank));
    }

    CompletionResponse::List(CompletionList { is_incomplete, items })
}

/// Names visible from the innermost scope at `offset`, then builtins and keywords
fn scope_candidates(
    session: &Session,
    snapshot: &AnalysisSnapshot,
    offset: usize,
) -> Vec<CompletionItem> {
    let scopes = &snapshot.scopes;
    let mut items = Vec::new();

    if !scopes.is_empty() {
        for (_, id) in scopes.visible_symbols(scopes.scope_at(offset)) {
            let symbol = scopes.symbol(id);
            let is_member = scopes.scope(symbol.scope).kind == ScopeKind::Class;
            items.push(item(
                &symbol.name,
                convert::completion_kind(symbol.kind, is_member),
                symbol.detail.clone().unwrap_or_else(|| symbol.kind.label().to_string()),
            ));
        }
    }

    let options = session.cache().options();
    let mut builtins: Vec<&str> = BUILTINS.to_vec();
    builtins.extend(options.extra_builtins.iter().map(String::as_str));
    for name in builtins {
        let kind = if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            CompletionItemKind::CLASS
        } else {
            CompletionItemKind::FUNCTION
        };
        items.push(item(name, kind, "builtin".to_string()));
    }

    if session.settings().completion.include_keywords {
        for keyword in TokenKind::KEYWORDS {
            items.push(item(keyword, CompletionItemKind::KEYWORD, "keyword".to_string()));
        }
    }
    items
}

/// Members of the dotted receiver before the cursor's `.`
fn member_candidates(
    session: &Session,
    uri: &Url,
    snapshot: &AnalysisSnapshot,
    offset: usize,
    chain: Vec<&str>,
) -> Vec<CompletionItem> {
    let scopes = &snapshot.scopes;
    let Some((first, rest)) = chain.split_first() else {
        return Vec::new();
    };
    if scopes.is_empty() {
        return Vec::new();
    }

    let symbol = scopes
        .visible_scopes(scopes.scope_at(offset))
        .into_iter()
        .find_map(|scope| scopes.lookup_local(scope, first));
    let Some(id) = symbol else {
        return Vec::new();
    };
    let symbol = scopes.symbol(id);

    let module = match (&symbol.import, symbol.kind) {
        (Some(target), _) if target.name.is_none() => Some(target.module.clone()),
        (Some(target), _) => match session.resolve_import(uri, snapshot, target) {
            Some(Resolved::Module(module_uri)) => session.index().module_name(&module_uri),
            _ => None,
        },
        (None, SymbolKind::Class) if rest.is_empty() => {
            return scopes
                .children(id)
                .into_iter()
                .map(|member| {
                    let member = scopes.symbol(member);
                    item(
                        &member.name,
                        convert::completion_kind(member.kind, true),
                        member.detail.clone().unwrap_or_else(|| member.kind.label().to_string()),
                    )
                })
                .collect();
        }
        _ => None,
    };
    let Some(mut module) = module else {
        return Vec::new();
    };
    for part in rest {
        module.push('.');
        module.push_str(part);
    }

    session
        .index()
        .module_symbols(&module)
        .into_iter()
        .map(|symbol| {
            let detail = symbol
                .detail
                .clone()
                .unwrap_or_else(|| format!("{} in {}", symbol.kind.label(), symbol.module));
            item(&symbol.name, convert::completion_kind(symbol.kind, false), detail)
        })
        .collect()
}

fn item(label: &str, kind: CompletionItemKind, detail: String) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(kind),
        detail: Some(detail),
        ..Default::default()
    }
}

fn is_identifier_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Byte offset where the identifier ending at the end of `text` starts
fn identifier_start(text: &str) -> usize {
    text.char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c))
        .last()
        .map_or(text.len(), |(i, _)| i)
}

/// `a.b` for text ending in `a.b`; empty when the receiver is not a plain dotted name
fn receiver_chain(text: &str) -> Vec<&str> {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c) || *c == '.')
        .last()
        .map_or(text.len(), |(i, _)| i);
    let chain: Vec<&str> = text[start..].split('.').collect();
    let valid = chain
        .iter()
        .all(|part| !part.is_empty() && !part.starts_with(|c: char| c.is_ascii_digit()));
    if valid {
        chain
    } else {
        Vec::new()
    }
}

fn starts_with_ignore_case(label: &str, prefix: &str) -> bool {
    label
        .chars()
        .flat_map(char::to_lowercase)
        .zip(prefix.chars().flat_map(char::to_lowercase))
        .all(|(a, b)| a == b)
        && label.chars().count() >= prefix.chars().count()
}
