//! Go-to-definition and find-references
//!
//! Local names resolve inside the document. Imports resolve lazily through
//! the workspace index, and module-level names gather references from every
//! indexed document that defines or imports them.

use crate::convert;
use crate::resolver::Resolved;
use crate::session::Session;
use lsp_types::{Location, Position, Range, Url};
use pyrite_analyzer::{AnalysisSnapshot, Resolution, SymbolId};
use std::collections::BTreeSet;

/// Find the definition of the symbol at `position`
pub fn find_definition(
    session: &Session,
    uri: &Url,
    snapshot: &AnalysisSnapshot,
    position: Position,
) -> Vec<Location> {
    let Some(id) = symbol_at(snapshot, position) else {
        return Vec::new();
    };
    definition_of(session, uri, snapshot, id).into_iter().collect()
}

/// Find every reference to the symbol at `position`
pub fn find_references(
    session: &Session,
    uri: &Url,
    snapshot: &AnalysisSnapshot,
    position: Position,
    include_declaration: bool,
) -> Vec<Location> {
    let Some(id) = symbol_at(snapshot, position) else {
        return Vec::new();
    };
    let scopes = &snapshot.scopes;
    let symbol = scopes.symbol(id);
    let declaration = definition_of(session, uri, snapshot, id);

    let mut locations: Vec<Location> = scopes
        .references_to(id)
        .into_iter()
        .map(|r| Location::new(uri.clone(), convert::span_to_range(snapshot, r.span)))
        .collect();

    if symbol.scope == scopes.root() {
        if let Some((name, origin)) = cross_file_key(session, uri, snapshot, id) {
            locations.extend(
                session
                    .index()
                    .references(&name)
                    .into_iter()
                    .filter(|r| r.origin == origin && &r.location.uri != uri)
                    .map(|r| r.location),
            );
        }
    }

    if include_declaration {
        locations.extend(declaration);
    } else if let Some(declaration) = &declaration {
        locations.retain(|location| location != declaration);
    }

    sort_locations(locations)
}

fn symbol_at(snapshot: &AnalysisSnapshot, position: Position) -> Option<SymbolId> {
    let offset = convert::position_to_offset(snapshot, position)?;
    match snapshot.scopes.reference_at(offset)?.resolution {
        Resolution::Symbol(id) => Some(id),
        Resolution::Builtin | Resolution::Unresolved => None,
    }
}

/// Where `id` is defined; imports follow the workspace index
fn definition_of(
    session: &Session,
    uri: &Url,
    snapshot: &AnalysisSnapshot,
    id: SymbolId,
) -> Option<Location> {
    let symbol = snapshot.scopes.symbol(id);
    match &symbol.import {
        Some(target) => match session.resolve_import(uri, snapshot, target)? {
            Resolved::Symbol(indexed) => Some(indexed.location()),
            Resolved::Module(module_uri) => Some(Location::new(module_uri, Range::default())),
        },
        None => Some(Location::new(uri.clone(), convert::span_to_range(snapshot, symbol.span))),
    }
}

/// Name and defining module a module-level symbol is indexed under
fn cross_file_key(
    session: &Session,
    uri: &Url,
    snapshot: &AnalysisSnapshot,
    id: SymbolId,
) -> Option<(String, String)> {
    let symbol = snapshot.scopes.symbol(id);
    let module = session.index().module_name(uri)?;
    match &symbol.import {
        Some(target) => {
            let origin = convert::absolute_module(&module, convert::is_package_init(uri), target)?;
            let name = target.name.clone().unwrap_or_else(|| symbol.name.clone());
            Some((name, origin))
        }
        None => Some((symbol.name.clone(), module)),
    }
}

fn sort_locations(locations: Vec<Location>) -> Vec<Location> {
    let unique: BTreeSet<(Url, u32, u32, u32, u32)> = locations
        .into_iter()
        .map(|l| {
            (
                l.uri,
                l.range.start.line,
                l.range.start.character,
                l.range.end.line,
                l.range.end.character,
            )
        })
        .collect();
    unique
        .into_iter()
        .map(|(uri, sl, sc, el, ec)| {
            Location::new(uri, Range::new(Position::new(sl, sc), Position::new(el, ec)))
        })
        .collect()
}
