//! Scope tree, symbols, and references
//!
//! Scopes and symbols live in flat arenas addressed by [`ScopeId`] and
//! [`SymbolId`]; a scope points at its parent by id, never by reference.
//! Every map is ordered so two analyses of the same text compare equal.

use crate::span::Span;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Index of a scope in its [`ScopeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

/// Index of a symbol in its [`ScopeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// Lexical scope classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
    Lambda,
    Comprehension,
}

/// One lexical scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Function or class name; `<module>`, `<lambda>`, ... otherwise
    pub name: String,
    pub parent: Option<ScopeId>,
    /// Source range the scope covers
    pub span: Span,
    /// Names bound in this scope, in first-binding order
    pub symbols: IndexMap<String, SymbolId>,
}

/// Symbol classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Variable,
    Function,
    Class,
    Parameter,
    Import,
}

impl SymbolKind {
    /// Label shown in hovers
    pub fn label(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Import => "import",
        }
    }
}

/// Cross-file target of an import binding, resolved lazily
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportTarget {
    /// Dotted module path without leading dots
    pub module: String,
    /// Number of leading dots of a relative import
    pub level: u32,
    /// Imported name for `from m import name`; `None` when the module itself is bound
    pub name: Option<String>,
}

impl ImportTarget {
    /// Module path as written, including leading dots
    pub fn module_path(&self) -> String {
        format!("{}{}", ".".repeat(self.level as usize), self.module)
    }
}

/// A named binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Scope the name is bound in
    pub scope: ScopeId,
    /// Span of the first binding occurrence of the name
    pub span: Span,
    /// Span of the whole defining statement
    pub definition_span: Span,
    /// Rendered signature for functions and classes
    pub detail: Option<String>,
    pub docstring: Option<String>,
    pub import: Option<ImportTarget>,
    /// Body scope of a function or class
    pub body_scope: Option<ScopeId>,
}

/// What an identifier occurrence refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Symbol(SymbolId),
    Builtin,
    Unresolved,
}

/// An identifier occurrence, either a use or a binding site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub span: Span,
    /// Scope the occurrence appears in
    pub scope: ScopeId,
    pub resolution: Resolution,
    /// The occurrence binds the name rather than reading it
    pub is_binding: bool,
}

/// Unresolved cross-file import edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEdge {
    pub target: ImportTarget,
    /// Local name the import binds; `*` for star imports
    pub alias: String,
    pub span: Span,
    pub is_star: bool,
    /// Binding created by the import, absent for star imports
    pub symbol: Option<SymbolId>,
}

/// All scopes, symbols, references, and imports of one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeTree {
    pub(crate) scopes: Vec<Scope>,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) references: Vec<Reference>,
    pub(crate) imports: Vec<ImportEdge>,
}

impl ScopeTree {
    /// The module scope; an empty tree still reports id 0
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, scope)| (ScopeId(i as u32), scope))
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| (SymbolId(i as u32), symbol))
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn imports(&self) -> &[ImportEdge] {
        &self.imports
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Symbol bound directly in `scope` under `name`
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes
            .get(scope.0 as usize)
            .and_then(|s| s.symbols.get(name).copied())
    }

    /// Module-scope symbol by name
    pub fn module_symbol(&self, name: &str) -> Option<SymbolId> {
        if self.is_empty() {
            return None;
        }
        self.lookup_local(self.root(), name)
    }

    /// Symbols bound at module scope, in binding order
    pub fn module_symbols(&self) -> Vec<SymbolId> {
        if self.is_empty() {
            return Vec::new();
        }
        self.scope(self.root()).symbols.values().copied().collect()
    }

    /// Whether the module contains a `from m import *`
    pub fn has_star_import(&self) -> bool {
        self.imports.iter().any(|edge| edge.is_star)
    }

    /// Innermost scope whose span contains `offset`
    pub fn scope_at(&self, offset: usize) -> ScopeId {
        // scopes are stored parent-first, so the last match is the deepest
        self.scopes()
            .filter(|(_, scope)| scope.span.contains(offset))
            .map(|(id, _)| id)
            .last()
            .unwrap_or(ScopeId(0))
    }

    /// Chain of scopes a name lookup from `scope` visits, nearest first.
    ///
    /// Class scopes are only visible from their own body, never from nested
    /// functions, lambdas, or comprehensions.
    pub fn visible_scopes(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        if self.is_empty() {
            return chain;
        }
        chain.push(scope);
        let mut current = self.scope(scope).parent;
        while let Some(id) = current {
            let candidate = self.scope(id);
            if candidate.kind != ScopeKind::Class {
                chain.push(id);
            }
            current = candidate.parent;
        }
        chain
    }

    /// Names visible from `scope`, nearest binding first; shadowed names are dropped
    pub fn visible_symbols(&self, scope: ScopeId) -> Vec<(usize, SymbolId)> {
        let mut seen = HashSet::new();
        let mut visible = Vec::new();
        for (depth, id) in self.visible_scopes(scope).into_iter().enumerate() {
            for (name, symbol) in &self.scope(id).symbols {
                if seen.insert(name.as_str()) {
                    visible.push((depth, *symbol));
                }
            }
        }
        visible
    }

    /// Occurrence (use or binding) covering `offset`
    pub fn reference_at(&self, offset: usize) -> Option<&Reference> {
        self.references
            .iter()
            .filter(|r| r.span.contains(offset))
            .min_by_key(|r| r.span.len())
    }

    /// All occurrences resolved to `symbol`, in source order
    pub fn references_to(&self, symbol: SymbolId) -> Vec<&Reference> {
        let mut refs: Vec<&Reference> = self
            .references
            .iter()
            .filter(|r| r.resolution == Resolution::Symbol(symbol))
            .collect();
        refs.sort_by_key(|r| r.span.start);
        refs
    }

    /// Symbols bound in a function's or class's body scope
    pub fn children(&self, symbol: SymbolId) -> Vec<SymbolId> {
        match self.symbol(symbol).body_scope {
            Some(scope) => self.scope(scope).symbols.values().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Members of every class, paired with the owning class name
    pub fn class_members(&self) -> Vec<(&str, SymbolId)> {
        self.scopes
            .iter()
            .filter(|scope| scope.kind == ScopeKind::Class)
            .flat_map(|scope| {
                scope
                    .symbols
                    .values()
                    .map(move |symbol| (scope.name.as_str(), *symbol))
            })
            .collect()
    }
}
