//! Workspace-wide symbol index for cross-file navigation
//!
//! Every analyzed document contributes its module-level definitions, the
//! members of its classes, and its uses of module-level names. A document's
//! contribution is replaced as a whole under one write lock, so readers see
//! either the old or the new set, never a mix.

use crate::convert;
use lsp_types::{Location, Range, Url};
use pyrite_analyzer::{AnalysisSnapshot, Resolution, SymbolKind};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::debug;

/// A definition visible to other documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub uri: Url,
    /// Module the definition lives in
    pub module: String,
    /// Range of the defining name
    pub range: Range,
    /// Owning class for members
    pub container: Option<String>,
    pub detail: Option<String>,
    pub docstring: Option<String>,
}

impl IndexedSymbol {
    pub fn location(&self) -> Location {
        Location::new(self.uri.clone(), self.range)
    }
}

/// A use of a module-level name, keyed by the name it was defined under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedReference {
    /// Name at the definition site (`foo` for `from a import foo as bar`)
    pub name: String,
    /// Module defining the name, as far as it is known
    pub origin: String,
    pub location: Location,
    pub is_binding: bool,
}

#[derive(Debug)]
struct FileEntry {
    version: i32,
    module: String,
    definitions: Vec<IndexedSymbol>,
    references: Vec<IndexedReference>,
}

#[derive(Debug, Default)]
struct IndexState {
    files: BTreeMap<Url, Arc<FileEntry>>,
    /// Name to the documents defining it
    definitions: BTreeMap<String, BTreeSet<Url>>,
    /// Name to the documents referencing it
    references: BTreeMap<String, BTreeSet<Url>>,
    /// Module name to document
    modules: BTreeMap<String, Url>,
}

impl IndexState {
    fn remove(&mut self, uri: &Url) -> Option<Arc<FileEntry>> {
        let entry = self.files.remove(uri)?;
        for symbol in &entry.definitions {
            unlink(&mut self.definitions, &symbol.name, uri);
        }
        for reference in &entry.references {
            unlink(&mut self.references, &reference.name, uri);
        }
        if self.modules.get(&entry.module) == Some(uri) {
            self.modules.remove(&entry.module);
        }
        Some(entry)
    }

    fn insert(&mut self, uri: Url, entry: FileEntry) {
        for symbol in &entry.definitions {
            self.definitions
                .entry(symbol.name.clone())
                .or_default()
                .insert(uri.clone());
        }
        for reference in &entry.references {
            self.references
                .entry(reference.name.clone())
                .or_default()
                .insert(uri.clone());
        }
        self.modules.insert(entry.module.clone(), uri.clone());
        self.files.insert(uri, Arc::new(entry));
    }
}

fn unlink(map: &mut BTreeMap<String, BTreeSet<Url>>, name: &str, uri: &Url) {
    if let Some(uris) = map.get_mut(name) {
        uris.remove(uri);
        if uris.is_empty() {
            map.remove(name);
        }
    }
}

/// Workspace-wide symbol index
#[derive(Debug, Default)]
pub struct WorkspaceIndex {
    state: RwLock<IndexState>,
    generation: AtomicU64,
    root: Option<PathBuf>,
}

impl WorkspaceIndex {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Module name of a document relative to the workspace root
    pub fn module_name(&self, uri: &Url) -> Option<String> {
        convert::module_name(self.root(), uri)
    }

    /// Replace everything `uri` contributes. Returns false when the index
    /// already holds a newer version of the document.
    pub fn update(&self, uri: &Url, snapshot: &AnalysisSnapshot) -> bool {
        if self.indexed_version(uri).is_some_and(|v| v > snapshot.version) {
            return false;
        }
        let Some(module) = self.module_name(uri) else {
            debug!(%uri, "not indexing document without a module name");
            return false;
        };
        let entry = build_entry(uri, module, snapshot);

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state
            .files
            .get(uri)
            .is_some_and(|existing| existing.version > snapshot.version)
        {
            return false;
        }
        state.remove(uri);
        debug!(
            %uri,
            version = entry.version,
            definitions = entry.definitions.len(),
            references = entry.references.len(),
            "indexed document"
        );
        state.insert(uri.clone(), entry);
        self.generation.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Drop everything `uri` contributes
    pub fn remove(&self, uri: &Url) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.remove(uri).is_some() {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Bumped by every change; keys memoized resolutions
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn indexed_version(&self, uri: &Url) -> Option<i32> {
        self.read().files.get(uri).map(|entry| entry.version)
    }

    /// Every definition named `name`, ordered by document
    pub fn lookup(&self, name: &str) -> Vec<IndexedSymbol> {
        let state = self.read();
        let Some(uris) = state.definitions.get(name) else {
            return Vec::new();
        };
        uris.iter()
            .filter_map(|uri| state.files.get(uri))
            .flat_map(|entry| entry.definitions.iter().filter(move |s| s.name == name))
            .cloned()
            .collect()
    }

    /// Every indexed use of `name`, ordered by document then position
    pub fn references(&self, name: &str) -> Vec<IndexedReference> {
        let state = self.read();
        let Some(uris) = state.references.get(name) else {
            return Vec::new();
        };
        uris.iter()
            .filter_map(|uri| state.files.get(uri))
            .flat_map(|entry| entry.references.iter().filter(move |r| r.name == name))
            .cloned()
            .collect()
    }

    /// Top-level definitions of a module
    pub fn module_symbols(&self, module: &str) -> Vec<IndexedSymbol> {
        let state = self.read();
        let Some(entry) = module_entry(&state, module) else {
            return Vec::new();
        };
        entry
            .definitions
            .iter()
            .filter(|s| s.container.is_none())
            .cloned()
            .collect()
    }

    /// Document implementing `module`; an exact name wins over a suffix match
    pub fn uri_for_module(&self, module: &str) -> Option<Url> {
        let state = self.read();
        if let Some(uri) = state.modules.get(module) {
            return Some(uri.clone());
        }
        let suffix = format!(".{}", module);
        state
            .modules
            .iter()
            .find(|(name, _)| name.ends_with(&suffix))
            .map(|(_, uri)| uri.clone())
    }

    /// Definitions whose name contains `query`, ignoring case
    pub fn workspace_symbols(&self, query: &str) -> Vec<IndexedSymbol> {
        let query = query.to_lowercase();
        let state = self.read();
        let mut matches = Vec::new();
        for (name, uris) in &state.definitions {
            if !name.to_lowercase().contains(&query) {
                continue;
            }
            for entry in uris.iter().filter_map(|uri| state.files.get(uri)) {
                matches.extend(entry.definitions.iter().filter(|s| &s.name == name).cloned());
            }
        }
        matches.sort_by(|a, b| {
            (&a.name, &a.uri, a.range.start.line, a.range.start.character).cmp(&(
                &b.name,
                &b.uri,
                b.range.start.line,
                b.range.start.character,
            ))
        });
        matches
    }

    pub fn len(&self) -> usize {
        self.read().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().files.is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn module_entry<'a>(state: &'a IndexState, module: &str) -> Option<&'a Arc<FileEntry>> {
    let uri = state.modules.get(module).or_else(|| {
        let suffix = format!(".{}", module);
        state
            .modules
            .iter()
            .find(|(name, _)| name.ends_with(&suffix))
            .map(|(_, uri)| uri)
    })?;
    state.files.get(uri)
}

/// Extract what one snapshot contributes
fn build_entry(uri: &Url, module: String, snapshot: &AnalysisSnapshot) -> FileEntry {
    let scopes = &snapshot.scopes;
    let mut definitions = Vec::new();
    let mut references = Vec::new();

    if scopes.is_empty() {
        return FileEntry {
            version: snapshot.version,
            module,
            definitions,
            references,
        };
    }

    let symbol_entry = |id, container: Option<&str>| {
        let symbol = scopes.symbol(id);
        IndexedSymbol {
            name: symbol.name.clone(),
            kind: symbol.kind,
            uri: uri.clone(),
            module: module.clone(),
            range: convert::span_to_range(snapshot, symbol.span),
            container: container.map(str::to_string),
            detail: symbol.detail.clone(),
            docstring: symbol.docstring.clone(),
        }
    };

    for id in scopes.module_symbols() {
        if scopes.symbol(id).kind != SymbolKind::Import {
            definitions.push(symbol_entry(id, None));
        }
    }
    for (class, id) in scopes.class_members() {
        definitions.push(symbol_entry(id, Some(class)));
    }

    let is_package = convert::is_package_init(uri);
    for reference in scopes.references() {
        let Resolution::Symbol(id) = reference.resolution else {
            continue;
        };
        let symbol = scopes.symbol(id);
        if symbol.scope != scopes.root() {
            continue;
        }
        let (name, origin) = match &symbol.import {
            Some(target) => {
                let Some(origin) = convert::absolute_module(&module, is_package, target) else {
                    continue;
                };
                let name = target.name.clone().unwrap_or_else(|| symbol.name.clone());
                (name, origin)
            }
            None => (symbol.name.clone(), module.clone()),
        };
        references.push(IndexedReference {
            name,
            origin,
            location: Location::new(uri.clone(), convert::span_to_range(snapshot, reference.span)),
            is_binding: reference.is_binding,
        });
    }

    FileEntry {
        version: snapshot.version,
        module,
        definitions,
        references,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pyrite_analyzer::{analyze, AnalysisOptions};

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file:///ws/{}", path)).unwrap()
    }

    fn index_doc(index: &WorkspaceIndex, path: &str, text: &str, version: i32) -> bool {
        let uri = uri(path);
        let snapshot = analyze(uri.as_str(), text, version, &AnalysisOptions::default());
        index.update(&uri, &snapshot)
    }

    fn index() -> WorkspaceIndex {
        WorkspaceIndex::new(Some(PathBuf::from("/ws")))
    }

    #[test]
    fn test_definitions_exclude_imports_and_locals() {
        let index = index();
        index_doc(
            &index,
            "a.py",
            concat!(
                "import os\nfrom b import helper\nLIMIT = 3\n",
                "def foo(x):\n    local = x\n",
                "class Box:\n    size = 1\n    def open(self): pass\n",
            ),
            1,
        );

        assert_eq!(index.lookup("foo").len(), 1);
        assert_eq!(index.lookup("LIMIT")[0].kind, SymbolKind::Variable);
        assert!(index.lookup("os").is_empty());
        assert!(index.lookup("helper").is_empty());
        assert!(index.lookup("local").is_empty());
        assert!(index.lookup("x").is_empty());

        let open = &index.lookup("open")[0];
        assert_eq!(open.container.as_deref(), Some("Box"));
        assert_eq!(open.module, "a");

        let names: Vec<String> = index.module_symbols("a").into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["LIMIT", "foo", "Box"]);
    }

    #[test]
    fn test_update_replaces_document_entries() {
        let index = index();
        index_doc(&index, "a.py", "def foo(): pass\n", 1);
        index_doc(&index, "a.py", "def bar(): pass\n", 2);

        assert!(index.lookup("foo").is_empty());
        assert_eq!(index.lookup("bar").len(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_older_update_is_ignored() {
        let index = index();
        assert!(index_doc(&index, "a.py", "def new(): pass\n", 5));
        let generation = index.generation();
        assert!(!index_doc(&index, "a.py", "def old(): pass\n", 4));

        assert!(index.lookup("old").is_empty());
        assert_eq!(index.lookup("new").len(), 1);
        assert_eq!(index.generation(), generation);
    }

    #[test]
    fn test_remove() {
        let index = index();
        index_doc(&index, "a.py", "def foo(): pass\n", 1);
        index_doc(&index, "b.py", "from a import foo\nfoo()\n", 1);
        index.remove(&uri("a.py"));

        assert!(index.lookup("foo").is_empty());
        assert_eq!(index.uri_for_module("a"), None);
        assert_eq!(index.references("foo").len(), 2);
    }

    #[test]
    fn test_import_references_use_imported_name_and_origin() {
        let index = index();
        index_doc(&index, "pkg/__init__.py", "", 1);
        index_doc(&index, "pkg/core.py", "def run(): pass\n", 1);
        index_doc(&index, "pkg/cli.py", "from .core import run as go\ngo()\n", 1);

        let refs = index.references("run");
        let cli: Vec<&IndexedReference> = refs
            .iter()
            .filter(|r| r.location.uri == uri("pkg/cli.py"))
            .collect();
        assert_eq!(cli.len(), 2);
        assert!(cli.iter().all(|r| r.origin == "pkg.core"));
        assert!(cli[0].is_binding);
        assert!(!cli[1].is_binding);
    }

    #[test]
    fn test_uri_for_module() {
        let index = index();
        index_doc(&index, "src/app/models.py", "class User: pass\n", 1);
        assert_eq!(index.uri_for_module("src.app.models"), Some(uri("src/app/models.py")));
        assert_eq!(index.uri_for_module("app.models"), Some(uri("src/app/models.py")));
        assert_eq!(index.uri_for_module("models.extra"), None);
        assert_eq!(index.module_symbols("app.models").len(), 1);
    }

    #[test]
    fn test_workspace_symbols() {
        let index = index();
        index_doc(&index, "a.py", "def parse_header(): pass\nclass HeaderMap: pass\n", 1);
        index_doc(&index, "b.py", "def body(): pass\n", 1);

        let names: Vec<String> = index
            .workspace_symbols("header")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["HeaderMap", "parse_header"]);
        assert_eq!(index.workspace_symbols("").len(), 3);
    }
}
