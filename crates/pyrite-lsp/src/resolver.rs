//! Lazy resolution of import edges through the workspace index
//!
//! Results are memoized per importing document version and index generation,
//! so any index change makes older entries unreachable; the LRU bound ages
//! them out.

use crate::convert;
use crate::index::{IndexedSymbol, WorkspaceIndex};
use lru::LruCache;
use lsp_types::Url;
use pyrite_analyzer::ImportTarget;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use tracing::trace;

/// Default number of memoized resolutions
pub const DEFAULT_CAPACITY: usize = 1024;

/// What an import refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Symbol(IndexedSymbol),
    Module(Url),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolveKey {
    uri: Url,
    version: i32,
    target: String,
    generation: u64,
}

/// Import resolver
pub struct ImportResolver {
    cache: Mutex<LruCache<ResolveKey, Option<Resolved>>>,
}

impl Default for ImportResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ImportResolver {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Resolve `target`, imported by version `version` of `uri`
    pub fn resolve(
        &self,
        index: &WorkspaceIndex,
        uri: &Url,
        version: i32,
        target: &ImportTarget,
    ) -> Option<Resolved> {
        let key = ResolveKey {
            uri: uri.clone(),
            version,
            target: format!("{}:{}", target.module_path(), target.name.as_deref().unwrap_or("")),
            generation: index.generation(),
        };

        if let Some(hit) = self.lock().get(&key) {
            return hit.clone();
        }

        let resolved = resolve_uncached(index, uri, target);
        trace!(%uri, target = %key.target, found = resolved.is_some(), "resolved import");
        self.lock().put(key, resolved.clone());
        resolved
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<ResolveKey, Option<Resolved>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Module path match first, then any definition of the name
fn resolve_uncached(index: &WorkspaceIndex, uri: &Url, target: &ImportTarget) -> Option<Resolved> {
    let importer = index.module_name(uri).unwrap_or_default();
    let module = convert::absolute_module(&importer, convert::is_package_init(uri), target);
    let module_uri = module.as_deref().and_then(|m| index.uri_for_module(m));

    let Some(name) = &target.name else {
        return module_uri.map(Resolved::Module);
    };

    let candidates = index.lookup(name);
    if let Some(module_uri) = &module_uri {
        if let Some(symbol) = candidates
            .iter()
            .find(|s| &s.uri == module_uri && s.container.is_none())
        {
            return Some(Resolved::Symbol(symbol.clone()));
        }
    }

    // `from pkg import sub` may name a submodule
    if let Some(submodule) = module
        .as_deref()
        .and_then(|m| index.uri_for_module(&format!("{}.{}", m, name)))
    {
        return Some(Resolved::Module(submodule));
    }

    candidates
        .iter()
        .find(|s| s.container.is_none())
        .or_else(|| candidates.first())
        .cloned()
        .map(Resolved::Symbol)
}
