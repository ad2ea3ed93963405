//! Per-connection engine state
//!
//! A [`Session`] exists from `initialize` until the connection closes and is
//! shared by every request task through an `Arc`.

use crate::cache::AnalysisCache;
use crate::cancel::CancellationToken;
use crate::client::Client;
use crate::document::DocumentStore;
use crate::index::WorkspaceIndex;
use crate::publisher::DiagnosticsPublisher;
use crate::resolver::{ImportResolver, Resolved};
use lsp_types::Url;
use pyrite_analyzer::{
    AnalysisOptions, AnalysisSnapshot, Cancelled, ImportTarget, Severity, StarImportPolicy,
};
use pyrite_config::{AnalysisSettings, DiagnosticLevel, Settings, StarImports};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub struct Session {
    root: Option<PathBuf>,
    settings: Settings,
    documents: DocumentStore,
    cache: AnalysisCache,
    index: WorkspaceIndex,
    resolver: ImportResolver,
    publisher: DiagnosticsPublisher,
    client: Client,
}

impl Session {
    pub fn new(root: Option<PathBuf>, settings: Settings, client: Client) -> Self {
        info!(
            root = ?root,
            workers = settings.server.workers,
            interpreter = ?settings.python.interpreter,
            "session started"
        );
        Self {
            cache: AnalysisCache::new(
                settings.server.workers,
                analysis_options(&settings.analysis),
            ),
            index: WorkspaceIndex::new(root.clone()),
            resolver: ImportResolver::default(),
            publisher: DiagnosticsPublisher::new(client.clone()),
            documents: DocumentStore::new(),
            root,
            settings,
            client,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub fn index(&self) -> &WorkspaceIndex {
        &self.index
    }

    pub fn publisher(&self) -> &DiagnosticsPublisher {
        &self.publisher
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Analysis of `text` at `(uri, version)` through the cache
    pub async fn analysis(
        &self,
        uri: &Url,
        version: i32,
        text: Arc<str>,
        cancel: &CancellationToken,
    ) -> Result<Arc<AnalysisSnapshot>, Cancelled> {
        self.cache.get_or_compute(uri, version, text, cancel).await
    }

    /// Resolve an import of `snapshot` through the workspace index
    pub fn resolve_import(
        &self,
        uri: &Url,
        snapshot: &AnalysisSnapshot,
        target: &ImportTarget,
    ) -> Option<Resolved> {
        self.resolver.resolve(&self.index, uri, snapshot.version, target)
    }
}

/// Analyzer policy for the configured analysis settings
pub fn analysis_options(settings: &AnalysisSettings) -> AnalysisOptions {
    AnalysisOptions {
        unresolved_severity: match settings.unresolved_severity {
            DiagnosticLevel::Error => Severity::Error,
            DiagnosticLevel::Warning => Severity::Warning,
            DiagnosticLevel::Information => Severity::Information,
            DiagnosticLevel::Hint => Severity::Hint,
        },
        star_imports: match settings.star_imports {
            StarImports::Suppress => StarImportPolicy::Suppress,
            StarImports::Report => StarImportPolicy::Report,
        },
        extra_builtins: settings.extra_builtins.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_options_from_settings() {
        let settings = AnalysisSettings {
            unresolved_severity: DiagnosticLevel::Warning,
            star_imports: StarImports::Report,
            extra_builtins: vec!["reveal_type".to_string()],
        };
        let options = analysis_options(&settings);
        assert_eq!(options.unresolved_severity, Severity::Warning);
        assert_eq!(options.star_imports, StarImportPolicy::Report);
        assert_eq!(options.extra_builtins, vec!["reveal_type".to_string()]);
    }

    #[test]
    fn test_default_settings_match_default_options() {
        assert_eq!(
            analysis_options(&Settings::default().analysis),
            AnalysisOptions::default()
        );
    }
}
