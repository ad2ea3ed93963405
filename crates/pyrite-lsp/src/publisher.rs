//! Push diagnostics, last write wins
//!
//! A diagnostics set goes out only if its version is still the document's
//! current version and no newer set has been sent for the document. The check
//! and the send happen under one lock, so sets reach the writer in version
//! order.

use crate::client::Client;
use crate::convert;
use crate::document::DocumentStore;
use lsp_types::Url;
use pyrite_analyzer::AnalysisSnapshot;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::trace;

pub struct DiagnosticsPublisher {
    client: Client,
    /// Last version published per document
    published: Mutex<HashMap<Url, i32>>,
}

impl DiagnosticsPublisher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            published: Mutex::new(HashMap::new()),
        }
    }

    /// Publish the diagnostics of `snapshot` if it is still current
    pub fn publish(
        &self,
        documents: &DocumentStore,
        uri: &Url,
        snapshot: &AnalysisSnapshot,
    ) -> bool {
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);

        if documents.version(uri) != Some(snapshot.version) {
            trace!(%uri, version = snapshot.version, "document moved on, not publishing");
            return false;
        }
        if published.get(uri).is_some_and(|&v| v >= snapshot.version) {
            return false;
        }

        published.insert(uri.clone(), snapshot.version);
        self.client.publish_diagnostics(
            uri.clone(),
            convert::diagnostics_to_lsp(snapshot),
            Some(snapshot.version),
        );
        true
    }

    /// Clear a closed document's diagnostics in the editor
    pub fn clear(&self, uri: &Url) {
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        published.remove(uri);
        self.client.publish_diagnostics(uri.clone(), Vec::new(), None);
    }

    pub fn published_version(&self, uri: &Url) -> Option<i32> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Edit;
    use crate::protocol::Message;
    use pyrite_analyzer::{analyze, AnalysisOptions};

    fn uri() -> Url {
        Url::parse("file:///ws/a.py").unwrap()
    }

    fn snapshot(text: &str, version: i32) -> AnalysisSnapshot {
        analyze(uri().as_str(), text, version, &AnalysisOptions::default())
    }

    #[test]
    fn test_only_current_version_is_published() {
        let (client, mut rx) = Client::channel();
        let publisher = DiagnosticsPublisher::new(client);
        let documents = DocumentStore::new();
        documents.open(uri(), "x\n", 1, "python");
        documents.apply_edit(&uri(), Edit::full("y\n")).unwrap();

        assert!(!publisher.publish(&documents, &uri(), &snapshot("x\n", 1)));
        assert!(publisher.publish(&documents, &uri(), &snapshot("y\n", 2)));
        assert!(!publisher.publish(&documents, &uri(), &snapshot("y\n", 2)));
        assert_eq!(publisher.published_version(&uri()), Some(2));

        let Ok(Message::Notification(sent)) = rx.try_recv() else {
            panic!("expected one notification");
        };
        assert_eq!(sent.method, "textDocument/publishDiagnostics");
        assert_eq!(sent.params["version"], 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clear_sends_empty_set() {
        let (client, mut rx) = Client::channel();
        let publisher = DiagnosticsPublisher::new(client);
        publisher.clear(&uri());

        let Ok(Message::Notification(sent)) = rx.try_recv() else {
            panic!("expected one notification");
        };
        assert_eq!(sent.params["diagnostics"], serde_json::json!([]));
        assert_eq!(publisher.published_version(&uri()), None);
    }
}
