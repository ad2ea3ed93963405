//! Request dispatcher
//!
//! Runs inside the server's read loop. Notifications that mutate documents
//! are applied synchronously, before the next message is read, so a request
//! always observes every edit received before it. Requests capture the
//! document's text and version synchronously and then compute on their own
//! task, so requests for different documents (and read-only requests for the
//! same one) run concurrently.
//!
//! Request lifecycle:
//! `Received -> SnapshotCaptured -> Computing -> Completed | Cancelled | Failed`.
//! A cancelled request gets no response.

use crate::cancel::CancellationToken;
use crate::completion;
use crate::convert;
use crate::document::{DocumentError, Edit};
use crate::error::{EngineError, EngineResult};
use crate::hover;
use crate::navigation;
use crate::protocol::{Notification, Request, RequestId};
use crate::session::Session;
use crate::symbols;
use lsp_types::{
    CompletionParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DocumentDiagnosticParams, DocumentDiagnosticReport,
    DocumentDiagnosticReportResult, DocumentSymbolParams, DocumentSymbolResponse,
    FullDocumentDiagnosticReport, GotoDefinitionParams, GotoDefinitionResponse, HoverParams,
    ReferenceParams, RelatedFullDocumentDiagnosticReport, RelatedUnchangedDocumentDiagnosticReport,
    UnchangedDocumentDiagnosticReport, Url, WorkspaceSymbolParams,
};
use pyrite_analyzer::AnalysisSnapshot;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Where a request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    SnapshotCaptured,
    Computing,
    Completed,
    Cancelled,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Received => "received",
            RequestState::SnapshotCaptured => "snapshot-captured",
            RequestState::Computing => "computing",
            RequestState::Completed => "completed",
            RequestState::Cancelled => "cancelled",
            RequestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize)]
struct CancelParams {
    id: RequestId,
}

struct DiagnosticsJob {
    id: u64,
    token: CancellationToken,
}

/// Counts running request tasks so shutdown can wait for them
#[derive(Default)]
struct ActiveRequests {
    count: AtomicUsize,
    idle: Notify,
}

impl ActiveRequests {
    fn enter(self: &Arc<Self>) -> ActiveGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        ActiveGuard { active: self.clone() }
    }

    async fn wait_idle(&self) {
        loop {
            let idle = self.idle.notified();
            if self.count.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }
}

struct ActiveGuard {
    active: Arc<ActiveRequests>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if self.active.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.active.idle.notify_waiters();
        }
    }
}

type Registry<K, V> = Arc<Mutex<HashMap<K, V>>>;

fn lock<K, V>(registry: &Registry<K, V>) -> MutexGuard<'_, HashMap<K, V>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Dispatcher {
    session: Arc<Session>,
    /// Cancellation tokens of requests still computing
    requests: Registry<RequestId, CancellationToken>,
    /// Running diagnostics pass per document
    diagnostics: Registry<Url, DiagnosticsJob>,
    active: Arc<ActiveRequests>,
    next_job: AtomicU64,
}

impl Dispatcher {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            requests: Arc::default(),
            diagnostics: Arc::default(),
            active: Arc::default(),
            next_job: AtomicU64::new(0),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Apply a notification; document changes are complete on return
    pub fn handle_notification(&self, notification: Notification) {
        let method = notification.method.as_str();
        debug!(method, "notification");

        match method {
            "initialized" => info!("client initialized"),
            "textDocument/didOpen" => {
                let params = parse_notification::<DidOpenTextDocumentParams>(&notification);
                if let Some(params) = params {
                    self.did_open(params);
                }
            }
            "textDocument/didChange" => {
                let params = parse_notification::<DidChangeTextDocumentParams>(&notification);
                if let Some(params) = params {
                    self.did_change(params);
                }
            }
            "textDocument/didClose" => {
                let params = parse_notification::<DidCloseTextDocumentParams>(&notification);
                if let Some(params) = params {
                    self.did_close(&params.text_document.uri);
                }
            }
            "textDocument/didSave" => {}
            "$/cancelRequest" => {
                if let Some(params) = parse_notification::<CancelParams>(&notification) {
                    self.cancel_request(&params.id);
                }
            }
            method if method.starts_with("$/") => {}
            method => warn!(method, "unhandled notification"),
        }
    }

    fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        self.session
            .documents()
            .open(document.uri.clone(), &document.text, document.version, document.language_id);
        self.schedule_diagnostics(&document.uri);
    }

    fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let edits: Vec<Edit> = params.content_changes.into_iter().map(Edit::from).collect();

        match self
            .session
            .documents()
            .apply_changes(&uri, params.text_document.version, edits)
        {
            Ok(version) => {
                debug!(%uri, version, "document changed");
                self.schedule_diagnostics(&uri);
            }
            Err(e) => warn!("rejected change: {}", e),
        }
    }

    fn did_close(&self, uri: &Url) {
        if let Some(job) = lock(&self.diagnostics).remove(uri) {
            job.token.cancel();
        }

        let session = &self.session;
        session.documents().close(uri);
        session.cache().evict_document(uri);
        // files that still exist keep serving cross-file navigation
        let on_disk = uri.to_file_path().map(|path| path.exists()).unwrap_or(false);
        if !on_disk {
            session.index().remove(uri);
        }
        session.publisher().clear(uri);
    }

    /// Cancel a running request; finished or unknown ids are ignored
    pub fn cancel_request(&self, id: &RequestId) {
        if let Some(token) = lock(&self.requests).get(id) {
            debug!(%id, "cancelling request");
            token.cancel();
        }
    }

    /// Analyze the current version of `uri`, then index and publish it.
    ///
    /// Supersedes any diagnostics pass still running for an older version.
    fn schedule_diagnostics(&self, uri: &Url) {
        let Some(document) = self.session.documents().get(uri) else {
            return;
        };
        let token = CancellationToken::new();
        let id = self.next_job.fetch_add(1, Ordering::Relaxed);

        let previous = lock(&self.diagnostics).insert(
            uri.clone(),
            DiagnosticsJob {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }

        let session = self.session.clone();
        let jobs = self.diagnostics.clone();
        let uri = uri.clone();
        tokio::spawn(async move {
            let analysis = session
                .analysis(&uri, document.version, document.text.clone(), &token)
                .await;
            match analysis {
                Ok(snapshot) if !token.is_cancelled() => {
                    session.index().update(&uri, &snapshot);
                    session.publisher().publish(session.documents(), &uri, &snapshot);
                }
                _ => debug!(%uri, version = document.version, "diagnostics pass superseded"),
            }

            let mut jobs = lock(&jobs);
            if jobs.get(&uri).is_some_and(|job| job.id == id) {
                jobs.remove(&uri);
            }
        });
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Start a request; its response is sent when it completes
    pub fn handle_request(&self, request: Request) {
        let Request { id, method, params, .. } = request;
        debug!(%id, method = method.as_str(), state = %RequestState::Received, "request");

        match method.as_str() {
            "textDocument/hover" => {
                let Some(params) = self.parse_params::<HoverParams>(&id, params) else {
                    return;
                };
                let position = params.text_document_position_params;
                self.document_request(
                    id,
                    "textDocument/hover",
                    position.text_document.uri,
                    move |session, uri, snapshot| {
                        to_json(hover::generate_hover(session, uri, snapshot, position.position))
                    },
                );
            }
            "textDocument/completion" => {
                let Some(params) = self.parse_params::<CompletionParams>(&id, params) else {
                    return;
                };
                let position = params.text_document_position;
                self.document_request(
                    id,
                    "textDocument/completion",
                    position.text_document.uri,
                    move |session, uri, snapshot| {
                        to_json(completion::generate_completions(
                            session,
                            uri,
                            snapshot,
                            position.position,
                        ))
                    },
                );
            }
            "textDocument/definition" => {
                let Some(params) = self.parse_params::<GotoDefinitionParams>(&id, params) else {
                    return;
                };
                let position = params.text_document_position_params;
                self.document_request(
                    id,
                    "textDocument/definition",
                    position.text_document.uri,
                    move |session, uri, snapshot| {
                        let locations =
                            navigation::find_definition(session, uri, snapshot, position.position);
                        to_json(GotoDefinitionResponse::Array(locations))
                    },
                );
            }
            "textDocument/references" => {
                let Some(params) = self.parse_params::<ReferenceParams>(&id, params) else {
                    return;
                };
                let position = params.text_document_position;
                let include_declaration = params.context.include_declaration;
                self.document_request(
                    id,
                    "textDocument/references",
                    position.text_document.uri,
                    move |session, uri, snapshot| {
                        to_json(navigation::find_references(
                            session,
                            uri,
                            snapshot,
                            position.position,
                            include_declaration,
                        ))
                    },
                );
            }
            "textDocument/documentSymbol" => {
                let Some(params) = self.parse_params::<DocumentSymbolParams>(&id, params) else {
                    return;
                };
                self.document_request(
                    id,
                    "textDocument/documentSymbol",
                    params.text_document.uri,
                    |_, _, snapshot| {
                        to_json(DocumentSymbolResponse::Nested(symbols::document_symbols(snapshot)))
                    },
                );
            }
            "textDocument/diagnostic" => {
                let Some(params) = self.parse_params::<DocumentDiagnosticParams>(&id, params) else {
                    return;
                };
                let previous = params.previous_result_id;
                self.document_request(
                    id,
                    "textDocument/diagnostic",
                    params.text_document.uri,
                    move |_, _, snapshot| to_json(diagnostic_report(snapshot, previous.as_deref())),
                );
            }
            "workspace/symbol" => {
                let Some(params) = self.parse_params::<WorkspaceSymbolParams>(&id, params) else {
                    return;
                };
                self.spawn_request(id, "workspace/symbol", move |session, _| async move {
                    to_json(symbols::workspace_symbols(session.index(), &params.query))
                });
            }
            method => {
                warn!(method, "unknown request");
                self.respond_error(id, EngineError::MethodNotFound(method.to_string()));
            }
        }
    }

    /// Capture the document now; analyze and run `handler` on a task
    fn document_request<H>(&self, id: RequestId, method: &'static str, uri: Url, handler: H)
    where
        H: FnOnce(&Session, &Url, &AnalysisSnapshot) -> EngineResult<Value> + Send + 'static,
    {
        let Some(document) = self.session.documents().get(&uri) else {
            let error = DocumentError::UnknownDocument(uri);
            self.respond_error(id, error.into());
            return;
        };
        debug!(
            %id,
            method,
            uri = %document.uri,
            version = document.version,
            state = %RequestState::SnapshotCaptured,
            "request"
        );

        self.spawn_request(id, method, move |session, token| async move {
            let snapshot = session
                .analysis(&document.uri, document.version, document.text.clone(), &token)
                .await?;
            if token.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            handler(session.as_ref(), &document.uri, snapshot.as_ref())
        });
    }

    /// Run `work` on its own task under a fresh cancellation token
    fn spawn_request<F, Fut>(&self, id: RequestId, method: &'static str, work: F)
    where
        F: FnOnce(Arc<Session>, CancellationToken) -> Fut,
        Fut: Future<Output = EngineResult<Value>> + Send + 'static,
    {
        let token = CancellationToken::new();
        lock(&self.requests).insert(id.clone(), token.clone());

        let guard = self.active.enter();
        let requests = self.requests.clone();
        let client = self.session.client().clone();
        let computation = work(self.session.clone(), token.clone());

        tokio::spawn(async move {
            let _guard = guard;
            debug!(%id, method, state = %RequestState::Computing, "request");

            // a panicking handler surfaces as a join error
            let outcome = match tokio::spawn(computation).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => {
                    Err(EngineError::Internal(format!("{} handler panicked", method)))
                }
                Err(_) => Err(EngineError::Cancelled),
            };
            lock(&requests).remove(&id);

            match outcome {
                _ if token.is_cancelled() => {
                    debug!(%id, method, state = %RequestState::Cancelled, "request");
                }
                Err(EngineError::Cancelled) => {
                    debug!(%id, method, state = %RequestState::Cancelled, "request");
                }
                Ok(result) => {
                    debug!(%id, method, state = %RequestState::Completed, "request");
                    client.respond(id, result);
                }
                Err(e) => {
                    match &e {
                        EngineError::Internal(_) => {
                            error!(%id, method, state = %RequestState::Failed, "{}", e)
                        }
                        _ => debug!(%id, method, state = %RequestState::Failed, "{}", e),
                    }
                    client.respond_error(Some(id), e.to_response_error());
                }
            }
        });
    }

    fn parse_params<P: DeserializeOwned>(&self, id: &RequestId, params: Value) -> Option<P> {
        match serde_json::from_value(params) {
            Ok(params) => Some(params),
            Err(e) => {
                self.respond_error(id.clone(), EngineError::from(e));
                None
            }
        }
    }

    fn respond_error(&self, id: RequestId, error: EngineError) {
        debug!(%id, state = %RequestState::Failed, "{}", error);
        self.session.client().respond_error(Some(id), error.to_response_error());
    }

    /// Number of requests still computing
    pub fn pending_requests(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Wait for every running request to finish; diagnostics passes are dropped
    pub async fn shutdown(&self) {
        for (_, job) in lock(&self.diagnostics).drain() {
            job.token.cancel();
        }
        self.active.wait_idle().await;
    }

    /// Cancel everything still running
    pub fn cancel_all(&self) {
        for token in lock(&self.requests).values() {
            token.cancel();
        }
        for (_, job) in lock(&self.diagnostics).drain() {
            job.token.cancel();
        }
    }
}

fn parse_notification<P: DeserializeOwned>(notification: &Notification) -> Option<P> {
    match serde_json::from_value(notification.params.clone()) {
        Ok(params) => Some(params),
        Err(e) => {
            warn!(method = notification.method.as_str(), "invalid notification params: {}", e);
            None
        }
    }
}

fn to_json<T: Serialize>(value: T) -> EngineResult<Value> {
    serde_json::to_value(value).map_err(|e| EngineError::Internal(e.to_string()))
}

/// Full report for the snapshot's version, or "unchanged" when the client
/// already holds it
fn diagnostic_report(
    snapshot: &AnalysisSnapshot,
    previous_result_id: Option<&str>,
) -> DocumentDiagnosticReportResult {
    let result_id = snapshot.version.to_string();
    let report = if previous_result_id == Some(result_id.as_str()) {
        DocumentDiagnosticReport::Unchanged(RelatedUnchangedDocumentDiagnosticReport {
            related_documents: None,
            unchanged_document_diagnostic_report: UnchangedDocumentDiagnosticReport { result_id },
        })
    } else {
        DocumentDiagnosticReport::Full(RelatedFullDocumentDiagnosticReport {
            related_documents: None,
            full_document_diagnostic_report: FullDocumentDiagnosticReport {
                result_id: Some(result_id),
                items: convert::diagnostics_to_lsp(snapshot),
            },
        })
    };
    DocumentDiagnosticReportResult::Report(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::protocol::{error_codes, Message, Response};
    use pyrite_config::Settings;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn dispatcher() -> (Dispatcher, UnboundedReceiver<Message>) {
        let (client, rx) = Client::channel();
        let session = Session::new(None, Settings::default(), client);
        (Dispatcher::new(Arc::new(session)), rx)
    }

    fn open(dispatcher: &Dispatcher, uri: &str, text: &str) {
        dispatcher.handle_notification(Notification::new(
            "textDocument/didOpen",
            json!({
                "textDocument": {"uri": uri, "languageId": "python", "version": 1, "text": text}
            }),
        ));
    }

    async fn next_response(rx: &mut UnboundedReceiver<Message>) -> Response {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("message in time")
                .expect("channel open");
            if let Message::Response(response) = message {
                return response;
            }
        }
    }

    fn completion(id: i64, uri: &str, line: u32, character: u32) -> Request {
        Request::new(
            id,
            "textDocument/completion",
            json!({
                "textDocument": {"uri": uri},
                "position": {"line": line, "character": character}
            }),
        )
    }

    #[tokio::test]
    async fn test_unknown_document_is_invalid_params() {
        let (dispatcher, mut rx) = dispatcher();
        dispatcher.handle_request(completion(1, "file:///ws/missing.py", 0, 0));

        let response = next_response(&mut rx).await;
        let error = response.error.unwrap();
        assert_eq!(error.code, error_codes::INVALID_PARAMS);
        assert!(error.message.contains("UnknownDocument"));
    }

    #[tokio::test]
    async fn test_invalid_params_and_unknown_method() {
        let (dispatcher, mut rx) = dispatcher();
        dispatcher.handle_request(Request::new(1, "textDocument/hover", json!({"bogus": true})));
        assert_eq!(next_response(&mut rx).await.error.unwrap().code, error_codes::INVALID_PARAMS);

        dispatcher.handle_request(Request::new(2, "textDocument/rename", json!({})));
        assert_eq!(next_response(&mut rx).await.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancelled_completion_gets_no_response() {
        let (dispatcher, mut rx) = dispatcher();
        let uri = "file:///ws/main.py";

        // hold every analysis permit so the request stays in Computing
        let workers = dispatcher.session().settings().server.workers as u32;
        let permits = dispatcher
            .session()
            .cache()
            .workers()
            .clone()
            .acquire_many_owned(workers)
            .await
            .unwrap();

        open(&dispatcher, uri, "value = 1\nval\n");
        dispatcher.handle_request(completion(7, uri, 1, 3));
        assert_eq!(dispatcher.pending_requests(), 1);

        dispatcher.handle_notification(Notification::new("$/cancelRequest", json!({"id": 7})));
        dispatcher.shutdown().await;
        drop(permits);

        assert_eq!(dispatcher.pending_requests(), 0);
        while let Ok(message) = rx.try_recv() {
            assert!(
                !matches!(message, Message::Response(_)),
                "cancelled request was answered: {:?}",
                message
            );
        }

        // the engine keeps serving
        dispatcher.handle_request(completion(8, uri, 1, 3));
        let response = next_response(&mut rx).await;
        assert_eq!(response.id, Some(RequestId::Number(8)));
        let labels: Vec<String> = response.result.unwrap()["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["label"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(labels[0], "value");
    }

    async fn settle(dispatcher: &Dispatcher) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while dispatcher.pending_requests() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("requests settle");
    }

    #[tokio::test]
    async fn test_cancel_after_edit_discards_stale_completion() {
        let (dispatcher, mut rx) = dispatcher();
        let uri = "file:///ws/main.py";
        let url = Url::parse(uri).unwrap();

        let workers = dispatcher.session().settings().server.workers as u32;
        let permits = dispatcher
            .session()
            .cache()
            .workers()
            .clone()
            .acquire_many_owned(workers)
            .await
            .unwrap();

        dispatcher.handle_notification(Notification::new(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": "python",
                    "version": 4,
                    "text": "value = 1\nval\n"
                }
            }),
        ));
        dispatcher.handle_request(completion(11, uri, 1, 3));
        dispatcher.handle_notification(Notification::new(
            "textDocument/didChange",
            json!({
                "textDocument": {"uri": uri, "version": 5},
                "contentChanges": [{
                    "range": {
                        "start": {"line": 1, "character": 3},
                        "end": {"line": 1, "character": 3}
                    },
                    "text": "ue"
                }]
            }),
        ));
        dispatcher.handle_notification(Notification::new("$/cancelRequest", json!({"id": 11})));
        settle(&dispatcher).await;
        drop(permits);

        // the v5 diagnostics pass still runs to completion
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("diagnostics in time")
                .expect("channel open");
            match message {
                Message::Response(response) => {
                    panic!("cancelled request was answered: {:?}", response)
                }
                Message::Notification(n) if n.method == "textDocument/publishDiagnostics" => {
                    assert_eq!(n.params["version"], 5);
                    break;
                }
                _ => {}
            }
        }

        let document = dispatcher.session().documents().get(&url).unwrap();
        assert_eq!(document.version, 5);
        assert_eq!(&*document.text, "value = 1\nvalue\n");

        let cache = dispatcher.session().cache();
        assert!(!cache.contains(&url, 4));
        assert!(cache.contains(&url, 5));
        assert_eq!(cache.stats().computations, 1);
        assert_eq!(cache.pending(), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_ignored() {
        let (dispatcher, mut rx) = dispatcher();
        let uri = "file:///ws/main.py";
        open(&dispatcher, uri, "x = 1\n");

        dispatcher.handle_request(Request::new(
            3,
            "textDocument/documentSymbol",
            json!({"textDocument": {"uri": uri}}),
        ));
        let response = next_response(&mut rx).await;
        assert!(response.is_success());

        dispatcher.handle_notification(Notification::new("$/cancelRequest", json!({"id": 3})));
        dispatcher.handle_notification(Notification::new("$/cancelRequest", json!({"id": "nope"})));
        assert_eq!(dispatcher.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_pull_diagnostics() {
        let (dispatcher, mut rx) = dispatcher();
        let uri = "file:///ws/main.py";
        open(&dispatcher, uri, "def f():\n    return x\n");

        dispatcher.handle_request(Request::new(
            1,
            "textDocument/diagnostic",
            json!({"textDocument": {"uri": uri}}),
        ));
        let result = next_response(&mut rx).await.result.unwrap();
        assert_eq!(result["kind"], "full");
        assert_eq!(result["resultId"], "1");
        assert_eq!(result["items"][0]["message"], "undefined name 'x'");

        dispatcher.handle_request(Request::new(
            2,
            "textDocument/diagnostic",
            json!({"textDocument": {"uri": uri}, "previousResultId": "1"}),
        ));
        let result = next_response(&mut rx).await.result.unwrap();
        assert_eq!(result["kind"], "unchanged");
    }

    #[tokio::test]
    async fn test_rejected_change_keeps_document() {
        let (dispatcher, _rx) = dispatcher();
        let uri = "file:///ws/main.py";
        open(&dispatcher, uri, "abc\n");

        dispatcher.handle_notification(Notification::new(
            "textDocument/didChange",
            json!({
                "textDocument": {"uri": uri, "version": 2},
                "contentChanges": [{
                    "range": {
                        "start": {"line": 9, "character": 0},
                        "end": {"line": 9, "character": 1}
                    },
                    "text": "z"
                }]
            }),
        ));

        let url = Url::parse(uri).unwrap();
        let document = dispatcher.session().documents().get(&url).unwrap();
        assert_eq!(document.version, 1);
        assert_eq!(&*document.text, "abc\n");
    }

    #[test]
    fn test_request_state_display() {
        assert_eq!(RequestState::SnapshotCaptured.to_string(), "snapshot-captured");
        assert_eq!(RequestState::Cancelled.to_string(), "cancelled");
    }
}
