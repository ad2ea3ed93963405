//! Pyrite LSP server
//!
//! Owns the protocol lifecycle. One task reads and parses frames in order,
//! another drains outgoing messages to the writer; everything in between is
//! the [`Dispatcher`].

use crate::client::Client;
use crate::dispatcher::Dispatcher;
use crate::error::EngineError;
use crate::protocol::{
    Message, MessageReader, MessageWriter, Notification, Request, RequestId, ResponseError,
};
use crate::session::Session;
use lsp_types::{
    CompletionOptions, DiagnosticOptions, DiagnosticServerCapabilities, HoverProviderCapability,
    InitializeParams, InitializeResult, MessageType, OneOf, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions, WorkDoneProgressOptions,
};
use pyrite_config::{Config, ConfigLoader, Settings};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

/// How long to wait for stragglers to flush their messages after exit
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

enum State {
    Uninitialized,
    Running(Arc<Dispatcher>),
    ShuttingDown(Arc<Dispatcher>),
}

/// Pyrite Language Server
pub struct Server {
    loader: ConfigLoader,
    client: Client,
    outgoing: Option<UnboundedReceiver<Message>>,
    state: State,
}

impl Server {
    /// Create a server that reads configuration through `loader` on initialize
    pub fn new(loader: ConfigLoader) -> Self {
        let (client, outgoing) = Client::channel();
        Self {
            loader,
            client,
            outgoing: Some(outgoing),
            state: State::Uninitialized,
        }
    }

    /// Serve until `exit` or end of input; returns the process exit code
    pub async fn run<R, W>(mut self, input: R, output: W) -> i32
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Some(outgoing) = self.outgoing.take() else {
            return 1;
        };
        let writer = tokio::spawn(write_loop(MessageWriter::new(output), outgoing));
        let mut reader = MessageReader::new(input);

        let code = loop {
            let body = match reader.read_message().await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    info!("input closed without exit");
                    self.abort();
                    break 1;
                }
                Err(e) => {
                    error!("transport error: {}", e);
                    self.abort();
                    break 1;
                }
            };

            match Message::parse(&body) {
                Ok(Message::Request(request)) => self.handle_request(request),
                Ok(Message::Notification(notification)) => {
                    if let Some(code) = self.handle_notification(notification) {
                        break code;
                    }
                }
                Ok(Message::Response(response)) => {
                    debug!(id = ?response.id, "ignoring client response")
                }
                Err(invalid) => {
                    warn!("invalid message: {}", invalid.error);
                    self.client.send(invalid.into_response().into());
                }
            }
        };

        // the writer stops once every client handle is gone
        drop(self);
        if tokio::time::timeout(FLUSH_TIMEOUT, writer).await.is_err() {
            warn!("outgoing messages not flushed before exit");
        }
        info!(code, "server stopped");
        code
    }

    fn handle_request(&mut self, request: Request) {
        match (&self.state, request.method.as_str()) {
            (State::Uninitialized, "initialize") => self.initialize(request),
            (State::Uninitialized, method) => {
                debug!(method, "request before initialize");
                self.reject(request.id, EngineError::NotInitialized);
            }
            (State::Running(_), "initialize") => {
                let error = ResponseError::invalid_request("server already initialized");
                self.client.respond_error(Some(request.id), error);
            }
            (State::Running(dispatcher), "shutdown") => {
                let dispatcher = dispatcher.clone();
                self.state = State::ShuttingDown(dispatcher.clone());
                info!("shutdown requested");

                let client = self.client.clone();
                let id = request.id;
                tokio::spawn(async move {
                    dispatcher.shutdown().await;
                    client.respond(id, Value::Null);
                });
            }
            (State::Running(dispatcher), _) => dispatcher.handle_request(request),
            (State::ShuttingDown(_), method) => {
                debug!(method, "request after shutdown");
                self.reject(request.id, EngineError::ShuttingDown);
            }
        }
    }

    /// Returns the exit code when the notification ends the session
    fn handle_notification(&mut self, notification: Notification) -> Option<i32> {
        if notification.method == "exit" {
            let code = match self.state {
                State::ShuttingDown(_) => 0,
                _ => 1,
            };
            info!(code, "exit");
            self.abort();
            return Some(code);
        }

        match &self.state {
            State::Running(dispatcher) => dispatcher.handle_notification(notification),
            State::Uninitialized | State::ShuttingDown(_) => {
                debug!(method = notification.method.as_str(), "dropping notification");
            }
        }
        None
    }

    fn initialize(&mut self, request: Request) {
        let params: InitializeParams = match serde_json::from_value(request.params) {
            Ok(params) => params,
            Err(e) => {
                self.reject(request.id, EngineError::from(e));
                return;
            }
        };

        let root = workspace_root(&params);
        let mut config = self.load_config(root.as_ref());
        if let Some(options) = &params.initialization_options {
            if let Err(e) = config.apply_init_options(options) {
                warn!("ignoring initializationOptions: {}", e);
                self.client.log_message(
                    MessageType::WARNING,
                    format!("pyrite: ignoring initializationOptions: {}", e),
                );
            }
        }

        let root = root.or_else(|| config.project_root.clone());
        info!(
            root = ?root,
            workers = config.settings.server.workers,
            interpreter = ?config.settings.python.interpreter,
            "initializing"
        );

        let session = Session::new(root, config.settings, self.client.clone());
        self.state = State::Running(Arc::new(Dispatcher::new(Arc::new(session))));

        let result = InitializeResult {
            capabilities: capabilities(),
            server_info: Some(ServerInfo {
                name: "pyrite".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        };
        match serde_json::to_value(result) {
            Ok(result) => self.client.respond(request.id, result),
            Err(e) => self.reject(request.id, EngineError::Internal(e.to_string())),
        }
    }

    /// Configuration for `root`; broken config files fall back to defaults
    fn load_config(&self, root: Option<&PathBuf>) -> Config {
        let start = match root {
            Some(root) => root.clone(),
            None => std::env::current_dir().unwrap_or_default(),
        };
        match self.loader.load_from_directory(&start) {
            Ok(config) => config,
            Err(e) => {
                warn!("using default configuration: {}", e);
                self.client.log_message(
                    MessageType::WARNING,
                    format!("pyrite: using default configuration: {}", e),
                );
                Config {
                    settings: Settings::default(),
                    project_root: None,
                    sources: Vec::new(),
                }
            }
        }
    }

    fn reject(&self, id: RequestId, error: EngineError) {
        self.client.respond_error(Some(id), error.to_response_error());
    }

    /// Cancel all in-flight work
    fn abort(&self) {
        match &self.state {
            State::Running(dispatcher) | State::ShuttingDown(dispatcher) => dispatcher.cancel_all(),
            State::Uninitialized => {}
        }
    }
}

/// Capabilities announced in the initialize response
pub fn capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
            open_close: Some(true),
            change: Some(TextDocumentSyncKind::INCREMENTAL),
            save: Some(TextDocumentSyncSaveOptions::Supported(true)),
            ..Default::default()
        })),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        completion_provider: Some(CompletionOptions {
            trigger_characters: Some(vec![".".to_string()]),
            ..Default::default()
        }),
        definition_provider: Some(OneOf::Left(true)),
        references_provider: Some(OneOf::Left(true)),
        document_symbol_provider: Some(OneOf::Left(true)),
        workspace_symbol_provider: Some(OneOf::Left(true)),
        diagnostic_provider: Some(DiagnosticServerCapabilities::Options(DiagnosticOptions {
            identifier: Some("pyrite".to_string()),
            inter_file_dependencies: true,
            workspace_diagnostics: false,
            work_done_progress_options: WorkDoneProgressOptions::default(),
        })),
        ..Default::default()
    }
}

/// Root directory from `rootUri`, else the first workspace folder
#[allow(deprecated)]
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    let folders = params.workspace_folders.iter().flatten().map(|folder| &folder.uri);
    params
        .root_uri
        .iter()
        .chain(folders)
        .find_map(|uri| uri.to_file_path().ok())
}

async fn write_loop<W>(mut writer: MessageWriter<W>, mut outgoing: UnboundedReceiver<Message>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outgoing.recv().await {
        if let Err(e) = writer.write_message(&message).await {
            error!("failed to write message: {}", e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::{Url, WorkspaceFolder};
    use serde_json::json;

    #[test]
    fn test_workspace_root_prefers_root_uri() {
        let params: InitializeParams = serde_json::from_value(json!({
            "capabilities": {},
            "rootUri": "file:///ws/project",
            "workspaceFolders": [{"uri": "file:///ws/other", "name": "other"}]
        }))
        .unwrap();
        assert_eq!(workspace_root(&params), Some(PathBuf::from("/ws/project")));

        let params = InitializeParams {
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: Url::parse("file:///ws/other").unwrap(),
                name: "other".to_string(),
            }]),
            ..Default::default()
        };
        assert_eq!(workspace_root(&params), Some(PathBuf::from("/ws/other")));
        assert_eq!(workspace_root(&InitializeParams::default()), None);
    }

    #[test]
    fn test_capabilities() {
        let caps = serde_json::to_value(capabilities()).unwrap();
        assert_eq!(caps["textDocumentSync"]["change"], 2);
        assert_eq!(caps["completionProvider"]["triggerCharacters"], json!(["."]));
        assert_eq!(caps["diagnosticProvider"]["identifier"], "pyrite");
        assert_eq!(caps["workspaceSymbolProvider"], true);
    }
}
