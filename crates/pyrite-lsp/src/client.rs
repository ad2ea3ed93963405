//! Handle for messages travelling to the editor
//!
//! Every outgoing message goes through one unbounded channel drained by the
//! server's writer task, so messages are framed one at a time and in the
//! order they were queued.

use crate::protocol::{Message, Notification, RequestId, Response, ResponseError};
use lsp_types::notification::{LogMessage, Notification as _, PublishDiagnostics};
use lsp_types::{Diagnostic, LogMessageParams, MessageType, PublishDiagnosticsParams, Url};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Client {
    tx: mpsc::UnboundedSender<Message>,
}

impl Client {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }

    /// Client plus the receiving end, for the writer task or tests
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, message: Message) {
        if self.tx.send(message).is_err() {
            debug!("writer closed, dropping outgoing message");
        }
    }

    pub fn respond(&self, id: RequestId, result: Value) {
        self.send(Response::success(id, result).into());
    }

    pub fn respond_error(&self, id: Option<RequestId>, error: ResponseError) {
        self.send(Response::error(id, error).into());
    }

    pub fn notify<P: Serialize>(&self, method: &str, params: P) {
        match serde_json::to_value(params) {
            Ok(params) => self.send(Notification::new(method, params).into()),
            Err(e) => warn!("failed to serialize {} params: {}", method, e),
        }
    }

    pub fn publish_diagnostics(
        &self,
        uri: Url,
        diagnostics: Vec<Diagnostic>,
        version: Option<i32>,
    ) {
        self.notify(
            PublishDiagnostics::METHOD,
            PublishDiagnosticsParams::new(uri, diagnostics, version),
        );
    }

    pub fn log_message(&self, typ: MessageType, message: impl Into<String>) {
        self.notify(
            LogMessage::METHOD,
            LogMessageParams {
                typ,
                message: message.into(),
            },
        );
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
