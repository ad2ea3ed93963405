//! In-memory LSP client driving a real server over a duplex pipe

#![allow(dead_code)]

use lsp_types::{PublishDiagnosticsParams, Url};
use pyrite_config::ConfigLoader;
use pyrite_lsp::protocol::{Message, MessageReader, Notification, Request, RequestId, Response};
use pyrite_lsp::Server;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

const TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestClient {
    writer: Option<WriteHalf<DuplexStream>>,
    reader: MessageReader<ReadHalf<DuplexStream>>,
    server: JoinHandle<i32>,
    next_id: i64,
    /// Notifications received while waiting for something else
    pub notifications: Vec<Notification>,
    pub workspace: TempDir,
}

impl TestClient {
    pub fn start() -> Self {
        let workspace = tempfile::tempdir().unwrap();
        let (client_io, server_io) = tokio::io::duplex(1 << 20);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, client_write) = tokio::io::split(client_io);

        // keep the user's global config out of the tests
        let loader = ConfigLoader::with_global_config(workspace.path().join("global.toml"));
        let server = tokio::spawn(Server::new(loader).run(server_read, server_write));

        Self {
            writer: Some(client_write),
            reader: MessageReader::new(client_read),
            server,
            next_id: 1,
            notifications: Vec::new(),
            workspace,
        }
    }

    pub fn uri(&self, name: &str) -> Url {
        Url::from_file_path(self.workspace.path().join(name)).unwrap()
    }

    pub fn root_uri(&self) -> Url {
        Url::from_directory_path(self.workspace.path()).unwrap()
    }

    pub async fn write_frame(&mut self, body: &str) {
        let writer = self.writer.as_mut().expect("input still open");
        let frame = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        writer.write_all(frame.as_bytes()).await.unwrap();
        writer.flush().await.unwrap();
    }

    pub async fn send(&mut self, message: Message) {
        let body = message.to_json().unwrap();
        self.write_frame(&body).await;
    }

    pub async fn send_request(&mut self, id: i64, method: &str, params: Value) {
        self.send(Message::Request(Request::new(id, method, params))).await;
    }

    pub async fn notify(&mut self, method: &str, params: Value) {
        self.send(Message::Notification(Notification::new(method, params))).await;
    }

    /// Send a request and wait for its response
    pub async fn request(&mut self, method: &str, params: Value) -> Response {
        let id = self.next_id;
        self.next_id += 1;
        self.send_request(id, method, params).await;
        self.response_for(Some(RequestId::Number(id))).await
    }

    /// Next message from the server; `None` once the server closed its output
    pub async fn recv(&mut self) -> Option<Message> {
        let body = tokio::time::timeout(TIMEOUT, self.reader.read_message())
            .await
            .expect("server message in time")
            .expect("readable frame")?;
        let value: Value = serde_json::from_str(&body).unwrap();
        let message = if value.get("method").is_some() {
            Message::Notification(serde_json::from_value(value).unwrap())
        } else {
            Message::Response(serde_json::from_value(value).unwrap())
        };
        Some(message)
    }

    /// Wait for the response carrying `id`, queueing notifications
    pub async fn response_for(&mut self, id: Option<RequestId>) -> Response {
        loop {
            match self.recv().await.expect("server still running") {
                Message::Response(response) if response.id == id => return response,
                Message::Response(response) => panic!("unexpected response: {:?}", response),
                Message::Notification(notification) => self.notifications.push(notification),
                Message::Request(request) => panic!("unexpected server request: {:?}", request),
            }
        }
    }

    pub async fn initialize(&mut self) -> Value {
        self.initialize_with(Value::Null).await
    }

    pub async fn initialize_with(&mut self, options: Value) -> Value {
        let params = json!({
            "processId": null,
            "rootUri": self.root_uri(),
            "capabilities": {},
            "initializationOptions": options,
        });
        let response = self.request("initialize", params).await;
        self.notify("initialized", json!({})).await;
        response.result.expect("initialize succeeds")
    }

    pub async fn open(&mut self, name: &str, text: &str) -> Url {
        let uri = self.uri(name);
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {"uri": uri, "languageId": "python", "version": 1, "text": text}
            }),
        )
        .await;
        uri
    }

    pub async fn replace(&mut self, uri: &Url, version: i32, text: &str) {
        self.notify(
            "textDocument/didChange",
            json!({
                "textDocument": {"uri": uri, "version": version},
                "contentChanges": [{"text": text}]
            }),
        )
        .await;
    }

    /// Diagnostics published for `uri` at `version`
    pub async fn diagnostics(
        &mut self,
        uri: &Url,
        version: Option<i32>,
    ) -> PublishDiagnosticsParams {
        let matches = |n: &Notification| {
            n.method == "textDocument/publishDiagnostics"
                && n.params["uri"] == json!(uri)
                && n.params["version"] == json!(version)
        };
        if let Some(found) = self.notifications.iter().find(|n| matches(n)) {
            return serde_json::from_value(found.params.clone()).unwrap();
        }
        loop {
            match self.recv().await.expect("server still running") {
                Message::Notification(notification) => {
                    let found = matches(&notification);
                    self.notifications.push(notification.clone());
                    if found {
                        return serde_json::from_value(notification.params).unwrap();
                    }
                }
                other => panic!("unexpected message while waiting for diagnostics: {:?}", other),
            }
        }
    }

    /// Every diagnostics version published for `uri` so far, in arrival order
    pub fn published_versions(&self, uri: &Url) -> Vec<Option<i64>> {
        self.notifications
            .iter()
            .filter(|n| {
                n.method == "textDocument/publishDiagnostics" && n.params["uri"] == json!(uri)
            })
            .map(|n| n.params["version"].as_i64())
            .collect()
    }

    pub async fn shutdown_and_exit(mut self) -> i32 {
        let response = self.request("shutdown", Value::Null).await;
        assert_eq!(response.result, Some(Value::Null));
        self.notify("exit", Value::Null).await;
        self.exit_code().await
    }

    /// Close the server's input
    pub async fn close_input(&mut self) {
        // dropping one split half leaves the pipe open, so shut it down
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await.unwrap();
        }
    }

    /// Wait for the server task to end and return its exit code
    pub async fn exit_code(self) -> i32 {
        let Self { server, reader, writer, .. } = self;
        // keep draining so the server's writer never blocks
        let drain = tokio::spawn(async move {
            let mut reader = reader;
            while let Ok(Some(_)) = reader.read_message().await {}
        });
        let code = tokio::time::timeout(TIMEOUT, server)
            .await
            .expect("server exits in time")
            .unwrap();
        drop(writer);
        drain.abort();
        code
    }
}
