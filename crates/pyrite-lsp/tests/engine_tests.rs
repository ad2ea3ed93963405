//! Concurrency behavior of the dispatcher and analysis cache

use lsp_types::Url;
use pyrite_config::Settings;
use pyrite_lsp::protocol::{Message, Notification, Request, RequestId, Response};
use pyrite_lsp::{CancellationToken, Client, Dispatcher, Session};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

fn engine() -> (Dispatcher, UnboundedReceiver<Message>) {
    let (client, rx) = Client::channel();
    let session = Session::new(None, Settings::default(), client);
    (Dispatcher::new(Arc::new(session)), rx)
}

fn open(dispatcher: &Dispatcher, uri: &str, version: i32, text: &str) {
    dispatcher.handle_notification(Notification::new(
        "textDocument/didOpen",
        json!({
            "textDocument": {"uri": uri, "languageId": "python", "version": version, "text": text}
        }),
    ));
}

fn hover(id: i64, uri: &str) -> Request {
    Request::new(
        id,
        "textDocument/hover",
        json!({"textDocument": {"uri": uri}, "position": {"line": 1, "character": 0}}),
    )
}

async fn responses(
    rx: &mut UnboundedReceiver<Message>,
    count: usize,
) -> HashMap<RequestId, Response> {
    let mut found = HashMap::new();
    while found.len() < count {
        let message = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("responses in time")
            .expect("channel open");
        if let Message::Response(response) = message {
            let id = response.id.clone().expect("response id");
            found.insert(id, response);
        }
    }
    found
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_analysis() {
    let (dispatcher, mut rx) = engine();
    let uri = "file:///ws/main.py";
    open(&dispatcher, uri, 1, "def compute():\n    pass\ncompute()\n");

    for id in 0..16 {
        dispatcher.handle_request(hover(id, uri));
    }
    let found = responses(&mut rx, 16).await;
    assert!(found.values().all(Response::is_success));

    let stats = dispatcher.session().cache().stats();
    assert_eq!(stats.computations, 1);
    assert!(dispatcher.session().cache().contains(&uri.parse().unwrap(), 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_documents_are_analyzed_independently() {
    let (dispatcher, mut rx) = engine();
    open(&dispatcher, "file:///ws/a.py", 1, "x = 1\nx\n");
    open(&dispatcher, "file:///ws/b.py", 3, "y = 2\ny\n");

    dispatcher.handle_request(hover(1, "file:///ws/a.py"));
    dispatcher.handle_request(hover(2, "file:///ws/b.py"));
    let found = responses(&mut rx, 2).await;

    let a = found[&RequestId::Number(1)].result.clone().unwrap();
    let b = found[&RequestId::Number(2)].result.clone().unwrap();
    assert_eq!(a["contents"]["value"], "```python\n(variable) x\n```");
    assert_eq!(b["contents"]["value"], "```python\n(variable) y\n```");
    assert_eq!(dispatcher.session().cache().stats().computations, 2);
}

#[tokio::test]
async fn test_shutdown_waits_for_running_requests() {
    let (dispatcher, mut rx) = engine();
    let uri = "file:///ws/main.py";
    open(&dispatcher, uri, 1, "value = 1\nvalue\n");

    dispatcher.handle_request(hover(9, uri));
    dispatcher.shutdown().await;
    assert_eq!(dispatcher.pending_requests(), 0);

    let mut answered = false;
    while let Ok(message) = rx.try_recv() {
        if let Message::Response(response) = message {
            assert_eq!(response.id, Some(RequestId::Number(9)));
            answered = true;
        }
    }
    assert!(answered);
}

#[tokio::test]
async fn test_late_analysis_of_older_version_is_discarded() {
    let (dispatcher, mut rx) = engine();
    let uri = "file:///ws/shapes.py";
    let url: Url = uri.parse().unwrap();
    let session = dispatcher.session();

    let workers = session.settings().server.workers as u32;
    let permits = session.cache().workers().clone().acquire_many_owned(workers).await.unwrap();

    open(&dispatcher, uri, 1, "def old_name():\n    pass\n");
    let old_text = session.documents().get(&url).unwrap().text;
    dispatcher.handle_notification(Notification::new(
        "textDocument/didChange",
        json!({
            "textDocument": {"uri": uri, "version": 2},
            "contentChanges": [{"text": "def new_name():\n    pass\n"}]
        }),
    ));
    drop(permits);

    loop {
        let message = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("diagnostics in time")
            .expect("channel open");
        if let Message::Notification(n) = message {
            if n.method == "textDocument/publishDiagnostics" {
                assert_eq!(n.params["version"], 2);
                break;
            }
        }
    }

    // version 1 finishes only after version 2 was indexed and published
    let stale = session
        .analysis(&url, 1, old_text, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stale.version, 1);
    assert!(!session.index().update(&url, &stale));
    assert!(!session.publisher().publish(session.documents(), &url, &stale));

    assert_eq!(session.publisher().published_version(&url), Some(2));
    assert_eq!(session.index().indexed_version(&url), Some(2));
    assert!(session.index().lookup("old_name").is_empty());
    assert_eq!(session.index().lookup("new_name").len(), 1);
    assert!(!session.cache().contains(&url, 1));

    while let Ok(message) = rx.try_recv() {
        if let Message::Notification(n) = message {
            assert_ne!(n.method, "textDocument/publishDiagnostics", "stale publish: {:?}", n);
        }
    }
}
