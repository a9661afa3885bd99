use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use colab_markdown::client::{ApiClient, ClientSyncAgent, LocalView};
use colab_markdown::config::Config;
use colab_markdown::models::SendMessage;
use colab_markdown::routes::{create_app, WEBSOCKET_PATH};
use colab_markdown::AppState;
use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

async fn start_server(config: Config) -> (String, Arc<AppState>) {
    let (state, _task) = AppState::new(config);
    let app = create_app(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

async fn mounted(base_url: &str) -> ClientSyncAgent {
    let mut agent = ClientSyncAgent::new(ApiClient::new(base_url));
    within(agent.mount()).await.unwrap();
    assert!(agent.is_connected());
    agent
}

async fn next_view(agent: &mut ClientSyncAgent) -> LocalView {
    within(agent.next_broadcast()).await.expect("connection closed").clone()
}

#[tokio::test]
async fn mount_loads_current_document() {
    let (base_url, _state) = start_server(Config {
        initial_text: "==hi==".to_string(),
        ..Config::default()
    })
    .await;

    let agent = mounted(&base_url).await;
    assert_eq!(
        agent.view(),
        &LocalView { text: "==hi==".into(), html: "<mark>hi</mark>".into() }
    );
}

#[tokio::test]
async fn agents_get_distinct_ids() {
    let (base_url, state) = start_server(Config::default()).await;
    let a = mounted(&base_url).await;
    let b = mounted(&base_url).await;

    assert_ne!(a.user_id(), b.user_id());
    assert!(state.registry.is_active(a.user_id().unwrap()));
    assert!(state.registry.is_active(b.user_id().unwrap()));
}

#[tokio::test]
async fn hello_is_broadcast_to_everyone() {
    let (base_url, state) = start_server(Config::default()).await;
    let mut a = mounted(&base_url).await;
    let mut b = mounted(&base_url).await;

    a.on_local_change("hello");

    let expected = LocalView { text: "hello".into(), html: "hello".into() };
    assert_eq!(next_view(&mut a).await, expected);
    assert_eq!(next_view(&mut b).await, expected);

    let doc = state.store.get_current().await;
    assert_eq!(doc.version, 1);
    assert_eq!(doc.last_editor_id, a.user_id());
}

#[tokio::test]
async fn bold_is_rendered() {
    let (base_url, _state) = start_server(Config::default()).await;
    let mut a = mounted(&base_url).await;
    let mut b = mounted(&base_url).await;

    b.on_local_change("**bold**");

    let view = next_view(&mut a).await;
    assert!(view.html.contains("<strong>bold</strong>"));
    assert!(!view.html.contains("**"));
}

#[tokio::test]
async fn concurrent_edits_converge_on_last_write() {
    let (base_url, state) = start_server(Config::default()).await;
    let mut a = mounted(&base_url).await;
    let mut b = mounted(&base_url).await;

    a.on_local_change("from a");
    b.on_local_change("from b");

    let mut a_seen = Vec::new();
    let mut b_seen = Vec::new();
    for _ in 0..2 {
        a_seen.push(next_view(&mut a).await.text);
        b_seen.push(next_view(&mut b).await.text);
    }

    // Both clients see the same order, and it ends with the stored content
    assert_eq!(a_seen, b_seen);
    let doc = state.store.get_current().await;
    assert_eq!(doc.version, 2);
    assert_eq!(a.view().text, doc.content);
    assert_eq!(b.view().text, doc.content);
}

#[tokio::test]
async fn updates_sent_while_disconnected_are_lost() {
    let (base_url, state) = start_server(Config::default()).await;
    let mut offline = mounted(&base_url).await;
    let mut watcher = mounted(&base_url).await;

    offline.disconnect();
    offline.on_local_change("never arrives");
    assert_eq!(offline.view().text, "never arrives");

    let nothing = tokio::time::timeout(Duration::from_millis(300), watcher.next_broadcast()).await;
    assert!(nothing.is_err());
    assert_eq!(state.store.get_current().await.version, 0);
    assert_eq!(state.store.get_current().await.content, "");
}

#[tokio::test]
async fn unknown_destination_gets_error_frame() {
    let (base_url, _state) = start_server(Config::default()).await;
    let url = format!("{}{}", base_url.replacen("http://", "ws://", 1), WEBSOCKET_PATH);
    let (mut socket, _) = within(connect_async(url)).await.unwrap();

    let first = loop {
        match within(socket.next()).await {
            Some(Ok(Message::Text(text))) => break serde_json::from_str::<SendMessage>(text.as_str()).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("socket ended: {other:?}"),
        }
    };
    assert!(matches!(first, SendMessage::Connected(_)));

    let frame = r#"{"type":"send","destination":"/app/elsewhere","payload":{}}"#;
    socket.send(Message::Text(frame.to_string().into())).await.unwrap();
    socket.send(Message::Text("not json".to_string().into())).await.unwrap();
    socket.send(Message::Text(r#"{"type":"ping"}"#.to_string().into())).await.unwrap();

    let mut kinds = Vec::new();
    while kinds.len() < 3 {
        match within(socket.next()).await {
            Some(Ok(Message::Text(text))) => {
                kinds.push(match serde_json::from_str::<SendMessage>(text.as_str()).unwrap() {
                    SendMessage::Error(_) => "error",
                    SendMessage::Pong(_) => "pong",
                    _ => "other",
                });
            }
            Some(Ok(_)) => continue,
            other => panic!("socket ended: {other:?}"),
        }
    }
    assert_eq!(kinds, vec!["error", "error", "pong"]);
}
