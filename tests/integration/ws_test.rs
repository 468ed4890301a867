//! Integration tests for WebSocket sessions end to end.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::helpers::{self, TestApp};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr, tag: &str) -> Client {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/{tag}_ws"))
        .await
        .expect("WebSocket connect failed");
    ws
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("Timed out waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");
        match msg {
            Message::Text(text) => return text.as_str().to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_chat_round_trip() {
    let app = TestApp::new();
    let (listener, heard) = helpers::recording_listener();
    app.bind("chat", Some(listener));
    let addr = app.spawn().await;

    let mut s1 = connect(addr, "chat").await;
    let mut s2 = connect(addr, "chat").await;
    app.wait_for_sessions("chat", 2).await;

    app.engine.publish("chat", "hi").await.unwrap();
    assert_eq!(next_text(&mut s1).await, "hi");
    assert_eq!(next_text(&mut s2).await, "hi");

    s1.send(Message::Text("yo".into())).await.unwrap();
    for _ in 0..200 {
        if !heard.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        *heard.lock().unwrap(),
        vec![("chat".to_string(), "yo".to_string())]
    );

    s1.close(None).await.unwrap();
    app.wait_for_sessions("chat", 1).await;

    app.engine.publish("chat", "only s2").await.unwrap();
    assert_eq!(next_text(&mut s2).await, "only s2");
}

#[tokio::test]
async fn test_fan_out_is_scoped_to_tag() {
    let app = TestApp::new();
    app.bind("chat", None);
    app.bind("news", None);
    let addr = app.spawn().await;

    let mut chat = connect(addr, "chat").await;
    let mut news = connect(addr, "news").await;
    app.wait_for_sessions("chat", 1).await;
    app.wait_for_sessions("news", 1).await;

    app.engine.publish("news", "headline").await.unwrap();
    app.engine.publish("chat", "hello").await.unwrap();

    assert_eq!(next_text(&mut news).await, "headline");
    assert_eq!(next_text(&mut chat).await, "hello");
}

#[tokio::test]
async fn test_binary_frames_reach_listener() {
    let app = TestApp::new();
    let (listener, heard) = helpers::recording_listener();
    app.bind("bin", Some(listener));
    let addr = app.spawn().await;

    let mut client = connect(addr, "bin").await;
    app.wait_for_sessions("bin", 1).await;

    client
        .send(Message::Binary(vec![b'o', b'k'].into()))
        .await
        .unwrap();
    for _ in 0..200 {
        if !heard.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        *heard.lock().unwrap(),
        vec![("bin".to_string(), "ok".to_string())]
    );
}

#[tokio::test]
async fn test_dropped_connection_is_dismissed() {
    let app = TestApp::new();
    app.bind("chat", None);
    let addr = app.spawn().await;

    let client = connect(addr, "chat").await;
    app.wait_for_sessions("chat", 1).await;

    drop(client);
    app.wait_for_sessions("chat", 0).await;

    let snapshot = app.engine.metrics().snapshot();
    assert_eq!(snapshot.sessions_opened, 1);
    assert_eq!(snapshot.sessions_closed, 1);
}

#[tokio::test]
async fn test_unbound_tag_rejects_upgrade() {
    let app = TestApp::new();
    app.bind("chat", None);
    let addr = app.spawn().await;

    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/ghost_ws")).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_shutdown_closes_clients() {
    let app = TestApp::new();
    app.bind("chat", None);
    let addr = app.spawn().await;

    let mut client = connect(addr, "chat").await;
    app.wait_for_sessions("chat", 1).await;

    app.engine.shutdown();

    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "client not closed after shutdown");
    assert_eq!(app.engine.registry().session_count("chat"), 0);
}
