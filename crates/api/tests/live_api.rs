//! End-to-end tests for `GET /api/v1/collages/{id}/live`.
//!
//! The router is served on a real local port so the WebSocket handshake goes
//! through the same auth extractor and upgrade path as a browser client.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::{post_json_auth, spawn_server, FailingGenerator, TestApp, REFERENCE_KEY};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const OWNER: i64 = 1;
const OTHER: i64 = 2;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn create(t: &TestApp, owner: i64) -> i64 {
    let body = json!({
        "reference_image_key": REFERENCE_KEY,
        "style": "Streetwear, urban",
        "products": [{ "name": "Cargo Pants", "brand": "Carhartt" }]
    });
    let response = post_json_auth(t.app(), "/api/v1/collages", body, &t.token(owner)).await;
    common::body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn connect(addr: SocketAddr, id: i64, token: &str) -> Result<Socket, WsError> {
    let url = format!("ws://{addr}/api/v1/collages/{id}/live?access_token={token}");
    connect_async(url).await.map(|(socket, _)| socket)
}

async fn next_message(socket: &mut Socket) -> Message {
    tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("no frame within 5s")
        .expect("socket closed without a close frame")
        .expect("invalid frame")
}

/// Next frame as the `data` object of a pushed collage view.
async fn next_view(socket: &mut Socket) -> Value {
    match next_message(socket).await {
        Message::Text(text) => serde_json::from_str::<Value>(&text).unwrap()["data"].clone(),
        other => panic!("expected a collage view, got {other:?}"),
    }
}

async fn assert_finished_close(socket: &mut Socket) {
    match next_message(socket).await {
        Message::Close(Some(frame)) => {
            assert_eq!(frame.code, CloseCode::Normal);
            assert_eq!(frame.reason, "collage finished");
        }
        other => panic!("expected a normal close, got {other:?}"),
    }
}

#[tokio::test]
async fn pushes_snapshot_then_completion_then_closes() {
    let t = common::build_test_app();
    t.upload_reference().await;
    let id = create(&t, OWNER).await;
    let sibling = create(&t, OWNER).await;
    let foreign = create(&t, OTHER).await;
    let addr = spawn_server(t.app()).await;

    let mut socket = connect(addr, id, &t.token(OWNER)).await.unwrap();

    let snapshot = next_view(&mut socket).await;
    assert_eq!(snapshot["id"], id);
    assert_eq!(snapshot["status"], "generating");
    assert!(snapshot["result_image_url"].is_null());

    // Completions of other collages must not produce a frame on this socket.
    t.service.run_generation(sibling).await;
    t.service.run_generation(foreign).await;
    t.service.run_generation(id).await;

    let update = next_view(&mut socket).await;
    assert_eq!(update["id"], id);
    assert_eq!(update["status"], "completed");
    assert!(update["result_image_url"].is_string());

    assert_finished_close(&mut socket).await;
}

#[tokio::test]
async fn failed_generation_is_pushed_with_detail() {
    let t = common::build_test_app_with(Arc::new(FailingGenerator));
    t.upload_reference().await;
    let id = create(&t, OWNER).await;
    let addr = spawn_server(t.app()).await;

    let mut socket = connect(addr, id, &t.token(OWNER)).await.unwrap();
    assert_eq!(next_view(&mut socket).await["status"], "generating");

    t.service.run_generation(id).await;

    let update = next_view(&mut socket).await;
    assert_eq!(update["status"], "failed");
    assert!(!update["error_detail"].as_str().unwrap().is_empty());
    assert_finished_close(&mut socket).await;
}

#[tokio::test]
async fn finished_collage_sends_one_view_and_closes() {
    let mut t = common::build_test_app();
    t.upload_reference().await;
    let id = create(&t, OWNER).await;
    t.run_scheduled().await;
    let addr = spawn_server(t.app()).await;

    let mut socket = connect(addr, id, &t.token(OWNER)).await.unwrap();

    assert_eq!(next_view(&mut socket).await["status"], "completed");
    assert_finished_close(&mut socket).await;
}

#[tokio::test]
async fn foreign_collage_is_rejected_before_upgrade() {
    let t = common::build_test_app();
    t.upload_reference().await;
    let id = create(&t, OWNER).await;
    let addr = spawn_server(t.app()).await;

    match connect(addr, id, &t.token(OTHER)).await {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 404),
        Err(other) => panic!("expected an HTTP 404, got {other}"),
        Ok(_) => panic!("upgrade should have been refused"),
    }
}
