//! Live badge updates over the WebSocket gateway, against a scripted
//! gateway double.

mod common;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use cirrus_client::Backend;
use cirrus_client::gateway::{self, GatewayFeed};
use cirrus_client::invites::PendingBadge;
use cirrus_types::events::{GatewayCommand, GatewayEvent};

use common::MockBackend;

/// Accepts one connection, checks the Identify token, answers Ready and
/// then plays back the given events before closing.
async fn scripted_gateway(
    listener: tokio::net::TcpListener,
    expected_token: &str,
    events: Vec<GatewayEvent>,
) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = accept_async(stream).await.unwrap();

    let frame = match ws.next().await {
        Some(Ok(Message::Text(text))) => text,
        other => panic!("expected identify frame, got {:?}", other),
    };
    let GatewayCommand::Identify { token } = serde_json::from_str(&frame).unwrap();
    assert_eq!(token, expected_token);

    let ready = GatewayEvent::Ready {
        user_id: uuid::Uuid::new_v4(),
        email: "bob@x.com".into(),
    };
    let payload = serde_json::to_string(&ready).unwrap();
    ws.send(Message::Text(payload.into())).await.unwrap();

    for event in events {
        let payload = serde_json::to_string(&event).unwrap();
        ws.send(Message::Text(payload.into())).await.unwrap();
    }
    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn badge_recounts_on_gateway_invite_events() {
    let mock = MockBackend::new();
    let alice = mock.add_account("alice@x.com", "pw", "Alice", "A");
    let bob = mock.add_account("bob@x.com", "pw", "Bob", "B");
    let folder = mock.add_folder("Reports", &alice);

    mock.set_server_session(Some(alice.clone()));
    mock.send_invite(folder, bob.id).await.unwrap();
    mock.send_invite(folder, bob.id).await.unwrap();
    mock.set_server_session(Some(bob.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(scripted_gateway(
        listener,
        "mock-token",
        vec![
            GatewayEvent::InviteChanged {
                invited_user_id: bob.id,
            },
            GatewayEvent::InviteChanged {
                invited_user_id: bob.id,
            },
        ],
    ));

    // The badge never refreshed on its own; only notifications move it
    let mut badge = PendingBadge::new(mock.clone());
    assert_eq!(badge.count(), 0);

    let mut feed = GatewayFeed::connect(&format!("ws://{}", addr), "mock-token")
        .await
        .unwrap();
    gateway::drive_badge(&mut feed, &mut badge).await;

    assert_eq!(badge.count(), 2);
    server.await.unwrap();
}

#[tokio::test]
async fn folder_events_leave_the_badge_alone() {
    let mock = MockBackend::new();
    let alice = mock.add_account("alice@x.com", "pw", "Alice", "A");
    let bob = mock.add_account("bob@x.com", "pw", "Bob", "B");
    let folder = mock.add_folder("Reports", &alice);

    mock.set_server_session(Some(alice.clone()));
    mock.send_invite(folder, bob.id).await.unwrap();
    mock.set_server_session(Some(bob.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(scripted_gateway(
        listener,
        "mock-token",
        vec![GatewayEvent::FolderChanged { folder_id: folder }],
    ));

    let mut badge = PendingBadge::new(mock.clone());
    let mut feed = GatewayFeed::connect(&format!("ws://{}", addr), "mock-token")
        .await
        .unwrap();
    gateway::drive_badge(&mut feed, &mut badge).await;

    // One invite is pending server-side, but no invite event arrived
    assert_eq!(badge.count(), 0);
    server.await.unwrap();
}
