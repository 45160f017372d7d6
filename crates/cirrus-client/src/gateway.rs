use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use cirrus_types::events::{GatewayCommand, GatewayEvent};

use crate::backend::Backend;
use crate::invites::PendingBadge;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway connect failed: {0}")]
    Connect(String),
    #[error("gateway closed before the identify handshake completed")]
    ClosedDuringIdentify,
}

/// Live event feed from the server's WebSocket gateway.
///
/// `connect` performs the Identify handshake and resolves once the server
/// answers with `Ready`; targeted events then arrive through [`recv`].
/// Heartbeat pings are answered internally. The feed ends when the
/// connection drops — reconnecting (with a fresh bearer token if the old
/// one expired) is the caller's loop.
///
/// [`recv`]: GatewayFeed::recv
pub struct GatewayFeed {
    events: mpsc::UnboundedReceiver<GatewayEvent>,
}

impl GatewayFeed {
    pub async fn connect(url: &str, token: &str) -> Result<Self, GatewayError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        let identify = GatewayCommand::Identify {
            token: token.to_string(),
        };
        let payload = serde_json::to_string(&identify)
            .map_err(|e| GatewayError::Connect(e.to_string()))?;
        ws_tx
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;

        // A successful Identify is acknowledged with Ready before any events;
        // a rejected token closes the socket instead.
        loop {
            match ws_rx.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str(&text) {
                    Ok(GatewayEvent::Ready { user_id, .. }) => {
                        debug!("Gateway ready for {}", user_id);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Undecodable gateway frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    return Err(GatewayError::ClosedDuringIdentify);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(GatewayError::Connect(e.to_string())),
            }
        }

        let (tx, events) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(msg) = ws_rx.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str(&text) {
                        Ok(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Undecodable gateway frame: {}", e),
                    },
                    Ok(Message::Ping(payload)) => {
                        // The server drops connections that stop answering
                        if ws_tx.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            debug!("Gateway feed ended");
        });

        Ok(Self { events })
    }

    /// Next event, or `None` once the connection has dropped.
    pub async fn recv(&mut self) -> Option<GatewayEvent> {
        self.events.recv().await
    }
}

/// Drive a badge from the feed: every invite change addressed to this user
/// triggers a recount. Returns when the connection drops.
pub async fn drive_badge<B: Backend>(feed: &mut GatewayFeed, badge: &mut PendingBadge<B>) {
    while let Some(event) = feed.recv().await {
        if let GatewayEvent::InviteChanged { .. } = event {
            badge.on_notification().await;
        }
    }
}
