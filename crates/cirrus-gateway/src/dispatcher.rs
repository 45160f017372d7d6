use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use cirrus_types::events::GatewayEvent;

/// Manages connected clients and routes change notifications.
///
/// Events with a target user (invite changes) go over that user's dedicated
/// channel; everything else is broadcast. Clients treat every notification
/// as a cue to refetch, so losing one to a lagged receiver degrades
/// freshness, never correctness.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel — all connected clients receive untargeted events
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                user_channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to untargeted gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Route an event: targeted if it names a user, broadcast otherwise.
    pub async fn dispatch(&self, event: GatewayEvent) {
        match event.target_user() {
            Some(user_id) => self.send_to_user(user_id, event).await,
            None => self.broadcast(event),
        }
    }

    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    pub async fn register_user_channel(
        &self,
        user_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.user_channels.write().await.insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches.
    /// A reconnect replaces the entry; the old connection's teardown must
    /// not tear down the new one.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&user_id);
            }
        }
    }

    /// Send a targeted event to a specific user. Dropped silently when the
    /// user has no live connection — they will refetch on next load.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let channels = self.inner.user_channels.read().await;
        if let Some((_, tx)) = channels.get(&user_id) {
            let _ = tx.send(event);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn targeted_events_reach_only_the_named_user() {
        let dispatcher = Dispatcher::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let (_conn_a, mut rx_a) = dispatcher.register_user_channel(alice).await;
        let (_conn_b, mut rx_b) = dispatcher.register_user_channel(bob).await;

        dispatcher
            .dispatch(GatewayEvent::InviteChanged { invited_user_id: alice })
            .await;

        let event = rx_a.recv().await.unwrap();
        assert!(matches!(event, GatewayEvent::InviteChanged { invited_user_id } if invited_user_id == alice));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn untargeted_events_are_broadcast() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();
        let folder_id = Uuid::new_v4();

        dispatcher.dispatch(GatewayEvent::FolderChanged { folder_id }).await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, GatewayEvent::FolderChanged { folder_id: f } if f == folder_id));
    }

    #[tokio::test]
    async fn stale_connection_cannot_unregister_replacement() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        let (old_conn, _old_rx) = dispatcher.register_user_channel(user).await;
        let (_new_conn, mut new_rx) = dispatcher.register_user_channel(user).await;

        // Old connection tears down after being replaced
        dispatcher.unregister_user_channel(user, old_conn).await;

        dispatcher
            .send_to_user(user, GatewayEvent::InviteChanged { invited_user_id: user })
            .await;
        assert!(new_rx.try_recv().is_ok());
    }
}
