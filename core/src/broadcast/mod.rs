//! Fan-out of overlay events to connected display clients.
//!
//! The client set is owned by a single [`Broadcaster`] task. Everything else
//! talks to it through a [`BroadcastHandle`], which only ever sends one of
//! three messages: subscribe, unsubscribe or broadcast.

use eqlive_types::OverlayEvent;
use hashbrown::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Messages buffered per client before new ones are dropped for it.
pub const CLIENT_QUEUE_CAPACITY: usize = 256;

pub type ClientId = u64;

/// A serialized event, shared between all clients that receive it.
pub type Frame = Arc<str>;

/// Where the core delivers classified events.
///
/// Delivery is best-effort and must never block or fail the caller.
pub trait EventSink: Send + Sync {
    fn broadcast(&self, event: OverlayEvent);
}

/// A connected client's end of the broadcast.
pub struct Subscription {
    pub id: ClientId,
    /// Starts with the current status and stats, then live events
    pub rx: mpsc::Receiver<Frame>,
}

enum BroadcastMessage {
    Subscribe { reply: oneshot::Sender<Subscription> },
    Unsubscribe(ClientId),
    Broadcast(OverlayEvent),
}

#[derive(Clone)]
pub struct BroadcastHandle {
    tx: mpsc::UnboundedSender<BroadcastMessage>,
}

impl BroadcastHandle {
    /// Register a client. `None` once the broadcaster has stopped.
    pub async fn subscribe(&self) -> Option<Subscription> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(BroadcastMessage::Subscribe { reply }).ok()?;
        rx.await.ok()
    }

    pub fn unsubscribe(&self, id: ClientId) {
        let _ = self.tx.send(BroadcastMessage::Unsubscribe(id));
    }
}

impl EventSink for BroadcastHandle {
    fn broadcast(&self, event: OverlayEvent) {
        if self.tx.send(BroadcastMessage::Broadcast(event)).is_err() {
            tracing::debug!("Broadcaster stopped, event dropped");
        }
    }
}

/// Owns the client set and the last status/stats frames.
pub struct Broadcaster {
    rx: mpsc::UnboundedReceiver<BroadcastMessage>,
    clients: HashMap<ClientId, mpsc::Sender<Frame>>,
    next_id: ClientId,
    last_status: Option<Frame>,
    last_stats: Option<Frame>,
}

impl Broadcaster {
    pub fn channel() -> (Self, BroadcastHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let broadcaster = Self {
            rx,
            clients: HashMap::new(),
            next_id: 1,
            last_status: None,
            last_stats: None,
        };
        (broadcaster, BroadcastHandle { tx })
    }

    /// Spawn the broadcaster task. It stops on cancellation or once every
    /// handle is dropped.
    pub fn spawn(cancel: CancellationToken) -> (BroadcastHandle, JoinHandle<()>) {
        let (broadcaster, handle) = Self::channel();
        let task = tokio::spawn(broadcaster.run(cancel));
        (handle, task)
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => break,
                msg = self.rx.recv() => msg,
            };
            let Some(msg) = msg else {
                break;
            };

            match msg {
                BroadcastMessage::Subscribe { reply } => {
                    let subscription = self.add_client();
                    let id = subscription.id;
                    if reply.send(subscription).is_err() {
                        self.clients.remove(&id);
                    }
                }
                BroadcastMessage::Unsubscribe(id) => {
                    if self.clients.remove(&id).is_some() {
                        tracing::debug!(client = id, clients = self.clients.len(), "Client unsubscribed");
                    }
                }
                BroadcastMessage::Broadcast(event) => self.publish(&event),
            }
        }
        tracing::debug!("Broadcaster stopped");
    }

    fn add_client(&mut self) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
        for frame in [&self.last_status, &self.last_stats].into_iter().flatten() {
            let _ = tx.try_send(frame.clone());
        }
        self.clients.insert(id, tx);
        tracing::info!(client = id, clients = self.clients.len(), "Client subscribed");

        Subscription { id, rx }
    }

    fn publish(&mut self, event: &OverlayEvent) {
        let frame: Frame = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!(error = %e, kind = event.kind(), "Failed to serialize event");
                return;
            }
        };

        match event {
            OverlayEvent::Status { .. } => self.last_status = Some(frame.clone()),
            OverlayEvent::Stats { .. } => self.last_stats = Some(frame.clone()),
            _ => {}
        }

        self.clients.retain(|id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(client = id, kind = event.kind(), "Client queue full, event dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(client = id, "Client disconnected");
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqlive_types::StatsCounters;
    use std::time::Duration;

    async fn recv(sub: &mut Subscription) -> String {
        tokio::time::timeout(Duration::from_secs(5), sub.rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
            .to_string()
    }

    #[tokio::test]
    async fn every_subscriber_gets_each_event() {
        let (handle, _task) = Broadcaster::spawn(CancellationToken::new());
        let mut a = handle.subscribe().await.unwrap();
        let mut b = handle.subscribe().await.unwrap();
        assert_ne!(a.id, b.id);

        handle.broadcast(OverlayEvent::BagOpen);
        assert_eq!(recv(&mut a).await, r#"{"type":"bag_open"}"#);
        assert_eq!(recv(&mut b).await, r#"{"type":"bag_open"}"#);
    }

    #[tokio::test]
    async fn new_subscriber_starts_with_snapshot() {
        let (handle, _task) = Broadcaster::spawn(CancellationToken::new());
        handle.broadcast(OverlayEvent::status("Tester", "Old Zone"));
        handle.broadcast(OverlayEvent::status("Tester", "Gfay"));
        handle.broadcast(OverlayEvent::Kill);
        handle.broadcast(OverlayEvent::stats(&StatsCounters {
            total_kills: 3,
            session_kills: 1,
            ..Default::default()
        }));

        let mut sub = handle.subscribe().await.unwrap();
        assert_eq!(
            recv(&mut sub).await,
            r#"{"type":"status","char_name":"Tester","current_zone":"Gfay"}"#
        );
        assert_eq!(
            recv(&mut sub).await,
            r#"{"type":"stats","total_deaths":0,"session_deaths":0,"total_kills":3,"session_kills":1}"#
        );
        assert!(sub.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_client_does_not_affect_others() {
        let (handle, _task) = Broadcaster::spawn(CancellationToken::new());
        let gone = handle.subscribe().await.unwrap();
        let mut stays = handle.subscribe().await.unwrap();
        drop(gone);

        handle.broadcast(OverlayEvent::Death);
        handle.broadcast(OverlayEvent::Interrupted);
        assert_eq!(recv(&mut stays).await, r#"{"type":"death"}"#);
        assert_eq!(recv(&mut stays).await, r#"{"type":"interrupted"}"#);
    }

    #[tokio::test]
    async fn full_client_queue_drops_instead_of_blocking() {
        let (handle, _task) = Broadcaster::spawn(CancellationToken::new());
        let mut slow = handle.subscribe().await.unwrap();

        for _ in 0..CLIENT_QUEUE_CAPACITY + 10 {
            handle.broadcast(OverlayEvent::BagOpen);
        }
        // messages are handled in order, so this returns after the flood
        let _barrier = handle.subscribe().await.unwrap();

        let mut received = 0;
        while slow.rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, CLIENT_QUEUE_CAPACITY);

        handle.broadcast(OverlayEvent::Kill);
        assert_eq!(recv(&mut slow).await, r#"{"type":"kill"}"#);
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_stream() {
        let (handle, _task) = Broadcaster::spawn(CancellationToken::new());
        let mut sub = handle.subscribe().await.unwrap();
        handle.unsubscribe(sub.id);

        let closed = tokio::time::timeout(Duration::from_secs(5), sub.rx.recv())
            .await
            .unwrap();
        assert!(closed.is_none());
    }

    #[tokio::test]
    async fn cancelled_broadcaster_refuses_subscribers() {
        let cancel = CancellationToken::new();
        let (handle, task) = Broadcaster::spawn(cancel.clone());
        cancel.cancel();
        task.await.unwrap();
        assert!(handle.subscribe().await.is_none());
    }
}
