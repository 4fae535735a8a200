//! WebSocket push channel for the overlay pages.
//!
//! Every connection becomes one broadcast subscription. Clients only listen;
//! anything they send is ignored apart from close frames.

use eqlive_core::BroadcastHandle;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

pub async fn run(listener: TcpListener, broadcast: BroadcastHandle, cancel: CancellationToken) {
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, addr)) => {
                let broadcast = broadcast.clone();
                let cancel = cancel.child_token();
                tokio::spawn(async move {
                    handle_client(stream, addr, broadcast, cancel).await;
                });
            }
            Err(e) => tracing::warn!(error = %e, "Failed to accept WebSocket connection"),
        }
    }
    tracing::debug!("WebSocket server stopped");
}

async fn handle_client(
    stream: TcpStream,
    addr: SocketAddr,
    broadcast: BroadcastHandle,
    cancel: CancellationToken,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(%addr, error = %e, "WebSocket handshake failed");
            return;
        }
    };
    let Some(mut subscription) = broadcast.subscribe().await else {
        return;
    };
    tracing::info!(%addr, client = subscription.id, "Overlay connected");

    let (mut outgoing, mut incoming) = ws.split();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = outgoing.send(Message::Close(None)).await;
                break;
            }
            frame = subscription.rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = outgoing.send(Message::text(frame.to_string())).await {
                    tracing::debug!(%addr, error = %e, "Send failed, dropping client");
                    break;
                }
            }
            msg = incoming.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(%addr, error = %e, "WebSocket read failed");
                    break;
                }
            },
        }
    }

    broadcast.unsubscribe(subscription.id);
    tracing::info!(%addr, client = subscription.id, "Overlay disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqlive_core::{Broadcaster, EventSink};
    use eqlive_types::OverlayEvent;
    use std::time::Duration;
    use tokio_tungstenite::connect_async;

    async fn next_text<S>(ws: &mut S) -> String
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out")
                .expect("stream ended")
                .expect("read error");
            if let Message::Text(text) = msg {
                return text.to_string();
            }
        }
    }

    #[tokio::test]
    async fn client_gets_snapshot_then_live_events() {
        let cancel = CancellationToken::new();
        let (broadcast, _task) = Broadcaster::spawn(cancel.clone());
        broadcast.broadcast(OverlayEvent::status("Tester", "Nektulos Forest"));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(run(listener, broadcast.clone(), cancel.clone()));

        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        assert_eq!(
            next_text(&mut ws).await,
            r#"{"type":"status","char_name":"Tester","current_zone":"Nektulos Forest"}"#
        );

        broadcast.broadcast(OverlayEvent::Interrupted);
        assert_eq!(next_text(&mut ws).await, r#"{"type":"interrupted"}"#);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }
}
