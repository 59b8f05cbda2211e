//! The per-connection adapter between one WebSocket and the hub. Exactly
//! one read pump and one write pump run per connection; all reads happen
//! in the former and all writes in the latter.

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::constants::{MAX_MESSAGE_BYTES, OUTBOUND_QUEUE, PING_PERIOD};
use super::hub::{ConnectionHandle, HubEvent, IncomingMessage};
use super::player::Player;
use super::session::SessionEvent;

/// Attach an upgraded socket to a session's hub and pump it until either
/// side goes away.
pub async fn serve_connection(
    socket: WebSocket,
    player: Player,
    session: mpsc::Sender<SessionEvent>,
    hub: mpsc::Sender<HubEvent>,
) {
    let (sink, stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
    let conn_id = Uuid::new_v4();

    let registered = hub
        .send(HubEvent::Register {
            conn: ConnectionHandle {
                conn_id,
                player: player.id,
                outbound: outbound_tx,
            },
        })
        .await;
    if registered.is_err() {
        // Session already tore down; dropping the socket closes it.
        tracing::debug!(player = %player.id, "connect raced session teardown");
        return;
    }

    let player_id = player.id;
    tracing::info!(player = %player_id, %conn_id, "connection open");

    let mut write_task = tokio::spawn(write_pump(sink, outbound_rx));
    let mut read_task = tokio::spawn(read_pump(stream, player_id, session));

    // Whichever pump stops first tears the other down.
    tokio::select! {
        _ = &mut write_task => read_task.abort(),
        _ = &mut read_task => write_task.abort(),
    }

    let _ = hub.try_send(HubEvent::Unregister { conn_id });
    tracing::info!(player = %player_id, %conn_id, "connection closed");
}

/// Pumps frames from the socket to the session's event queue.
async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    player: Uuid,
    session: mpsc::Sender<SessionEvent>,
) {
    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(%player, "websocket read error: {err}");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                if text.len() > MAX_MESSAGE_BYTES {
                    tracing::warn!(%player, bytes = text.len(), "oversized frame, disconnecting");
                    break;
                }
                let payload = normalize_whitespace(&text);
                let event = SessionEvent::Inbound(IncomingMessage { player, payload });
                // Never block the read loop on a busy session.
                if session.try_send(event).is_err() {
                    tracing::warn!(%player, "session queue saturated, dropping message");
                }
            }
            Message::Close(_) => break,
            // axum answers pings itself; pongs only refresh the transport's
            // liveness window.
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Binary(_) => {
                tracing::warn!(%player, "unexpected binary frame");
            }
        }
    }
}

/// Drains the outbound queue onto the socket and keeps the peer alive
/// with periodic pings.
async fn write_pump(mut sink: SplitSink<WebSocket, Message>, mut outbound: mpsc::Receiver<String>) {
    let first_ping = tokio::time::Instant::now() + PING_PERIOD;
    let mut ping = tokio::time::interval_at(first_ping, PING_PERIOD);

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                None => {
                    // The hub closed the queue; say goodbye properly.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.replace(['\r', '\n'], " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello\nworld\r\n"), "hello world");
        assert_eq!(normalize_whitespace("plain"), "plain");
        assert_eq!(normalize_whitespace(" \n "), "");
    }
}
