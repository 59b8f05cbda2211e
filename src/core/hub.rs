//! The per-session message hub. One hub task owns the set of live
//! connections for its session; everything else talks to it through its
//! event queue, so the connected-set needs no locking.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::constants::{HUB_QUEUE, SEND_RETRY_DELAY, SEND_RETRY_LIMIT, SESSION_TTL};
use super::session::SessionEvent;

/// A message read off a player's WebSocket, not yet parsed.
#[derive(Debug)]
pub struct IncomingMessage {
    pub player: Uuid,
    pub payload: String,
}

/// The hub's view of one live connection: the player it speaks for and the
/// outbound frame queue its write pump drains. Dropping the handle closes
/// the queue, which makes the write pump send a Close frame and stop.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub conn_id: Uuid,
    pub player: Uuid,
    pub outbound: mpsc::Sender<String>,
}

#[derive(Debug)]
pub enum HubEvent {
    Register {
        conn: ConnectionHandle,
    },
    Unregister {
        conn_id: Uuid,
    },
    Broadcast {
        payload: String,
    },
    SendTo {
        target: Uuid,
        payload: String,
        attempt: u32,
    },
    /// Sent by the session once it has finished; queued updates ahead of it
    /// are still delivered first.
    Shutdown,
}

/// Tracks currently connected players for one session and routes updates
/// out to them.
pub struct GameHub {
    events: mpsc::Receiver<HubEvent>,
    /// Own handle, kept for rescheduling targeted sends.
    handle: mpsc::Sender<HubEvent>,
    session: mpsc::Sender<SessionEvent>,
    /// Live connections by player identity.
    connections: HashMap<Uuid, ConnectionHandle>,
    /// Player identities that have connected at least once; a repeat
    /// registration means a reconnect and triggers a state replay.
    seen: HashSet<Uuid>,
}

impl GameHub {
    pub fn new(session: mpsc::Sender<SessionEvent>) -> (mpsc::Sender<HubEvent>, Self) {
        let (handle, events) = mpsc::channel(HUB_QUEUE);
        let hub = Self {
            events,
            handle: handle.clone(),
            session,
            connections: HashMap::new(),
            seen: HashSet::new(),
        };
        (handle, hub)
    }

    /// Event loop. Exits on session shutdown or when the lifetime ceiling
    /// fires, closing every outbound queue either way.
    pub async fn run(mut self) {
        let ttl = tokio::time::sleep(SESSION_TTL);
        tokio::pin!(ttl);

        loop {
            tokio::select! {
                _ = &mut ttl => {
                    tracing::warn!("hub lifetime ceiling reached, closing connections");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(HubEvent::Shutdown) | None => break,
                    Some(event) => self.handle_event(event),
                }
            }
        }

        self.connections.clear();
    }

    fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register { conn } => self.register(conn),
            HubEvent::Unregister { conn_id } => self.unregister(conn_id),
            HubEvent::Broadcast { payload } => self.broadcast(payload),
            HubEvent::SendTo {
                target,
                payload,
                attempt,
            } => self.send_to(target, payload, attempt),
            // Shutdown never reaches here; run() breaks on it directly.
            HubEvent::Shutdown => {}
        }
    }

    fn register(&mut self, conn: ConnectionHandle) {
        let player = conn.player;
        let returning = !self.seen.insert(player);
        // Replacing an existing handle drops it, closing the stale queue.
        self.connections.insert(player, conn);
        tracing::debug!(%player, returning, "connection registered");

        if returning {
            if let Err(err) = self.session.try_send(SessionEvent::Reconnected(player)) {
                tracing::warn!(%player, "could not notify session of reconnect: {err}");
            }
        }
    }

    /// Removes the connection if it is still the current one for its
    /// player. Safe to call repeatedly and after a replacement.
    fn unregister(&mut self, conn_id: Uuid) {
        self.connections.retain(|_, conn| conn.conn_id != conn_id);
    }

    fn broadcast(&mut self, payload: String) {
        let mut saturated = Vec::new();
        for (player, conn) in &self.connections {
            if conn.outbound.try_send(payload.clone()).is_err() {
                saturated.push(*player);
            }
        }
        // A slow consumer is cut loose rather than allowed to stall the hub.
        for player in saturated {
            tracing::warn!(%player, "outbound queue saturated, disconnecting");
            self.connections.remove(&player);
        }
    }

    /// Deliver to one player. An absent or saturated target gets the
    /// message rescheduled after a delay rather than silently dropped.
    fn send_to(&mut self, target: Uuid, payload: String, attempt: u32) {
        let payload = match self.connections.get(&target) {
            Some(conn) => match conn.outbound.try_send(payload) {
                Ok(()) => return,
                Err(err) => err.into_inner(),
            },
            None => payload,
        };

        if attempt >= SEND_RETRY_LIMIT {
            tracing::error!(
                %target,
                attempt,
                "abandoning undeliverable targeted message"
            );
            return;
        }

        let hub = self.handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SEND_RETRY_DELAY).await;
            let _ = hub
                .send(HubEvent::SendTo {
                    target,
                    payload,
                    attempt: attempt + 1,
                })
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::OUTBOUND_QUEUE;
    use tokio::sync::mpsc::Receiver;
    use tokio::time::{timeout, Duration};

    fn spawn_hub() -> (mpsc::Sender<HubEvent>, Receiver<SessionEvent>) {
        let (session_tx, session_rx) = mpsc::channel(8);
        let (hub_tx, hub) = GameHub::new(session_tx);
        tokio::spawn(hub.run());
        (hub_tx, session_rx)
    }

    async fn connect(
        hub: &mpsc::Sender<HubEvent>,
        player: Uuid,
        capacity: usize,
    ) -> (Uuid, Receiver<String>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(capacity);
        hub.send(HubEvent::Register {
            conn: ConnectionHandle {
                conn_id,
                player,
                outbound: tx,
            },
        })
        .await
        .unwrap();
        (conn_id, rx)
    }

    async fn recv_frame(rx: &mut Receiver<String>) -> String {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("queue closed")
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_connections() {
        let (hub, _session_rx) = spawn_hub();
        let (_, mut rx_a) = connect(&hub, Uuid::new_v4(), OUTBOUND_QUEUE).await;
        let (_, mut rx_b) = connect(&hub, Uuid::new_v4(), OUTBOUND_QUEUE).await;

        hub.send(HubEvent::Broadcast {
            payload: "hello".into(),
        })
        .await
        .unwrap();

        assert_eq!(recv_frame(&mut rx_a).await, "hello");
        assert_eq!(recv_frame(&mut rx_b).await, "hello");
    }

    #[tokio::test]
    async fn test_first_register_is_not_a_reconnect() {
        let (hub, mut session_rx) = spawn_hub();
        let player = Uuid::new_v4();
        let (_, _rx) = connect(&hub, player, OUTBOUND_QUEUE).await;

        // Flush the hub queue, then confirm no reconnect notice arrived.
        hub.send(HubEvent::Broadcast { payload: "x".into() })
            .await
            .unwrap();
        assert!(
            timeout(Duration::from_millis(200), session_rx.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_repeat_register_notifies_session() {
        let (hub, mut session_rx) = spawn_hub();
        let player = Uuid::new_v4();

        let (conn_a, _rx_a) = connect(&hub, player, OUTBOUND_QUEUE).await;
        hub.send(HubEvent::Unregister { conn_id: conn_a })
            .await
            .unwrap();
        let (_, mut rx_b) = connect(&hub, player, OUTBOUND_QUEUE).await;

        match timeout(Duration::from_secs(5), session_rx.recv())
            .await
            .unwrap()
            .unwrap()
        {
            SessionEvent::Reconnected(id) => assert_eq!(id, player),
            other => panic!("expected reconnect notice, got {:?}", other),
        }

        // The fresh handle receives traffic.
        hub.send(HubEvent::Broadcast {
            payload: "again".into(),
        })
        .await
        .unwrap();
        assert_eq!(recv_frame(&mut rx_b).await, "again");
    }

    #[tokio::test]
    async fn test_stale_unregister_leaves_replacement_alone() {
        let (hub, _session_rx) = spawn_hub();
        let player = Uuid::new_v4();

        let (conn_a, _rx_a) = connect(&hub, player, OUTBOUND_QUEUE).await;
        let (_, mut rx_b) = connect(&hub, player, OUTBOUND_QUEUE).await;

        // The old pump unregisters after its replacement took over; the
        // replacement must keep receiving.
        hub.send(HubEvent::Unregister { conn_id: conn_a })
            .await
            .unwrap();
        hub.send(HubEvent::Unregister { conn_id: conn_a })
            .await
            .unwrap();
        hub.send(HubEvent::Broadcast {
            payload: "still here".into(),
        })
        .await
        .unwrap();

        assert_eq!(recv_frame(&mut rx_b).await, "still here");
    }

    #[tokio::test]
    async fn test_saturated_broadcast_disconnects_only_slow_consumer() {
        let (hub, _session_rx) = spawn_hub();
        let (_, mut slow_rx) = connect(&hub, Uuid::new_v4(), 1).await;
        let (_, mut fast_rx) = connect(&hub, Uuid::new_v4(), OUTBOUND_QUEUE).await;

        hub.send(HubEvent::Broadcast {
            payload: "one".into(),
        })
        .await
        .unwrap();
        // Queue of the slow consumer is now full; this overflows it.
        hub.send(HubEvent::Broadcast {
            payload: "two".into(),
        })
        .await
        .unwrap();

        assert_eq!(recv_frame(&mut fast_rx).await, "one");
        assert_eq!(recv_frame(&mut fast_rx).await, "two");

        // Slow consumer got the first frame, then its queue was closed.
        assert_eq!(recv_frame(&mut slow_rx).await, "one");
        assert_eq!(
            timeout(Duration::from_secs(5), slow_rx.recv()).await.unwrap(),
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_targeted_send_retries_until_target_connects() {
        let (hub, _session_rx) = spawn_hub();
        let player = Uuid::new_v4();

        hub.send(HubEvent::SendTo {
            target: player,
            payload: "your prompt".into(),
            attempt: 0,
        })
        .await
        .unwrap();

        // Target shows up late; the redelivery loop must still reach it.
        let (_, mut rx) = connect(&hub, player, OUTBOUND_QUEUE).await;
        let frame = timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("redelivery never happened")
            .expect("queue closed");
        assert_eq!(frame, "your prompt");
    }

    #[tokio::test]
    async fn test_shutdown_closes_outbound_queues() {
        let (hub, _session_rx) = spawn_hub();
        let (_, mut rx) = connect(&hub, Uuid::new_v4(), OUTBOUND_QUEUE).await;

        hub.send(HubEvent::Broadcast {
            payload: "last words".into(),
        })
        .await
        .unwrap();
        hub.send(HubEvent::Shutdown).await.unwrap();

        // Updates queued before shutdown still arrive, then the queue ends.
        assert_eq!(recv_frame(&mut rx).await, "last words");
        assert_eq!(timeout(Duration::from_secs(5), rx.recv()).await.unwrap(), None);
    }
}
