//! The session actor. All mutation of one game's state (players, journeys,
//! round index, stage) happens inside this loop, one event at a time;
//! everything else reaches it through its event queue.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::constants::{ROSTER_PERIOD, SESSION_QUEUE, SESSION_TTL};
use super::hub::{GameHub, HubEvent, IncomingMessage};
use super::journey::{rotation, GamePlay, WordJourney};
use super::player::Player;
use super::protocol::{ClientMessage, JourneyView, PlayView, ServerUpdate};
use super::registry::GameRegistry;
use super::words::pick_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStage {
    /// Accepting joins, no rounds active.
    Starting,
    /// Rounds in progress, including the review phase after the last round.
    Running,
    /// Results are out; the session is eligible for teardown.
    Ended,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("game has already started")]
    AlreadyStarted,
    #[error("game no longer exists")]
    Closed,
}

#[derive(Debug)]
pub enum SessionEvent {
    /// Add a player; only honored while the game is forming.
    Join {
        reply: oneshot::Sender<Result<Player, SessionError>>,
    },
    /// Fetch a player record, used to validate WebSocket connects.
    Lookup {
        player: Uuid,
        reply: oneshot::Sender<Option<Player>>,
    },
    /// A raw message read off a player's WebSocket.
    Inbound(IncomingMessage),
    /// The hub saw a previously-seen player register again.
    Reconnected(Uuid),
}

/// Clonable address of a running session: its id, the join code it was
/// created with, and the queues into its actor and hub.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub join_code: String,
    pub events: mpsc::Sender<SessionEvent>,
    pub hub: mpsc::Sender<HubEvent>,
}

impl SessionHandle {
    pub async fn join(&self) -> Result<Player, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(SessionEvent::Join { reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn lookup(&self, player: Uuid) -> Option<Player> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(SessionEvent::Lookup { player, reply })
            .await
            .ok()?;
        rx.await.ok()?
    }
}

/// One game instance: owns its players, journeys, and round state, plus the
/// hub that fans updates out to connected clients.
pub struct GameSession {
    id: Uuid,
    join_code: String,
    registry: Arc<GameRegistry>,
    hub: mpsc::Sender<HubEvent>,
    events: mpsc::Receiver<SessionEvent>,
    /// Insertion order is join order; position 0 may start the game.
    players: Vec<Player>,
    stage: GameStage,
    round: usize,
    limit: usize,
    journeys: Vec<WordJourney>,
    /// Players who have finished reviewing.
    finished: HashSet<Uuid>,
}

impl GameSession {
    /// Spawn a session and its hub, returning the handle the registry keeps.
    pub fn spawn(id: Uuid, join_code: String, registry: Arc<GameRegistry>) -> SessionHandle {
        let (events_tx, events_rx) = mpsc::channel(SESSION_QUEUE);
        let (hub_tx, hub) = GameHub::new(events_tx.clone());
        tokio::spawn(hub.run());

        let session = GameSession {
            id,
            join_code: join_code.clone(),
            registry,
            hub: hub_tx.clone(),
            events: events_rx,
            players: Vec::new(),
            stage: GameStage::Starting,
            round: 0,
            limit: 0,
            journeys: Vec::new(),
            finished: HashSet::new(),
        };
        tokio::spawn(session.run());

        SessionHandle {
            id,
            join_code,
            events: events_tx,
            hub: hub_tx,
        }
    }

    /// Event loop. Exits when the game ends or the lifetime ceiling fires,
    /// then unregisters itself and shuts the hub down.
    async fn run(mut self) {
        let ttl = tokio::time::sleep(SESSION_TTL);
        tokio::pin!(ttl);
        let mut roster = tokio::time::interval(ROSTER_PERIOD);

        loop {
            tokio::select! {
                _ = &mut ttl => {
                    tracing::warn!(session = %self.id, "session lifetime ceiling reached");
                    break;
                }
                _ = roster.tick(), if self.stage == GameStage::Starting => {
                    self.broadcast_players();
                }
                event = self.events.recv() => match event {
                    Some(event) => {
                        if self.handle_event(event).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }

        self.registry.remove_session(self.id).await;
        let _ = self.hub.try_send(HubEvent::Shutdown);
        tracing::info!(session = %self.id, "session closed");
    }

    /// Returns true once the game has ended and the loop should stop.
    async fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Join { reply } => {
                let _ = reply.send(self.join());
                false
            }
            SessionEvent::Lookup { player, reply } => {
                let _ = reply.send(self.player(player).cloned());
                false
            }
            SessionEvent::Inbound(message) => self.handle_message(message).await,
            SessionEvent::Reconnected(player) => {
                self.replay(player);
                false
            }
        }
    }

    fn join(&mut self) -> Result<Player, SessionError> {
        if self.stage != GameStage::Starting {
            return Err(SessionError::AlreadyStarted);
        }
        let player = Player::new(self.players.len());
        self.players.push(player.clone());
        Ok(player)
    }

    async fn handle_message(&mut self, message: IncomingMessage) -> bool {
        let parsed = match ClientMessage::parse(&message.payload) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(player = %message.player, "dropping inbound message: {err}");
                return false;
            }
        };

        let player = message.player;
        match parsed {
            ClientMessage::Name(name) => {
                self.rename(player, &name);
                false
            }
            ClientMessage::Start => {
                self.start(player).await;
                false
            }
            ClientMessage::Drawing(drawing) => {
                self.record_play(player, GamePlay::Drawing { drawing, author: player });
                false
            }
            ClientMessage::Guess(word) => {
                self.record_play(
                    player,
                    GamePlay::Word {
                        word,
                        author: Some(player),
                    },
                );
                false
            }
            ClientMessage::Award(target) => {
                self.award(player, target);
                false
            }
            ClientMessage::Done => self.mark_done(player),
        }
    }

    fn rename(&mut self, player: Uuid, name: &str) {
        match self.player_mut(player) {
            Some(record) => {
                if let Err(err) = record.set_name(name) {
                    tracing::warn!(%player, "rejected name change: {err}");
                }
            }
            None => tracing::warn!(%player, "name change from unknown player"),
        }
    }

    async fn start(&mut self, player: Uuid) {
        if self.stage != GameStage::Starting {
            tracing::debug!(session = %self.id, "ignoring start for a running game");
            return;
        }
        // Only the first player in join order may start the game.
        if self.players.first().map(|p| p.id) != Some(player) {
            tracing::warn!(session = %self.id, %player, "ignoring start from non-owner");
            return;
        }

        self.stage = GameStage::Running;
        // One final roster in case the ticker missed a late join.
        self.broadcast_players();
        // The game is no longer joinable; free the code for reuse.
        self.registry.release_join_code(&self.join_code).await;

        self.limit = self.players.len();
        self.round = 0;
        self.finished.clear();
        self.start_journeys();
        self.send_round_prompts();
        tracing::info!(session = %self.id, players = self.limit, "game started");
    }

    /// One journey per player, each visiting the roster at its own cyclic
    /// offset and seeded with a generated prompt.
    fn start_journeys(&mut self) {
        let ids: Vec<Uuid> = self.players.iter().map(|p| p.id).collect();
        self.journeys = (0..ids.len())
            .map(|offset| WordJourney::new(rotation(&ids, offset), pick_prompt().to_string()))
            .collect();
    }

    /// Hand every journey's latest play to whoever acts on it this round.
    /// Even rounds draw a word, odd rounds guess a drawing.
    fn send_round_prompts(&self) {
        for journey in &self.journeys {
            let Some(contributor) = journey.contributor_at(self.round) else {
                continue;
            };
            let Some(latest) = journey.latest() else {
                continue;
            };
            let update = if self.round % 2 == 0 {
                ServerUpdate::Word(latest.payload().to_string())
            } else {
                ServerUpdate::Drawing(latest.payload().to_string())
            };
            self.send_to(contributor, &update);
        }
    }

    fn record_play(&mut self, player: Uuid, play: GamePlay) {
        if self.stage != GameStage::Running || self.round >= self.limit {
            tracing::debug!(%player, "ignoring play outside an active round");
            return;
        }
        let wants_drawing = self.round % 2 == 0;
        if wants_drawing != matches!(play, GamePlay::Drawing { .. }) {
            tracing::warn!(%player, round = self.round, "play does not match round parity");
            return;
        }
        let round = self.round;
        let Some(journey) = self
            .journeys
            .iter_mut()
            .find(|j| j.contributor_at(round) == Some(player))
        else {
            tracing::warn!(%player, round, "no journey expects a play from this player");
            return;
        };
        if journey.has_play_for(round) {
            tracing::debug!(%player, round, "duplicate play for this round");
            return;
        }
        journey.plays.push(play);
        self.check_progress();
    }

    /// Recompute what we are still waiting on. Idempotent: re-running after
    /// an advance changes nothing.
    fn check_progress(&mut self) -> bool {
        if self.stage != GameStage::Running {
            return false;
        }

        if self.round == self.limit {
            // Review phase: completion is driven by done-signals alone.
            if !self.players.is_empty() && self.finished.len() == self.players.len() {
                self.broadcast(&ServerUpdate::Results(self.players.clone()));
                self.stage = GameStage::Ended;
                tracing::info!(session = %self.id, "game ended");
                return true;
            }
            return false;
        }

        let waiting = self
            .journeys
            .iter()
            .filter(|j| !j.has_play_for(self.round))
            .count();
        if waiting > 0 {
            tracing::debug!(session = %self.id, round = self.round, waiting, "round incomplete");
            return false;
        }

        self.round += 1;
        if self.round == self.limit {
            self.broadcast(&ServerUpdate::Review(self.journey_views()));
        } else {
            self.send_round_prompts();
        }
        false
    }

    fn award(&mut self, from: Uuid, target: Uuid) {
        if self.stage != GameStage::Running {
            return;
        }
        if target == from {
            return;
        }
        match self.player_mut(target) {
            Some(record) => record.points += 1,
            None => tracing::warn!(%target, "award for unknown player"),
        }
    }

    fn mark_done(&mut self, player: Uuid) -> bool {
        if self.stage != GameStage::Running || self.round != self.limit {
            tracing::debug!(%player, "ignoring done outside the review phase");
            return false;
        }
        if self.player(player).is_none() {
            return false;
        }
        if !self.finished.insert(player) {
            // Already counted.
            return false;
        }
        self.check_progress()
    }

    /// Re-send the one payload a returning player needs to resynchronize,
    /// rather than a full history replay.
    fn replay(&mut self, player: Uuid) {
        match self.stage {
            GameStage::Starting => {
                self.send_to(player, &ServerUpdate::Players(self.players.clone()));
            }
            GameStage::Running if self.round == self.limit => {
                self.send_to(player, &ServerUpdate::Review(self.journey_views()));
            }
            GameStage::Running => {
                let round = self.round;
                let Some(journey) = self
                    .journeys
                    .iter()
                    .find(|j| j.contributor_at(round) == Some(player))
                else {
                    return;
                };
                if journey.has_play_for(round) {
                    // Already contributed; they are waiting like everyone else.
                    return;
                }
                if let Some(latest) = journey.latest() {
                    let update = if round % 2 == 0 {
                        ServerUpdate::Word(latest.payload().to_string())
                    } else {
                        ServerUpdate::Drawing(latest.payload().to_string())
                    };
                    self.send_to(player, &update);
                }
            }
            GameStage::Ended => {}
        }
    }

    fn journey_views(&self) -> Vec<JourneyView> {
        self.journeys
            .iter()
            .map(|journey| JourneyView {
                play_order: journey
                    .order
                    .iter()
                    .filter_map(|id| self.player(*id).cloned())
                    .collect(),
                game_plays: journey
                    .plays
                    .iter()
                    .map(|play| match play {
                        GamePlay::Word { word, author } => PlayView::Word {
                            word: word.clone(),
                            player: author.and_then(|id| self.player(id).cloned()),
                        },
                        GamePlay::Drawing { drawing, author } => PlayView::Drawing {
                            drawing: drawing.clone(),
                            player: self.player(*author).cloned(),
                        },
                    })
                    .collect(),
            })
            .collect()
    }

    fn player(&self, id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    fn broadcast_players(&self) {
        self.broadcast(&ServerUpdate::Players(self.players.clone()));
    }

    fn broadcast(&self, update: &ServerUpdate) {
        let Some(payload) = encode(update) else { return };
        if let Err(err) = self.hub.try_send(HubEvent::Broadcast { payload }) {
            tracing::warn!(session = %self.id, "could not queue broadcast: {err}");
        }
    }

    fn send_to(&self, target: Uuid, update: &ServerUpdate) {
        let Some(payload) = encode(update) else { return };
        if let Err(err) = self.hub.try_send(HubEvent::SendTo {
            target,
            payload,
            attempt: 0,
        }) {
            tracing::warn!(session = %self.id, %target, "could not queue targeted send: {err}");
        }
    }
}

fn encode(update: &ServerUpdate) -> Option<String> {
    match serde_json::to_string(update) {
        Ok(payload) => Some(payload),
        Err(err) => {
            tracing::error!("could not serialize update: {err}");
            None
        }
    }
}
