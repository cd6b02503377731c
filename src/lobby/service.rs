//! Lobby service - join, ready, leave and disconnect handling
//!
//! Both the WebSocket handler and the REST routes go through here, so the
//! same session invariants hold for either entry point.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::game::entity::{Airplane, Player, PlayerId};
use crate::game::error::GameError;
use crate::game::registry::{RoomMessage, SessionHandle, SessionRegistry};
use crate::game::session::SessionState;
use crate::game::snapshot::SnapshotBuilder;
use crate::game::tick::TickScheduler;
use crate::ws::dispatcher::{InputDispatcher, PlayerBinding};
use crate::ws::protocol::ServerMsg;

/// Result of a WebSocket join
pub struct JoinedConnection {
    pub player_id: PlayerId,
    /// `joinedSession` reply for the joining connection
    pub reply: ServerMsg,
    /// Subscription to the session room, opened before anyone was told
    pub room: broadcast::Receiver<RoomMessage>,
}

#[derive(Debug, Clone, Copy)]
enum ReadyChange {
    Toggle,
    Set(bool),
}

/// Session lifecycle orchestration
pub struct LobbyService {
    config: Arc<Config>,
    registry: Arc<SessionRegistry>,
    dispatcher: Arc<InputDispatcher>,
    scheduler: Arc<TickScheduler>,
}

impl LobbyService {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<SessionRegistry>,
        dispatcher: Arc<InputDispatcher>,
        scheduler: Arc<TickScheduler>,
    ) -> Self {
        Self {
            config,
            registry,
            dispatcher,
            scheduler,
        }
    }

    /// Create a session (or return the live one with this id)
    pub fn create_session(&self, session_id: Option<String>) -> String {
        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.open_session(&session_id).id.clone()
    }

    /// Join over a WebSocket connection. The session is created on demand
    /// unless auto-creation is disabled.
    pub fn join_connection(
        &self,
        connection_id: Uuid,
        session_id: &str,
        player_name: Option<String>,
        player_id: Option<String>,
    ) -> Result<JoinedConnection, GameError> {
        if let Some(previous) = self.dispatcher.binding(&connection_id) {
            info!(
                connection_id = %connection_id,
                previous_session = %previous.session_id,
                "Connection re-joining, leaving previous session"
            );
            self.disconnect(connection_id);
        }

        let handle = if self.config.auto_create_sessions {
            self.open_session(session_id)
        } else {
            self.live_session(session_id)?
        };

        let player_id = player_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| connection_id.to_string());
        let name = player_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Player_{}", &connection_id.simple().to_string()[..5]));

        let room = handle.subscribe();
        let reply = self.admit(&handle, &player_id, name, Some(connection_id))?;

        self.dispatcher.bind(
            connection_id,
            PlayerBinding {
                player_id: player_id.clone(),
                session_id: handle.id.clone(),
            },
        );

        Ok(JoinedConnection {
            player_id,
            reply,
            room,
        })
    }

    /// Join through REST: the session must already exist
    pub fn join_player(
        &self,
        session_id: &str,
        player_id: &str,
        player_name: &str,
    ) -> Result<ServerMsg, GameError> {
        let handle = self.live_session(session_id)?;
        self.admit(&handle, player_id, player_name.to_string(), None)
    }

    /// Flip the ready flag of the player bound to `connection_id`
    pub fn toggle_ready(&self, connection_id: Uuid, session_id: &str) -> Result<bool, GameError> {
        let binding = self
            .dispatcher
            .authorize(&connection_id, session_id, "ready signal")?;
        self.update_ready(session_id, &binding.player_id, ReadyChange::Toggle)
    }

    /// Mark a player ready (REST)
    pub fn set_ready(&self, session_id: &str, player_id: &str) -> Result<bool, GameError> {
        self.update_ready(session_id, player_id, ReadyChange::Set(true))
    }

    /// Remove a player (REST). Absent players are a no-op.
    pub fn leave(&self, session_id: &str, player_id: &str) -> Result<(), GameError> {
        let handle = self
            .registry
            .get(session_id)
            .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;
        self.remove_player(&handle, player_id);
        Ok(())
    }

    /// Transport-level disconnect
    pub fn disconnect(&self, connection_id: Uuid) {
        let Some(binding) = self.dispatcher.unbind(&connection_id) else {
            debug!(connection_id = %connection_id, "Disconnected without a session binding");
            return;
        };

        match self.registry.get(&binding.session_id) {
            Some(handle) => self.remove_player(&handle, &binding.player_id),
            None => debug!(
                connection_id = %connection_id,
                session_id = %binding.session_id,
                "Session already gone on disconnect"
            ),
        }
    }

    /// Registered session for `session_id`, replacing an ended one
    fn open_session(&self, session_id: &str) -> Arc<SessionHandle> {
        let handle = self.registry.create(session_id);
        let ended = handle.lock().state() == SessionState::Ended;
        if ended {
            self.registry.remove_if_same(&handle);
            return self.registry.create(session_id);
        }
        handle
    }

    fn live_session(&self, session_id: &str) -> Result<Arc<SessionHandle>, GameError> {
        self.registry
            .get(session_id)
            .filter(|h| h.lock().state() != SessionState::Ended)
            .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))
    }

    /// Add a player with a fresh airplane and announce it to the room
    fn admit(
        &self,
        handle: &SessionHandle,
        player_id: &str,
        name: String,
        connection_id: Option<Uuid>,
    ) -> Result<ServerMsg, GameError> {
        let game = &self.config.game;

        let (reply, announcement) = {
            let mut session = handle.lock();
            if session.state() == SessionState::Ended {
                return Err(GameError::SessionNotFound(handle.id.clone()));
            }
            if session.player(player_id).is_some() {
                warn!(
                    session_id = %handle.id,
                    player_id = %player_id,
                    "Player id already in session"
                );
                return Err(GameError::PlayerAlreadyInSession(player_id.to_string()));
            }

            let spawn = session.spawn_position(game.spawn_min, game.spawn_spread);
            let mut airplane = Airplane::new(
                game.airplane_type.clone(),
                game.airplane_speed,
                game.airplane_health,
            );
            airplane.set_position(spawn.x, spawn.y);

            let mut player = Player::new(player_id, name);
            player.assign_airplane(airplane);

            let announcement = ServerMsg::PlayerJoined {
                player_id: player.id.clone(),
                name: player.name.clone(),
                is_ready: player.is_ready,
                airplane: player.airplane.as_ref().map(SnapshotBuilder::airplane_summary),
            };
            let player_data = SnapshotBuilder::player_data(&player);
            session.add_player(player);

            let reply = ServerMsg::JoinedSession {
                session_id: handle.id.clone(),
                player_id: player_id.to_string(),
                player_data,
                game_state: session.state(),
                all_players: SnapshotBuilder::all_players(&session),
            };
            (reply, announcement)
        };

        match connection_id {
            Some(connection_id) => handle.broadcast_except(connection_id, announcement),
            None => handle.broadcast(announcement),
        }
        Ok(reply)
    }

    fn update_ready(
        &self,
        session_id: &str,
        player_id: &str,
        change: ReadyChange,
    ) -> Result<bool, GameError> {
        let handle = self
            .registry
            .get(session_id)
            .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;

        let (is_ready, started) = {
            let mut session = handle.lock();
            let player = session
                .player_mut(player_id)
                .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
            player.is_ready = match change {
                ReadyChange::Toggle => !player.is_ready,
                ReadyChange::Set(ready) => ready,
            };
            let is_ready = player.is_ready;
            info!(
                session_id = %session_id,
                player_id = %player_id,
                is_ready,
                "Player ready state changed"
            );
            (is_ready, session.try_activate())
        };

        handle.broadcast(ServerMsg::PlayerReadyStateChanged {
            player_id: player_id.to_string(),
            is_ready,
        });

        if started {
            info!(session_id = %session_id, "All players ready, session active");
            handle.broadcast(ServerMsg::GameStarting {
                message: "All players ready! Game starting...".to_string(),
            });
            self.scheduler.start(handle);
        }

        Ok(is_ready)
    }

    /// Remove a player, announce it, and tear the session down once empty
    fn remove_player(&self, handle: &Arc<SessionHandle>, player_id: &str) {
        let (removed, finished) = {
            let mut session = handle.lock();
            let removed = session.remove_player(player_id);
            let finished = session.is_empty() && session.state() == SessionState::Ended;
            (removed, finished)
        };

        if let Some(player) = removed {
            let dropped = self.dispatcher.unbind_player(&handle.id, &player.id);
            if dropped > 0 {
                debug!(
                    session_id = %handle.id,
                    player_id = %player.id,
                    dropped,
                    "Released connection bindings of removed player"
                );
            }
            handle.broadcast(ServerMsg::PlayerLeft {
                message: format!("{} has left the game.", player.name),
                player_id: player.id,
                name: player.name,
            });
        }

        if finished {
            info!(session_id = %handle.id, "Session empty, tearing down");
            self.scheduler.stop(&handle.id);
            self.registry.remove_if_same(handle);
        }
    }
}
