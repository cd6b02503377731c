//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::entity::{Airplane, Vec2};
use crate::game::session::SessionState;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Join (or create) a session
    #[serde(rename_all = "camelCase")]
    JoinSession {
        session_id: String,
        #[serde(default)]
        player_name: Option<String>,
        /// Defaults to the connection id
        #[serde(default)]
        player_id: Option<String>,
    },

    /// Gameplay command
    #[serde(rename_all = "camelCase")]
    PlayerInput {
        session_id: String,
        input: InputCommand,
    },

    /// Toggle the caller's ready flag
    #[serde(rename_all = "camelCase")]
    PlayerReady { session_id: String },
}

/// Gameplay command carried by `playerInput`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputCommand {
    /// Set velocity to `direction * airplane.speed`
    Move {
        #[serde(default)]
        direction: Option<Direction>,
    },
    /// Fire a projectile
    Shoot,
    /// Anything else; ignored
    #[serde(other)]
    Unknown,
}

/// Movement direction; missing components count as zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
}

impl Direction {
    pub fn to_vec(self) -> Vec2 {
        Vec2::new(self.x.unwrap_or(0.0), self.y.unwrap_or(0.0))
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Reply to the joining connection
    #[serde(rename_all = "camelCase")]
    JoinedSession {
        session_id: String,
        player_id: String,
        player_data: PlayerData,
        game_state: SessionState,
        all_players: Vec<PlayerSummary>,
    },

    /// Another player joined
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_id: String,
        name: String,
        is_ready: bool,
        airplane: Option<AirplaneSummary>,
    },

    /// A player left or disconnected
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: String,
        name: String,
        message: String,
    },

    #[serde(rename_all = "camelCase")]
    PlayerReadyStateChanged { player_id: String, is_ready: bool },

    /// Every player is ready; the simulation is starting
    GameStarting { message: String },

    /// Full authoritative state, sent every tick
    GameStateUpdate(SessionSnapshot),

    /// Session finished in the tick loop
    #[serde(rename_all = "camelCase")]
    GameOver {
        message: String,
        final_state: SessionSnapshot,
    },

    /// Error message
    Error { message: String },

    /// Join refused because the session does not exist
    #[serde(rename_all = "camelCase")]
    SessionNotFound { session_id: String },
}

/// The joining player's own record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    pub name: String,
    pub score: u32,
    pub airplane: Option<Airplane>,
}

/// Lobby view of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: String,
    pub name: String,
    pub is_ready: bool,
    pub airplane: Option<AirplaneSummary>,
}

/// Lobby view of an airplane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirplaneSummary {
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Vec2,
    pub is_alive: bool,
}

/// Snapshot of a whole session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub game_state: SessionState,
    pub players: Vec<PlayerSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub last_update_time: u64,
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: String,
    pub name: String,
    pub score: u32,
    pub is_ready: bool,
    pub airplane: Option<AirplaneSnapshot>,
}

/// Airplane state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirplaneSnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub health: f32,
    pub is_alive: bool,
}

/// Projectile state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileSnapshot {
    pub id: Uuid,
    pub owner_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Vec2,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_join_with_optional_fields() {
        let msg: ClientMsg = serde_json::from_value(json!({
            "event": "joinSession",
            "data": { "sessionId": "s1", "playerName": "Ace" }
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMsg::JoinSession {
                session_id: "s1".to_string(),
                player_name: Some("Ace".to_string()),
                player_id: None,
            }
        );
    }

    #[test]
    fn parses_move_with_partial_direction() {
        let msg: ClientMsg = serde_json::from_value(json!({
            "event": "playerInput",
            "data": { "sessionId": "s1", "input": { "type": "move", "direction": { "x": 1 } } }
        }))
        .unwrap();
        let ClientMsg::PlayerInput { input, .. } = msg else {
            panic!("expected playerInput");
        };
        let InputCommand::Move { direction } = input else {
            panic!("expected move");
        };
        assert_eq!(direction.unwrap_or_default().to_vec(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn move_without_direction_is_zero() {
        let input: InputCommand = serde_json::from_value(json!({ "type": "move" })).unwrap();
        assert_eq!(input, InputCommand::Move { direction: None });
    }

    #[test]
    fn unknown_input_type_is_captured() {
        let input: InputCommand =
            serde_json::from_value(json!({ "type": "barrelRoll", "speed": 9 })).unwrap();
        assert_eq!(input, InputCommand::Unknown);

        let shoot: InputCommand =
            serde_json::from_value(json!({ "type": "shoot", "extra": true })).unwrap();
        assert_eq!(shoot, InputCommand::Shoot);
    }

    #[test]
    fn unknown_event_is_rejected() {
        let parsed = serde_json::from_value::<ClientMsg>(json!({
            "event": "teleport",
            "data": {}
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn server_messages_use_event_envelope() {
        let msg = ServerMsg::PlayerReadyStateChanged {
            player_id: "p1".to_string(),
            is_ready: true,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "playerReadyStateChanged");
        assert_eq!(value["data"]["playerId"], "p1");
        assert_eq!(value["data"]["isReady"], true);

        let value = serde_json::to_value(ServerMsg::SessionNotFound {
            session_id: "gone".to_string(),
        })
        .unwrap();
        assert_eq!(value["event"], "sessionNotFound");
        assert_eq!(value["data"]["sessionId"], "gone");
    }
}
