//! Snapshot building: projects a session into its wire shape

use crate::ws::protocol::{
    AirplaneSnapshot, AirplaneSummary, PlayerData, PlayerSnapshot, PlayerSummary,
    ProjectileSnapshot, ServerMsg, SessionSnapshot,
};

use super::entity::{Airplane, Player};
use super::session::GameSession;

/// Builds snapshots for network transmission
///
/// Snapshots are always complete; clients replace their state wholesale.
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Full authoritative state of `session`
    pub fn build(session: &GameSession) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session.id().to_string(),
            game_state: session.state(),
            players: session.players().map(Self::player).collect(),
            projectiles: session
                .projectiles()
                .filter(|p| p.is_active)
                .map(|p| ProjectileSnapshot {
                    id: p.id,
                    owner_id: p.owner_id.clone(),
                    kind: p.kind.clone(),
                    position: p.position,
                })
                .collect(),
            last_update_time: session.last_update_time,
        }
    }

    /// Per-tick state update message
    pub fn state_update(session: &GameSession) -> ServerMsg {
        ServerMsg::GameStateUpdate(Self::build(session))
    }

    /// Final message of a session ending in the tick loop
    pub fn game_over(session: &GameSession) -> ServerMsg {
        ServerMsg::GameOver {
            message: "Game Over!".to_string(),
            final_state: Self::build(session),
        }
    }

    fn player(player: &Player) -> PlayerSnapshot {
        PlayerSnapshot {
            id: player.id.clone(),
            name: player.name.clone(),
            score: player.score,
            is_ready: player.is_ready,
            airplane: player.airplane.as_ref().map(|a| AirplaneSnapshot {
                kind: a.kind.clone(),
                position: a.position,
                velocity: a.velocity,
                health: a.health,
                is_alive: a.is_alive,
            }),
        }
    }

    pub fn airplane_summary(airplane: &Airplane) -> AirplaneSummary {
        AirplaneSummary {
            kind: airplane.kind.clone(),
            position: airplane.position,
            is_alive: airplane.is_alive,
        }
    }

    pub fn player_summary(player: &Player) -> PlayerSummary {
        PlayerSummary {
            id: player.id.clone(),
            name: player.name.clone(),
            is_ready: player.is_ready,
            airplane: player.airplane.as_ref().map(Self::airplane_summary),
        }
    }

    pub fn player_data(player: &Player) -> PlayerData {
        PlayerData {
            name: player.name.clone(),
            score: player.score,
            airplane: player.airplane.clone(),
        }
    }

    /// Lobby list for `joinedSession`
    pub fn all_players(session: &GameSession) -> Vec<PlayerSummary> {
        session.players().map(Self::player_summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{Projectile, Vec2};
    use crate::game::session::SessionState;

    fn sample_session() -> GameSession {
        let mut session = GameSession::with_seed("s1", 7);
        let mut pilot = Player::new("p1", "Pilot");
        let mut plane = Airplane::new("defaultFighter", 200.0, 100.0);
        plane.set_position(10.0, 20.0);
        plane.set_velocity(1.0, 2.0);
        pilot.assign_airplane(plane);
        pilot.add_score(30);
        session.add_player(pilot);
        session.add_player(Player::new("p2", "Grounded"));
        session
    }

    #[test]
    fn snapshot_contains_players_and_airplanes() {
        let session = sample_session();
        let snapshot = SnapshotBuilder::build(&session);

        assert_eq!(snapshot.session_id, "s1");
        assert_eq!(snapshot.game_state, SessionState::Waiting);
        assert_eq!(snapshot.players.len(), 2);

        let pilot = &snapshot.players[0];
        assert_eq!(pilot.id, "p1");
        assert_eq!(pilot.score, 30);
        let plane = pilot.airplane.as_ref().unwrap();
        assert_eq!(plane.position, Vec2::new(10.0, 20.0));
        assert_eq!(plane.velocity, Vec2::new(1.0, 2.0));
        assert_eq!(plane.health, 100.0);
        assert!(plane.is_alive);

        assert!(snapshot.players[1].airplane.is_none());
    }

    #[test]
    fn snapshot_skips_inactive_projectiles() {
        let mut session = sample_session();
        let live = session.add_projectile(Projectile::new(
            "p1".to_string(),
            "bullet",
            10.0,
            500.0,
            Vec2::new(5.0, 5.0),
            Vec2::ZERO,
        ));
        let dead = session.add_projectile(Projectile::new(
            "p1".to_string(),
            "bullet",
            10.0,
            500.0,
            Vec2::ZERO,
            Vec2::ZERO,
        ));
        session.projectile_mut(&dead).unwrap().deactivate();

        let snapshot = SnapshotBuilder::build(&session);
        assert_eq!(snapshot.projectiles.len(), 1);
        assert_eq!(snapshot.projectiles[0].id, live);
        assert_eq!(snapshot.projectiles[0].owner_id, "p1");
        assert_eq!(snapshot.projectiles[0].kind, "bullet");
    }

    #[test]
    fn wire_shape_of_state_update() {
        let session = sample_session();
        let value = serde_json::to_value(SnapshotBuilder::state_update(&session)).unwrap();
        assert_eq!(value["event"], "gameStateUpdate");
        assert_eq!(value["data"]["sessionId"], "s1");
        assert_eq!(value["data"]["gameState"], "waiting");
        assert_eq!(value["data"]["players"][0]["isReady"], false);
        assert_eq!(value["data"]["players"][0]["airplane"]["type"], "defaultFighter");
        assert!(value["data"]["players"][1]["airplane"].is_null());
    }
}
