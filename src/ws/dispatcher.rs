//! Routes gameplay input from a connection into its session

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::game::combat::WeaponStats;
use crate::game::entity::{PlayerId, SessionId};
use crate::game::error::GameError;
use crate::game::registry::SessionRegistry;
use crate::game::session::GameSession;
use crate::ws::protocol::InputCommand;

/// Which player a connection speaks for, and in which session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerBinding {
    pub player_id: PlayerId,
    pub session_id: SessionId,
}

/// Connection → player binding plus input routing
pub struct InputDispatcher {
    registry: Arc<SessionRegistry>,
    weapon: WeaponStats,
    bindings: DashMap<Uuid, PlayerBinding>,
}

impl InputDispatcher {
    pub fn new(registry: Arc<SessionRegistry>, config: &GameConfig) -> Self {
        Self {
            registry,
            weapon: WeaponStats::from_config(config),
            bindings: DashMap::new(),
        }
    }

    /// Bind a connection after a successful join. Returns the previous binding.
    pub fn bind(&self, connection_id: Uuid, binding: PlayerBinding) -> Option<PlayerBinding> {
        self.bindings.insert(connection_id, binding)
    }

    pub fn unbind(&self, connection_id: &Uuid) -> Option<PlayerBinding> {
        self.bindings.remove(connection_id).map(|(_, b)| b)
    }

    /// Drop every connection bound to `player_id` in `session_id`.
    /// Returns how many were dropped.
    pub fn unbind_player(&self, session_id: &str, player_id: &str) -> usize {
        let before = self.bindings.len();
        self.bindings
            .retain(|_, b| !(b.session_id == session_id && b.player_id == player_id));
        before.saturating_sub(self.bindings.len())
    }

    pub fn binding(&self, connection_id: &Uuid) -> Option<PlayerBinding> {
        self.bindings.get(connection_id).map(|b| b.value().clone())
    }

    #[cfg(test)]
    pub fn connection_count(&self) -> usize {
        self.bindings.len()
    }

    /// The connection's binding, if it is bound to `session_id`
    pub fn authorize(
        &self,
        connection_id: &Uuid,
        session_id: &str,
        action: &'static str,
    ) -> Result<PlayerBinding, GameError> {
        match self.binding(connection_id) {
            Some(binding) if binding.session_id == session_id => Ok(binding),
            _ => Err(GameError::Unauthorized { action }),
        }
    }

    /// Apply `input` on behalf of the player bound to `connection_id`
    pub fn dispatch(
        &self,
        connection_id: &Uuid,
        session_id: &str,
        input: InputCommand,
    ) -> Result<(), GameError> {
        let binding = self.authorize(connection_id, session_id, "input")?;
        let handle = self
            .registry
            .get(session_id)
            .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;

        let mut session = handle.lock();
        apply_input(&mut session, &binding.player_id, input, &self.weapon)
    }
}

/// Apply one command to a player's airplane. Commands for a destroyed
/// airplane, or a player without one, do nothing.
pub fn apply_input(
    session: &mut GameSession,
    player_id: &str,
    input: InputCommand,
    weapon: &WeaponStats,
) -> Result<(), GameError> {
    let player = session
        .player_mut(player_id)
        .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;

    match input {
        InputCommand::Move { direction } => {
            if let Some(airplane) = player.living_airplane_mut() {
                let direction = direction.unwrap_or_default().to_vec();
                let speed = airplane.speed;
                airplane.set_velocity(direction.x * speed, direction.y * speed);
            }
        }
        InputCommand::Shoot => {
            let Some(origin) = player.living_airplane().map(|a| a.position) else {
                return Ok(());
            };
            let projectile_id = session.add_projectile(weapon.fire(player_id.to_string(), origin));
            debug!(
                session_id = %session.id(),
                player_id = %player_id,
                projectile_id = %projectile_id,
                "Projectile fired"
            );
        }
        InputCommand::Unknown => {
            debug!(player_id = %player_id, "Ignoring unknown input type");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{Airplane, Player, Vec2};
    use crate::ws::protocol::Direction;
    use tokio_test::{assert_err, assert_ok};

    fn setup() -> (Arc<SessionRegistry>, InputDispatcher, Uuid) {
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = InputDispatcher::new(registry.clone(), &GameConfig::default());
        let handle = registry.create("s1");
        {
            let mut session = handle.lock();
            let mut player = Player::new("p1", "Pilot");
            let mut plane = Airplane::new("defaultFighter", 200.0, 100.0);
            plane.set_position(100.0, 100.0);
            player.assign_airplane(plane);
            session.add_player(player);
        }
        let connection = Uuid::new_v4();
        dispatcher.bind(
            connection,
            PlayerBinding {
                player_id: "p1".to_string(),
                session_id: "s1".to_string(),
            },
        );
        (registry, dispatcher, connection)
    }

    fn move_cmd(x: Option<f32>, y: Option<f32>) -> InputCommand {
        InputCommand::Move {
            direction: Some(Direction { x, y }),
        }
    }

    #[test]
    fn unbound_connection_is_rejected() {
        let (_registry, dispatcher, _) = setup();
        let err = assert_err!(dispatcher.dispatch(&Uuid::new_v4(), "s1", InputCommand::Shoot));
        assert_eq!(err, GameError::Unauthorized { action: "input" });
    }

    #[test]
    fn session_mismatch_is_rejected() {
        let (registry, dispatcher, connection) = setup();
        registry.create("s2");
        let err = assert_err!(dispatcher.dispatch(&connection, "s2", InputCommand::Shoot));
        assert_eq!(
            err.to_string(),
            "Not authorized or session mismatch for input."
        );
    }

    #[test]
    fn move_scales_direction_by_speed() {
        let (registry, dispatcher, connection) = setup();
        assert_ok!(dispatcher.dispatch(&connection, "s1", move_cmd(Some(1.0), Some(-0.5))));

        let handle = registry.get("s1").unwrap();
        let session = handle.lock();
        let plane = session.player("p1").unwrap().airplane.as_ref().unwrap();
        assert_eq!(plane.velocity, Vec2::new(200.0, -100.0));
    }

    #[test]
    fn missing_direction_components_default_to_zero() {
        let (registry, dispatcher, connection) = setup();
        assert_ok!(dispatcher.dispatch(&connection, "s1", move_cmd(None, Some(1.0))));
        {
            let handle = registry.get("s1").unwrap();
            let session = handle.lock();
            let plane = session.player("p1").unwrap().airplane.as_ref().unwrap();
            assert_eq!(plane.velocity, Vec2::new(0.0, 200.0));
        }

        assert_ok!(dispatcher.dispatch(&connection, "s1", InputCommand::Move { direction: None }));
        let handle = registry.get("s1").unwrap();
        let session = handle.lock();
        let plane = session.player("p1").unwrap().airplane.as_ref().unwrap();
        assert_eq!(plane.velocity, Vec2::ZERO);
    }

    #[test]
    fn shoot_spawns_projectile_at_airplane() {
        let (registry, dispatcher, connection) = setup();
        assert_ok!(dispatcher.dispatch(&connection, "s1", InputCommand::Shoot));
        assert_ok!(dispatcher.dispatch(&connection, "s1", InputCommand::Shoot));

        let handle = registry.get("s1").unwrap();
        let session = handle.lock();
        // No cooldown: both shots exist
        assert_eq!(session.projectile_count(), 2);
        let shot = session.projectiles().next().unwrap();
        assert_eq!(shot.owner_id, "p1");
        assert_eq!(shot.position, Vec2::new(100.0, 100.0));
        assert_eq!(shot.velocity, Vec2::new(0.0, -500.0));
        assert_eq!(shot.damage, 10.0);
    }

    #[test]
    fn destroyed_airplane_ignores_commands() {
        let (registry, dispatcher, connection) = setup();
        {
            let handle = registry.get("s1").unwrap();
            let mut session = handle.lock();
            let plane = session.player_mut("p1").unwrap().airplane.as_mut().unwrap();
            plane.set_velocity(7.0, 7.0);
            plane.take_damage(1_000.0);
        }

        assert_ok!(dispatcher.dispatch(&connection, "s1", move_cmd(Some(1.0), Some(1.0))));
        assert_ok!(dispatcher.dispatch(&connection, "s1", InputCommand::Shoot));

        let handle = registry.get("s1").unwrap();
        let session = handle.lock();
        let plane = session.player("p1").unwrap().airplane.as_ref().unwrap();
        assert_eq!(plane.velocity, Vec2::new(7.0, 7.0));
        assert_eq!(session.projectile_count(), 0);
    }

    #[test]
    fn unknown_input_is_a_no_op() {
        let (registry, dispatcher, connection) = setup();
        assert_ok!(dispatcher.dispatch(&connection, "s1", InputCommand::Unknown));
        let handle = registry.get("s1").unwrap();
        assert_eq!(handle.lock().projectile_count(), 0);
    }

    #[test]
    fn vanished_session_and_player_are_reported() {
        let (registry, dispatcher, connection) = setup();
        registry.get("s1").unwrap().lock().remove_player("p1");
        let err = assert_err!(dispatcher.dispatch(&connection, "s1", InputCommand::Shoot));
        assert_eq!(err, GameError::PlayerNotFound("p1".to_string()));

        registry.remove("s1");
        let err = assert_err!(dispatcher.dispatch(&connection, "s1", InputCommand::Shoot));
        assert_eq!(err, GameError::SessionNotFound("s1".to_string()));
    }

    #[test]
    fn unbind_player_drops_only_that_player() {
        let (_registry, dispatcher, connection) = setup();
        let other = Uuid::new_v4();
        dispatcher.bind(
            other,
            PlayerBinding {
                player_id: "p2".to_string(),
                session_id: "s1".to_string(),
            },
        );

        assert_eq!(dispatcher.unbind_player("s2", "p1"), 0);
        assert_eq!(dispatcher.unbind_player("s1", "p1"), 1);
        assert!(dispatcher.binding(&connection).is_none());
        assert!(dispatcher.binding(&other).is_some());

        let err = assert_err!(dispatcher.dispatch(&connection, "s1", InputCommand::Shoot));
        assert_eq!(err, GameError::Unauthorized { action: "input" });
    }

    #[test]
    fn unbind_returns_previous_binding() {
        let (_registry, dispatcher, connection) = setup();
        assert_eq!(dispatcher.connection_count(), 1);
        let binding = dispatcher.unbind(&connection).unwrap();
        assert_eq!(binding.player_id, "p1");
        assert!(dispatcher.unbind(&connection).is_none());
        assert_eq!(dispatcher.connection_count(), 0);
    }
}
