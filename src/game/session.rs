//! Session state (one match) and its lifecycle state machine

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::unix_millis;

use super::entity::{Player, PlayerId, Projectile, SessionId, Vec2};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Lobby, waiting for every player to be ready
    Waiting,
    /// Simulation running
    Active,
    /// Reserved; nothing transitions here
    Paused,
    /// Terminal
    Ended,
}

/// Authoritative state of one match
///
/// Players and projectiles live in ordered maps so every tick walks them in
/// the same order.
pub struct GameSession {
    id: SessionId,
    pub(super) players: BTreeMap<PlayerId, Player>,
    pub(super) projectiles: BTreeMap<Uuid, Projectile>,
    state: SessionState,
    start_time: Option<u64>,
    /// Unix millis of the last state change or simulation step
    pub last_update_time: u64,
    rng: ChaCha8Rng,
}

impl GameSession {
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self::with_seed(id, rand::random::<u64>())
    }

    /// Create with a fixed seed for spawn positions
    pub fn with_seed(id: impl Into<SessionId>, seed: u64) -> Self {
        Self {
            id: id.into(),
            players: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            state: SessionState::Waiting,
            start_time: None,
            last_update_time: unix_millis(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Unix millis of the first activation
    #[cfg(test)]
    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Add a player. Returns false (and changes nothing) if the id is taken.
    pub fn add_player(&mut self, player: Player) -> bool {
        if self.players.contains_key(&player.id) {
            return false;
        }
        info!(
            session_id = %self.id,
            player_id = %player.id,
            name = %player.name,
            "Player joined session"
        );
        self.players.insert(player.id.clone(), player);
        true
    }

    /// Remove a player; absent ids are a no-op. Removing the last player ends
    /// the session.
    pub fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let player = self.players.remove(player_id)?;
        info!(
            session_id = %self.id,
            player_id = %player.id,
            name = %player.name,
            "Player left session"
        );

        if self.players.is_empty() && self.state != SessionState::Ended {
            info!(session_id = %self.id, "Last player left, ending session");
            self.update_state(SessionState::Ended);
        }

        Some(player)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.get_mut(player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn add_projectile(&mut self, projectile: Projectile) -> Uuid {
        let id = projectile.id;
        self.projectiles.insert(id, projectile);
        id
    }

    pub fn remove_projectile(&mut self, projectile_id: &Uuid) -> Option<Projectile> {
        self.projectiles.remove(projectile_id)
    }

    #[cfg(test)]
    pub fn projectile(&self, projectile_id: &Uuid) -> Option<&Projectile> {
        self.projectiles.get(projectile_id)
    }

    #[cfg(test)]
    pub fn projectile_mut(&mut self, projectile_id: &Uuid) -> Option<&mut Projectile> {
        self.projectiles.get_mut(projectile_id)
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    #[cfg(test)]
    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Move to `new_state`, stamping `last_update_time`. The first activation
    /// records the start time. `Ended` is terminal: leaving it is refused and
    /// returns false.
    pub fn update_state(&mut self, new_state: SessionState) -> bool {
        self.update_state_at(new_state, unix_millis())
    }

    pub fn update_state_at(&mut self, new_state: SessionState, now: u64) -> bool {
        if self.state == SessionState::Ended && new_state != SessionState::Ended {
            warn!(
                session_id = %self.id,
                requested = ?new_state,
                "Refusing to leave ended state"
            );
            return false;
        }

        self.state = new_state;
        if new_state == SessionState::Active && self.start_time.is_none() {
            self.start_time = Some(now);
        }
        // Projectiles never outlive their session
        if new_state == SessionState::Ended {
            self.projectiles.clear();
        }
        self.last_update_time = now;

        info!(session_id = %self.id, state = ?new_state, "Session state changed");
        true
    }

    /// True iff at least one player is present and every player is ready
    pub fn are_all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| p.is_ready)
    }

    /// `waiting -> active` once everyone is ready. Returns true if it fired.
    pub fn try_activate(&mut self) -> bool {
        if self.state == SessionState::Waiting && self.are_all_ready() {
            return self.update_state(SessionState::Active);
        }
        false
    }

    /// Pseudo-random spawn point in `[min, min + spread)` on both axes
    pub fn spawn_position(&mut self, min: f32, spread: f32) -> Vec2 {
        let spread = spread.max(f32::EPSILON);
        let x = min + self.rng.gen_range(0.0..spread);
        let y = min + self.rng.gen_range(0.0..spread);
        debug!(session_id = %self.id, x, y, "Generated spawn position");
        Vec2::new(x, y)
    }
}
