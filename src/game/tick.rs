//! Authoritative tick loop: one fixed-rate task per active session

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::AbortHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::util::time::{elapsed_secs, tick_interval, unix_millis};
use crate::ws::protocol::ServerMsg;

use super::combat::{CollisionResolver, HitResult};
use super::entity::SessionId;
use super::physics::{PhysicsSystem, WorldBounds};
use super::registry::{SessionHandle, SessionRegistry};
use super::session::{GameSession, SessionState};
use super::snapshot::SnapshotBuilder;

/// What a single step decided about the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not active; nothing simulated
    Idle,
    /// Simulated; keep ticking
    Continue,
    /// Ended or empty; tear the loop down
    Finished,
}

/// The simulation step shared by every session
pub struct Simulation {
    world: WorldBounds,
    resolver: CollisionResolver,
}

impl Simulation {
    pub fn new(world: WorldBounds, resolver: CollisionResolver) -> Self {
        Self { world, resolver }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            WorldBounds::from_config(config),
            CollisionResolver::from_config(config),
        )
    }

    /// Advance `session` to `now` (unix millis) using the wall-clock delta
    /// since its last update.
    pub fn step(&self, session: &mut GameSession, now: u64) -> TickOutcome {
        match session.state() {
            SessionState::Ended => return TickOutcome::Finished,
            SessionState::Active => {}
            SessionState::Waiting | SessionState::Paused => return TickOutcome::Idle,
        }

        let dt = elapsed_secs(session.last_update_time, now);
        self.advance(session, dt);
        session.last_update_time = now;

        if session.is_empty() {
            session.update_state_at(SessionState::Ended, now);
            return TickOutcome::Finished;
        }
        TickOutcome::Continue
    }

    /// Move everything by `dt` seconds, then resolve projectile hits.
    /// Returns the hits applied this step.
    pub fn advance(&self, session: &mut GameSession, dt: f32) -> Vec<HitResult> {
        let session_id = session.id().to_string();
        let players = &mut session.players;
        let projectiles = &mut session.projectiles;

        for player in players.values_mut() {
            if let Some(airplane) = player.living_airplane_mut() {
                PhysicsSystem::integrate(airplane, dt);
                self.world
                    .clamp(&mut airplane.position, self.resolver.airplane_extent);
            }
        }

        let mut spent = Vec::new();
        let mut hits = Vec::new();

        for projectile in projectiles.values_mut() {
            if !projectile.is_active {
                spent.push(projectile.id);
                continue;
            }

            PhysicsSystem::integrate(projectile, dt);
            if self.world.is_out_of_bounds(projectile.position) {
                projectile.deactivate();
                spent.push(projectile.id);
                continue;
            }

            for (player_id, player) in players.iter_mut() {
                if *player_id == projectile.owner_id {
                    continue;
                }
                let Some(airplane) = player.living_airplane_mut() else {
                    continue;
                };
                if let Some(hit) = self.resolver.resolve(projectile, player_id, airplane) {
                    spent.push(projectile.id);
                    hits.push(hit);
                    break;
                }
            }
        }

        for hit in &hits {
            if let Some(shooter) = players.get_mut(&hit.shooter_id) {
                shooter.add_score(hit.points);
            }
            if hit.target_killed {
                info!(
                    session_id = %session_id,
                    shooter_id = %hit.shooter_id,
                    target_id = %hit.target_id,
                    "Airplane destroyed"
                );
            } else {
                debug!(
                    session_id = %session_id,
                    shooter_id = %hit.shooter_id,
                    target_id = %hit.target_id,
                    damage = hit.damage,
                    "Projectile hit"
                );
            }
        }

        for id in spent {
            session.remove_projectile(&id);
        }

        hits
    }
}

/// Running loop bookkeeping
struct LoopEntry {
    generation: u64,
    task: AbortHandle,
}

/// Starts and stops per-session tick loops
///
/// At most one loop runs per session id. Whoever removes the loop entry
/// (the loop itself on game over, or `stop`) performs the teardown, so a
/// loop is stopped exactly once.
pub struct TickScheduler {
    registry: Arc<SessionRegistry>,
    simulation: Simulation,
    tick_duration: Duration,
    loops: DashMap<SessionId, LoopEntry>,
    next_generation: AtomicU64,
}

impl TickScheduler {
    pub fn new(registry: Arc<SessionRegistry>, config: &GameConfig) -> Self {
        Self {
            registry,
            simulation: Simulation::from_config(config),
            tick_duration: tick_interval(config.tick_rate),
            loops: DashMap::new(),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Start the loop for `handle`. No-op (returns false) if one is running.
    pub fn start(self: &Arc<Self>, handle: Arc<SessionHandle>) -> bool {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        match self.loops.entry(handle.id.clone()) {
            Entry::Occupied(_) => {
                debug!(session_id = %handle.id, "Tick loop already running");
                false
            }
            Entry::Vacant(entry) => {
                info!(
                    session_id = %handle.id,
                    tick_ms = self.tick_duration.as_millis() as u64,
                    "Starting tick loop"
                );
                let scheduler = Arc::clone(self);
                let task = tokio::spawn(scheduler.run_loop(handle, generation));
                entry.insert(LoopEntry {
                    generation,
                    task: task.abort_handle(),
                });
                true
            }
        }
    }

    /// Stop the loop for `session_id`. Idempotent; returns true if a loop
    /// was running.
    pub fn stop(&self, session_id: &str) -> bool {
        match self.loops.remove(session_id) {
            Some((_, entry)) => {
                entry.task.abort();
                info!(session_id = %session_id, "Tick loop stopped");
                true
            }
            None => false,
        }
    }

    /// Stop every loop (server shutdown)
    pub fn stop_all(&self) {
        let ids: Vec<SessionId> = self.loops.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.stop(&id);
        }
    }

    #[cfg(test)]
    pub fn is_running(&self, session_id: &str) -> bool {
        self.loops.contains_key(session_id)
    }

    pub fn active_loops(&self) -> usize {
        self.loops.len()
    }

    /// Remove our own entry; false if someone else already stopped us
    fn release(&self, session_id: &str, generation: u64) -> bool {
        self.loops
            .remove_if(session_id, |_, e| e.generation == generation)
            .is_some()
    }

    async fn run_loop(self: Arc<Self>, handle: Arc<SessionHandle>, generation: u64) {
        let mut ticker = interval(self.tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately; start simulating one interval in
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !self.tick(&handle, generation) {
                break;
            }
        }
    }

    /// One scheduled step. Returns false once the loop must exit.
    ///
    /// The loop entry stays borrowed until the snapshot is out, so a
    /// concurrent `stop` blocks on it and nothing is sent after it returns.
    fn tick(&self, handle: &Arc<SessionHandle>, generation: u64) -> bool {
        let game_over = {
            let Some(entry) = self.loops.get(&handle.id) else {
                return false;
            };
            if entry.generation != generation {
                return false;
            }

            let mut session = handle.lock();
            match self.simulation.step(&mut session, unix_millis()) {
                TickOutcome::Idle => None,
                TickOutcome::Continue => {
                    handle.broadcast(SnapshotBuilder::state_update(&session));
                    None
                }
                TickOutcome::Finished => Some(SnapshotBuilder::game_over(&session)),
            }
        };

        match game_over {
            Some(msg) => {
                self.finish(handle, generation, msg);
                false
            }
            None => true,
        }
    }

    fn finish(&self, handle: &Arc<SessionHandle>, generation: u64, game_over: ServerMsg) {
        if !self.release(&handle.id, generation) {
            return;
        }
        info!(session_id = %handle.id, "Session ended or empty, stopping tick loop");
        handle.broadcast(game_over);
        self.registry.remove_if_same(handle);
    }
}
