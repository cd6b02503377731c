//! Kinematic integration and world bounds

use crate::config::{Extent, GameConfig};

use super::entity::{Airplane, Player, Projectile, Vec2};

/// Anything the integrator can move
pub trait Kinematic {
    /// Position and velocity, or `None` when the entity has nothing to move
    fn kinematics(&mut self) -> Option<(&mut Vec2, Vec2)>;
}

impl Kinematic for Airplane {
    fn kinematics(&mut self) -> Option<(&mut Vec2, Vec2)> {
        let velocity = self.velocity;
        Some((&mut self.position, velocity))
    }
}

impl Kinematic for Projectile {
    fn kinematics(&mut self) -> Option<(&mut Vec2, Vec2)> {
        let velocity = self.velocity;
        Some((&mut self.position, velocity))
    }
}

impl Kinematic for Player {
    fn kinematics(&mut self) -> Option<(&mut Vec2, Vec2)> {
        self.airplane.as_mut().and_then(|airplane| airplane.kinematics())
    }
}

/// Physics system for advancing entities
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// `position += velocity * dt` with `dt` in seconds. No drag, no acceleration.
    pub fn integrate<K: Kinematic + ?Sized>(entity: &mut K, dt: f32) {
        if let Some((position, velocity)) = entity.kinematics() {
            *position += velocity * dt;
        }
    }
}

/// Rectangular play area anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl WorldBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.world_width, config.world_height)
    }

    /// Keep a box of the given extent fully inside the world
    pub fn clamp(&self, position: &mut Vec2, extent: Extent) {
        let max_x = (self.width - extent.width).max(0.0);
        let max_y = (self.height - extent.height).max(0.0);
        position.x = position.x.clamp(0.0, max_x);
        position.y = position.y.clamp(0.0, max_y);
    }

    /// True once a point has left `[0, width] x [0, height]`
    pub fn is_out_of_bounds(&self, position: Vec2) -> bool {
        position.x < 0.0 || position.x > self.width || position.y < 0.0 || position.y > self.height
    }
}
