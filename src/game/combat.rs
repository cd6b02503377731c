//! Combat system - weapons, hit detection, damage

use uuid::Uuid;

use crate::config::{Extent, GameConfig};

use super::entity::{Airplane, PlayerId, Projectile, Vec2};

/// Weapon fired by every airplane
#[derive(Debug, Clone)]
pub struct WeaponStats {
    pub projectile_type: String,
    /// Damage per hit
    pub damage: f32,
    /// Projectile speed
    pub projectile_speed: f32,
}

impl WeaponStats {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            projectile_type: config.projectile_type.clone(),
            damage: config.projectile_damage,
            projectile_speed: config.projectile_speed,
        }
    }

    /// Spawn a projectile at `origin`, flying straight up the screen (negative y)
    pub fn fire(&self, owner_id: PlayerId, origin: Vec2) -> Projectile {
        Projectile::new(
            owner_id,
            self.projectile_type.clone(),
            self.damage,
            self.projectile_speed,
            origin,
            Vec2::new(0.0, -self.projectile_speed),
        )
    }
}

/// Axis-aligned box, anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub origin: Vec2,
    pub extent: Extent,
}

impl Aabb {
    pub fn new(origin: Vec2, extent: Extent) -> Self {
        Self { origin, extent }
    }

    /// Strict overlap on both axes; boxes that only touch do not collide
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.origin.x < other.origin.x + other.extent.width
            && self.origin.x + self.extent.width > other.origin.x
            && self.origin.y < other.origin.y + other.extent.height
            && self.origin.y + self.extent.height > other.origin.y
    }
}

/// Projectile-vs-airplane collision detection
///
/// Entities carry no size of their own; every projectile and every airplane
/// uses the extents configured here. Checks are brute force, one test per
/// (projectile, airplane) pair per tick.
#[derive(Debug, Clone)]
pub struct CollisionResolver {
    pub projectile_extent: Extent,
    pub airplane_extent: Extent,
    /// Score awarded to the projectile owner per hit
    pub hit_score: u32,
}

impl CollisionResolver {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            projectile_extent: config.projectile_extent,
            airplane_extent: config.airplane_extent,
            hit_score: config.hit_score,
        }
    }

    pub fn projectile_box(&self, projectile: &Projectile) -> Aabb {
        Aabb::new(projectile.position, self.projectile_extent)
    }

    pub fn airplane_box(&self, airplane: &Airplane) -> Aabb {
        Aabb::new(airplane.position, self.airplane_extent)
    }

    /// Check collision between a projectile and an airplane
    pub fn check_hit(&self, projectile: &Projectile, airplane: &Airplane) -> bool {
        self.projectile_box(projectile)
            .overlaps(&self.airplane_box(airplane))
    }

    /// Test for a hit and apply it: damages the target and deactivates the
    /// projectile. Scoring is left to the caller, who owns the shooter.
    pub fn resolve(
        &self,
        projectile: &mut Projectile,
        target_id: &str,
        target: &mut Airplane,
    ) -> Option<HitResult> {
        if !projectile.is_active || !target.is_alive || !self.check_hit(projectile, target) {
            return None;
        }

        target.take_damage(projectile.damage);
        projectile.deactivate();

        Some(HitResult {
            projectile_id: projectile.id,
            shooter_id: projectile.owner_id.clone(),
            target_id: target_id.to_string(),
            damage: projectile.damage,
            points: self.hit_score,
            target_killed: !target.is_alive,
        })
    }
}

/// Hit result from combat resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub projectile_id: Uuid,
    pub shooter_id: PlayerId,
    pub target_id: PlayerId,
    pub damage: f32,
    pub points: u32,
    pub target_killed: bool,
}
