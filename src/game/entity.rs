//! Simulation entities: airplanes, projectiles and the players who own them

use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Player identifier (client supplied, or the connection id)
pub type PlayerId = String;

/// Session identifier
pub type SessionId = String;

/// 2D vector used for positions and velocities
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// A player's airplane (authoritative)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airplane {
    #[serde(rename = "type")]
    pub kind: String,
    /// Movement speed in units per second
    pub speed: f32,
    pub health: f32,
    pub max_health: f32,
    pub is_alive: bool,
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Airplane {
    pub fn new(kind: impl Into<String>, speed: f32, health: f32) -> Self {
        let health = health.max(0.0);
        Self {
            kind: kind.into(),
            speed,
            health,
            max_health: health,
            is_alive: health > 0.0,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
        }
    }

    /// Apply damage. Health never drops below zero and a destroyed airplane
    /// stays destroyed.
    pub fn take_damage(&mut self, amount: f32) {
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            self.health = 0.0;
            self.is_alive = false;
        }
    }

    /// Restore health up to the maximum. No effect once destroyed.
    #[cfg(test)]
    pub fn heal(&mut self, amount: f32) {
        if !self.is_alive {
            return;
        }
        self.health = (self.health + amount).clamp(0.0, self.max_health);
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
    }

    pub fn set_velocity(&mut self, vx: f32, vy: f32) {
        self.velocity = Vec2::new(vx, vy);
    }
}

/// Projectile in flight
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: Uuid,
    pub owner_id: PlayerId,
    pub kind: String,
    pub damage: f32,
    pub speed: f32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub is_active: bool,
}

impl Projectile {
    pub fn new(
        owner_id: PlayerId,
        kind: impl Into<String>,
        damage: f32,
        speed: f32,
        position: Vec2,
        velocity: Vec2,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            kind: kind.into(),
            damage,
            speed,
            position,
            velocity,
            is_active: true,
        }
    }

    /// One-way: an inactive projectile is never revived
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

/// Player in a session
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub airplane: Option<Airplane>,
    pub score: u32,
    pub is_ready: bool,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            airplane: None,
            score: 0,
            is_ready: false,
        }
    }

    pub fn assign_airplane(&mut self, airplane: Airplane) {
        self.airplane = Some(airplane);
    }

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Airplane if present and still flying
    pub fn living_airplane(&self) -> Option<&Airplane> {
        self.airplane.as_ref().filter(|a| a.is_alive)
    }

    pub fn living_airplane_mut(&mut self) -> Option<&mut Airplane> {
        self.airplane.as_mut().filter(|a| a.is_alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_clamps_at_zero_and_kills_once() {
        let mut plane = Airplane::new("defaultFighter", 200.0, 100.0);
        plane.take_damage(30.0);
        assert_eq!(plane.health, 70.0);
        assert!(plane.is_alive);

        plane.take_damage(500.0);
        assert_eq!(plane.health, 0.0);
        assert!(!plane.is_alive);

        plane.take_damage(10.0);
        assert_eq!(plane.health, 0.0);
        assert!(!plane.is_alive);
    }

    #[test]
    fn exact_lethal_damage_kills() {
        let mut plane = Airplane::new("defaultFighter", 200.0, 10.0);
        plane.take_damage(10.0);
        assert_eq!(plane.health, 0.0);
        assert!(!plane.is_alive);
    }

    #[test]
    fn heal_caps_at_max_and_never_resurrects() {
        let mut plane = Airplane::new("defaultFighter", 200.0, 100.0);
        plane.take_damage(40.0);
        plane.heal(25.0);
        assert_eq!(plane.health, 85.0);
        plane.heal(1000.0);
        assert_eq!(plane.health, 100.0);

        plane.take_damage(100.0);
        plane.heal(50.0);
        assert_eq!(plane.health, 0.0);
        assert!(!plane.is_alive);
    }

    #[test]
    fn setters_overwrite() {
        let mut plane = Airplane::new("bomber", 150.0, 200.0);
        plane.set_position(12.0, 34.0);
        plane.set_velocity(-1.0, 2.0);
        assert_eq!(plane.position, Vec2::new(12.0, 34.0));
        assert_eq!(plane.velocity, Vec2::new(-1.0, 2.0));
    }

    #[test]
    fn projectile_deactivation_is_sticky() {
        let mut shot = Projectile::new(
            "p1".to_string(),
            "bullet",
            10.0,
            500.0,
            Vec2::ZERO,
            Vec2::new(0.0, -500.0),
        );
        assert!(shot.is_active);
        shot.deactivate();
        shot.deactivate();
        assert!(!shot.is_active);
    }

    #[test]
    fn score_accumulates() {
        let mut player = Player::new("p1", "Alice");
        player.add_score(10);
        player.add_score(10);
        assert_eq!(player.score, 20);
    }

    #[test]
    fn airplane_serializes_with_wire_names() {
        let plane = Airplane::new("defaultFighter", 200.0, 100.0);
        let json = serde_json::to_value(&plane).unwrap();
        assert_eq!(json["type"], "defaultFighter");
        assert_eq!(json["maxHealth"], 100.0);
        assert_eq!(json["isAlive"], true);
        assert_eq!(json["position"]["x"], 0.0);
    }
}
