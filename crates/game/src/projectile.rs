//! Cannonballs: straight-line projectiles fired from a ship's cannons.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Projectile ids start at 1000 (ship/module ids occupy 1..999, spec §3).
pub const PROJECTILE_ID_BASE: u32 = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cannonball {
    pub id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub firing_velocity: Vec2,
    pub radius: f32,
    pub max_range: f32,
    pub distance_traveled: f32,
    pub time_alive_s: f32,
    pub fired_from: u32,
}

impl Cannonball {
    pub fn new(id: u32, position: Vec2, firing_velocity: Vec2, max_range: f32, fired_from: u32) -> Self {
        Self {
            id,
            position,
            velocity: firing_velocity,
            firing_velocity,
            radius: 6.0,
            max_range,
            distance_traveled: 0.0,
            time_alive_s: 0.0,
            fired_from,
        }
    }

    /// Straight-line advance; returns `true` once the projectile should be
    /// retired (out of range).
    pub fn integrate(&mut self, dt: f32) -> bool {
        let step = self.velocity * dt;
        self.position += step;
        self.distance_traveled += step.length();
        self.time_alive_s += dt;
        self.distance_traveled >= self.max_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retires_once_max_range_reached() {
        let mut ball = Cannonball::new(1000, Vec2::ZERO, Vec2::new(100.0, 0.0), 50.0, 1);
        assert!(!ball.integrate(0.1));
        assert!(ball.integrate(1.0));
        assert!(ball.distance_traveled >= ball.max_range);
    }

    #[test]
    fn tracks_distance_independent_of_firing_velocity() {
        let mut ball = Cannonball::new(1000, Vec2::ZERO, Vec2::new(0.0, 50.0), 200.0, 1);
        for _ in 0..60 {
            ball.integrate(1.0 / 30.0);
        }
        assert!((ball.distance_traveled - 100.0).abs() < 1.0);
        assert_eq!(ball.firing_velocity, Vec2::new(0.0, 50.0));
    }
}
