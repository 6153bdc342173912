//! Ship rigid body: hull, deck, modules, and the per-tick sail/rudder
//! integration described in the world simulator's ship-integration step.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::math::{normalize_angle, rotate2};
use crate::ship::hull::{generate_hull, HullControlPoints};
use crate::ship::module::Module;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShipPhysicsParams {
    pub mass: f32,
    pub moment_of_inertia: f32,
    pub max_speed: f32,
    pub turn_rate: f32,
    pub water_drag: f32,
    pub angular_drag: f32,
}

/// Brigantine defaults (spec.md §3).
impl Default for ShipPhysicsParams {
    fn default() -> Self {
        Self {
            mass: 5000.0,
            moment_of_inertia: 500_000.0,
            max_speed: 30.0,
            turn_rate: 0.5,
            water_drag: 0.98,
            angular_drag: 0.95,
        }
    }
}

/// Ship-local deck bounding box. Not a general polygon, but treated as one
/// for containment purposes (four-vertex rectangle).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeckAabb {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Default for DeckAabb {
    fn default() -> Self {
        Self {
            min_x: -260.0,
            max_x: 415.0,
            min_y: -90.0,
            max_y: 90.0,
        }
    }
}

impl DeckAabb {
    pub fn contains(&self, local: Vec2, epsilon: f32) -> bool {
        local.x >= self.min_x - epsilon
            && local.x <= self.max_x + epsilon
            && local.y >= self.min_y - epsilon
            && local.y <= self.max_y + epsilon
    }

    /// Clamps a local point to the inflated boundary, returning the clamped
    /// point and the outward normal of the edge it was clamped against (if
    /// any), for dropping velocity normal to that edge.
    pub fn clamp_with_normal(&self, local: Vec2, epsilon: f32) -> (Vec2, Option<Vec2>) {
        let min_x = self.min_x - epsilon;
        let max_x = self.max_x + epsilon;
        let min_y = self.min_y - epsilon;
        let max_y = self.max_y + epsilon;

        let mut clamped = local;
        let mut normal = None;

        if local.x < min_x {
            clamped.x = min_x;
            normal = Some(Vec2::new(-1.0, 0.0));
        } else if local.x > max_x {
            clamped.x = max_x;
            normal = Some(Vec2::new(1.0, 0.0));
        }
        if local.y < min_y {
            clamped.y = min_y;
            normal = Some(Vec2::new(0.0, -1.0));
        } else if local.y > max_y {
            clamped.y = max_y;
            normal = Some(Vec2::new(0.0, 1.0));
        }
        (clamped, normal)
    }
}

/// Rate, in units-of-openness per second, that actual sail openness slews
/// toward its target.
const SAIL_SLEW_RATE: f32 = 0.6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub id: u32,
    pub position: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    pub params: ShipPhysicsParams,
    pub deck: DeckAabb,
    pub modules: Vec<Module>,

    pub rudder: f32,
    pub sail_openness_target: f32,
    pub sail_openness: f32,
    pub sail_angle: f32,

    #[serde(skip)]
    hull_cache: Vec<Vec2>,
}

impl Ship {
    pub fn new(id: u32, position: Vec2, rotation: f32) -> Self {
        let hull = generate_hull(&HullControlPoints::default());
        Self {
            id,
            position,
            rotation,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            params: ShipPhysicsParams::default(),
            deck: DeckAabb::default(),
            modules: Vec::new(),
            rudder: 0.0,
            sail_openness_target: 0.0,
            sail_openness: 0.0,
            sail_angle: 0.0,
            hull_cache: hull,
        }
    }

    pub fn hull_world(&self) -> Vec<Vec2> {
        self.hull_cache
            .iter()
            .map(|p| self.position + rotate2(*p, self.rotation))
            .collect()
    }

    pub fn hull_local(&self) -> &[Vec2] {
        &self.hull_cache
    }

    pub fn world_to_local(&self, world: Vec2) -> Vec2 {
        rotate2(world - self.position, -self.rotation)
    }

    pub fn local_to_world(&self, local: Vec2) -> Vec2 {
        self.position + rotate2(local, self.rotation)
    }

    pub fn set_rudder(&mut self, turning_left: bool, turning_right: bool) {
        self.rudder = match (turning_left, turning_right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
    }

    pub fn set_sail_openness_target(&mut self, desired_percent: f32) {
        self.sail_openness_target = (desired_percent / 100.0).clamp(0.0, 1.0);
    }

    pub fn set_sail_angle_target(&mut self, desired_angle_radians: f32) {
        self.sail_angle = desired_angle_radians.clamp(
            -crate::ship::module::SAIL_ANGLE_LIMIT,
            crate::ship::module::SAIL_ANGLE_LIMIT,
        );
    }

    /// Forward thrust magnitude for this tick. `wind` is an optional
    /// world-space wind vector; absent wind degrades gracefully to a
    /// constant following-wind approximation rather than producing zero
    /// thrust.
    fn forward_thrust(&self, wind: Option<Vec2>) -> f32 {
        const BASE_THRUST: f32 = 4000.0;
        let wind_factor = match wind {
            Some(w) if w.length() > 1e-4 => {
                let sail_normal = rotate2(Vec2::X, self.rotation + self.sail_angle);
                (w.normalize().dot(sail_normal)).max(0.0)
            }
            _ => 1.0,
        };
        BASE_THRUST * self.sail_openness * wind_factor
    }

    /// Advances this ship's rigid body by one fixed tick (spec.md §4.1.1).
    pub fn integrate(&mut self, dt: f32, wind: Option<Vec2>) {
        let slew = SAIL_SLEW_RATE * dt;
        if self.sail_openness < self.sail_openness_target {
            self.sail_openness = (self.sail_openness + slew).min(self.sail_openness_target);
        } else if self.sail_openness > self.sail_openness_target {
            self.sail_openness = (self.sail_openness - slew).max(self.sail_openness_target);
        }

        let thrust = self.forward_thrust(wind);
        let forward = rotate2(Vec2::X, self.rotation);
        self.velocity += (forward * thrust / self.params.mass) * dt;
        self.velocity *= self.params.water_drag;

        self.angular_velocity =
            self.angular_velocity * self.params.angular_drag + self.rudder * self.params.turn_rate * dt;

        let speed = self.velocity.length();
        if speed > self.params.max_speed {
            self.velocity *= self.params.max_speed / speed;
        }
        self.angular_velocity = self
            .angular_velocity
            .clamp(-self.params.turn_rate, self.params.turn_rate);

        self.rotation = normalize_angle(self.rotation + self.angular_velocity * dt);
        self.position += self.velocity * dt;

        for module in &mut self.modules {
            if let Some(cannon) = module.cannon_mut() {
                cannon.time_since_fire_s += dt;
            }
        }
    }

    pub fn next_module_slot(&self) -> Option<&Module> {
        self.modules.iter().find(|m| m.occupied_by.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_sail_accelerates_ship() {
        let mut ship = Ship::new(1, Vec2::ZERO, 0.0);
        ship.set_sail_openness_target(100.0);
        for _ in 0..120 {
            ship.integrate(1.0 / 30.0, None);
        }
        assert!(ship.velocity.length() > 0.0);
        assert!(ship.velocity.length() <= ship.params.max_speed + 1e-3);
    }

    #[test]
    fn velocity_never_exceeds_max_speed() {
        let mut ship = Ship::new(1, Vec2::ZERO, 0.0);
        ship.set_sail_openness_target(100.0);
        for _ in 0..10_000 {
            ship.integrate(1.0 / 30.0, None);
            assert!(ship.velocity.length() <= ship.params.max_speed + 1e-3);
        }
    }

    #[test]
    fn angular_velocity_never_exceeds_turn_rate() {
        let mut ship = Ship::new(1, Vec2::ZERO, 0.0);
        ship.set_rudder(false, true);
        for _ in 0..10_000 {
            ship.integrate(1.0 / 30.0, None);
            assert!(ship.angular_velocity.abs() <= ship.params.turn_rate + 1e-3);
        }
    }

    #[test]
    fn rotation_stays_normalized() {
        let mut ship = Ship::new(1, Vec2::ZERO, 3.0);
        ship.set_rudder(false, true);
        for _ in 0..1000 {
            ship.integrate(1.0 / 30.0, None);
            assert!(ship.rotation >= -std::f32::consts::PI && ship.rotation <= std::f32::consts::PI);
        }
    }

    #[test]
    fn deck_aabb_clamp_drops_normal_component() {
        let deck = DeckAabb::default();
        let (clamped, normal) = deck.clamp_with_normal(Vec2::new(1000.0, 0.0), 1.0);
        assert_eq!(normal, Some(Vec2::new(1.0, 0.0)));
        assert!(clamped.x <= deck.max_x + 1.0 + 1e-4);
    }

    #[test]
    fn world_local_round_trip() {
        let ship = Ship::new(1, Vec2::new(10.0, -5.0), 1.2);
        let world = Vec2::new(3.0, 4.0);
        let local = ship.world_to_local(world);
        let back = ship.local_to_world(local);
        assert!((back - world).length() < 1e-3);
    }
}
