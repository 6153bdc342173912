//! The canonical world model: one arena of ships, players, and
//! projectiles, advanced one fixed tick at a time by `World::tick`.
//!
//! Replaces the prior pair of divergent `Entity`/`World` shapes (see
//! DESIGN.md) with a single representation matching spec.md §3's
//! `WorldState`.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collision::{resolve_ship_collision, segment_hits_polygon, ship_ship_overlap};
use crate::event::ActionKind;
use crate::math::normalize_angle;
use crate::player::{integrate_movement, update_attachment, HysteresisState, MovementState, Player};
use crate::projectile::Cannonball;
use crate::ship::Ship;

pub const TICK_DT: f32 = 1.0 / 30.0;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("entity {entity_id} produced a non-finite value and was reset")]
    NumericAnomaly { entity_id: u32 },
}

/// Hybrid input variants a session may merge into a player's stored intent
/// (spec.md §4.2's message table), validated by the gateway before they
/// reach the simulator.
#[derive(Debug, Clone)]
pub enum HybridInput {
    MovementState { direction: Vec2, is_moving: bool },
    RotationUpdate { rotation: f32 },
    Action { action: ActionKind, target: Option<u32> },
    ShipSailControl { desired_openness_percent: f32 },
    ShipRudderControl { turning_left: bool, turning_right: bool },
    ShipSailAngleControl { desired_angle_radians: f32 },
    CannonAim { aim_angle: f32 },
    CannonFire { fire_all: bool, cannon_ids: Vec<u32> },
}

/// Ship-relative aim tolerance for a non-`fire_all` cannon-fire action
/// (spec.md §4.2, resolved in DESIGN.md open question 2).
const CANNON_AIM_TOLERANCE_RADIANS: f32 = 15.0 * std::f32::consts::PI / 180.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    pub tick: u32,
    pub timestamp_ms: u64,
    pub ships: Vec<Ship>,
    pub players: Vec<Player>,
    pub projectiles: Vec<Cannonball>,
    pub hysteresis: HashMap<u32, HysteresisState>,

    #[serde(skip)]
    pub numeric_anomalies: u64,
    next_projectile_id: u32,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            tick: 0,
            timestamp_ms: 0,
            ships: Vec::new(),
            players: Vec::new(),
            projectiles: Vec::new(),
            hysteresis: HashMap::new(),
            numeric_anomalies: 0,
            next_projectile_id: crate::projectile::PROJECTILE_ID_BASE,
        }
    }
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_mut(&mut self, player_id: u32) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn ship(&self, ship_id: u32) -> Option<&Ship> {
        self.ships.iter().find(|s| s.id == ship_id)
    }

    pub fn ship_mut(&mut self, ship_id: u32) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|s| s.id == ship_id)
    }

    pub fn spawn_player(&mut self, player: Player) {
        self.hysteresis.insert(player.id, HysteresisState::default());
        self.players.push(player);
    }

    pub fn remove_player(&mut self, player_id: u32) {
        self.players.retain(|p| p.id != player_id);
        self.hysteresis.remove(&player_id);
    }

    /// Merges a validated hybrid-input record into the player's stored
    /// intent. Does not advance physics.
    pub fn apply_input(&mut self, player_id: u32, input: HybridInput, now_ms: f64) {
        match input {
            HybridInput::MovementState { direction, is_moving } => {
                if let Some(player) = self.player_mut(player_id) {
                    let clamped = Vec2::new(direction.x.clamp(-1.0, 1.0), direction.y.clamp(-1.0, 1.0));
                    player.set_movement_intent(clamped, is_moving);
                }
            }
            HybridInput::RotationUpdate { rotation } => {
                if let Some(player) = self.player_mut(player_id) {
                    player.set_rotation_intent(normalize_angle(rotation));
                }
            }
            HybridInput::Action { action, target } => {
                if let Some(player) = self.player_mut(player_id) {
                    player.queue_action(action, target, now_ms);
                }
            }
            HybridInput::ShipSailControl {
                desired_openness_percent,
            } => {
                if let Some(ship_id) = self.helm_ship_for(player_id) {
                    if let Some(ship) = self.ship_mut(ship_id) {
                        ship.set_sail_openness_target(desired_openness_percent.clamp(0.0, 100.0));
                    }
                }
            }
            HybridInput::ShipRudderControl {
                turning_left,
                turning_right,
            } => {
                if let Some(ship_id) = self.helm_ship_for(player_id) {
                    if let Some(ship) = self.ship_mut(ship_id) {
                        ship.set_rudder(turning_left, turning_right);
                    }
                }
            }
            HybridInput::ShipSailAngleControl {
                desired_angle_radians,
            } => {
                if let Some(ship_id) = self.helm_ship_for(player_id) {
                    if let Some(ship) = self.ship_mut(ship_id) {
                        ship.set_sail_angle_target(desired_angle_radians);
                    }
                }
            }
            HybridInput::CannonAim { aim_angle } => {
                if let Some(player) = self.player_mut(player_id) {
                    player.cannon_aim = normalize_angle(aim_angle);
                }
            }
            HybridInput::CannonFire { fire_all, cannon_ids } => {
                self.fire_cannons(player_id, fire_all, &cannon_ids);
            }
        }
    }

    /// Resolves the ship a player controls via a mounted helm, if any.
    fn helm_ship_for(&self, player_id: u32) -> Option<u32> {
        let player = self.players.iter().find(|p| p.id == player_id)?;
        if !player.is_attached() {
            return None;
        }
        let ship = self.ship(player.carrier_ship_id)?;
        let mount = player.mount?;
        ship.modules
            .iter()
            .find(|m| m.id == mount.mounted_module_id && matches!(m.kind, crate::ship::ModuleKind::Helm))
            .map(|_| ship.id)
    }

    /// Applies one drained `QueuedAction` (spec.md §4.2 `action_event`:
    /// fire_cannon, jump, interact, reload, mount, dismount).
    fn apply_queued_action(&mut self, player_id: u32, action: ActionKind, target: Option<u32>) {
        match action {
            ActionKind::Jump => {
                if let Some(player) = self.player_mut(player_id) {
                    if player.movement_state == MovementState::Walking {
                        player.movement_state = MovementState::Falling;
                    }
                }
            }
            ActionKind::Mount => {
                let Some(module_id) = target else { return };
                let offset = self
                    .players
                    .iter()
                    .find(|p| p.id == player_id)
                    .filter(|p| p.is_attached())
                    .and_then(|p| self.ship(p.carrier_ship_id))
                    .and_then(|ship| ship.modules.iter().find(|m| m.id == module_id))
                    .map(|m| m.local_position);
                if let Some(offset) = offset {
                    if let Some(player) = self.player_mut(player_id) {
                        player.mount_at(module_id, offset);
                    }
                }
            }
            ActionKind::Dismount => {
                if let Some(player) = self.player_mut(player_id) {
                    player.dismount();
                }
            }
            ActionKind::FireCannon => {
                let ids = target.into_iter().collect::<Vec<u32>>();
                self.fire_cannons(player_id, false, &ids);
            }
            ActionKind::Reload => {
                let Some(module_id) = target else { return };
                let ship_id = self
                    .players
                    .iter()
                    .find(|p| p.id == player_id)
                    .map(|p| p.carrier_ship_id)
                    .unwrap_or(0);
                if ship_id == 0 {
                    return;
                }
                if let Some(ship) = self.ship_mut(ship_id) {
                    if let Some(cannon) = ship
                        .modules
                        .iter_mut()
                        .find(|m| m.id == module_id)
                        .and_then(|m| m.cannon_mut())
                    {
                        cannon.ammunition = (cannon.ammunition + 1).min(crate::ship::CANNON_MAGAZINE_CAPACITY);
                    }
                }
            }
            // No simulator-level effect: generic world interaction hooks are
            // module-specific game content, out of scope here.
            ActionKind::Interact => {}
        }
    }

    fn fire_cannons(&mut self, player_id: u32, fire_all: bool, cannon_ids: &[u32]) {
        let Some(player) = self.players.iter().find(|p| p.id == player_id) else {
            return;
        };
        let player_aim = player.cannon_aim;
        let Some(ship_id) = Some(player.carrier_ship_id).filter(|id| *id != 0) else {
            return;
        };
        let Some(ship) = self.ship_mut(ship_id) else {
            return;
        };

        let mut to_fire = Vec::new();
        for module in ship.modules.iter_mut() {
            if !matches!(module.kind, crate::ship::ModuleKind::Cannon) {
                continue;
            }
            if !module.is_ready_cannon() {
                continue;
            }
            let selected = if fire_all {
                true
            } else if cannon_ids.contains(&module.id) {
                true
            } else {
                let aim = module.cannon().map(|c| c.aim_direction).unwrap_or(0.0);
                angle_delta(aim, player_aim).abs() <= CANNON_AIM_TOLERANCE_RADIANS
            };
            if selected {
                let local_pos = module.local_position;
                let aim = module.cannon_mut().map(|c| {
                    c.time_since_fire_s = 0.0;
                    c.ammunition = c.ammunition.saturating_sub(1);
                    c.aim_direction
                });
                if let Some(aim_direction) = aim {
                    to_fire.push((local_pos, aim_direction));
                }
            }
        }

        for (local_pos, aim_direction) in to_fire {
            let world_pos = ship.local_to_world(local_pos);
            let direction = crate::math::rotate2(Vec2::new(1.0, 0.0), ship.rotation + aim_direction);
            let speed = 400.0;
            self.spawn_projectile(world_pos, direction * speed, 1200.0, ship_id);
        }
    }

    /// Appends a projectile with a unique id.
    pub fn spawn_projectile(&mut self, origin: Vec2, velocity: Vec2, max_range: f32, fired_from: u32) -> u32 {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;
        self.projectiles
            .push(Cannonball::new(id, origin, velocity, max_range, fired_from));
        id
    }

    /// Advances the world by one fixed tick, mutating state only here.
    pub fn tick(&mut self, dt: f32, now_ms: f64, wall_now_ms: u64) {
        for ship in &mut self.ships {
            ship.integrate(dt, None);
            if !ship.position.is_finite() || !ship.velocity.is_finite() {
                self.numeric_anomalies += 1;
                log::warn!(
                    "{}",
                    SimulationError::NumericAnomaly { entity_id: ship.id }
                );
                ship.position = Vec2::ZERO;
                ship.velocity = Vec2::ZERO;
            }
        }

        let queued_player_ids: Vec<u32> = self.players.iter().map(|p| p.id).collect();
        for player_id in queued_player_ids {
            let drained = match self.player_mut(player_id) {
                Some(player) => player.drain_actions(now_ms),
                None => continue,
            };
            for queued in drained {
                self.apply_queued_action(player_id, queued.action, queued.target);
            }
        }

        let player_config = crate::player::PlayerConfig::default();
        for player in &mut self.players {
            let hysteresis = self
                .hysteresis
                .entry(player.id)
                .or_insert_with(HysteresisState::default);
            update_attachment(player, &self.ships, hysteresis, &player_config, now_ms);
            integrate_movement(player, &self.ships, &player_config, dt);

            if matches!(player.movement_state, MovementState::Falling) {
                let epsilon = player_config.deck_epsilon();
                let landing_deck = self.ships.iter().find(|s| {
                    let local = s.world_to_local(player.position);
                    s.deck.contains(local, epsilon)
                });
                match landing_deck {
                    Some(ship) => {
                        player.carrier_ship_id = ship.id;
                        player.deck_id = ship.id;
                        player.on_deck = true;
                        player.local_position = ship.world_to_local(player.position);
                        player.movement_state = MovementState::Walking;
                    }
                    None => player.movement_state = MovementState::Swimming,
                }
            }

            if !player.position.is_finite() {
                self.numeric_anomalies += 1;
                log::warn!(
                    "{}",
                    SimulationError::NumericAnomaly { entity_id: player.id }
                );
                player.position = Vec2::ZERO;
                player.velocity = Vec2::ZERO;
            }
        }

        self.projectiles.retain_mut(|projectile| !projectile.integrate(dt));

        self.resolve_collisions(dt);

        self.tick += 1;
        self.timestamp_ms = wall_now_ms;
    }

    fn resolve_collisions(&mut self, dt: f32) {
        for i in 0..self.ships.len() {
            for j in (i + 1)..self.ships.len() {
                let (left, right) = self.ships.split_at_mut(j);
                let a = &mut left[i];
                let b = &mut right[0];
                if let Some(overlap) = ship_ship_overlap(a, b) {
                    resolve_ship_collision(a, b, overlap);
                }
            }
        }

        let mut hit_ids = Vec::new();
        for projectile in &self.projectiles {
            for ship in &self.ships {
                if ship.id == projectile.fired_from {
                    continue;
                }
                let hull = ship.hull_world();
                let prev = projectile.position - projectile.velocity * dt;
                if segment_hits_polygon(prev, projectile.position, &hull).is_some() {
                    hit_ids.push(projectile.id);
                    break;
                }
            }
        }
        self.projectiles.retain(|p| !hit_ids.contains(&p.id));
    }
}

fn angle_delta(a: f32, b: f32) -> f32 {
    normalize_angle(a - b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_counter_increments_monotonically() {
        let mut world = WorldState::new();
        world.tick(TICK_DT, 0.0, 0);
        world.tick(TICK_DT, 33.0, 33);
        assert_eq!(world.tick, 2);
    }

    #[test]
    fn spawn_projectile_gets_unique_increasing_ids() {
        let mut world = WorldState::new();
        let a = world.spawn_projectile(Vec2::ZERO, Vec2::X, 100.0, 1);
        let b = world.spawn_projectile(Vec2::ZERO, Vec2::X, 100.0, 1);
        assert!(b > a);
        assert!(a >= crate::projectile::PROJECTILE_ID_BASE);
    }

    #[test]
    fn queued_jump_action_transitions_walking_to_falling() {
        let mut world = WorldState::new();
        world.ships.push(crate::ship::Ship::new(1, Vec2::ZERO, 0.0));
        let mut player = Player::spawn(1, "a".into(), Vec2::ZERO, 20.0);
        player.carrier_ship_id = 1;
        player.deck_id = 1;
        player.on_deck = true;
        player.movement_state = MovementState::Walking;
        world.spawn_player(player);

        world.apply_input(1, HybridInput::Action { action: ActionKind::Jump, target: None }, 0.0);
        world.tick(TICK_DT, 0.0, 0);

        assert_eq!(world.player_mut(1).unwrap().movement_state, MovementState::Falling);
    }

    #[test]
    fn queued_dismount_action_clears_mount_state() {
        let mut world = WorldState::new();
        world.spawn_player(Player::spawn(1, "a".into(), Vec2::ZERO, 20.0));
        world.player_mut(1).unwrap().mount_at(7, Vec2::ZERO);

        world.apply_input(1, HybridInput::Action { action: ActionKind::Dismount, target: None }, 0.0);
        world.tick(TICK_DT, 0.0, 0);

        assert!(world.player_mut(1).unwrap().mount.is_none());
    }

    #[test]
    fn queued_reload_action_restores_ammunition_up_to_the_magazine_cap() {
        let mut world = WorldState::new();
        let mut ship = crate::ship::Ship::new(1, Vec2::ZERO, 0.0);
        let mut cannon = crate::ship::Module::new(10, crate::ship::ModuleKind::Cannon, Vec2::ZERO, 0.0);
        cannon.cannon_mut().unwrap().ammunition = crate::ship::CANNON_MAGAZINE_CAPACITY - 1;
        ship.modules.push(cannon);
        world.ships.push(ship);

        let mut player = Player::spawn(1, "a".into(), Vec2::ZERO, 20.0);
        player.carrier_ship_id = 1;
        world.spawn_player(player);

        world.apply_input(1, HybridInput::Action { action: ActionKind::Reload, target: Some(10) }, 0.0);
        world.tick(TICK_DT, 0.0, 0);
        let ammo_after_one = world.ship(1).unwrap().modules[0].cannon().unwrap().ammunition;
        assert_eq!(ammo_after_one, crate::ship::CANNON_MAGAZINE_CAPACITY);

        world.apply_input(1, HybridInput::Action { action: ActionKind::Reload, target: Some(10) }, 33.0);
        world.tick(TICK_DT, 33.0, 33);
        let ammo_after_two = world.ship(1).unwrap().modules[0].cannon().unwrap().ammunition;
        assert_eq!(ammo_after_two, crate::ship::CANNON_MAGAZINE_CAPACITY);
    }

    #[test]
    fn movement_state_input_clamps_magnitude() {
        let mut world = WorldState::new();
        world.spawn_player(Player::spawn(1, "a".into(), Vec2::ZERO, 20.0));
        world.apply_input(
            1,
            HybridInput::MovementState {
                direction: Vec2::new(5.0, -5.0),
                is_moving: true,
            },
            0.0,
        );
        let player = world.player_mut(1).unwrap();
        assert!(player.movement_direction.x <= 1.0 && player.movement_direction.y >= -1.0);
    }
}
