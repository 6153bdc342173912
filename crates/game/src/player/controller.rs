//! Player movement integration: carrier attachment hysteresis, per-state
//! movement, and the deck-bounds clamp (spec.md §4.1 steps 2-3).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::math::rotate2;
use crate::player::config::PlayerConfig;
use crate::player::state::{MovementState, Player};
use crate::ship::Ship;

/// Per-player carrier-detection hysteresis counters. One entry per player
/// in `WorldState`, tracking containment against whichever ship is
/// currently the best candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HysteresisState {
    /// Ship currently accumulating `in_ticks` toward a WALKING transition.
    pub candidate_ship_id: u32,
    pub in_ticks: u32,
    /// Ticks the currently-attached ship has failed containment.
    pub out_ticks: u32,
    pub cooldown_until_ms: f64,
}

impl Default for HysteresisState {
    fn default() -> Self {
        Self {
            candidate_ship_id: 0,
            in_ticks: 0,
            out_ticks: 0,
            cooldown_until_ms: 0.0,
        }
    }
}

fn ship_contains(ship: &Ship, world_pos: Vec2, epsilon: f32) -> bool {
    let local = ship.world_to_local(world_pos);
    ship.deck.contains(local, epsilon)
}

/// Finds the first ship (in iteration order) whose deck contains `world_pos`.
fn find_containing_ship<'a>(ships: &'a [Ship], world_pos: Vec2, epsilon: f32) -> Option<&'a Ship> {
    ships.iter().find(|s| ship_contains(s, world_pos, epsilon))
}

/// Runs carrier-detection hysteresis for one player against all ships,
/// attaching/detaching `player` as the counters cross their thresholds.
/// Returns `true` if the player's movement state changed this tick.
pub fn update_attachment(
    player: &mut Player,
    ships: &[Ship],
    hysteresis: &mut HysteresisState,
    config: &PlayerConfig,
    now_ms: f64,
) -> bool {
    let epsilon = config.deck_epsilon();
    let mut transitioned = false;

    if player.is_attached() {
        let still_contained = ships
            .iter()
            .find(|s| s.id == player.carrier_ship_id)
            .map(|s| ship_contains(s, player.position, epsilon))
            .unwrap_or(false);

        if still_contained {
            hysteresis.out_ticks = 0;
        } else {
            hysteresis.out_ticks += 1;
            if hysteresis.out_ticks >= config.hysteresis_out_ticks
                && player.movement_state == MovementState::Walking
            {
                detach(player);
                hysteresis.out_ticks = 0;
                hysteresis.cooldown_until_ms = now_ms + config.switch_cooldown_ms;
                transitioned = true;
            }
        }
        return transitioned;
    }

    if now_ms < hysteresis.cooldown_until_ms {
        return transitioned;
    }

    match find_containing_ship(ships, player.position, epsilon) {
        Some(ship) if ship.id == hysteresis.candidate_ship_id => {
            hysteresis.in_ticks += 1;
        }
        Some(ship) => {
            hysteresis.candidate_ship_id = ship.id;
            hysteresis.in_ticks = 1;
        }
        None => {
            hysteresis.candidate_ship_id = 0;
            hysteresis.in_ticks = 0;
        }
    }

    if hysteresis.candidate_ship_id != 0 && hysteresis.in_ticks >= config.hysteresis_in_ticks {
        if let Some(ship) = ships.iter().find(|s| s.id == hysteresis.candidate_ship_id) {
            attach(player, ship);
            hysteresis.in_ticks = 0;
            hysteresis.cooldown_until_ms = now_ms + config.switch_cooldown_ms;
            transitioned = true;
        }
    }

    transitioned
}

fn attach(player: &mut Player, ship: &Ship) {
    player.carrier_ship_id = ship.id;
    player.deck_id = ship.id;
    player.on_deck = true;
    player.local_position = ship.world_to_local(player.position);
    player.movement_state = MovementState::Walking;
}

fn detach(player: &mut Player) {
    player.carrier_ship_id = 0;
    player.deck_id = 0;
    player.on_deck = false;
    player.movement_state = MovementState::Swimming;
}

/// Moves `player` for one tick according to its current movement state.
pub fn integrate_movement(player: &mut Player, ships: &[Ship], config: &PlayerConfig, dt: f32) {
    match player.movement_state {
        MovementState::Walking => {
            let Some(ship) = ships.iter().find(|s| s.id == player.carrier_ship_id) else {
                return;
            };
            if player.is_moving {
                player.local_position += player.movement_direction * config.walk_speed * dt;
            }
            let epsilon = config.deck_epsilon();
            let (clamped, normal) = ship.deck.clamp_with_normal(player.local_position, epsilon);
            player.local_position = clamped;
            if let Some(n) = normal {
                let world_normal = rotate2(n, ship.rotation);
                let vn = player.velocity.dot(world_normal);
                if vn < 0.0 {
                    player.velocity -= world_normal * vn;
                }
            }
            player.position = ship.local_to_world(player.local_position);
            player.velocity = ship.velocity;
        }
        MovementState::Swimming => {
            if player.is_moving {
                player.velocity = player.movement_direction * config.swim_speed;
            } else {
                player.velocity *= config.swim_drag;
            }
            let speed = player.velocity.length();
            if speed > config.swim_speed {
                player.velocity *= config.swim_speed / speed;
            }
            player.position += player.velocity * dt;
        }
        MovementState::Falling => {
            if player.is_moving {
                player.position += player.movement_direction * config.walk_speed * dt;
            }
        }
    }
    player.rotation = player.last_rotation_input;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ship_at_origin() -> Ship {
        Ship::new(1, Vec2::ZERO, 0.0)
    }

    #[test]
    fn player_attaches_after_n_in_ticks_inside_deck() {
        let ships = vec![make_ship_at_origin()];
        let config = PlayerConfig::default();
        let mut player = Player::spawn(1, "a".into(), Vec2::new(0.0, 0.0), config.player_radius);
        let mut hysteresis = HysteresisState::default();

        for tick in 0..config.hysteresis_in_ticks {
            let changed = update_attachment(
                &mut player,
                &ships,
                &mut hysteresis,
                &config,
                tick as f64 * 33.0,
            );
            if tick + 1 == config.hysteresis_in_ticks {
                assert!(changed);
            }
        }
        assert_eq!(player.movement_state, MovementState::Walking);
        assert_eq!(player.carrier_ship_id, 1);
    }

    #[test]
    fn player_detaches_after_n_out_ticks_outside_deck() {
        let ships = vec![make_ship_at_origin()];
        let config = PlayerConfig::default();
        let mut player = Player::spawn(1, "a".into(), Vec2::new(0.0, 0.0), config.player_radius);
        let mut hysteresis = HysteresisState::default();

        for tick in 0..config.hysteresis_in_ticks {
            update_attachment(&mut player, &ships, &mut hysteresis, &config, tick as f64 * 33.0);
        }
        assert_eq!(player.movement_state, MovementState::Walking);

        player.position = Vec2::new(10_000.0, 0.0);
        let mut now = 1_000.0;
        for _ in 0..config.hysteresis_out_ticks {
            update_attachment(&mut player, &ships, &mut hysteresis, &config, now);
            now += 33.0;
        }
        assert_eq!(player.movement_state, MovementState::Swimming);
    }

    #[test]
    fn walking_player_is_clamped_to_deck_bounds() {
        let ship = make_ship_at_origin();
        let config = PlayerConfig::default();
        let mut player = Player::spawn(1, "a".into(), Vec2::ZERO, config.player_radius);
        player.carrier_ship_id = ship.id;
        player.movement_state = MovementState::Walking;
        player.local_position = Vec2::new(400.0, 0.0);
        player.set_movement_intent(Vec2::new(1.0, 0.0), true);

        integrate_movement(&mut player, std::slice::from_ref(&ship), &config, 1.0);

        assert!(player.local_position.x <= ship.deck.max_x + config.deck_epsilon() + 1e-3);
    }

    #[test]
    fn walking_player_world_position_follows_ship() {
        let mut ship = make_ship_at_origin();
        let config = PlayerConfig::default();
        let mut player = Player::spawn(1, "a".into(), Vec2::ZERO, config.player_radius);
        player.carrier_ship_id = ship.id;
        player.movement_state = MovementState::Walking;
        player.local_position = Vec2::new(10.0, 10.0);

        ship.position = Vec2::new(100.0, 0.0);
        ship.rotation = std::f32::consts::FRAC_PI_2;

        integrate_movement(&mut player, std::slice::from_ref(&ship), &config, 1.0 / 30.0);

        let expected = ship.position + rotate2(Vec2::new(10.0, 10.0), ship.rotation);
        assert!((player.position - expected).length() < 1.0);
    }
}
