//! Builds the outbound snapshot forms from `WorldState`: the JSON shape for
//! the text protocol and the quantized entity list for the binary one.

use dual::net::{BinaryEntity, GameStateSnapshot, PlayerSnapshotJson, ProjectileSnapshotJson, ShipSnapshotJson};
use dual::{MovementState, WorldState};

fn movement_label(state: MovementState) -> dual::net::MovementStateLabel {
    match state {
        MovementState::Walking => dual::net::MovementStateLabel::Walking,
        MovementState::Swimming => dual::net::MovementStateLabel::Swimming,
        MovementState::Falling => dual::net::MovementStateLabel::Falling,
    }
}

pub fn build_json_snapshot(world: &WorldState) -> GameStateSnapshot {
    GameStateSnapshot {
        tick: world.tick,
        timestamp: world.timestamp_ms,
        ships: world
            .ships
            .iter()
            .map(|s| ShipSnapshotJson {
                id: s.id,
                x: s.position.x,
                y: s.position.y,
                rotation: s.rotation,
                velocity_x: s.velocity.x,
                velocity_y: s.velocity.y,
                angular_velocity: s.angular_velocity,
            })
            .collect(),
        players: world
            .players
            .iter()
            .map(|p| PlayerSnapshotJson {
                id: p.id,
                name: p.name.clone(),
                world_x: p.position.x,
                world_y: p.position.y,
                rotation: p.rotation,
                velocity_x: p.velocity.x,
                velocity_y: p.velocity.y,
                is_moving: p.is_moving,
                movement_direction_x: p.movement_direction.x,
                movement_direction_y: p.movement_direction.y,
                parent_ship: p.carrier_ship_id,
                local_x: p.local_position.x,
                local_y: p.local_position.y,
                state: movement_label(p.movement_state),
            })
            .collect(),
        projectiles: world
            .projectiles
            .iter()
            .map(|c| ProjectileSnapshotJson {
                id: c.id,
                x: c.position.x,
                y: c.position.y,
                velocity_x: c.velocity.x,
                velocity_y: c.velocity.y,
            })
            .collect(),
    }
}

/// Quantized entity rows for the binary snapshot: ships first, then
/// players. Projectiles are omitted from the binary fast path (they are
/// short-lived and carried in full on the JSON surface instead).
pub fn build_binary_entities(world: &WorldState) -> Vec<BinaryEntity> {
    let mut entities = Vec::with_capacity(world.ships.len() + world.players.len());

    for ship in &world.ships {
        entities.push(BinaryEntity {
            entity_id: ship.id as u16,
            position: ship.position,
            velocity: ship.velocity,
            rotation: ship.rotation,
            state_flags: 0,
        });
    }

    for player in &world.players {
        let flags = match player.movement_state {
            MovementState::Walking => 0b0000_0001,
            MovementState::Swimming => 0b0000_0010,
            MovementState::Falling => 0b0000_0100,
        };
        entities.push(BinaryEntity {
            entity_id: player.id as u16,
            position: player.position,
            velocity: player.velocity,
            rotation: player.rotation,
            state_flags: flags,
        });
    }

    entities
}

/// Maps a decoded `BinaryInput`'s continuous thrust/turn fields onto the
/// same sail-and-rudder controls the JSON surface exposes, since the binary
/// path is a compact fast lane for ship helm control rather than a second
/// input vocabulary.
pub fn binary_input_to_hybrid(thrust: f32, turn: f32) -> [dual::HybridInput; 2] {
    let desired_openness_percent = ((thrust + 1.0) * 0.5 * 100.0).clamp(0.0, 100.0);
    [
        dual::HybridInput::ShipSailControl {
            desired_openness_percent,
        },
        dual::HybridInput::ShipRudderControl {
            turning_left: turn < -0.1,
            turning_right: turn > 0.1,
        },
    ]
}
