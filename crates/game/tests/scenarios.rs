//! End-to-end scenario tests exercising the simulator's public surface
//! directly (no transport layer): standing movement, ship boarding
//! hysteresis, ship rotation carrying an attached player, and cannon fire
//! selection. Handshake/session behavior is covered in the gateway crate's
//! own integration tests, and client-side prediction rollback is covered by
//! `dual_client`'s reconciliation unit tests; neither needs a `WorldState`.

use dual::math::normalize_angle;
use dual::player::{integrate_movement, MovementState, Player, PlayerConfig};
use dual::ship::{Module, ModuleKind, Ship};
use dual::world::{HybridInput, WorldState, TICK_DT};
use glam::Vec2;

#[test]
fn standing_movement_swims_south_at_swim_speed() {
    let mut world = WorldState::new();
    world.spawn_player(Player::spawn(1, "alice".into(), Vec2::ZERO, 20.0));
    world.apply_input(
        1,
        HybridInput::MovementState {
            direction: Vec2::new(0.0, -1.0),
            is_moving: true,
        },
        0.0,
    );

    for tick in 0..30 {
        world.tick(TICK_DT, tick as f64 * 33.0, tick as u64 * 33);
    }

    let player = world.player_mut(1).unwrap();
    assert_eq!(player.movement_state, MovementState::Swimming);
    assert!(player.is_moving);
    assert!((player.movement_direction.y + 1.0).abs() < 1e-3);
    assert!(
        (player.position.y - (-140.0)).abs() <= 5.0,
        "expected world_y to drop ~140 units, got {}",
        player.position.y
    );
}

#[test]
fn boarding_a_ship_requires_hysteresis_in_ticks_before_walking_confirmed() {
    let config = PlayerConfig::default();
    let mut world = WorldState::new();
    world.ships.push(Ship::new(1, Vec2::ZERO, 0.0));
    world.spawn_player(Player::spawn(1, "alice".into(), Vec2::ZERO, config.player_radius));

    // Ticks T .. T+(N_IN-2): the candidate hasn't accumulated enough ticks
    // yet, so the player is still reported unattached.
    for tick in 0..(config.hysteresis_in_ticks - 1) {
        world.tick(TICK_DT, tick as f64 * 33.0, tick as u64 * 33);
        let player = world.player_mut(1).unwrap();
        assert_eq!(player.carrier_ship_id, 0, "attached too early at tick {tick}");
        assert_eq!(player.movement_state, MovementState::Swimming);
    }

    // The tick that completes N_IN confirms WALKING and attaches the ship.
    world.tick(
        TICK_DT,
        (config.hysteresis_in_ticks - 1) as f64 * 33.0,
        (config.hysteresis_in_ticks - 1) as u64 * 33,
    );
    let player = world.player_mut(1).unwrap();
    assert_eq!(player.movement_state, MovementState::Walking);
    assert_eq!(player.carrier_ship_id, 1);
    let ship = world.ship(1).unwrap();
    let expected_local = ship.world_to_local(Vec2::ZERO);
    assert!((player.local_position - expected_local).length() < 1e-3);
}

#[test]
fn ship_rotation_carries_an_attached_player_with_no_input() {
    let config = PlayerConfig::default();
    let mut ship = Ship::new(1, Vec2::ZERO, 0.0);
    let mut player = Player::spawn(1, "alice".into(), Vec2::ZERO, config.player_radius);
    player.carrier_ship_id = ship.id;
    player.movement_state = MovementState::Walking;
    player.local_position = Vec2::new(100.0, 0.0);

    let angular_velocity = 1.0_f32;
    for _ in 0..30 {
        ship.rotation = normalize_angle(ship.rotation + angular_velocity * TICK_DT);
        integrate_movement(&mut player, std::slice::from_ref(&ship), &config, TICK_DT);
    }

    let expected = Vec2::new(1.0_f32.cos() * 100.0, 1.0_f32.sin() * 100.0);
    assert!(
        (player.position - expected).length() < 1.0,
        "expected position near {expected:?}, got {:?}",
        player.position
    );
}

fn cannon_ship(id: u32) -> Ship {
    let mut ship = Ship::new(id, Vec2::ZERO, 0.0);

    let helm = Module::new(1, ModuleKind::Helm, Vec2::new(-200.0, 0.0), 0.0);
    ship.modules.push(helm);

    // Three cannons to port (negative local y), three to starboard.
    for (i, local_y) in [-40.0, 0.0, 40.0].into_iter().enumerate() {
        let mut cannon = Module::new(10 + i as u32, ModuleKind::Cannon, Vec2::new(0.0, local_y), 0.0);
        cannon.cannon_mut().unwrap().aim_direction = std::f32::consts::FRAC_PI_2;
        cannon.cannon_mut().unwrap().ammunition = 5;
        ship.modules.push(cannon);
    }
    for (i, local_y) in [-40.0, 0.0, 40.0].into_iter().enumerate() {
        let mut cannon = Module::new(20 + i as u32, ModuleKind::Cannon, Vec2::new(0.0, local_y), 0.0);
        cannon.cannon_mut().unwrap().aim_direction = -std::f32::consts::FRAC_PI_2;
        cannon.cannon_mut().unwrap().ammunition = 5;
        ship.modules.push(cannon);
    }

    ship
}

#[test]
fn cannon_fire_selects_only_the_aimed_broadside() {
    let config = PlayerConfig::default();
    let mut world = WorldState::new();
    world.ships.push(cannon_ship(1));
    let mut player = Player::spawn(1, "alice".into(), Vec2::ZERO, config.player_radius);
    player.carrier_ship_id = 1;
    player.mount_at(1, Vec2::ZERO);
    world.spawn_player(player);

    world.apply_input(1, HybridInput::CannonAim { aim_angle: -std::f32::consts::FRAC_PI_2 }, 0.0);
    world.apply_input(
        1,
        HybridInput::CannonFire {
            fire_all: false,
            cannon_ids: Vec::new(),
        },
        0.0,
    );

    assert_eq!(world.projectiles.len(), 3, "expected exactly the starboard broadside");
    for projectile in &world.projectiles {
        // Starboard cannons aim at -pi/2; fired direction is ship.rotation + aim_direction.
        let expected_dir = Vec2::new(0.0, -1.0);
        let actual_dir = projectile.velocity.normalize();
        assert!((actual_dir - expected_dir).length() < 1e-3);
    }

    let ship = world.ship(1).unwrap();
    let starboard_ready: Vec<_> = ship
        .modules
        .iter()
        .filter(|m| matches!(m.kind, ModuleKind::Cannon) && m.id >= 20)
        .collect();
    for module in &starboard_ready {
        assert!(!module.is_ready_cannon(), "fired starboard cannons should be reloading");
    }
    let port_untouched: Vec<_> = ship
        .modules
        .iter()
        .filter(|m| matches!(m.kind, ModuleKind::Cannon) && m.id < 20)
        .collect();
    for module in &port_untouched {
        assert!(module.is_ready_cannon(), "port cannons were never fired");
    }
}

#[test]
fn cannon_fire_all_only_fires_cannons_past_their_reload_timer() {
    let config = PlayerConfig::default();
    let mut world = WorldState::new();
    world.ships.push(cannon_ship(1));
    let mut player = Player::spawn(1, "alice".into(), Vec2::ZERO, config.player_radius);
    player.carrier_ship_id = 1;
    player.mount_at(1, Vec2::ZERO);
    world.spawn_player(player);

    // Fire the starboard broadside first so those three cannons start
    // reloading, then immediately issue a fire_all: only the three port
    // cannons, which were never fired, should be ready.
    world.apply_input(1, HybridInput::CannonAim { aim_angle: -std::f32::consts::FRAC_PI_2 }, 0.0);
    world.apply_input(
        1,
        HybridInput::CannonFire {
            fire_all: false,
            cannon_ids: Vec::new(),
        },
        0.0,
    );
    assert_eq!(world.projectiles.len(), 3);

    world.apply_input(
        1,
        HybridInput::CannonFire {
            fire_all: true,
            cannon_ids: Vec::new(),
        },
        0.0,
    );
    assert_eq!(
        world.projectiles.len(),
        3 + 3,
        "fire_all should only add the three still-ready port cannons"
    );

    // Once the reload timer clears, the same fire_all fires all six.
    let ship = world.ship_mut(1).unwrap();
    for module in ship.modules.iter_mut() {
        if let Some(cannon) = module.cannon_mut() {
            cannon.time_since_fire_s = 10.0;
        }
    }
    world.apply_input(
        1,
        HybridInput::CannonFire {
            fire_all: true,
            cannon_ids: Vec::new(),
        },
        0.0,
    );
    assert_eq!(world.projectiles.len(), 6 + 6);
}
