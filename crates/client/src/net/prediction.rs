//! Client-side movement prediction. The local player is advanced every
//! frame with the same `integrate_movement` step the server runs, so
//! reconciling against an authoritative snapshot only ever has to replay
//! the same function against a corrected base state rather than approximate
//! it with a second implementation.
//!
//! The wire protocol carries no per-command ack (the server only ever
//! echoes back full player snapshots, never "here is the input sequence
//! number I last applied"), so reconciliation here is time-based rather
//! than sequence-based: a command is assumed already reflected in an
//! incoming snapshot once it's older than the current round-trip estimate,
//! and only commands younger than that get replayed on top of the
//! authoritative state.

use std::collections::VecDeque;

use glam::Vec2;

use dual::net::{MovementStateLabel, PlayerSnapshotJson};
use dual::player::{integrate_movement, MovementState, Player, PlayerConfig};
use dual::ship::Ship;

const MAX_PENDING_COMMANDS: usize = 128;

/// Position-error threshold, in units, beyond which a reconcile schedules a
/// rollback rather than trusting the in-flight local prediction (spec.md
/// §4.3 step 5).
const POSITION_ERROR_THRESHOLD: f32 = 5.0;
/// Velocity-error threshold, in units/s, with the same role as
/// `POSITION_ERROR_THRESHOLD`.
const VELOCITY_ERROR_THRESHOLD: f32 = 10.0;
/// Per-frame blend coefficient toward a rollback-corrected world, so a
/// correction does not visibly snap ("Rollback smoothing", spec.md §4.3).
const ROLLBACK_SMOOTHING_ALPHA: f32 = 0.15;
/// After this many consecutive oversized corrections, skip smoothing and
/// snap straight to the latest snapshot (spec.md §4.3 failure semantics:
/// "three consecutive oversized corrections → full re-seed").
const OVERSIZED_CORRECTIONS_BEFORE_RESEED: u32 = 3;

#[derive(Debug, Clone, Copy)]
struct PendingCommand {
    enqueued_at_ms: f64,
    direction: Vec2,
    is_moving: bool,
    rotation: f32,
    dt: f32,
}

pub struct ClientPrediction {
    config: PlayerConfig,
    player: Player,
    pending: VecDeque<PendingCommand>,
    consecutive_oversized_corrections: u32,
}

impl ClientPrediction {
    pub fn new(config: PlayerConfig, player_id: u32, name: String) -> Self {
        Self {
            config,
            player: Player::spawn(player_id, name, Vec2::ZERO, 20.0),
            pending: VecDeque::with_capacity(MAX_PENDING_COMMANDS),
            consecutive_oversized_corrections: 0,
        }
    }

    /// Advances the locally-held player by one command and records it in
    /// the replay buffer, stamped with the local clock so a later
    /// reconcile knows how old it is.
    pub fn store_command(
        &mut self,
        now_ms: f64,
        direction: Vec2,
        is_moving: bool,
        rotation: f32,
        dt: f32,
        ships: &[Ship],
    ) {
        self.pending.push_back(PendingCommand {
            enqueued_at_ms: now_ms,
            direction,
            is_moving,
            rotation,
            dt,
        });
        while self.pending.len() > MAX_PENDING_COMMANDS {
            self.pending.pop_front();
        }

        self.player.set_movement_intent(direction, is_moving);
        self.player.set_rotation_intent(rotation);
        integrate_movement(&mut self.player, ships, &self.config, dt);
    }

    /// Compares the local prediction against an arriving authoritative
    /// snapshot and, only if the divergence exceeds the error threshold,
    /// rebases onto it and replays every command younger than
    /// `round_trip_ms` (commands it assumes the snapshot hasn't had a
    /// chance to reflect yet). A sub-threshold divergence is left alone:
    /// the client keeps trusting its own prediction (spec.md §4.3 step 5).
    pub fn reconcile(
        &mut self,
        snapshot: &PlayerSnapshotJson,
        ships: &[Ship],
        snapshot_received_at_ms: f64,
        round_trip_ms: f64,
    ) {
        let cutoff = snapshot_received_at_ms - round_trip_ms;
        self.pending.retain(|cmd| cmd.enqueued_at_ms >= cutoff);

        let snapshot_position = Vec2::new(snapshot.world_x, snapshot.world_y);
        let snapshot_velocity = Vec2::new(snapshot.velocity_x, snapshot.velocity_y);
        let position_error = (self.player.position - snapshot_position).length();
        let velocity_error = (self.player.velocity - snapshot_velocity).length();
        if position_error < POSITION_ERROR_THRESHOLD && velocity_error < VELOCITY_ERROR_THRESHOLD {
            self.consecutive_oversized_corrections = 0;
            return;
        }

        let pre_correction_position = self.player.position;
        let pre_correction_velocity = self.player.velocity;

        self.player.position = snapshot_position;
        self.player.rotation = snapshot.rotation;
        self.player.velocity = snapshot_velocity;
        self.player.carrier_ship_id = snapshot.parent_ship;
        self.player.on_deck = snapshot.parent_ship != 0;
        self.player.local_position = Vec2::new(snapshot.local_x, snapshot.local_y);
        self.player.movement_state = movement_state_from_label(snapshot.state);

        let pending: Vec<_> = self.pending.iter().copied().collect();
        for cmd in pending {
            self.player.set_movement_intent(cmd.direction, cmd.is_moving);
            self.player.set_rotation_intent(cmd.rotation);
            integrate_movement(&mut self.player, ships, &self.config, cmd.dt);
        }

        self.consecutive_oversized_corrections += 1;
        if self.consecutive_oversized_corrections < OVERSIZED_CORRECTIONS_BEFORE_RESEED {
            self.player.position = pre_correction_position.lerp(self.player.position, ROLLBACK_SMOOTHING_ALPHA);
            self.player.velocity = pre_correction_velocity.lerp(self.player.velocity, ROLLBACK_SMOOTHING_ALPHA);
        } else {
            self.consecutive_oversized_corrections = 0;
        }
    }

    pub fn predicted_position(&self) -> Vec2 {
        self.player.position
    }

    pub fn predicted_rotation(&self) -> f32 {
        self.player.rotation
    }

    pub fn reset(&mut self, spawn_position: Vec2) {
        self.pending.clear();
        self.player.position = spawn_position;
        self.player.velocity = Vec2::ZERO;
        self.player.carrier_ship_id = 0;
        self.player.on_deck = false;
        self.player.movement_state = MovementState::Swimming;
        self.consecutive_oversized_corrections = 0;
    }

    pub fn pending_command_count(&self) -> usize {
        self.pending.len()
    }
}

fn movement_state_from_label(label: MovementStateLabel) -> MovementState {
    match label {
        MovementStateLabel::Walking => MovementState::Walking,
        MovementStateLabel::Swimming => MovementState::Swimming,
        MovementStateLabel::Falling => MovementState::Falling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_command_advances_swimming_player() {
        let mut prediction = ClientPrediction::new(PlayerConfig::default(), 1, "a".into());
        let ships = Vec::new();
        prediction.store_command(0.0, Vec2::new(1.0, 0.0), true, 0.0, 1.0 / 30.0, &ships);
        assert!(prediction.predicted_position().x > 0.0);
    }

    fn base_snapshot() -> PlayerSnapshotJson {
        PlayerSnapshotJson {
            id: 1,
            name: "a".into(),
            world_x: 0.0,
            world_y: 0.0,
            rotation: 0.0,
            velocity_x: 0.0,
            velocity_y: 0.0,
            is_moving: true,
            movement_direction_x: 1.0,
            movement_direction_y: 0.0,
            parent_ship: 0,
            local_x: 0.0,
            local_y: 0.0,
            state: MovementStateLabel::Swimming,
        }
    }

    #[test]
    fn reconcile_drops_commands_older_than_the_round_trip_window() {
        let mut prediction = ClientPrediction::new(PlayerConfig::default(), 1, "a".into());
        let ships = Vec::new();
        prediction.store_command(0.0, Vec2::new(1.0, 0.0), true, 0.0, 1.0 / 30.0, &ships);
        prediction.store_command(200.0, Vec2::new(1.0, 0.0), true, 0.0, 1.0 / 30.0, &ships);

        prediction.reconcile(&base_snapshot(), &ships, 250.0, 100.0);
        assert_eq!(prediction.pending_command_count(), 1);
    }

    #[test]
    fn reconcile_replays_remaining_commands_on_top_of_authoritative_state() {
        let mut prediction = ClientPrediction::new(PlayerConfig::default(), 1, "a".into());
        let ships = Vec::new();
        // Seed a prediction far enough from the snapshot to force a
        // correction so the replay path actually runs.
        prediction.reset(Vec2::new(100.0, 0.0));
        prediction.store_command(100.0, Vec2::new(1.0, 0.0), true, 0.0, 1.0 / 30.0, &ships);

        prediction.reconcile(&base_snapshot(), &ships, 100.0, 50.0);
        // Corrected-and-replayed position is > 0 (the replayed command moved
        // it off the snapshot's 0.0), but the 15% smoothing blend keeps it
        // well short of the pre-correction 100+ prediction.
        assert!(prediction.predicted_position().x > 0.0);
        assert!(prediction.predicted_position().x < 100.0);
    }

    #[test]
    fn reconcile_leaves_prediction_untouched_below_the_error_threshold() {
        let mut prediction = ClientPrediction::new(PlayerConfig::default(), 1, "a".into());
        prediction.reset(Vec2::new(50.0, 0.0));
        let ships = Vec::new();

        let mut snapshot = base_snapshot();
        snapshot.world_x = 52.0; // 2 units: under the 5-unit threshold.
        prediction.reconcile(&snapshot, &ships, 0.0, 0.0);

        assert!((prediction.predicted_position().x - 50.0).abs() < 1e-6);
    }

    #[test]
    fn reconcile_blends_15_percent_toward_an_oversized_correction() {
        let mut prediction = ClientPrediction::new(PlayerConfig::default(), 1, "a".into());
        prediction.reset(Vec2::new(50.0, 0.0));
        let ships = Vec::new();

        let mut snapshot = base_snapshot();
        snapshot.world_x = 55.0; // exactly at the 5-unit threshold: scenario 5.
        prediction.reconcile(&snapshot, &ships, 0.0, 0.0);

        let expected = 50.0 + (55.0_f32 - 50.0) * 0.15;
        assert!(
            (prediction.predicted_position().x - expected).abs() < 1e-4,
            "expected blended position near {expected}, got {}",
            prediction.predicted_position().x
        );
    }

    #[test]
    fn three_consecutive_oversized_corrections_trigger_a_full_reseed() {
        let mut prediction = ClientPrediction::new(PlayerConfig::default(), 1, "a".into());
        prediction.reset(Vec2::new(50.0, 0.0));
        let ships = Vec::new();
        let mut snapshot = base_snapshot();
        snapshot.world_x = 100.0; // always far outside the threshold.

        prediction.reconcile(&snapshot, &ships, 0.0, 0.0);
        prediction.reconcile(&snapshot, &ships, 0.0, 0.0);
        prediction.reconcile(&snapshot, &ships, 0.0, 0.0);

        assert!(
            (prediction.predicted_position().x - 100.0).abs() < 1e-4,
            "third consecutive oversized correction should re-seed fully, got {}",
            prediction.predicted_position().x
        );
    }
}
