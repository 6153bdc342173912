//! Gateway between inbound client messages and `WorldState::apply_input`:
//! per-player rate limiting (spec.md §4.2 caps input at 120 Hz) and
//! magnitude clamping, so a misbehaving or malicious client cannot feed the
//! simulator out-of-range or flood-rate input.

use std::collections::HashMap;

use glam::Vec2;

use crate::world::HybridInput;

const MIN_INTERVAL_MS: f64 = 1000.0 / 120.0;

/// A `movement_state` whose vector exceeds this magnitude is rejected
/// outright rather than clamped (spec.md §4.2/§8: "magnitude > 1.5 ⇒ reject
/// whole message").
const MOVEMENT_MAGNITUDE_LIMIT: f32 = 1.5;

#[derive(Debug, Default)]
struct RateLimiter {
    last_accepted_ms: Option<f64>,
}

impl RateLimiter {
    fn allow(&mut self, now_ms: f64) -> bool {
        match self.last_accepted_ms {
            Some(last) if now_ms - last < MIN_INTERVAL_MS => false,
            _ => {
                self.last_accepted_ms = Some(now_ms);
                true
            }
        }
    }
}

/// Tracks one rate limiter per connected player and clamps the handful of
/// input variants that carry an unbounded magnitude.
#[derive(Debug, Default)]
pub struct IntentGate {
    limiters: HashMap<u32, RateLimiter>,
}

impl IntentGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the clamped input if it passes `player_id`'s rate limit and
    /// magnitude check, `None` if it should be silently dropped.
    pub fn admit(&mut self, player_id: u32, input: HybridInput, now_ms: f64) -> Option<HybridInput> {
        let limiter = self.limiters.entry(player_id).or_default();
        if !limiter.allow(now_ms) {
            return None;
        }
        clamp_input(input)
    }

    pub fn remove(&mut self, player_id: u32) {
        self.limiters.remove(&player_id);
    }
}

/// Clamps the handful of input variants that carry an unbounded magnitude,
/// dropping `MovementState` outright if its vector is implausibly large
/// rather than silently normalizing it.
fn clamp_input(input: HybridInput) -> Option<HybridInput> {
    match input {
        HybridInput::MovementState { direction, is_moving } => {
            if direction.length() > MOVEMENT_MAGNITUDE_LIMIT {
                return None;
            }
            let clamped = Vec2::new(direction.x.clamp(-1.0, 1.0), direction.y.clamp(-1.0, 1.0));
            Some(HybridInput::MovementState {
                direction: clamped,
                is_moving,
            })
        }
        HybridInput::ShipSailControl {
            desired_openness_percent,
        } => Some(HybridInput::ShipSailControl {
            desired_openness_percent: desired_openness_percent.clamp(0.0, 100.0),
        }),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn second_message_within_window_is_dropped() {
        let mut gate = IntentGate::new();
        let first = gate.admit(
            1,
            HybridInput::RotationUpdate { rotation: 0.0 },
            0.0,
        );
        assert!(first.is_some());
        let second = gate.admit(1, HybridInput::RotationUpdate { rotation: 1.0 }, 1.0);
        assert!(second.is_none());
    }

    #[test]
    fn message_after_window_is_admitted() {
        let mut gate = IntentGate::new();
        gate.admit(1, HybridInput::RotationUpdate { rotation: 0.0 }, 0.0);
        let later = gate.admit(1, HybridInput::RotationUpdate { rotation: 1.0 }, 100.0);
        assert!(later.is_some());
    }

    #[test]
    fn movement_vector_past_the_reject_limit_is_dropped() {
        let mut gate = IntentGate::new();
        let admitted = gate.admit(
            1,
            HybridInput::MovementState {
                direction: Vec2::new(5.0, 0.0),
                is_moving: true,
            },
            0.0,
        );
        assert!(admitted.is_none());
    }

    #[test]
    fn movement_vector_at_exactly_the_reject_limit_is_admitted() {
        let mut gate = IntentGate::new();
        let admitted = gate.admit(
            1,
            HybridInput::MovementState {
                direction: Vec2::new(MOVEMENT_MAGNITUDE_LIMIT, 0.0),
                is_moving: true,
            },
            0.0,
        );
        assert!(admitted.is_some());
    }

    #[test]
    fn movement_vector_just_past_the_reject_limit_is_dropped() {
        let mut gate = IntentGate::new();
        let admitted = gate.admit(
            1,
            HybridInput::MovementState {
                direction: Vec2::new(MOVEMENT_MAGNITUDE_LIMIT + 1e-3, 0.0),
                is_moving: true,
            },
            0.0,
        );
        assert!(admitted.is_none());
    }

    #[test]
    fn in_range_movement_vector_is_component_clamped_not_normalized() {
        let mut gate = IntentGate::new();
        let admitted = gate
            .admit(
                1,
                HybridInput::MovementState {
                    direction: Vec2::new(1.2, -1.3),
                    is_moving: true,
                },
                0.0,
            )
            .unwrap();
        match admitted {
            HybridInput::MovementState { direction, .. } => {
                assert_eq!(direction, Vec2::new(1.0, -1.0));
            }
            _ => panic!("wrong variant"),
        }
    }
}
