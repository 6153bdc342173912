//! Adaptive broadcast cadence (spec.md §4.2): the simulation loop ticks the
//! world at a fixed 30 Hz regardless of load, but only *emits* snapshots at
//! a rate that scales with how many sessions are actually doing something.

use std::time::Duration;

/// A session counts as "active" if it produced an input message within this
/// window of the current tick.
pub const ACTIVE_WINDOW: Duration = Duration::from_secs(2);

/// 5 Hz with nobody connected, 20 Hz default once connected but idle, 25 Hz
/// with exactly one active player, 30 Hz with more than one.
pub fn broadcast_rate_hz(connected: usize, active: usize) -> f32 {
    if connected == 0 {
        5.0
    } else if active == 0 {
        20.0
    } else if active == 1 {
        25.0
    } else {
        30.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nobody_connected_is_five_hz() {
        assert_eq!(broadcast_rate_hz(0, 0), 5.0);
    }

    #[test]
    fn idle_session_is_twenty_hz() {
        assert_eq!(broadcast_rate_hz(3, 0), 20.0);
    }

    #[test]
    fn single_active_player_is_twenty_five_hz() {
        assert_eq!(broadcast_rate_hz(1, 1), 25.0);
    }

    #[test]
    fn multiple_active_players_is_thirty_hz() {
        assert_eq!(broadcast_rate_hz(4, 2), 30.0);
    }
}
