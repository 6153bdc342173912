//! Player movement tuning. One struct holding every tunable with a
//! `Default` impl, in the same shape as this workspace's other `*Config`
//! types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub walk_speed: f32,
    pub swim_speed: f32,
    pub swim_drag: f32,
    pub player_radius: f32,
    /// Ticks a player must be continuously inside a ship's deck before
    /// `WALKING` is confirmed.
    pub hysteresis_in_ticks: u32,
    /// Ticks a player must be continuously outside the current deck before
    /// `WALKING` is released.
    pub hysteresis_out_ticks: u32,
    pub switch_cooldown_ms: f64,
    /// Deck-bounds clamp tolerance, as a fraction of `player_radius`.
    pub deck_epsilon_factor: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            walk_speed: 1000.0,
            swim_speed: 140.0,
            swim_drag: 0.9,
            player_radius: 20.0,
            hysteresis_in_ticks: 3,
            hysteresis_out_ticks: 8,
            switch_cooldown_ms: 200.0,
            deck_epsilon_factor: 0.03,
        }
    }
}

impl PlayerConfig {
    pub fn deck_epsilon(&self) -> f32 {
        self.deck_epsilon_factor * self.player_radius
    }
}
