mod config;
mod controller;
mod state;

pub use config::PlayerConfig;
pub use controller::{integrate_movement, update_attachment, HysteresisState};
pub use state::{MountState, MovementState, Player, QueuedAction};
