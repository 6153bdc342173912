pub mod client;
pub mod config;
pub mod input;
pub mod interpolation;
pub mod prediction;

pub use client::{ConnectionState, NetworkClient, NetworkStats};
pub use config::ClientConfig;
pub use input::InputState;
pub use interpolation::{InterpolatedPlayer, InterpolatedShip, InterpolationEngine, InterpolationStats};
pub use prediction::ClientPrediction;
