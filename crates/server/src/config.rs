use std::net::IpAddr;

use dual::PacketLossSimulation;

/// Typed configuration surface for `dual-server` (spec.md §6's recognized
/// options). Loading from a file format is out of scope; this struct plus
/// the `clap` CLI in `main.rs` together are the configuration surface.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    /// Binary UDP snapshot/input port (`gamePort`, default 8080).
    pub game_port: u16,
    /// Text/JSON WebSocket port (`wsPort`, default 8082).
    pub ws_port: u16,
    /// Read-only admin HTTP port (`adminPort`, default 8081).
    pub admin_port: u16,
    pub max_sessions: usize,
    pub tick_rate: u32,
    pub history_capacity: usize,
    pub world_bounds: f32,
    pub global_packet_loss: Option<PacketLossSimulation>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".parse().unwrap(),
            game_port: 8080,
            ws_port: 8082,
            admin_port: 8081,
            max_sessions: dual::net::MAX_SESSIONS,
            tick_rate: dual::DEFAULT_TICK_RATE,
            history_capacity: 128,
            world_bounds: 4096.0,
            global_packet_loss: None,
        }
    }
}
