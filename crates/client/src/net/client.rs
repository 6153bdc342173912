//! WebSocket-based `NetworkClient`: owns a background thread running its
//! own single-threaded Tokio runtime so the synchronous TUI loop never has
//! to await anything. The two sides are bridged by a pair of unbounded
//! `tokio::sync::mpsc` channels, whose `send`/`try_recv` calls are plain
//! non-async functions and so work fine from either side without either
//! thread being inside a runtime.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use glam::Vec2;
use tokio_tungstenite::tungstenite::Message;

use dual::net::{ClientMessage, GameStateSnapshot, HandshakeStatus, ServerMessage, PROTOCOL_VERSION};
use dual::player::PlayerConfig;
use dual::ship::Ship;

use super::config::ClientConfig;
use super::input::InputState;
use super::interpolation::{InterpolationConfig, InterpolationEngine, InterpolationStats};
use super::prediction::ClientPrediction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Denied,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub rtt_ms: f32,
}

struct Shared {
    state: Mutex<ConnectionState>,
    deny_reason: Mutex<Option<String>>,
}

pub struct NetworkClient {
    config: ClientConfig,
    player_name: String,
    shared: Arc<Shared>,
    cmd_tx: Option<tokio::sync::mpsc::UnboundedSender<ClientMessage>>,
    evt_rx: Option<tokio::sync::mpsc::UnboundedReceiver<ServerMessage>>,
    worker: Option<thread::JoinHandle<()>>,

    player_id: u32,
    interpolation: InterpolationEngine,
    prediction: ClientPrediction,
    ships_cache: Vec<Ship>,

    last_command_time: Instant,
    command_interval: Duration,
    last_ping_time: Instant,
    ping_interval: Duration,
    ping_sent_at_ms: Option<f64>,

    stats: NetworkStats,
    latest_tick: u32,
}

impl NetworkClient {
    pub fn new(config: ClientConfig, player_name: String) -> Self {
        let interpolation_config = InterpolationConfig {
            target_delay_ms: (1000.0 / config.server_tick_rate as f64) * config.interpolation_delay as f64,
            ..InterpolationConfig::default()
        };

        Self {
            command_interval: Duration::from_secs_f64(1.0 / config.command_rate as f64),
            ping_interval: Duration::from_secs_f32(config.ping_interval_secs),
            player_name,
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::Disconnected),
                deny_reason: Mutex::new(None),
            }),
            cmd_tx: None,
            evt_rx: None,
            worker: None,
            player_id: 0,
            interpolation: InterpolationEngine::new(interpolation_config),
            prediction: ClientPrediction::new(PlayerConfig::default(), 0, String::new()),
            ships_cache: Vec::new(),
            last_command_time: Instant::now(),
            last_ping_time: Instant::now(),
            ping_sent_at_ms: None,
            stats: NetworkStats::default(),
            latest_tick: 0,
            config,
        }
    }

    /// Spawns the background connection thread. `addr` is a `host:port`
    /// pair for the text/WebSocket transport (the binary/UDP fast lane is
    /// not driven by this harness).
    pub fn connect(&mut self, addr: &str) {
        *self.shared.state.lock().unwrap() = ConnectionState::Connecting;
        *self.shared.deny_reason.lock().unwrap() = None;

        let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel::<ClientMessage>();
        let (evt_tx, evt_rx) = tokio::sync::mpsc::unbounded_channel::<ServerMessage>();

        let url = format!("ws://{addr}");
        let shared = Arc::clone(&self.shared);
        let player_name = self.player_name.clone();

        let handle = thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("failed to start client runtime: {e}");
                    *shared.deny_reason.lock().unwrap() = Some(e.to_string());
                    *shared.state.lock().unwrap() = ConnectionState::Disconnected;
                    return;
                }
            };
            rt.block_on(run_connection(url, player_name, shared, cmd_rx, evt_tx));
        });

        self.cmd_tx = Some(cmd_tx);
        self.evt_rx = Some(evt_rx);
        self.worker = Some(handle);
    }

    pub fn disconnect(&mut self) {
        self.cmd_tx = None;
        self.evt_rx = None;
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        *self.shared.state.lock().unwrap() = ConnectionState::Disconnected;
        self.player_id = 0;
        self.interpolation.reset();
        self.prediction.reset(Vec2::ZERO);
        self.ships_cache.clear();
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock().unwrap()
    }

    pub fn deny_reason(&self) -> Option<String> {
        self.shared.deny_reason.lock().unwrap().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn player_id(&self) -> u32 {
        self.player_id
    }

    /// Per-frame pump: drains inbound messages, advances interpolation, and
    /// sends a command/ping when their intervals elapse.
    pub fn update(&mut self, delta_time: f32, input: &InputState) {
        self.drain_inbound();

        if self.state() != ConnectionState::Connected {
            return;
        }

        self.interpolation.update(delta_time);

        if self.last_command_time.elapsed() >= self.command_interval {
            self.send_movement(input, delta_time);
            self.last_command_time = Instant::now();
        }

        if self.last_ping_time.elapsed() >= self.ping_interval {
            self.send_ping();
            self.last_ping_time = Instant::now();
        }
    }

    fn send_movement(&mut self, input: &InputState, dt: f32) {
        let now = current_time_ms();
        self.prediction
            .store_command(now, input.move_direction, input.is_moving, input.rotation, dt, &self.ships_cache);

        let Some(tx) = &self.cmd_tx else { return };
        for message in input.to_messages() {
            if tx.send(message).is_ok() {
                self.stats.messages_sent += 1;
            }
        }
    }

    fn send_ping(&mut self) {
        let Some(tx) = &self.cmd_tx else { return };
        self.ping_sent_at_ms = Some(current_time_ms());
        if tx.send(ClientMessage::Ping {}).is_ok() {
            self.stats.messages_sent += 1;
        }
    }

    fn drain_inbound(&mut self) {
        let Some(rx) = &mut self.evt_rx else { return };
        while let Ok(message) = rx.try_recv() {
            self.stats.messages_received += 1;
            self.handle_message(message);
        }
    }

    fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::HandshakeResponse { player_id, status, message, .. } => {
                match status {
                    HandshakeStatus::Connected | HandshakeStatus::Reconnected => {
                        self.player_id = player_id;
                        self.prediction = ClientPrediction::new(PlayerConfig::default(), player_id, self.player_name.clone());
                        *self.shared.state.lock().unwrap() = ConnectionState::Connected;
                    }
                    HandshakeStatus::Error => {
                        *self.shared.deny_reason.lock().unwrap() = message;
                        *self.shared.state.lock().unwrap() = ConnectionState::Denied;
                    }
                }
            }
            ServerMessage::GameState(snapshot) => self.handle_snapshot(*snapshot),
            ServerMessage::MessageAck { .. } => {}
            ServerMessage::Pong { .. } => {
                if let Some(sent_at) = self.ping_sent_at_ms.take() {
                    self.stats.rtt_ms = (current_time_ms() - sent_at) as f32;
                }
            }
        }
    }

    fn handle_snapshot(&mut self, snapshot: GameStateSnapshot) {
        self.latest_tick = snapshot.tick;
        self.ships_cache = snapshot.ships.iter().map(ship_from_snapshot).collect();

        if let Some(local) = snapshot.players.iter().find(|p| p.id == self.player_id) {
            let round_trip = (self.stats.rtt_ms as f64).max(1000.0 / self.config.server_tick_rate as f64);
            self.prediction.reconcile(local, &self.ships_cache, current_time_ms(), round_trip);
        }

        self.interpolation.push_snapshot(snapshot);
    }

    pub fn predicted_position(&self) -> Vec2 {
        self.prediction.predicted_position()
    }

    pub fn predicted_rotation(&self) -> f32 {
        self.prediction.predicted_rotation()
    }

    pub fn pending_command_count(&self) -> usize {
        self.prediction.pending_command_count()
    }

    pub fn is_interpolation_ready(&self) -> bool {
        self.interpolation.is_ready()
    }

    pub fn interpolation_stats(&self) -> InterpolationStats {
        self.interpolation.debug_stats()
    }

    pub fn interpolation(&self) -> &InterpolationEngine {
        &self.interpolation
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats
    }

    pub fn latest_tick(&self) -> u32 {
        self.latest_tick
    }

    pub fn shutdown(&mut self) {
        self.disconnect();
    }
}

async fn run_connection(
    url: String,
    player_name: String,
    shared: Arc<Shared>,
    mut cmd_rx: tokio::sync::mpsc::UnboundedReceiver<ClientMessage>,
    evt_tx: tokio::sync::mpsc::UnboundedSender<ServerMessage>,
) {
    let (stream, _) = match tokio_tungstenite::connect_async(&url).await {
        Ok(pair) => pair,
        Err(e) => {
            log::warn!("connect to {url} failed: {e}");
            *shared.deny_reason.lock().unwrap() = Some(e.to_string());
            *shared.state.lock().unwrap() = ConnectionState::Disconnected;
            return;
        }
    };
    let (mut write, mut read) = stream.split();

    let handshake = ClientMessage::Handshake {
        player_name,
        protocol_version: PROTOCOL_VERSION as u32,
        timestamp: current_time_ms() as u64,
    };
    if let Ok(text) = serde_json::to_string(&handshake) {
        if write.send(Message::Text(text.into())).await.is_err() {
            *shared.state.lock().unwrap() = ConnectionState::Disconnected;
            return;
        }
    }

    loop {
        tokio::select! {
            outgoing = cmd_rx.recv() => {
                let Some(message) = outgoing else { break };
                let Ok(text) = serde_json::to_string(&message) else { continue };
                if write.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(msg) = serde_json::from_str::<ServerMessage>(&text) {
                            let _ = evt_tx.send(msg);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("websocket read error: {e}");
                        break;
                    }
                }
            }
        }
    }

    *shared.state.lock().unwrap() = ConnectionState::Disconnected;
}

fn ship_from_snapshot(s: &dual::net::ShipSnapshotJson) -> Ship {
    let mut ship = Ship::new(s.id, Vec2::new(s.x, s.y), s.rotation);
    ship.velocity = Vec2::new(s.velocity_x, s.velocity_y);
    ship.angular_velocity = s.angular_velocity;
    ship
}

fn current_time_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
        * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_starts_disconnected() {
        let client = NetworkClient::new(ClientConfig::default(), "sailor".into());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
    }
}
