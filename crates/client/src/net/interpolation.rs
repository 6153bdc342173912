use std::collections::HashMap;

use glam::Vec2;

use dual::net::{GameStateSnapshot, PlayerSnapshotJson, ProjectileSnapshotJson, ShipSnapshotJson};

pub const DEFAULT_INTERPOLATION_DELAY_MS: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct InterpolationConfig {
    pub target_delay_ms: f64,
    pub min_buffer_snapshots: usize,
    pub max_buffer_snapshots: usize,
    pub time_correction_rate: f64,
    pub extrapolation_limit_ms: f64,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            target_delay_ms: DEFAULT_INTERPOLATION_DELAY_MS,
            min_buffer_snapshots: 3,
            max_buffer_snapshots: 64,
            time_correction_rate: 0.1,
            extrapolation_limit_ms: 250.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InterpolatedShip {
    pub id: u32,
    pub position: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
}

#[derive(Debug, Clone)]
pub struct InterpolatedPlayer {
    pub id: u32,
    pub name: String,
    pub position: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
    pub parent_ship: u32,
}

#[derive(Debug)]
struct TimedSnapshot {
    snapshot: GameStateSnapshot,
    server_time_ms: f64,
}

/// Buffers full snapshots and renders a point slightly behind the latest
/// arrival, smoothing out jitter in delivery time. Unlike ship/player
/// motion, cannonballs are not interpolated: they are short-lived and move
/// fast enough that the latest authoritative position is a better read than
/// a lerp between two stale points.
#[derive(Debug)]
pub struct InterpolationEngine {
    config: InterpolationConfig,
    snapshots: Vec<TimedSnapshot>,
    server_time_offset_ms: f64,
    render_time_ms: f64,
    ships: HashMap<u32, InterpolatedShip>,
    players: HashMap<u32, InterpolatedPlayer>,
    projectiles: Vec<ProjectileSnapshotJson>,
    ready: bool,
    latest_server_tick: u32,
    last_snapshot_time_ms: f64,
    is_extrapolating: bool,
}

impl InterpolationEngine {
    pub fn new(config: InterpolationConfig) -> Self {
        Self {
            config,
            snapshots: Vec::new(),
            server_time_offset_ms: 0.0,
            render_time_ms: 0.0,
            ships: HashMap::new(),
            players: HashMap::new(),
            projectiles: Vec::new(),
            ready: false,
            latest_server_tick: 0,
            last_snapshot_time_ms: 0.0,
            is_extrapolating: false,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(InterpolationConfig::default())
    }

    pub fn push_snapshot(&mut self, snapshot: GameStateSnapshot) {
        let server_time = snapshot.timestamp as f64;

        if snapshot.tick > self.latest_server_tick {
            self.latest_server_tick = snapshot.tick;
        }

        self.last_snapshot_time_ms = current_time_ms();
        self.is_extrapolating = false;

        let local_time = current_time_ms();
        let new_offset = server_time - local_time;

        if self.snapshots.is_empty() {
            self.server_time_offset_ms = new_offset;
            self.render_time_ms = server_time - self.config.target_delay_ms;
        } else {
            let correction = (new_offset - self.server_time_offset_ms) * self.config.time_correction_rate;
            self.server_time_offset_ms += correction;
        }

        let insert_pos = self
            .snapshots
            .iter()
            .position(|s| s.server_time_ms > server_time)
            .unwrap_or(self.snapshots.len());
        self.snapshots.insert(insert_pos, TimedSnapshot { snapshot, server_time_ms: server_time });

        while self.snapshots.len() > self.config.max_buffer_snapshots {
            self.snapshots.remove(0);
        }

        if !self.ready && self.snapshots.len() >= self.config.min_buffer_snapshots {
            self.ready = true;
        }
    }

    pub fn update(&mut self, delta_time: f32) {
        if !self.ready || self.snapshots.is_empty() {
            return;
        }

        let local_time = current_time_ms();
        let target_render_time = local_time + self.server_time_offset_ms - self.config.target_delay_ms;

        let time_diff = target_render_time - self.render_time_ms;
        let max_correction = (delta_time as f64 * 1000.0) * 1.5;
        let correction = time_diff.clamp(-max_correction, max_correction);
        self.render_time_ms += (delta_time as f64 * 1000.0) + correction * self.config.time_correction_rate;

        self.cleanup_old_snapshots();

        if let Some(latest) = self.snapshots.last() {
            self.projectiles = latest.snapshot.projectiles.clone();
        }

        if self.snapshots.len() < 2 {
            self.extrapolate_from_latest(delta_time);
            return;
        }

        if let Some((from_idx, to_idx, t)) = self.find_interpolation_indices() {
            self.is_extrapolating = t > 1.0;
            self.interpolate_at_indices(from_idx, to_idx, t);
        } else {
            self.extrapolate_from_latest(delta_time);
        }
    }

    fn extrapolate_from_latest(&mut self, delta_time: f32) {
        let time_since_last_snapshot = current_time_ms() - self.last_snapshot_time_ms;
        if time_since_last_snapshot > self.config.extrapolation_limit_ms {
            return;
        }
        self.is_extrapolating = true;

        let Some(latest) = self.snapshots.last() else { return };
        self.ships = latest
            .snapshot
            .ships
            .iter()
            .map(|s| {
                let mut ship = interpolated_ship(s);
                ship.position += ship.velocity * delta_time;
                ship.rotation = dual::math::normalize_angle(ship.rotation + ship.angular_velocity * delta_time);
                (ship.id, ship)
            })
            .collect();
        self.players = latest
            .snapshot
            .players
            .iter()
            .map(|p| {
                let mut player = interpolated_player(p);
                player.position += player.velocity * delta_time;
                (player.id, player)
            })
            .collect();
    }

    fn find_interpolation_indices(&self) -> Option<(usize, usize, f32)> {
        if self.snapshots.len() < 2 {
            return None;
        }
        for i in 0..self.snapshots.len() - 1 {
            let from = &self.snapshots[i];
            let to = &self.snapshots[i + 1];
            if from.server_time_ms <= self.render_time_ms && to.server_time_ms >= self.render_time_ms {
                let duration = to.server_time_ms - from.server_time_ms;
                let t = if duration > 0.0 {
                    ((self.render_time_ms - from.server_time_ms) / duration) as f32
                } else {
                    0.0
                };
                return Some((i, i + 1, t.clamp(0.0, 1.0)));
            }
        }

        if self.render_time_ms < self.snapshots[0].server_time_ms {
            return Some((0, 0, 0.0));
        }

        let len = self.snapshots.len();
        let prev = &self.snapshots[len - 2];
        let last = &self.snapshots[len - 1];
        let duration = last.server_time_ms - prev.server_time_ms;
        let t = if duration > 0.0 {
            ((self.render_time_ms - prev.server_time_ms) / duration) as f32
        } else {
            1.0
        };
        Some((len - 2, len - 1, t.clamp(0.0, 2.0).min(1.5)))
    }

    fn interpolate_at_indices(&mut self, from_idx: usize, to_idx: usize, t: f32) {
        let from = &self.snapshots[from_idx].snapshot;
        let to = &self.snapshots[to_idx].snapshot;

        let to_ships: HashMap<u32, &ShipSnapshotJson> = to.ships.iter().map(|s| (s.id, s)).collect();
        self.ships = from
            .ships
            .iter()
            .map(|from_ship| {
                let interpolated = match to_ships.get(&from_ship.id) {
                    Some(to_ship) => interpolate_ship(from_ship, to_ship, t),
                    None => interpolated_ship(from_ship),
                };
                (interpolated.id, interpolated)
            })
            .collect();
        for to_ship in &to.ships {
            self.ships.entry(to_ship.id).or_insert_with(|| interpolated_ship(to_ship));
        }

        let to_players: HashMap<u32, &PlayerSnapshotJson> = to.players.iter().map(|p| (p.id, p)).collect();
        self.players = from
            .players
            .iter()
            .map(|from_player| {
                let interpolated = match to_players.get(&from_player.id) {
                    Some(to_player) => interpolate_player(from_player, to_player, t),
                    None => interpolated_player(from_player),
                };
                (interpolated.id, interpolated)
            })
            .collect();
        for to_player in &to.players {
            self.players
                .entry(to_player.id)
                .or_insert_with(|| interpolated_player(to_player));
        }
    }

    fn cleanup_old_snapshots(&mut self) {
        let cutoff = self.render_time_ms - 500.0;
        self.snapshots.retain(|s| s.server_time_ms > cutoff);
    }

    pub fn ship(&self, id: u32) -> Option<&InterpolatedShip> {
        self.ships.get(&id)
    }

    pub fn player(&self, id: u32) -> Option<&InterpolatedPlayer> {
        self.players.get(&id)
    }

    pub fn ships(&self) -> impl Iterator<Item = &InterpolatedShip> {
        self.ships.values()
    }

    pub fn players(&self) -> impl Iterator<Item = &InterpolatedPlayer> {
        self.players.values()
    }

    pub fn projectiles(&self) -> &[ProjectileSnapshotJson] {
        &self.projectiles
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn reset(&mut self) {
        self.snapshots.clear();
        self.server_time_offset_ms = 0.0;
        self.render_time_ms = 0.0;
        self.ships.clear();
        self.players.clear();
        self.projectiles.clear();
        self.ready = false;
        self.latest_server_tick = 0;
        self.last_snapshot_time_ms = 0.0;
        self.is_extrapolating = false;
    }

    pub fn debug_stats(&self) -> InterpolationStats {
        InterpolationStats {
            buffer_size: self.snapshots.len(),
            render_time_ms: self.render_time_ms,
            server_time_offset_ms: self.server_time_offset_ms,
            latest_server_tick: self.latest_server_tick,
            entity_count: self.ships.len() + self.players.len(),
            is_ready: self.ready,
            is_extrapolating: self.is_extrapolating,
        }
    }
}

fn interpolated_ship(s: &ShipSnapshotJson) -> InterpolatedShip {
    InterpolatedShip {
        id: s.id,
        position: Vec2::new(s.x, s.y),
        rotation: s.rotation,
        velocity: Vec2::new(s.velocity_x, s.velocity_y),
        angular_velocity: s.angular_velocity,
    }
}

fn interpolated_player(p: &PlayerSnapshotJson) -> InterpolatedPlayer {
    InterpolatedPlayer {
        id: p.id,
        name: p.name.clone(),
        position: Vec2::new(p.world_x, p.world_y),
        rotation: p.rotation,
        velocity: Vec2::new(p.velocity_x, p.velocity_y),
        parent_ship: p.parent_ship,
    }
}

fn interpolate_ship(from: &ShipSnapshotJson, to: &ShipSnapshotJson, t: f32) -> InterpolatedShip {
    InterpolatedShip {
        id: from.id,
        position: Vec2::new(from.x, from.y).lerp(Vec2::new(to.x, to.y), t),
        rotation: lerp_angle(from.rotation, to.rotation, t),
        velocity: Vec2::new(from.velocity_x, from.velocity_y).lerp(Vec2::new(to.velocity_x, to.velocity_y), t),
        angular_velocity: from.angular_velocity + (to.angular_velocity - from.angular_velocity) * t,
    }
}

fn interpolate_player(from: &PlayerSnapshotJson, to: &PlayerSnapshotJson, t: f32) -> InterpolatedPlayer {
    InterpolatedPlayer {
        id: from.id,
        name: from.name.clone(),
        position: Vec2::new(from.world_x, from.world_y).lerp(Vec2::new(to.world_x, to.world_y), t),
        rotation: lerp_angle(from.rotation, to.rotation, t),
        velocity: Vec2::new(from.velocity_x, from.velocity_y).lerp(Vec2::new(to.velocity_x, to.velocity_y), t),
        parent_ship: to.parent_ship,
    }
}

/// Shortest-path angle interpolation (avoids the long way around at the
/// +/-PI wraparound).
fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    let mut diff = (to - from) % std::f32::consts::TAU;
    if diff > std::f32::consts::PI {
        diff -= std::f32::consts::TAU;
    } else if diff < -std::f32::consts::PI {
        diff += std::f32::consts::TAU;
    }
    from + diff * t
}

fn current_time_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
        * 1000.0
}

#[derive(Debug, Clone)]
pub struct InterpolationStats {
    pub buffer_size: usize,
    pub render_time_ms: f64,
    pub server_time_offset_ms: f64,
    pub latest_server_tick: u32,
    pub entity_count: usize,
    pub is_ready: bool,
    pub is_extrapolating: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_snapshot(tick: u32, time_ms: u64, ship_x: f32) -> GameStateSnapshot {
        GameStateSnapshot {
            tick,
            timestamp: time_ms,
            ships: vec![ShipSnapshotJson {
                id: 1,
                x: ship_x,
                y: 0.0,
                rotation: 0.0,
                velocity_x: 0.0,
                velocity_y: 0.0,
                angular_velocity: 0.0,
            }],
            players: Vec::new(),
            projectiles: Vec::new(),
        }
    }

    #[test]
    fn becomes_ready_after_min_buffer_snapshots() {
        let mut engine = InterpolationEngine::with_defaults();
        assert!(!engine.is_ready());
        engine.push_snapshot(test_snapshot(0, 0, 0.0));
        engine.push_snapshot(test_snapshot(1, 33, 10.0));
        engine.push_snapshot(test_snapshot(2, 66, 20.0));
        assert!(engine.is_ready());
    }

    #[test]
    fn lerp_angle_takes_the_short_way_around() {
        let result = lerp_angle(3.0, -3.0, 0.5);
        assert!(result.abs() > 3.0);
    }
}
