//! Deck fixtures: helms, cannons, masts, ladders, planks, and plain deck
//! tiles.

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ModuleFlags: u8 {
        const DAMAGED = 0b0000_0001;
        const ACTIVE  = 0b0000_0010;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModuleKind {
    Helm = 0,
    Seat = 1,
    Cannon = 2,
    Mast = 3,
    Ladder = 4,
    Plank = 5,
    Deck = 6,
    Custom = 255,
}

/// The maximum angle, in radians, a sail may be trimmed to either side of
/// dead ahead (§3: `sail angle ∈ [-π/3, π/3]`).
pub const SAIL_ANGLE_LIMIT: f32 = std::f32::consts::FRAC_PI_3;

/// Minimum seconds between shots for a single cannon before it is ready
/// again.
pub const CANNON_RELOAD_TIME_S: f32 = 3.0;

/// Ammunition a single `reload` action event restores a cannon toward
/// (spec.md §4.2 action_event: reload).
pub const CANNON_MAGAZINE_CAPACITY: u32 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CannonRecord {
    /// Ship-relative aim direction, radians.
    pub aim_direction: f32,
    pub ammunition: u32,
    pub time_since_fire_s: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MastRecord {
    pub sail_openness_target: f32,
    pub sail_angle: f32,
    pub integrity: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlankRecord {
    pub health: f32,
    pub segment_index: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HelmRecord {
    pub wheel_rotation: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ModuleRecord {
    Cannon(CannonRecord),
    Mast(MastRecord),
    Plank(PlankRecord),
    Helm(HelmRecord),
    None,
}

/// A fixture placed on a ship's deck. Module ids are unique across the
/// entire world and immutable once assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: u32,
    pub kind: ModuleKind,
    pub local_position: Vec2,
    pub local_rotation: f32,
    pub occupied_by: Option<u32>,
    pub flags: ModuleFlags,
    pub record: ModuleRecord,
}

impl Module {
    pub fn new(id: u32, kind: ModuleKind, local_position: Vec2, local_rotation: f32) -> Self {
        let record = match kind {
            ModuleKind::Cannon => ModuleRecord::Cannon(CannonRecord {
                aim_direction: 0.0,
                ammunition: 0,
                time_since_fire_s: f32::MAX,
            }),
            ModuleKind::Mast => ModuleRecord::Mast(MastRecord {
                sail_openness_target: 0.0,
                sail_angle: 0.0,
                integrity: 1.0,
            }),
            ModuleKind::Plank => ModuleRecord::Plank(PlankRecord {
                health: 100.0,
                segment_index: 0,
            }),
            ModuleKind::Helm => ModuleRecord::Helm(HelmRecord { wheel_rotation: 0.0 }),
            ModuleKind::Seat | ModuleKind::Ladder | ModuleKind::Deck | ModuleKind::Custom => {
                ModuleRecord::None
            }
        };
        Self {
            id,
            kind,
            local_position,
            local_rotation,
            occupied_by: None,
            flags: ModuleFlags::empty(),
            record,
        }
    }

    pub fn is_ready_cannon(&self) -> bool {
        matches!(
            self.record,
            ModuleRecord::Cannon(CannonRecord { ammunition, time_since_fire_s, .. })
                if ammunition > 0 && time_since_fire_s >= CANNON_RELOAD_TIME_S
        )
    }

    pub fn cannon(&self) -> Option<&CannonRecord> {
        match &self.record {
            ModuleRecord::Cannon(c) => Some(c),
            _ => None,
        }
    }

    pub fn cannon_mut(&mut self) -> Option<&mut CannonRecord> {
        match &mut self.record {
            ModuleRecord::Cannon(c) => Some(c),
            _ => None,
        }
    }

    pub fn mast_mut(&mut self) -> Option<&mut MastRecord> {
        match &mut self.record {
            ModuleRecord::Mast(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cannon_starts_not_ready() {
        let m = Module::new(1, ModuleKind::Cannon, Vec2::ZERO, 0.0);
        assert!(!m.is_ready_cannon());
    }

    #[test]
    fn cannon_with_ammo_is_ready() {
        let mut m = Module::new(1, ModuleKind::Cannon, Vec2::ZERO, 0.0);
        m.cannon_mut().unwrap().ammunition = 3;
        assert!(m.is_ready_cannon());
    }

    #[test]
    fn non_cannon_kinds_have_no_cannon_record() {
        let m = Module::new(2, ModuleKind::Ladder, Vec2::ZERO, 0.0);
        assert!(m.cannon().is_none());
    }
}
