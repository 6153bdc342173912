//! Player entity: world state, carrier attachment, movement state machine,
//! mount state, and the bounded queue of pending action events.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::event::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementState {
    Swimming,
    Walking,
    Falling,
}

/// An action queued by `action_event`, applied on the next tick and dropped
/// if not applied within 10 s (spec §5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueuedAction {
    pub action: ActionKind,
    pub target: Option<u32>,
    pub queued_at_ms: f64,
}

const ACTION_QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MountState {
    pub mounted_module_id: u32,
    pub mount_offset: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,

    pub position: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
    pub radius: f32,

    /// 0 = not attached to any ship.
    pub carrier_ship_id: u32,
    pub deck_id: u32,
    pub on_deck: bool,
    /// Valid only while `carrier_ship_id != 0`.
    pub local_position: Vec2,

    pub movement_state: MovementState,

    pub mount: Option<MountState>,

    pub movement_direction: Vec2,
    pub is_moving: bool,
    pub last_rotation_input: f32,
    /// Ship-relative radians set by a `cannon_aim` message; the server does
    /// not need to rotate anything in response, it only stores this value
    /// for the aim-tolerance check on the next `cannon_fire`.
    pub cannon_aim: f32,
    pub action_queue: VecDeque<QueuedAction>,
}

impl Player {
    pub fn spawn(id: u32, name: String, position: Vec2, radius: f32) -> Self {
        Self {
            id,
            name,
            position,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            radius,
            carrier_ship_id: 0,
            deck_id: 0,
            on_deck: false,
            local_position: Vec2::ZERO,
            movement_state: MovementState::Swimming,
            mount: None,
            movement_direction: Vec2::ZERO,
            is_moving: false,
            last_rotation_input: 0.0,
            cannon_aim: 0.0,
            action_queue: VecDeque::with_capacity(ACTION_QUEUE_CAPACITY),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.carrier_ship_id != 0
    }

    pub fn set_movement_intent(&mut self, direction: Vec2, is_moving: bool) {
        self.movement_direction = direction;
        self.is_moving = is_moving;
    }

    pub fn set_rotation_intent(&mut self, rotation: f32) {
        self.last_rotation_input = crate::math::normalize_angle(rotation);
    }

    pub fn queue_action(&mut self, action: ActionKind, target: Option<u32>, now_ms: f64) {
        if self.action_queue.len() >= ACTION_QUEUE_CAPACITY {
            self.action_queue.pop_front();
        }
        self.action_queue.push_back(QueuedAction {
            action,
            target,
            queued_at_ms: now_ms,
        });
    }

    /// Drains actions queued before or at `now_ms`, dropping any older than
    /// 10 s.
    pub fn drain_actions(&mut self, now_ms: f64) -> Vec<QueuedAction> {
        const TTL_MS: f64 = 10_000.0;
        let mut drained = Vec::with_capacity(self.action_queue.len());
        while let Some(front) = self.action_queue.pop_front() {
            if now_ms - front.queued_at_ms <= TTL_MS {
                drained.push(front);
            }
        }
        drained
    }

    pub fn mount_at(&mut self, module_id: u32, offset: Vec2) {
        self.mount = Some(MountState {
            mounted_module_id: module_id,
            mount_offset: offset,
        });
    }

    pub fn dismount(&mut self) {
        self.mount = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawns_swimming_and_unattached() {
        let p = Player::spawn(1, "abe".into(), Vec2::ZERO, 20.0);
        assert_eq!(p.movement_state, MovementState::Swimming);
        assert!(!p.is_attached());
    }

    #[test]
    fn action_queue_drops_entries_older_than_ten_seconds() {
        let mut p = Player::spawn(1, "abe".into(), Vec2::ZERO, 20.0);
        p.queue_action(ActionKind::Jump, None, 0.0);
        p.queue_action(ActionKind::Interact, None, 5_000.0);

        let drained = p.drain_actions(11_000.0);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].action, ActionKind::Interact);
    }

    #[test]
    fn action_queue_is_bounded() {
        let mut p = Player::spawn(1, "abe".into(), Vec2::ZERO, 20.0);
        for _ in 0..(ACTION_QUEUE_CAPACITY + 5) {
            p.queue_action(ActionKind::FireCannon, None, 0.0);
        }
        assert_eq!(p.action_queue.len(), ACTION_QUEUE_CAPACITY);
    }
}
