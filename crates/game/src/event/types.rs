use rkyv::{Archive, Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliabilityMode {
    Unreliable,
    UnreliableExpiring { ttl_ms: u64 },
    Reliable,
}

impl ReliabilityMode {
    pub fn is_reliable(&self) -> bool {
        matches!(self, Self::Reliable)
    }

    pub fn ttl_ms(&self) -> Option<u64> {
        match self {
            Self::UnreliableExpiring { ttl_ms } => Some(*ttl_ms),
            _ => None,
        }
    }
}

/// Pending action events older than 10 s are dropped (spec §5).
pub const ACTION_EVENT_TTL_MS: u64 = 10_000;

/// The six action kinds a player may queue via an `action_event` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug, PartialEq))]
pub enum ActionKind {
    FireCannon,
    Jump,
    Interact,
    Reload,
    Mount,
    Dismount,
}

/// A validated action event, queued for application on the next tick.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct GameEvent {
    pub player_id: u32,
    pub action: ActionKind,
    pub target: Option<u32>,
}

impl GameEvent {
    pub fn new(player_id: u32, action: ActionKind, target: Option<u32>) -> Self {
        Self {
            player_id,
            action,
            target,
        }
    }

    /// Every action kind shares the same reliability tier: unreliable, and
    /// dropped if not applied within 10 s of being queued.
    pub fn reliability(&self) -> ReliabilityMode {
        ReliabilityMode::UnreliableExpiring {
            ttl_ms: ACTION_EVENT_TTL_MS,
        }
    }

    pub fn is_transient(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_expires_after_ten_seconds() {
        for action in [
            ActionKind::FireCannon,
            ActionKind::Jump,
            ActionKind::Interact,
            ActionKind::Reload,
            ActionKind::Mount,
            ActionKind::Dismount,
        ] {
            let event = GameEvent::new(1, action, None);
            assert_eq!(event.reliability().ttl_ms(), Some(ACTION_EVENT_TTL_MS));
        }
    }
}
