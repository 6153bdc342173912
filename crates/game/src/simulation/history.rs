//! Fixed-capacity ring buffer of `WorldState` snapshots, indexed by tick
//! modulo capacity. Backs both the server's reconciliation window and the
//! client's rollback-and-replay prediction buffer.

use crate::world::WorldState;

pub struct WorldHistory {
    capacity: usize,
    slots: Vec<Option<WorldState>>,
}

impl WorldHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    pub fn push(&mut self, state: WorldState) {
        let slot = (state.tick as usize) % self.capacity;
        self.slots[slot] = Some(state);
    }

    /// Returns the stored snapshot for `tick`, or `None` if it was never
    /// recorded or has since been overwritten by a later tick at the same
    /// slot.
    pub fn get(&self, tick: u32) -> Option<&WorldState> {
        let slot = (tick as usize) % self.capacity;
        self.slots[slot].as_ref().filter(|s| s.tick == tick)
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// The most recent recorded snapshot at or before `tick`, for clients
    /// resuming a rollback when the exact tick was never stored.
    pub fn latest_before(&self, tick: u32) -> Option<&WorldState> {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.tick <= tick)
            .max_by_key(|s| s.tick)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_get_round_trips_within_capacity() {
        let mut history = WorldHistory::new(8);
        let mut state = WorldState::new();
        state.tick = 3;
        history.push(state);
        assert_eq!(history.get(3).map(|s| s.tick), Some(3));
        assert!(history.get(4).is_none());
    }

    #[test]
    fn overwritten_slot_is_not_mistaken_for_requested_tick() {
        let mut history = WorldHistory::new(4);
        let mut older = WorldState::new();
        older.tick = 1;
        history.push(older);

        let mut newer = WorldState::new();
        newer.tick = 5; // same slot (1 % 4 == 5 % 4)
        history.push(newer);

        assert!(history.get(1).is_none());
        assert_eq!(history.get(5).map(|s| s.tick), Some(5));
    }

    #[test]
    fn latest_before_finds_closest_prior_snapshot() {
        let mut history = WorldHistory::new(16);
        for tick in [2, 5, 9] {
            let mut state = WorldState::new();
            state.tick = tick;
            history.push(state);
        }
        assert_eq!(history.latest_before(7).map(|s| s.tick), Some(5));
    }
}
