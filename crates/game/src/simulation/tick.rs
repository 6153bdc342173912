//! Fixed-timestep accumulator driving `WorldState::tick`, with a rolling
//! snapshot history for reconciliation/rollback.

use crate::simulation::history::WorldHistory;
use crate::world::WorldState;

pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: f32) {
        self.accumulator += delta.min(0.25);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.dt
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

pub struct SimulationState {
    pub world: WorldState,
    pub history: WorldHistory,
    pub timestep: FixedTimestep,
}

impl SimulationState {
    pub fn new(tick_rate: u32, history_capacity: usize) -> Self {
        Self {
            world: WorldState::new(),
            history: WorldHistory::new(history_capacity),
            timestep: FixedTimestep::new(tick_rate),
        }
    }

    pub fn tick(&self) -> u32 {
        self.world.tick
    }

    pub fn store_snapshot(&mut self) {
        self.history.push(self.world.clone());
    }

    pub fn rollback_to(&mut self, tick: u32) -> bool {
        if let Some(snapshot) = self.history.get(tick) {
            self.world = snapshot.clone();
            true
        } else {
            false
        }
    }
}

/// Drives `SimulationState` forward, calling `tick_fn` immediately before
/// each fixed step so callers can merge buffered network input into the
/// world before it advances.
pub struct SimulationLoop<F> {
    state: SimulationState,
    tick_fn: F,
}

impl<F> SimulationLoop<F>
where
    F: FnMut(&mut WorldState),
{
    pub fn new(tick_rate: u32, history_capacity: usize, tick_fn: F) -> Self {
        Self {
            state: SimulationState::new(tick_rate, history_capacity),
            tick_fn,
        }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    /// Advances by `delta` real seconds, running as many fixed ticks as the
    /// accumulator permits. `now_ms`/`wall_clock_ms` seed the first tick;
    /// subsequent ticks within the same call advance `now_ms` by `dt`.
    pub fn update(&mut self, delta: f32, now_ms: f64, wall_clock_ms: u64) -> u32 {
        self.state.timestep.accumulate(delta);
        let dt = self.state.timestep.dt();

        let mut ticks_run = 0;
        let mut sim_now_ms = now_ms;
        while self.state.timestep.consume_tick() {
            (self.tick_fn)(&mut self.state.world);
            self.state.world.tick(dt, sim_now_ms, wall_clock_ms);
            self.state.store_snapshot();
            sim_now_ms += dt as f64 * 1000.0;
            ticks_run += 1;
        }

        ticks_run
    }

    pub fn interpolation_alpha(&self) -> f32 {
        self.state.timestep.alpha()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::new(60);

        ts.accumulate(1.0 / 30.0);
        assert!(ts.should_tick());
        assert!(ts.consume_tick());
        assert!(ts.consume_tick());
        assert!(!ts.consume_tick());
    }

    #[test]
    fn simulation_loop_ticks() {
        let mut tick_count = 0u32;
        let mut sim = SimulationLoop::new(60, 128, |_world| {
            tick_count += 1;
        });

        sim.update(1.0 / 30.0, 0.0, 0);
        assert_eq!(tick_count, 2);
        assert_eq!(sim.state().tick(), 2);
    }

    #[test]
    fn rollback_restores_a_prior_snapshot() {
        let mut sim = SimulationLoop::new(30, 128, |_world| {});
        sim.update(1.0 / 30.0, 0.0, 0);
        sim.update(1.0 / 30.0, 33.0, 33);
        assert_eq!(sim.state().tick(), 2);
        assert!(sim.state_mut().rollback_to(1));
        assert_eq!(sim.state().tick(), 1);
    }
}
