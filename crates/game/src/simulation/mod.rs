mod command;
mod history;
mod tick;

pub use command::IntentGate;
pub use history::WorldHistory;
pub use tick::{FixedTimestep, SimulationLoop, SimulationState};
