mod queue;
mod types;

pub use queue::{EventQueue, PendingEvent};
pub use types::{ActionKind, GameEvent, ReliabilityMode, ACTION_EVENT_TTL_MS};
