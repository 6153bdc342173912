pub mod collision;
pub mod event;
pub mod math;
pub mod net;
pub mod player;
pub mod projectile;
pub mod ship;
pub mod simulation;
pub mod world;

pub use collision::{polygon_overlap, resolve_ship_collision, ship_ship_overlap, Overlap};
pub use event::{ActionKind, EventQueue, GameEvent, PendingEvent, ReliabilityMode, ACTION_EVENT_TTL_MS};
pub use net::{
    AckTracker, NetworkEndpoint, NetworkStats, PacketLossSimulation, PendingPacket, ProtocolError,
    ReceiveTracker, Session, SessionManager, SessionState, DEFAULT_PORT, DEFAULT_TICK_RATE,
    MAX_PACKET_SIZE,
};
pub use player::{HysteresisState, MountState, MovementState, Player, PlayerConfig, QueuedAction};
pub use projectile::{Cannonball, PROJECTILE_ID_BASE};
pub use ship::{
    generate_hull, DeckAabb, HullControlPoints, Module, ModuleFlags, ModuleKind, ModuleRecord,
    Ship, ShipPhysicsParams, HULL_POINT_COUNT,
};
pub use simulation::{FixedTimestep, IntentGate, SimulationLoop, SimulationState, WorldHistory};
pub use world::{HybridInput, SimulationError, WorldState, TICK_DT};
