mod endpoint;
mod protocol;
mod session;
mod stats;
mod tracking;

pub use endpoint::NetworkEndpoint;
pub use protocol::{
    AckStatus, BinaryEntity, BinaryHeader, BinaryInput, ClientMessage, GameStateSnapshot,
    HandshakeStatus, MovementStateLabel, PacketType, PlayerSnapshotJson, ProjectileSnapshotJson,
    ProtocolError, ServerMessage, ShipSnapshotJson, Vec2Json, BINARY_ENTITY_LEN, BINARY_HEADER_LEN,
    BINARY_INPUT_LEN, DEFAULT_PORT, DEFAULT_TICK_RATE, MAX_PACKET_SIZE, PROTOCOL_VERSION,
};
pub use session::{
    Session, SessionManager, SessionState, HANDSHAKE_TIMEOUT, IDLE_TIMEOUT, MAX_SESSIONS,
    RECONNECT_WINDOW,
};
pub use stats::{NetworkStats, PacketLossSimulation};
pub use tracking::{AckTracker, PendingPacket, ReceiveTracker};
