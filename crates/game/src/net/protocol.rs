//! Wire protocol: the text/JSON message enums (the normative client
//! surface) and the fixed-layout binary packets used for the quantized
//! snapshot/input stream.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::ActionKind;
use crate::math::{
    checksum16, float_to_q15, q15_to_float, quantize_position, quantize_rotation,
    quantize_velocity, unquantize_position, unquantize_rotation, unquantize_velocity,
};

pub const MAX_PACKET_SIZE: usize = 1400;
pub const PROTOCOL_VERSION: u8 = 1;
pub const DEFAULT_PORT: u16 = 27015;
pub const DEFAULT_TICK_RATE: u32 = 30;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("packet too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("input packet checksum mismatch")]
    InputChecksumMismatch,
    #[error("unknown packet type {0}")]
    UnknownPacketType(u8),
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    ClientHandshake = 1,
    ServerHandshake = 2,
    ClientInput = 3,
    ServerSnapshot = 4,
    ClientAck = 5,
    Heartbeat = 6,
}

impl PacketType {
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            1 => Ok(Self::ClientHandshake),
            2 => Ok(Self::ServerHandshake),
            3 => Ok(Self::ClientInput),
            4 => Ok(Self::ServerSnapshot),
            5 => Ok(Self::ClientAck),
            6 => Ok(Self::Heartbeat),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }
}

pub const BINARY_HEADER_LEN: usize = 14;
pub const BINARY_ENTITY_LEN: usize = 14;
pub const BINARY_INPUT_LEN: usize = 18;

/// 14-byte binary snapshot header, one per UDP datagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryHeader {
    pub packet_type: u8,
    pub version: u8,
    pub server_time_ms: u32,
    /// Reference snapshot id this one deltas against, or 0 for a full one.
    pub base_id: u16,
    pub snap_id: u16,
    pub aoi_cell: u16,
    pub entity_count: u8,
    pub flags: u8,
}

impl BinaryHeader {
    pub fn encode(&self) -> [u8; BINARY_HEADER_LEN] {
        let mut buf = [0u8; BINARY_HEADER_LEN];
        buf[0] = self.packet_type;
        buf[1] = self.version;
        buf[2..6].copy_from_slice(&self.server_time_ms.to_le_bytes());
        buf[6..8].copy_from_slice(&self.base_id.to_le_bytes());
        buf[8..10].copy_from_slice(&self.snap_id.to_le_bytes());
        buf[10..12].copy_from_slice(&self.aoi_cell.to_le_bytes());
        buf[12] = self.entity_count;
        buf[13] = self.flags;
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < BINARY_HEADER_LEN {
            return Err(ProtocolError::TooShort {
                expected: BINARY_HEADER_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            packet_type: bytes[0],
            version: bytes[1],
            server_time_ms: u32::from_le_bytes(bytes[2..6].try_into().unwrap()),
            base_id: u16::from_le_bytes(bytes[6..8].try_into().unwrap()),
            snap_id: u16::from_le_bytes(bytes[8..10].try_into().unwrap()),
            aoi_cell: u16::from_le_bytes(bytes[10..12].try_into().unwrap()),
            entity_count: bytes[12],
            flags: bytes[13],
        })
    }
}

/// 14-byte quantized entity record (ship or player) in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryEntity {
    pub entity_id: u16,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub state_flags: u8,
}

impl BinaryEntity {
    pub fn encode(&self) -> [u8; BINARY_ENTITY_LEN] {
        let mut buf = [0u8; BINARY_ENTITY_LEN];
        buf[0..2].copy_from_slice(&self.entity_id.to_le_bytes());
        buf[2..4].copy_from_slice(&quantize_position(self.position.x).to_le_bytes());
        buf[4..6].copy_from_slice(&quantize_position(self.position.y).to_le_bytes());
        buf[6..8].copy_from_slice(&quantize_velocity(self.velocity.x).to_le_bytes());
        buf[8..10].copy_from_slice(&quantize_velocity(self.velocity.y).to_le_bytes());
        buf[10..12].copy_from_slice(&quantize_rotation(self.rotation).to_le_bytes());
        buf[12] = self.state_flags;
        buf[13] = 0;
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < BINARY_ENTITY_LEN {
            return Err(ProtocolError::TooShort {
                expected: BINARY_ENTITY_LEN,
                actual: bytes.len(),
            });
        }
        let pos_x = u16::from_le_bytes(bytes[2..4].try_into().unwrap());
        let pos_y = u16::from_le_bytes(bytes[4..6].try_into().unwrap());
        let vel_x = u16::from_le_bytes(bytes[6..8].try_into().unwrap());
        let vel_y = u16::from_le_bytes(bytes[8..10].try_into().unwrap());
        let rotation = u16::from_le_bytes(bytes[10..12].try_into().unwrap());
        Ok(Self {
            entity_id: u16::from_le_bytes(bytes[0..2].try_into().unwrap()),
            position: Vec2::new(unquantize_position(pos_x), unquantize_position(pos_y)),
            velocity: Vec2::new(unquantize_velocity(vel_x), unquantize_velocity(vel_y)),
            rotation: unquantize_rotation(rotation),
            state_flags: bytes[12],
        })
    }
}

/// 18-byte client input packet: `type, version, seq, dt_ms, thrust(Q15),
/// turn(Q15), actions, clientTime, checksum`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryInput {
    pub sequence: u16,
    pub dt_ms: u16,
    pub thrust: f32,
    pub turn: f32,
    pub actions: u16,
    pub client_time_ms: u32,
}

impl BinaryInput {
    pub fn encode(&self) -> [u8; BINARY_INPUT_LEN] {
        let mut buf = [0u8; BINARY_INPUT_LEN];
        buf[0] = PacketType::ClientInput as u8;
        buf[1] = PROTOCOL_VERSION;
        buf[2..4].copy_from_slice(&self.sequence.to_le_bytes());
        buf[4..6].copy_from_slice(&self.dt_ms.to_le_bytes());
        buf[6..8].copy_from_slice(&float_to_q15(self.thrust).to_le_bytes());
        buf[8..10].copy_from_slice(&float_to_q15(self.turn).to_le_bytes());
        buf[10..12].copy_from_slice(&self.actions.to_le_bytes());
        buf[12..16].copy_from_slice(&self.client_time_ms.to_le_bytes());
        let checksum = checksum16(&buf[0..16]);
        buf[16..18].copy_from_slice(&checksum.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < BINARY_INPUT_LEN {
            return Err(ProtocolError::TooShort {
                expected: BINARY_INPUT_LEN,
                actual: bytes.len(),
            });
        }
        let expected = checksum16(&bytes[0..16]);
        let actual = u16::from_le_bytes(bytes[16..18].try_into().unwrap());
        if expected != actual {
            return Err(ProtocolError::InputChecksumMismatch);
        }
        let thrust_q = i16::from_le_bytes(bytes[6..8].try_into().unwrap());
        let turn_q = i16::from_le_bytes(bytes[8..10].try_into().unwrap());
        Ok(Self {
            sequence: u16::from_le_bytes(bytes[2..4].try_into().unwrap()),
            dt_ms: u16::from_le_bytes(bytes[4..6].try_into().unwrap()),
            thrust: q15_to_float(thrust_q),
            turn: q15_to_float(turn_q),
            actions: u16::from_le_bytes(bytes[10..12].try_into().unwrap()),
            client_time_ms: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        })
    }
}

// ---- Text/JSON protocol: the normative client-facing surface. ----

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Vec2Json {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2Json> for Vec2 {
    fn from(v: Vec2Json) -> Self {
        Vec2::new(v.x, v.y)
    }
}

impl From<Vec2> for Vec2Json {
    fn from(v: Vec2) -> Self {
        Vec2Json { x: v.x, y: v.y }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Handshake {
        player_name: String,
        protocol_version: u32,
        timestamp: u64,
    },
    MovementState {
        movement: Vec2Json,
        is_moving: bool,
    },
    RotationUpdate {
        rotation: f32,
    },
    ActionEvent {
        action: ActionKind,
        target: Option<u32>,
    },
    ShipSailControl {
        desired_openness: f32,
    },
    ShipRudderControl {
        turning_left: bool,
        turning_right: bool,
    },
    ShipSailAngleControl {
        desired_angle: f32,
    },
    CannonAim {
        aim_angle: f32,
    },
    CannonFire {
        fire_all: bool,
        cannon_ids: Option<Vec<u32>>,
    },
    Ping {},
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeStatus {
    Connected,
    Reconnected,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    InputReceived,
    NoPlayer,
    PlayerNotFound,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementStateLabel {
    Walking,
    Swimming,
    Falling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipSnapshotJson {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub angular_velocity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshotJson {
    pub id: u32,
    pub name: String,
    pub world_x: f32,
    pub world_y: f32,
    pub rotation: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub is_moving: bool,
    pub movement_direction_x: f32,
    pub movement_direction_y: f32,
    pub parent_ship: u32,
    pub local_x: f32,
    pub local_y: f32,
    pub state: MovementStateLabel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshotJson {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub tick: u32,
    pub timestamp: u64,
    pub ships: Vec<ShipSnapshotJson>,
    pub players: Vec<PlayerSnapshotJson>,
    pub projectiles: Vec<ProjectileSnapshotJson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    HandshakeResponse {
        player_id: u32,
        player_name: String,
        server_time: u64,
        status: HandshakeStatus,
        message: Option<String>,
    },
    GameState(Box<GameStateSnapshot>),
    MessageAck {
        status: AckStatus,
    },
    Pong {
        timestamp: u64,
        server_time: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_header_round_trips_fields() {
        let header = BinaryHeader {
            packet_type: PacketType::ServerSnapshot as u8,
            version: PROTOCOL_VERSION,
            server_time_ms: 123_456,
            base_id: 0,
            snap_id: 42,
            aoi_cell: 7,
            entity_count: 3,
            flags: 0,
        };
        let encoded = header.encode();
        let decoded = BinaryHeader::decode(&encoded).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn binary_entity_round_trips_within_quantization_tolerance() {
        let entity = BinaryEntity {
            entity_id: 7,
            position: Vec2::new(12.5, -30.0),
            velocity: Vec2::new(3.0, -1.5),
            rotation: 1.0,
            state_flags: 0b0000_0010,
        };
        let encoded = entity.encode();
        let decoded = BinaryEntity::decode(&encoded).unwrap();
        assert!((decoded.position - entity.position).length() < 0.2);
        assert!((decoded.velocity - entity.velocity).length() < 0.01);
        assert_eq!(decoded.state_flags, entity.state_flags);
    }

    #[test]
    fn binary_input_checksum_detects_corruption() {
        let input = BinaryInput {
            sequence: 5,
            dt_ms: 33,
            thrust: 0.5,
            turn: -0.25,
            actions: 0,
            client_time_ms: 9000,
        };
        let mut encoded = input.encode();
        assert!(BinaryInput::decode(&encoded).is_ok());
        encoded[6] ^= 0xFF;
        assert!(matches!(
            BinaryInput::decode(&encoded),
            Err(ProtocolError::InputChecksumMismatch)
        ));
    }

    #[test]
    fn client_message_json_round_trips() {
        let msg = ClientMessage::MovementState {
            movement: Vec2Json { x: 0.5, y: -0.5 },
            is_moving: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        match back {
            ClientMessage::MovementState { movement, is_moving } => {
                assert_eq!(movement, Vec2Json { x: 0.5, y: -0.5 });
                assert!(is_moving);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unrecognized_packet_type_is_reported() {
        assert!(matches!(
            PacketType::from_u8(200),
            Err(ProtocolError::UnknownPacketType(200))
        ));
    }
}
