use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    SessionConnecting {
        addr: SocketAddr,
    },
    SessionConnected {
        player_id: u32,
        player_name: String,
        addr: SocketAddr,
        reconnected: bool,
    },
    SessionDisconnected {
        player_id: u32,
        reason: DisconnectReason,
    },
    ConnectionDenied {
        addr: SocketAddr,
        reason: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum DisconnectReason {
    Graceful,
    Timeout,
    Kicked,
    HandshakeTimeout,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Graceful => "disconnected",
            DisconnectReason::Timeout => "timed out",
            DisconnectReason::Kicked => "kicked",
            DisconnectReason::HandshakeTimeout => "handshake timed out",
        }
    }
}
