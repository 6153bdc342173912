//! Client session bookkeeping: handshake tracking, idle/disconnect timeouts,
//! and the 30-second reconnect grace window a returning player's ship and
//! inventory state survives within (spec.md §6).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub const MAX_SESSIONS: usize = 100;
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
pub const RECONNECT_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket accepted, awaiting the `handshake` client message.
    AwaitingHandshake,
    Connected,
    /// Dropped but still within `RECONNECT_WINDOW`; the player entity is
    /// kept alive so a reconnect can resume it in place.
    Disconnected,
}

#[derive(Debug)]
pub struct Session {
    pub addr: SocketAddr,
    pub player_id: u32,
    pub player_name: String,
    pub state: SessionState,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub disconnected_at: Option<Instant>,
}

impl Session {
    fn new(addr: SocketAddr, player_id: u32) -> Self {
        let now = Instant::now();
        Self {
            addr,
            player_id,
            player_name: String::new(),
            state: SessionState::AwaitingHandshake,
            created_at: now,
            last_activity: now,
            disconnected_at: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_handshake_timed_out(&self) -> bool {
        self.state == SessionState::AwaitingHandshake
            && self.created_at.elapsed() > HANDSHAKE_TIMEOUT
    }

    pub fn is_idle_timed_out(&self) -> bool {
        self.state == SessionState::Connected && self.last_activity.elapsed() > IDLE_TIMEOUT
    }

    pub fn is_reconnect_expired(&self) -> bool {
        match self.disconnected_at {
            Some(at) => at.elapsed() > RECONNECT_WINDOW,
            None => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<u32, Session>,
    by_addr: HashMap<SocketAddr, u32>,
    next_player_id: u32,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            by_addr: HashMap::new(),
            next_player_id: 1,
        }
    }

    /// Accepts a new socket, returning its pending session, or an error if
    /// the server is at `MAX_SESSIONS`.
    pub fn accept(&mut self, addr: SocketAddr) -> Result<u32, &'static str> {
        if self.sessions.len() >= MAX_SESSIONS {
            return Err("server full");
        }
        let player_id = self.next_player_id;
        self.next_player_id += 1;
        self.sessions.insert(player_id, Session::new(addr, player_id));
        self.by_addr.insert(addr, player_id);
        Ok(player_id)
    }

    /// Completes the handshake for a pending session, or resumes a session
    /// still inside its reconnect window under a new socket address.
    pub fn complete_handshake(&mut self, player_id: u32, player_name: String) -> bool {
        let Some(session) = self.sessions.get_mut(&player_id) else {
            return false;
        };
        session.player_name = player_name;
        session.state = SessionState::Connected;
        session.disconnected_at = None;
        session.touch();
        true
    }

    /// Looks for a disconnected session belonging to `player_name` still
    /// inside its reconnect window, rebinding it to `addr`.
    pub fn try_reconnect(&mut self, player_name: &str, addr: SocketAddr) -> Option<u32> {
        let existing = self.sessions.iter().find_map(|(id, s)| {
            (s.player_name == player_name
                && s.state == SessionState::Disconnected
                && !s.is_reconnect_expired())
            .then_some(*id)
        })?;

        if let Some(session) = self.sessions.get_mut(&existing) {
            self.by_addr.remove(&session.addr);
            session.addr = addr;
            session.state = SessionState::Connected;
            session.disconnected_at = None;
            session.touch();
        }
        self.by_addr.insert(addr, existing);
        Some(existing)
    }

    pub fn get(&self, player_id: u32) -> Option<&Session> {
        self.sessions.get(&player_id)
    }

    pub fn get_mut(&mut self, player_id: u32) -> Option<&mut Session> {
        self.sessions.get_mut(&player_id)
    }

    pub fn get_by_addr(&self, addr: &SocketAddr) -> Option<&Session> {
        self.by_addr.get(addr).and_then(|id| self.sessions.get(id))
    }

    /// Marks a session disconnected (entering its reconnect grace window)
    /// rather than removing it outright.
    pub fn mark_disconnected(&mut self, player_id: u32) {
        if let Some(session) = self.sessions.get_mut(&player_id) {
            self.by_addr.remove(&session.addr);
            session.state = SessionState::Disconnected;
            session.disconnected_at = Some(Instant::now());
        }
    }

    pub fn remove(&mut self, player_id: u32) -> Option<Session> {
        if let Some(session) = self.sessions.remove(&player_id) {
            self.by_addr.remove(&session.addr);
            Some(session)
        } else {
            None
        }
    }

    /// Sweeps handshake timeouts, idle timeouts, and expired reconnect
    /// windows, returning the player ids that were fully evicted.
    pub fn sweep(&mut self) -> Vec<u32> {
        let mut to_disconnect = Vec::new();
        let mut to_remove = Vec::new();

        for (id, session) in &self.sessions {
            if session.is_handshake_timed_out() {
                to_remove.push(*id);
            } else if session.is_idle_timed_out() {
                to_disconnect.push(*id);
            } else if session.state == SessionState::Disconnected && session.is_reconnect_expired()
            {
                to_remove.push(*id);
            }
        }

        for id in &to_disconnect {
            self.mark_disconnected(*id);
        }

        for id in &to_remove {
            self.remove(*id);
        }
        to_remove
    }

    pub fn connected_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.state == SessionState::Connected)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}
