//! Binary/UDP transport: the quantized fast lane for ship-helm input and
//! entity snapshots. A player only ever reaches this path after a text
//! handshake has assigned it a player id (spec.md's "binary input packets
//! reference an id the WebSocket handshake already minted" ordering); the
//! first datagram from a new address is matched against an existing session
//! by address rather than performing its own handshake.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::interval;

use dual::net::{BinaryHeader, BinaryInput, PacketType, PROTOCOL_VERSION};

use crate::core::{unix_ms, GameServer};
use crate::snapshot::binary_input_to_hybrid;

const RECV_BUF_SIZE: usize = 1500;

pub async fn run(server: Arc<GameServer>) -> anyhow::Result<()> {
    let addr = (server.config.bind, server.config.game_port);
    let socket = Arc::new(UdpSocket::bind(addr).await?);
    log::info!("UDP listening on {}", socket.local_addr()?);

    let recv_socket = Arc::clone(&socket);
    let recv_server = Arc::clone(&server);
    let recv_task = tokio::spawn(async move { recv_loop(recv_server, recv_socket).await });

    let send_server = Arc::clone(&server);
    let send_task = tokio::spawn(async move { broadcast_loop(send_server, socket).await });

    let _ = tokio::join!(recv_task, send_task);
    Ok(())
}

async fn recv_loop(server: Arc<GameServer>, socket: Arc<UdpSocket>) -> anyhow::Result<()> {
    let mut buf = [0u8; RECV_BUF_SIZE];
    while server.running.load(Ordering::SeqCst) {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("udp recv error: {e}");
                continue;
            }
        };
        if let Some(sim) = &server.config.global_packet_loss {
            if sim.should_drop() {
                continue;
            }
        }
        server.note_received(len);
        handle_datagram(&server, &buf[..len], peer);
    }
    Ok(())
}

fn handle_datagram(server: &GameServer, bytes: &[u8], peer: SocketAddr) {
    let Ok(header) = BinaryHeader::decode(bytes) else {
        return;
    };
    if header.version != PROTOCOL_VERSION {
        return;
    }
    let Ok(packet_type) = PacketType::from_u8(header.packet_type) else {
        return;
    };
    if packet_type != PacketType::ClientInput {
        return;
    }

    let Some(player_id) = server.player_id_for_addr(&peer) else {
        return;
    };

    let body = &bytes[dual::net::BINARY_HEADER_LEN..];
    let Ok(input) = BinaryInput::decode(body) else {
        return;
    };

    server.register_udp_peer(player_id, peer);
    server.touch_session(player_id);
    for hybrid in binary_input_to_hybrid(input.thrust, input.turn) {
        server.submit_input(player_id, hybrid);
    }
}

/// Emits quantized entity snapshots to every registered UDP peer at the tick
/// rate; the adaptive WebSocket broadcast cadence does not apply here since
/// this path exists specifically for players who need the lowest-latency
/// helm feedback loop.
async fn broadcast_loop(server: Arc<GameServer>, socket: Arc<UdpSocket>) -> anyhow::Result<()> {
    let period = Duration::from_secs_f64(1.0 / server.config.tick_rate as f64);
    let mut ticker = interval(period);
    let mut snap_id: u16 = 0;

    while server.running.load(Ordering::SeqCst) {
        ticker.tick().await;
        let peers = server.udp_peer_snapshot();
        if peers.is_empty() {
            continue;
        }

        let entities = server.binary_entities();
        snap_id = snap_id.wrapping_add(1);
        let header = BinaryHeader {
            packet_type: PacketType::ServerSnapshot as u8,
            version: PROTOCOL_VERSION,
            server_time_ms: unix_ms() as u32,
            base_id: 0,
            snap_id,
            aoi_cell: 0,
            entity_count: entities.len().min(u8::MAX as usize) as u8,
            flags: 0,
        };

        let mut datagram = Vec::with_capacity(dual::net::BINARY_HEADER_LEN + entities.len() * dual::net::BINARY_ENTITY_LEN);
        datagram.extend_from_slice(&header.encode());
        for entity in entities.iter().take(header.entity_count as usize) {
            datagram.extend_from_slice(&entity.encode());
        }

        for (_player_id, addr) in &peers {
            if let Some(sim) = &server.config.global_packet_loss {
                if sim.should_drop() {
                    continue;
                }
            }
            if let Err(e) = socket.send_to(&datagram, addr).await {
                log::debug!("udp send to {addr} failed: {e}");
                continue;
            }
            server.note_sent(datagram.len());
        }
    }
    Ok(())
}
