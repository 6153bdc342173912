use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::Duration;

use dual::net::{
    BinaryEntity, BinaryHeader, BinaryInput, NetworkEndpoint, PacketType, BINARY_ENTITY_LEN,
    BINARY_HEADER_LEN, PROTOCOL_VERSION,
};
use glam::Vec2;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(41000);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(10, Ordering::SeqCst)
}

fn wait_for_datagram(
    endpoint: &mut NetworkEndpoint,
    timeout_ms: u64,
) -> Option<Vec<(Vec<u8>, SocketAddr)>> {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        let received = endpoint.receive().unwrap();
        if !received.is_empty() {
            return Some(received);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

/// Exercises the real `NetworkEndpoint` over loopback UDP with a
/// header-plus-entity snapshot datagram, round-tripping through the
/// quantized `BinaryEntity` encoding the binary fast lane actually uses.
#[test]
fn snapshot_datagram_round_trips_through_real_sockets() {
    let server_port = next_port();
    let client_port = server_port + 1;
    let server_addr: SocketAddr = format!("127.0.0.1:{server_port}").parse().unwrap();
    let client_addr: SocketAddr = format!("127.0.0.1:{client_port}").parse().unwrap();

    let mut server = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client = NetworkEndpoint::bind(client_addr).unwrap();

    let header = BinaryHeader {
        packet_type: PacketType::ServerSnapshot as u8,
        version: PROTOCOL_VERSION,
        server_time_ms: 12_345,
        base_id: 0,
        snap_id: 7,
        aoi_cell: 0,
        entity_count: 1,
        flags: 0,
    };
    let entity = BinaryEntity {
        entity_id: 1000,
        position: Vec2::new(100.0, -50.0),
        velocity: Vec2::new(1.5, 0.0),
        rotation: 0.75,
        state_flags: 0,
    };

    let mut datagram = Vec::with_capacity(BINARY_HEADER_LEN + BINARY_ENTITY_LEN);
    datagram.extend_from_slice(&header.encode());
    datagram.extend_from_slice(&entity.encode());

    server.send_to(&datagram, client_addr).unwrap();

    let received = wait_for_datagram(&mut client, 200).expect("no datagram received");
    assert_eq!(received.len(), 1);
    let (bytes, from) = &received[0];
    assert_eq!(*from, server_addr);

    let decoded_header = BinaryHeader::decode(bytes).unwrap();
    assert_eq!(decoded_header.packet_type, PacketType::ServerSnapshot as u8);
    assert_eq!(decoded_header.snap_id, 7);
    assert_eq!(decoded_header.entity_count, 1);

    let decoded_entity = BinaryEntity::decode(&bytes[BINARY_HEADER_LEN..]).unwrap();
    assert_eq!(decoded_entity.entity_id, 1000);
    assert!((decoded_entity.position.x - 100.0).abs() < 1.0 / 8.0);
    assert!((decoded_entity.rotation - 0.75).abs() < std::f32::consts::PI / 1024.0);

    assert_eq!(client.stats().packets_received, 1);
    assert_eq!(server.stats().packets_sent, 1);
}

#[test]
fn client_input_packet_checksum_detects_corruption() {
    let input = BinaryInput {
        sequence: 42,
        dt_ms: 33,
        thrust: 1.0,
        turn: -0.5,
        actions: 0,
        client_time_ms: 9_000,
    };
    let mut bytes = input.encode();
    assert!(BinaryInput::decode(&bytes).is_ok());

    bytes[6] ^= 0xFF;
    assert!(BinaryInput::decode(&bytes).is_err());
}
