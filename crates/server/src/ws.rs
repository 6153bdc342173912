//! Text/JSON transport: one `tokio-tungstenite` WebSocket connection per
//! session, matching §5's "one I/O task per session" model. Each connection
//! task only ever talks to `GameServer`'s public queueing API; it never
//! touches `WorldState` directly.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use dual::net::{ClientMessage, HandshakeStatus, ServerMessage, PROTOCOL_VERSION};
use dual::HybridInput;

use crate::core::{unix_ms, GameServer};
use crate::events::{DisconnectReason, ServerEvent};

type WsWrite = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>;

pub async fn run(server: Arc<GameServer>) -> anyhow::Result<()> {
    let addr = (server.config.bind, server.config.ws_port);
    let listener = TcpListener::bind(addr).await?;
    log::info!("WebSocket listening on {}", listener.local_addr()?);

    while server.running.load(Ordering::SeqCst) {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted?;
                let server = Arc::clone(&server);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(server, stream, peer_addr).await {
                        log::debug!("ws session {peer_addr} ended: {e}");
                    }
                });
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
        }
    }
    Ok(())
}

async fn send_json(write: &mut WsWrite, server: &GameServer, msg: &ServerMessage) -> anyhow::Result<()> {
    let text = serde_json::to_string(msg)?;
    server.note_sent(text.len());
    write.send(Message::Text(text.into())).await?;
    Ok(())
}

async fn handle_connection(server: Arc<GameServer>, stream: TcpStream, addr: SocketAddr) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut write, mut read) = ws.split();

    let mut player_id = match server.accept_session(addr) {
        Ok(id) => id,
        Err(reason) => {
            let resp = ServerMessage::HandshakeResponse {
                player_id: 0,
                player_name: String::new(),
                server_time: unix_ms(),
                status: HandshakeStatus::Error,
                message: Some(reason.to_string()),
            };
            let _ = send_json(&mut write, &server, &resp).await;
            server.push_event(ServerEvent::ConnectionDenied { addr, reason: reason.to_string() });
            return Ok(());
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut handshaked = false;

    loop {
        tokio::select! {
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        server.note_received(text.len());
                        if !handle_text_message(&server, &mut write, &text, &mut handshaked, &mut player_id, addr, &tx).await? {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("ws read error from {addr}: {e}");
                        break;
                    }
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Some(msg) => send_json(&mut write, &server, &msg).await?,
                    None => break,
                }
            }
        }
    }

    server.disconnect_session(
        player_id,
        if handshaked { DisconnectReason::Graceful } else { DisconnectReason::HandshakeTimeout },
    );
    Ok(())
}

/// Returns `false` when the connection should close.
#[allow(clippy::too_many_arguments)]
async fn handle_text_message(
    server: &Arc<GameServer>,
    write: &mut WsWrite,
    text: &str,
    handshaked: &mut bool,
    player_id: &mut u32,
    addr: SocketAddr,
    outbox: &mpsc::UnboundedSender<ServerMessage>,
) -> anyhow::Result<bool> {
    let Ok(msg) = serde_json::from_str::<ClientMessage>(text) else {
        // Unrecognized/malformed message: counted, no disconnect.
        return Ok(true);
    };

    if !*handshaked {
        let ClientMessage::Handshake { player_name, protocol_version, .. } = msg else {
            return Ok(true);
        };
        if protocol_version != PROTOCOL_VERSION as u32 {
            let resp = ServerMessage::HandshakeResponse {
                player_id: 0,
                player_name,
                server_time: unix_ms(),
                status: HandshakeStatus::Error,
                message: Some("unsupported protocol version".into()),
            };
            send_json(write, server, &resp).await?;
            return Ok(false);
        }

        let (resolved_id, status) = server.handshake(*player_id, addr, player_name.clone());
        *player_id = resolved_id;
        *handshaked = true;
        server.register_ws_outbox(resolved_id, outbox.clone());

        let resp = ServerMessage::HandshakeResponse {
            player_id: resolved_id,
            player_name,
            server_time: unix_ms(),
            status,
            message: None,
        };
        send_json(write, server, &resp).await?;
        return Ok(true);
    }

    if matches!(msg, ClientMessage::Ping {}) {
        let resp = ServerMessage::Pong { timestamp: unix_ms(), server_time: unix_ms() };
        send_json(write, server, &resp).await?;
        return Ok(true);
    }

    server.touch_session(*player_id);
    if let Some(input) = client_message_to_input(msg) {
        server.submit_input(*player_id, input);
    }
    Ok(true)
}

fn client_message_to_input(msg: ClientMessage) -> Option<HybridInput> {
    match msg {
        ClientMessage::MovementState { movement, is_moving } => {
            Some(HybridInput::MovementState { direction: movement.into(), is_moving })
        }
        ClientMessage::RotationUpdate { rotation } => Some(HybridInput::RotationUpdate { rotation }),
        ClientMessage::ActionEvent { action, target } => Some(HybridInput::Action { action, target }),
        ClientMessage::ShipSailControl { desired_openness } => {
            Some(HybridInput::ShipSailControl { desired_openness_percent: desired_openness })
        }
        ClientMessage::ShipRudderControl { turning_left, turning_right } => {
            Some(HybridInput::ShipRudderControl { turning_left, turning_right })
        }
        ClientMessage::ShipSailAngleControl { desired_angle } => {
            Some(HybridInput::ShipSailAngleControl { desired_angle_radians: desired_angle })
        }
        ClientMessage::CannonAim { aim_angle } => Some(HybridInput::CannonAim { aim_angle }),
        ClientMessage::CannonFire { fire_all, cannon_ids } => {
            Some(HybridInput::CannonFire { fire_all, cannon_ids: cannon_ids.unwrap_or_default() })
        }
        ClientMessage::Handshake { .. } | ClientMessage::Ping {} => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::AtomicU16;

    use tokio::time::timeout;

    use crate::config::ServerConfig;

    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18000);

    fn next_port() -> u16 {
        PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    async fn connect(port: u16) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>> {
        let url = format!("ws://127.0.0.1:{port}/");
        for _ in 0..50 {
            if let Ok((ws, _)) = tokio_tungstenite::connect_async(&url).await {
                return ws;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("could not connect to test server on port {port}");
    }

    /// Scenario 1: handshake and spawn. A client that sends `handshake` is
    /// told it's connected within 50ms and shows up SWIMMING in the next
    /// game-state snapshot.
    #[tokio::test]
    async fn handshake_spawns_player_swimming_within_50ms() {
        let port = next_port();
        let mut config = ServerConfig::default();
        config.bind = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.ws_port = port;

        let server = GameServer::new(config);
        let ws_server = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = run(ws_server).await;
        });

        let mut socket = connect(port).await;

        let handshake = serde_json::json!({
            "type": "handshake",
            "player_name": "Alice",
            "protocol_version": dual::net::PROTOCOL_VERSION,
            "timestamp": 0,
        });
        socket.send(Message::Text(handshake.to_string().into())).await.unwrap();

        let response = timeout(Duration::from_millis(50), socket.next())
            .await
            .expect("handshake_response did not arrive within 50ms")
            .expect("socket closed before responding")
            .unwrap();
        let Message::Text(text) = response else {
            panic!("expected a text frame, got {response:?}");
        };
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["type"], "handshake_response");
        assert_eq!(parsed["status"], "connected");
        let player_id = parsed["player_id"].as_u64().unwrap() as u32;
        assert!(player_id > 0);

        let snapshot = server.tick_once().or_else(|| server.tick_once()).expect("no snapshot produced");
        let spawned = snapshot
            .players
            .iter()
            .find(|p| p.id == player_id)
            .expect("handshaked player missing from game state");
        assert_eq!(spawned.state, dual::net::MovementStateLabel::Swimming);

        server.shutdown();
    }
}
