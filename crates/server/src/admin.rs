//! Read-only admin HTTP surface: a minimal line-based HTTP/1.1 responder,
//! not a web framework, since the contract is "status JSON on a handful of
//! fixed paths" rather than general routing.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::core::GameServer;

pub async fn run(server: Arc<GameServer>) -> anyhow::Result<()> {
    let addr = (server.config.bind, server.config.admin_port);
    let listener = TcpListener::bind(addr).await?;
    log::info!("admin HTTP listening on {}", listener.local_addr()?);

    while server.running.load(Ordering::SeqCst) {
        let (stream, _peer) = listener.accept().await?;
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = handle_request(server, stream).await {
                log::debug!("admin request failed: {e}");
            }
        });
    }
    Ok(())
}

async fn handle_request(server: Arc<GameServer>, stream: TcpStream) -> anyhow::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();

    // Drain headers; none of these endpoints need them.
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }

    let body = match path.as_str() {
        "/api/status" => serde_json::to_string(&status_body(&server))?,
        "/api/map" => serde_json::to_string(&map_body(&server))?,
        "/api/messages" => serde_json::to_string(&messages_body(&server))?,
        "/api/physics" => serde_json::to_string(&physics_body(&server))?,
        "/api/network" => serde_json::to_string(&network_body(&server))?,
        "/api/performance" => serde_json::to_string(&performance_body(&server))?,
        _ => {
            let mut stream = reader.into_inner();
            write_response(&mut stream, 404, "not found").await?;
            return Ok(());
        }
    };

    let mut stream = reader.into_inner();
    write_response(&mut stream, 200, &body).await
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> anyhow::Result<()> {
    let status_text = if status == 200 { "OK" } else { "Not Found" };
    let response = format!(
        "HTTP/1.1 {status} {status_text}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

#[derive(Serialize)]
struct StatusBody {
    tick: u32,
    connected_sessions: usize,
    max_sessions: usize,
    uptime_secs: u64,
}

fn status_body(server: &GameServer) -> StatusBody {
    let stats = server.stats();
    StatusBody {
        tick: stats.tick,
        connected_sessions: stats.connected_sessions,
        max_sessions: stats.max_sessions,
        uptime_secs: stats.uptime_secs,
    }
}

#[derive(Serialize)]
struct MapBody {
    world_bounds: f32,
    ship_count: usize,
}

fn map_body(server: &GameServer) -> MapBody {
    let stats = server.stats();
    MapBody { world_bounds: server.config.world_bounds, ship_count: stats.ship_count }
}

#[derive(Serialize)]
struct ClientSummary {
    player_id: u32,
    player_name: String,
    addr: String,
    connected_secs: u64,
}

#[derive(Serialize)]
struct MessagesBody {
    clients: Vec<ClientSummary>,
}

fn messages_body(server: &GameServer) -> MessagesBody {
    MessagesBody {
        clients: server
            .client_infos()
            .into_iter()
            .map(|c| ClientSummary {
                player_id: c.player_id,
                player_name: c.player_name,
                addr: c.addr,
                connected_secs: c.connected_secs,
            })
            .collect(),
    }
}

#[derive(Serialize)]
struct PhysicsBody {
    tick_rate: u32,
    player_count: usize,
    projectile_count: usize,
    numeric_anomalies: u64,
}

fn physics_body(server: &GameServer) -> PhysicsBody {
    let stats = server.stats();
    PhysicsBody {
        tick_rate: server.config.tick_rate,
        player_count: stats.player_count,
        projectile_count: stats.projectile_count,
        numeric_anomalies: stats.numeric_anomalies,
    }
}

#[derive(Serialize)]
struct NetworkBody {
    packets_sent: u64,
    packets_received: u64,
    bytes_sent: u64,
    bytes_received: u64,
}

fn network_body(server: &GameServer) -> NetworkBody {
    let stats = server.stats();
    NetworkBody {
        packets_sent: stats.packets_sent,
        packets_received: stats.packets_received,
        bytes_sent: stats.bytes_sent,
        bytes_received: stats.bytes_received,
    }
}

#[derive(Serialize)]
struct PerformanceBody {
    tick: u32,
    uptime_secs: u64,
    numeric_anomalies: u64,
}

fn performance_body(server: &GameServer) -> PerformanceBody {
    let stats = server.stats();
    PerformanceBody { tick: stats.tick, uptime_secs: stats.uptime_secs, numeric_anomalies: stats.numeric_anomalies }
}
