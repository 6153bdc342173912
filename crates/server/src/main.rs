mod admin;
mod cadence;
mod config;
mod core;
mod events;
mod snapshot;
mod tui;
mod udp;
mod ws;

use std::collections::VecDeque;
use std::io;
use std::net::IpAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use config::ServerConfig;
use core::GameServer;
use dual::PacketLossSimulation;

const EVENT_LOG_CAPACITY: usize = 200;

#[derive(Parser)]
#[command(name = "dual-server")]
#[command(about = "Authoritative sailing-ship simulation server")]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(long, default_value_t = dual::net::DEFAULT_PORT)]
    game_port: u16,

    #[arg(long, default_value_t = 8082)]
    ws_port: u16,

    #[arg(long, default_value_t = 8081)]
    admin_port: u16,

    #[arg(long, default_value_t = dual::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = dual::net::MAX_SESSIONS)]
    max_sessions: usize,

    #[arg(long)]
    headless: bool,

    #[arg(long, help = "Enable global packet loss simulation")]
    simulate_packet_loss: bool,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,

    #[arg(long, default_value_t = 0, help = "Minimum latency in ms")]
    min_latency: u32,

    #[arg(long, default_value_t = 0, help = "Maximum latency in ms")]
    max_latency: u32,

    #[arg(long, default_value_t = 0, help = "Jitter in ms")]
    jitter: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let global_packet_loss = if args.simulate_packet_loss {
        Some(PacketLossSimulation {
            enabled: true,
            loss_percent: args.loss_percent,
            min_latency_ms: args.min_latency,
            max_latency_ms: args.max_latency,
            jitter_ms: args.jitter,
        })
    } else {
        None
    };

    let bind: IpAddr = args.bind.parse()?;
    let config = ServerConfig {
        bind,
        game_port: args.game_port,
        ws_port: args.ws_port,
        admin_port: args.admin_port,
        max_sessions: args.max_sessions,
        tick_rate: args.tick_rate,
        global_packet_loss,
        ..Default::default()
    };

    let headless = args.headless;
    let server = GameServer::new(config);

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    let ws_server = Arc::clone(&server);
    rt.spawn(async move {
        if let Err(e) = ws::run(ws_server).await {
            log::error!("ws listener exited: {e}");
        }
    });

    let udp_server = Arc::clone(&server);
    rt.spawn(async move {
        if let Err(e) = udp::run(udp_server).await {
            log::error!("udp listener exited: {e}");
        }
    });

    let admin_server = Arc::clone(&server);
    rt.spawn(async move {
        if let Err(e) = admin::run(admin_server).await {
            log::error!("admin listener exited: {e}");
        }
    });

    let tick_server = Arc::clone(&server);
    rt.spawn(async move { sim_tick_loop(tick_server).await });

    if headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        log::info!(
            "Server started: game={}:{} ws={}:{} admin={}:{}",
            server.config.bind,
            server.config.game_port,
            server.config.bind,
            server.config.ws_port,
            server.config.bind,
            server.config.admin_port
        );
        rt.block_on(async move {
            let _ = tokio::signal::ctrl_c().await;
        });
        server.shutdown();
        log::info!("Server shutting down");
    } else {
        run_with_tui(&rt, &server)?;
    }

    Ok(())
}

/// Owns `WorldState` exclusively: advances the simulation on a fixed timer
/// and, when the adaptive cadence schedule calls for it, broadcasts a
/// snapshot to every connected session over both transports.
async fn sim_tick_loop(server: Arc<GameServer>) {
    let period = Duration::from_secs_f64(1.0 / server.config.tick_rate as f64);
    let mut ticker = tokio::time::interval(period);

    while server.running.load(Ordering::SeqCst) {
        ticker.tick().await;
        let Some(snapshot) = server.tick_once() else {
            continue;
        };

        let ws_msg = dual::net::ServerMessage::GameState(Box::new(snapshot));
        for (_player_id, tx) in server.ws_outbox_snapshot() {
            let _ = tx.send(ws_msg.clone());
        }
    }
}

fn run_with_tui(rt: &tokio::runtime::Runtime, server: &Arc<GameServer>) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut event_log = VecDeque::with_capacity(EVENT_LOG_CAPACITY);
    let running = Arc::clone(&server.running);

    while running.load(Ordering::SeqCst) {
        for event in server.drain_events() {
            event_log.push_back(event);
            if event_log.len() > EVENT_LOG_CAPACITY {
                event_log.pop_front();
            }
        }

        if event::poll(Duration::from_millis(33))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    running.store(false, Ordering::SeqCst);
                }
            }
        }

        let stats = server.stats();
        let clients = server.client_infos();
        let events: Vec<_> = event_log.iter().cloned().collect();
        terminal.draw(|frame| {
            tui::render(frame, &stats, &clients, &events);
        })?;
    }

    server.shutdown();
    rt.shutdown_timeout(Duration::from_secs(2));

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
