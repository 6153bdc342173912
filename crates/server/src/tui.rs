use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

use crate::core::{ClientInfo, ServerStats};
use crate::events::ServerEvent;

pub fn render(frame: &mut Frame, stats: &ServerStats, clients: &[ClientInfo], events: &[ServerEvent]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], stats);
    render_occupancy(frame, chunks[1], stats);
    render_network(frame, chunks[2], stats);
    render_clients(frame, chunks[3], clients, events);
    render_help(frame, chunks[4]);
}

fn render_header(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let uptime = format_duration(stats.uptime_secs);
    let title = format!(" dual-server - Uptime: {} ", uptime);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = format!(
        "Tick: {}  |  Ships: {}  |  Players: {}  |  Projectiles: {}  |  Anomalies: {}",
        stats.tick, stats.ship_count, stats.player_count, stats.projectile_count, stats.numeric_anomalies
    );

    let paragraph = Paragraph::new(text).block(block).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_occupancy(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Sessions ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let ratio = if stats.max_sessions == 0 {
        0.0
    } else {
        stats.connected_sessions as f64 / stats.max_sessions as f64
    };
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.min(1.0))
        .label(format!("{}/{} connected", stats.connected_sessions, stats.max_sessions));

    frame.render_widget(gauge, area);
}

fn render_network(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Network ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let lines = vec![
        Line::from(vec![
            Span::styled("Packets: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} sent / {} recv", stats.packets_sent, stats.packets_received),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Bytes: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} sent / {} recv", format_bytes(stats.bytes_sent), format_bytes(stats.bytes_received)),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_clients(frame: &mut Frame, area: Rect, clients: &[ClientInfo], events: &[ServerEvent]) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let client_block = Block::default()
        .title(" Connected players ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let client_lines: Vec<Line> = clients
        .iter()
        .map(|c| {
            Line::from(format!(
                "#{} {} ({}) - {}s",
                c.player_id, c.player_name, c.addr, c.connected_secs
            ))
        })
        .collect();
    frame.render_widget(Paragraph::new(client_lines).block(client_block), columns[0]);

    let event_block = Block::default()
        .title(" Recent events ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    let event_lines: Vec<Line> = events.iter().rev().take(20).map(event_line).collect();
    frame.render_widget(Paragraph::new(event_lines).block(event_block), columns[1]);
}

fn event_line(event: &ServerEvent) -> Line<'static> {
    match event {
        ServerEvent::SessionConnecting { addr } => Line::from(format!("connecting from {addr}")),
        ServerEvent::SessionConnected { player_id, player_name, addr, reconnected } => {
            let verb = if *reconnected { "reconnected" } else { "connected" };
            Line::from(format!("#{player_id} {player_name} {verb} from {addr}"))
        }
        ServerEvent::SessionDisconnected { player_id, reason } => {
            Line::from(format!("#{player_id} {}", reason.as_str()))
        }
        ServerEvent::ConnectionDenied { addr, reason } => Line::from(format!("denied {addr}: {reason}")),
        ServerEvent::Error { message } => Line::from(format!("error: {message}")),
    }
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("Press 'q' or ESC to quit")
        .block(block)
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));

    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
