use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph};
use ratatui::Frame;

use crate::net::NetworkClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    MainMenu,
    Connect,
    Connecting,
    Connected,
}

pub fn render(
    frame: &mut Frame,
    screen: Screen,
    selected: usize,
    connect_input: &str,
    connect_error: Option<&str>,
    client: &Option<NetworkClient>,
    fps: f32,
) {
    let area = frame.area();

    let block = Block::default()
        .title(" Dual ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Min(0)])
        .split(area)[0];

    match screen {
        Screen::MainMenu => render_main_menu(frame, inner, selected),
        Screen::Connect => render_connect(frame, inner, connect_input, connect_error),
        Screen::Connecting => render_connecting(frame, inner, client),
        Screen::Connected => render_connected(frame, inner, client, fps),
    }
}

fn render_main_menu(frame: &mut Frame, area: Rect, selected: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);

    let title = r#"
  ____  _   _   _    _
 |  _ \| | | | / \  | |
 | | | | | | |/ _ \ | |
 | |_| | |_| / ___ \| |___
 |____/ \___/_/   \_\_____|
"#;

    let title_widget = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);
    frame.render_widget(title_widget, chunks[0]);

    let menu_items = vec![ListItem::new("  Connect to Server"), ListItem::new("  Quit")];

    let menu_items: Vec<ListItem> = menu_items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if i == selected {
                item.style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            } else {
                item.style(Style::default().fg(Color::White))
            }
        })
        .collect();

    let menu = List::new(menu_items).block(
        Block::default()
            .title(" Menu ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    let menu_area = centered_rect(40, 6, chunks[2]);
    frame.render_widget(menu, menu_area);

    let help = Paragraph::new("\u{2191}\u{2193} Navigate  Enter Select  Q Quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[3]);
}

fn render_connect(frame: &mut Frame, area: Rect, input: &str, error: Option<&str>) {
    let dialog_area = centered_rect(50, 10, area);
    frame.render_widget(Clear, dialog_area);

    let dialog = Block::default()
        .title(" Connect to Server ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(dialog, dialog_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(dialog_area);

    let label = Paragraph::new("Server Address:").style(Style::default().fg(Color::White));
    frame.render_widget(label, inner[0]);

    let input_block = Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Yellow));

    let input_text = Paragraph::new(format!("{}_", input)).style(Style::default().fg(Color::White)).block(input_block);
    frame.render_widget(input_text, inner[1]);

    if let Some(err) = error {
        let error_text = Paragraph::new(err).style(Style::default().fg(Color::Red)).alignment(Alignment::Center);
        frame.render_widget(error_text, inner[2]);
    }

    let help = Paragraph::new("Enter Connect  Esc Cancel")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, inner[3]);
}

fn render_connecting(frame: &mut Frame, area: Rect, client: &Option<NetworkClient>) {
    let dialog_area = centered_rect(40, 8, area);
    frame.render_widget(Clear, dialog_area);

    let dialog = Block::default()
        .title(" Connecting ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(dialog, dialog_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(dialog_area);

    let status = if let Some(client) = client {
        format!("Status: {:?}\n\nPlease wait...", client.state())
    } else {
        "Initializing connection...".to_string()
    };

    let status_text = Paragraph::new(status).style(Style::default().fg(Color::White)).alignment(Alignment::Center);
    frame.render_widget(status_text, inner[0]);

    let help = Paragraph::new("Esc Cancel").style(Style::default().fg(Color::DarkGray)).alignment(Alignment::Center);
    frame.render_widget(help, inner[1]);
}

/// The persistent post-handshake screen: a live read on the client's own
/// predicted state and interpolation buffer health, driven straight from
/// `NetworkClient`'s accessors every frame. There's no separate in-game
/// screen to switch to since this harness has nothing to render but the
/// numbers themselves.
fn render_connected(frame: &mut Frame, area: Rect, client: &Option<NetworkClient>, fps: f32) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0), Constraint::Length(2)])
        .split(area);

    let Some(client) = client else {
        return;
    };

    let stats = client.stats();
    let interp = client.interpolation_stats();
    let pos = client.predicted_position();

    let header_lines = vec![
        Line::from(Span::styled(
            format!("player {} — tick {}", client.player_id(), client.latest_tick()),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("predicted position: ({:.1}, {:.1})  rotation: {:.2} rad", pos.x, pos.y, client.predicted_rotation())),
        Line::from(format!("pending commands: {}", client.pending_command_count())),
        Line::from(format!(
            "messages sent/recv: {}/{}  rtt: {:.0}ms",
            stats.messages_sent, stats.messages_received, stats.rtt_ms
        )),
        Line::from(format!(
            "interpolation buffer: {} snapshots  ready: {}  extrapolating: {}",
            interp.buffer_size, interp.is_ready, interp.is_extrapolating
        )),
        Line::from(format!("frame rate: {:.0} fps", fps)),
    ];
    frame.render_widget(Paragraph::new(header_lines), chunks[0]);

    let side_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let ship_lines: Vec<ListItem> = client
        .interpolation()
        .ships()
        .map(|s| ListItem::new(format!("ship {} @ ({:.0}, {:.0}) rot {:.2}", s.id, s.position.x, s.position.y, s.rotation)))
        .collect();
    frame.render_widget(
        List::new(ship_lines).block(Block::default().title(" Ships ").borders(Borders::ALL)),
        side_chunks[0],
    );

    let player_lines: Vec<ListItem> = client
        .interpolation()
        .players()
        .map(|p| ListItem::new(format!("{} @ ({:.0}, {:.0})", p.name, p.position.x, p.position.y)))
        .collect();
    frame.render_widget(
        List::new(player_lines).block(Block::default().title(" Players ").borders(Borders::ALL)),
        side_chunks[1],
    );

    let help = Paragraph::new("WASD move  \u{2190}\u{2192} turn  F fire  [ ] sails  Esc/Q disconnect")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[2]);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
