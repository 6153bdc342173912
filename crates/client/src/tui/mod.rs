mod screens;

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::debug::DebugStats;
use crate::net::{ClientConfig, ConnectionState, InputState, NetworkClient};

pub use screens::Screen;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    None,
    Quit,
    Connect(String),
    Disconnect,
    ChangeScreen(Screen),
}

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    screen: Screen,
    client: Option<NetworkClient>,
    connect_input: String,
    connect_error: Option<String>,
    selected_index: usize,
    should_quit: bool,
    input: InputState,
    last_frame: Instant,
    debug_stats: DebugStats,
}

impl Tui {
    pub fn new(server: Option<String>) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let mut tui = Self {
            terminal,
            screen: Screen::MainMenu,
            client: None,
            connect_input: String::from("127.0.0.1:8082"),
            connect_error: None,
            selected_index: 0,
            should_quit: false,
            input: InputState::default(),
            last_frame: Instant::now(),
            debug_stats: DebugStats::new(),
        };

        if let Some(addr) = server {
            tui.connect_input = addr.clone();
            tui.connect_to_server(&addr);
        }

        Ok(tui)
    }

    pub fn run(&mut self) -> io::Result<()> {
        while !self.should_quit {
            let dt = self.last_frame.elapsed().as_secs_f32();
            self.last_frame = Instant::now();
            self.debug_stats.record_frame(dt);

            if let Some(client) = &mut self.client {
                client.update(dt, &self.input);
                if client.is_connected() && self.screen == Screen::Connecting {
                    self.screen = Screen::Connected;
                }
                if client.state() == ConnectionState::Disconnected && self.screen != Screen::MainMenu {
                    self.connect_error = client.deny_reason().or_else(|| Some("disconnected".to_string()));
                    self.client = None;
                    self.screen = Screen::MainMenu;
                }
            }

            self.draw()?;

            if event::poll(Duration::from_millis(33))? {
                if let Event::Key(key) = event::read()? {
                    let action = match key.kind {
                        KeyEventKind::Press => self.handle_key(key.code, key.modifiers),
                        KeyEventKind::Release => {
                            self.handle_key_release(key.code);
                            Action::None
                        }
                        KeyEventKind::Repeat => Action::None,
                    };
                    self.process_action(action);
                }
            }
        }

        Ok(())
    }

    fn draw(&mut self) -> io::Result<()> {
        let screen = self.screen;
        let selected = self.selected_index;
        let connect_input = self.connect_input.clone();
        let connect_error = self.connect_error.clone();
        let client = &self.client;
        let fps = self.debug_stats.fps();

        self.terminal.draw(|frame| {
            screens::render(frame, screen, selected, &connect_input, connect_error.as_deref(), client, fps);
        })?;

        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Action {
        if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
            return Action::Quit;
        }

        match self.screen {
            Screen::MainMenu => self.handle_main_menu_key(code),
            Screen::Connect => self.handle_connect_key(code),
            Screen::Connecting => self.handle_connecting_key(code),
            Screen::Connected => self.handle_connected_key(code),
        }
    }

    fn handle_main_menu_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_index = self.selected_index.saturating_sub(1);
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_index = (self.selected_index + 1).min(1);
                Action::None
            }
            KeyCode::Enter => match self.selected_index {
                0 => Action::ChangeScreen(Screen::Connect),
                1 => Action::Quit,
                _ => Action::None,
            },
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            _ => Action::None,
        }
    }

    fn handle_connect_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Esc => {
                self.connect_error = None;
                Action::ChangeScreen(Screen::MainMenu)
            }
            KeyCode::Enter => {
                self.connect_error = None;
                Action::Connect(self.connect_input.clone())
            }
            KeyCode::Backspace => {
                self.connect_input.pop();
                Action::None
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || c == '.' || c == ':' {
                    self.connect_input.push(c);
                }
                Action::None
            }
            _ => Action::None,
        }
    }

    fn handle_connecting_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Esc => Action::Disconnect,
            _ => Action::None,
        }
    }

    fn handle_connected_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => Action::Disconnect,
            KeyCode::Char('w') => {
                self.input.move_direction.y = 1.0;
                self.input.is_moving = true;
                Action::None
            }
            KeyCode::Char('s') => {
                self.input.move_direction.y = -1.0;
                self.input.is_moving = true;
                Action::None
            }
            KeyCode::Char('a') => {
                self.input.move_direction.x = -1.0;
                self.input.is_moving = true;
                Action::None
            }
            KeyCode::Char('d') => {
                self.input.move_direction.x = 1.0;
                self.input.is_moving = true;
                Action::None
            }
            KeyCode::Left => {
                self.input.rotation -= 0.1;
                Action::None
            }
            KeyCode::Right => {
                self.input.rotation += 0.1;
                Action::None
            }
            KeyCode::Char('[') => {
                self.input.sail_openness = (self.input.sail_openness - 10.0).max(0.0);
                Action::None
            }
            KeyCode::Char(']') => {
                self.input.sail_openness = (self.input.sail_openness + 10.0).min(100.0);
                Action::None
            }
            KeyCode::Char('f') => {
                self.input.fire = true;
                Action::None
            }
            _ => Action::None,
        }
    }

    /// Crossterm only reports key-release events when the terminal's
    /// kitty/enhanced keyboard protocol is active; without it, movement
    /// keys behave as one-shot taps rather than held keys. Good enough for
    /// exercising prediction/rollback manually.
    fn handle_key_release(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('w') | KeyCode::Char('s') => {
                self.input.move_direction.y = 0.0;
                self.input.is_moving = self.input.move_direction != glam::Vec2::ZERO;
            }
            KeyCode::Char('a') | KeyCode::Char('d') => {
                self.input.move_direction.x = 0.0;
                self.input.is_moving = self.input.move_direction != glam::Vec2::ZERO;
            }
            KeyCode::Char('f') => self.input.fire = false,
            _ => {}
        }
    }

    fn process_action(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Quit => self.should_quit = true,
            Action::Connect(addr) => self.connect_to_server(&addr),
            Action::Disconnect => {
                if let Some(client) = &mut self.client {
                    client.disconnect();
                }
                self.client = None;
                self.input = InputState::default();
                self.screen = Screen::MainMenu;
                self.selected_index = 0;
            }
            Action::ChangeScreen(screen) => {
                self.screen = screen;
                self.selected_index = 0;
            }
        }
    }

    fn connect_to_server(&mut self, addr: &str) {
        let mut client = NetworkClient::new(ClientConfig::default(), "sailor".to_string());
        client.connect(addr);
        self.client = Some(client);
        self.screen = Screen::Connecting;
    }

    pub fn restore_terminal(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

pub fn run(server: Option<String>) -> io::Result<()> {
    let mut tui = Tui::new(server)?;
    let result = tui.run();
    tui.restore_terminal()?;
    result
}
