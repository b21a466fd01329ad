use std::io::{self, Stdout};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context as _;
use beeper_core::event::StopSource;
use beeper_core::indicator::{Importance, IndicatorError, Notice, PresenceIndicator};
use beeper_core::log_buffer::LogLevel;
use chrono::{DateTime, FixedOffset};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use crate::AppEvent;
use crate::log_capture::{recent_log_entries, render_line};

type PanelTerminal = Terminal<CrosstermBackend<Stdout>>;

// Extension trait for rendering log levels
trait LevelExt {
    fn color(&self) -> Color;
}

impl LevelExt for LogLevel {
    fn color(&self) -> Color {
        match *self {
            LogLevel::Error => Color::Red,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Info => Color::Cyan,
            LogLevel::Debug => Color::Gray,
            LogLevel::Trace => Color::DarkGray,
        }
    }
}

enum PanelMessage {
    Notice(Option<Notice>),
    Status {
        running: bool,
        next: Option<DateTime<FixedOffset>>,
    },
    Prompt(Option<String>),
    Shutdown,
}

struct PanelState {
    rx: Receiver<PanelMessage>,
    notice: Option<Notice>,
    running: bool,
    next: Option<DateTime<FixedOffset>>,
    prompt: Option<String>,
    should_quit: bool,
}

impl PanelState {
    fn new(rx: Receiver<PanelMessage>) -> Self {
        Self {
            rx,
            notice: None,
            running: false,
            next: None,
            prompt: None,
            should_quit: false,
        }
    }

    fn collect_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                PanelMessage::Notice(notice) => self.notice = notice,
                PanelMessage::Status { running, next } => {
                    self.running = running;
                    self.next = next;
                }
                PanelMessage::Prompt(prompt) => self.prompt = prompt,
                PanelMessage::Shutdown => self.should_quit = true,
            }
        }
    }

    /// Map a key to the event it stands for.
    fn key_event(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<AppEvent> {
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(AppEvent::Quit),
            KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Quit),
            KeyCode::Char('s') => Some(AppEvent::Start),
            KeyCode::Char('x') => Some(AppEvent::Stop(StopSource::User)),
            KeyCode::Char('k') if self.notice.is_some() => Some(AppEvent::Stop(StopSource::Indicator)),
            _ => None,
        }
    }
}

/// Presence indicator drawn as a panel in the terminal.
pub struct TerminalIndicator {
    tx: Sender<PanelMessage>,
}

impl PresenceIndicator for TerminalIndicator {
    fn show(&mut self, notice: &Notice) -> Result<(), IndicatorError> {
        self.tx
            .send(PanelMessage::Notice(Some(notice.clone())))
            .map_err(|_| IndicatorError::Unavailable)
    }

    fn dismiss(&mut self) {
        let _ = self.tx.send(PanelMessage::Notice(None));
    }
}

/// Handle to the terminal UI thread: status label, start/stop controls, the
/// presence notice and the log pane.
pub struct StatusPanel {
    tx: Sender<PanelMessage>,
    thread: Option<JoinHandle<()>>,
}

impl StatusPanel {
    pub fn spawn(events: Sender<AppEvent>) -> anyhow::Result<Self> {
        let terminal = enter_terminal().context("could not take over the terminal")?;
        let (tx, rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("status-panel".to_string())
            .spawn(move || {
                let mut terminal = terminal;
                if let Err(e) = run_panel(&mut terminal, PanelState::new(rx), &events) {
                    log::error!("status panel failed: {}", e);
                }
                if let Err(e) = leave_terminal(&mut terminal) {
                    log::error!("could not restore terminal: {}", e);
                }
                let _ = events.send(AppEvent::Quit);
            })
            .context("could not spawn status panel thread")?;

        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    pub fn indicator(&self) -> TerminalIndicator {
        TerminalIndicator {
            tx: self.tx.clone(),
        }
    }

    pub fn set_status(&self, running: bool, next: Option<DateTime<FixedOffset>>) {
        let _ = self.tx.send(PanelMessage::Status { running, next });
    }

    pub fn prompt(&self, text: Option<&str>) {
        let _ = self.tx.send(PanelMessage::Prompt(text.map(str::to_string)));
    }

    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.tx.send(PanelMessage::Shutdown);
            if thread.join().is_err() {
                log::warn!("status panel thread panicked");
            }
        }
    }
}

impl Drop for StatusPanel {
    fn drop(&mut self) {
        self.stop_thread();
    }
}

fn enter_terminal() -> io::Result<PanelTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e);
    }
    Terminal::new(CrosstermBackend::new(stdout))
}

fn leave_terminal(terminal: &mut PanelTerminal) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

fn run_panel(terminal: &mut PanelTerminal, mut state: PanelState, events: &Sender<AppEvent>) -> io::Result<()> {
    loop {
        state.collect_messages();
        if state.should_quit {
            return Ok(());
        }

        terminal.draw(|f| ui(f, &state))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if let Some(app_event) = state.key_event(key.code, key.modifiers) {
            if events.send(app_event).is_err() || app_event == AppEvent::Quit {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, state: &PanelState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(5), // Notice
            Constraint::Length(4), // Status
            Constraint::Min(5),    // Logs
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    let title = Paragraph::new("Minute Beeper")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_notice(f, chunks[1], state);
    render_status(f, chunks[2], state);
    render_logs(f, chunks[3]);

    let help = Paragraph::new("S: Start | X: Stop | K: notice STOP | Q/ESC/Ctrl+C: Quit")
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[4]);
}

fn render_notice(f: &mut Frame, area: Rect, state: &PanelState) {
    let Some(notice) = &state.notice else {
        let idle = Paragraph::new("No active notice")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Notice"));
        f.render_widget(idle, area);
        return;
    };

    let border = match notice.importance {
        Importance::Low => Color::Gray,
        Importance::Default => Color::White,
        Importance::High => Color::Yellow,
    };
    let lines = vec![
        Line::from(Span::styled(notice.title, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(notice.body),
        Line::from(vec![
            Span::styled(
                format!("[K] {}", notice.stop_label),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
        ]),
    ];
    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(notice.channel_name),
    );
    f.render_widget(panel, area);
}

fn render_status(f: &mut Frame, area: Rect, state: &PanelState) {
    let (label, color) = if state.running {
        ("Status: ACTIVE", Color::Green)
    } else {
        ("Status: STOPPED", Color::Red)
    };

    let next = match (state.running, state.next) {
        (_, Some(due)) => Span::raw(format!("Next beep: {}", due.format("%H:%M:%S"))),
        (true, None) => Span::styled("Next beep: not scheduled", Style::default().fg(Color::Yellow)),
        (false, None) => Span::styled("Next beep: -", Style::default().fg(Color::DarkGray)),
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw("   "),
        next,
    ])];
    if let Some(prompt) = &state.prompt {
        lines.push(Line::from(Span::styled(prompt.clone(), Style::default().fg(Color::Yellow))));
    }

    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}

fn render_logs(f: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Log");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let items: Vec<ListItem> = recent_log_entries(inner.height as usize)
        .into_iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(render_line(&entry), Style::default().fg(entry.level.color())),
                Span::raw(" "),
                Span::raw(entry.message.to_string()),
            ]))
        })
        .collect();

    f.render_widget(List::new(items), inner);
}
