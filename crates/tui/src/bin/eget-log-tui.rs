use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor::Show, execute};
use ratatui::backend::{Backend, CrosstermBackend, TestBackend};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Terminal;

use eget_log::{LogEntry, LogStore};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "eget-log-tui",
    version,
    about = "Interactive viewer for the eget operation log"
)]
struct Args {
    /// Log file to view. Overrides EGET_LOG_FILE and the platform default.
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Follow new lines appended to the log
    #[arg(long, default_value_t = false)]
    follow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Filter,
}

struct App {
    store: LogStore,
    entries: Vec<LogEntry>,
    /// Index into the visible (filtered, newest-first) rows.
    selected: usize,
    filter: String,
    mode: Mode,
    follow: bool,
    last_size: u64,
    help: bool,
}

impl App {
    fn new(store: LogStore, follow: bool) -> Self {
        Self {
            store,
            entries: Vec::new(),
            selected: 0,
            filter: String::new(),
            mode: Mode::Browse,
            follow,
            last_size: 0,
            help: false,
        }
    }

    /// Reads the whole log. A file that does not exist yet loads as empty.
    ///
    /// Entries and the follow offset come out of the same byte buffer, so a
    /// line appended while we read is either parsed now or picked up by the
    /// next poll, never dropped in between.
    fn load_initial(&mut self) -> Result<()> {
        let bytes = match fs::read(self.store.path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read log: {}", self.store.path().display()))
            }
        };
        self.entries = parse_lines(&bytes);
        self.last_size = bytes.len() as u64;
        self.clamp_selection();
        Ok(())
    }

    /// Picks up lines appended since the last observed size. A torn final
    /// line fails to parse and is dropped, same as on a full read.
    fn poll_updates(&mut self) {
        if !self.follow {
            return;
        }
        let Ok(meta) = fs::metadata(self.store.path()) else {
            return;
        };
        if meta.len() <= self.last_size {
            return;
        }
        if let Ok(mut f) = File::open(self.store.path()) {
            if f.seek(SeekFrom::Start(self.last_size)).is_ok() {
                let mut tail = Vec::new();
                if f.read_to_end(&mut tail).is_ok() {
                    self.entries.extend(parse_lines(&tail));
                    self.last_size += tail.len() as u64;
                }
            }
        }
    }

    /// Indices of the rows that pass the filter, newest first.
    fn visible(&self) -> Vec<usize> {
        let needle = self.filter.to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, entry)| needle.is_empty() || matches_filter(entry, &needle))
            .map(|(idx, _)| idx)
            .collect()
    }

    fn clamp_selection(&mut self) {
        let visible = self.visible().len();
        if self.selected >= visible {
            self.selected = visible.saturating_sub(1);
        }
    }

    fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn select_next(&mut self) {
        let visible = self.visible().len();
        self.selected = self.selected.saturating_add(1).min(visible.saturating_sub(1));
    }

    fn select_first(&mut self) {
        self.selected = 0;
    }

    fn select_last(&mut self) {
        self.selected = self.visible().len().saturating_sub(1);
    }

    fn status_line(&self) -> String {
        if self.mode == Mode::Filter {
            return format!("filter: {}_", self.filter);
        }
        let shown = self.visible().len();
        let mut status = format!("{} of {} entries", shown, self.entries.len());
        if !self.filter.is_empty() {
            status.push_str(&format!(" | filter: {}", self.filter));
        }
        status.push_str(&format!(
            " | follow {} | {}",
            if self.follow { "on" } else { "off" },
            self.store.path().display()
        ));
        status
    }
}

/// Splits raw log bytes into entries. Bad bytes decode to replacement
/// characters; lines that do not parse drop out.
fn parse_lines(bytes: &[u8]) -> Vec<LogEntry> {
    bytes
        .split(|b| *b == b'\n')
        .filter_map(|raw| {
            let line = String::from_utf8_lossy(raw);
            LogEntry::parse_line(line.trim())
        })
        .collect()
}

fn matches_filter(entry: &LogEntry, needle: &str) -> bool {
    entry.repo.to_lowercase().contains(needle) || entry.path.to_lowercase().contains(needle)
}

fn is_removal(action: &str) -> bool {
    action.to_lowercase().starts_with("remove")
}

/// Human-readable byte count for the status column.
fn size_human(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        b if b >= GB => format!("{:.1} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

/// Current on-disk state of the path an entry touched.
fn path_state(path: &str) -> String {
    match fs::metadata(path) {
        Ok(meta) => size_human(meta.len()),
        Err(_) => "missing".to_string(),
    }
}

fn row_line(entry: &LogEntry) -> String {
    format!(
        "{}  {:<28}  {:<10}  {}  [{}]",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.repo,
        entry.action,
        entry.path,
        path_state(&entry.path)
    )
}

fn main() -> Result<()> {
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let store = LogStore::from_sources(args.log_file.clone())
        .context("resolve log file location")?;

    let headless = headless_mode();
    let initial_follow = if headless { false } else { args.follow };

    let mut app = App::new(store, initial_follow);
    app.load_initial()?;

    if headless {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend)?;
        let mut control = LoopControl::headless();
        return run_app(&mut terminal, &mut app, &mut control);
    }

    let mut control = LoopControl::interactive(initial_follow)?;
    let guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;
    let result = run_app(&mut terminal, &mut app, &mut control);
    terminal.show_cursor().ok();
    drop(guard);
    result
}

fn headless_mode() -> bool {
    std::env::var("EGET_TUI_HEADLESS")
        .ok()
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(std::io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        disable_raw_mode().ok();
        let mut stdout = std::io::stdout();
        execute!(stdout, LeaveAlternateScreen, Show).ok();
    }
}

struct LoopControl {
    headless: bool,
    follow_stop: Option<FollowStop>,
}

impl LoopControl {
    fn headless() -> Self {
        Self {
            headless: true,
            follow_stop: None,
        }
    }

    fn interactive(initial_follow: bool) -> Result<Self> {
        let follow_stop = if initial_follow {
            Some(FollowStop::install_ctrlc_handler()?)
        } else {
            None
        };
        Ok(Self {
            headless: false,
            follow_stop,
        })
    }

    fn ensure_follow_stop(&mut self) -> Result<()> {
        if self.follow_stop.is_none() {
            self.follow_stop = Some(FollowStop::install_ctrlc_handler()?);
        }
        Ok(())
    }
}

struct FollowStop {
    rx: Receiver<()>,
}

impl FollowStop {
    fn install_ctrlc_handler() -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        ctrlc::set_handler(move || {
            let _ = tx.send(());
        })
        .context("install ctrl+c handler for follow mode")?;
        Ok(Self { rx })
    }

    fn should_stop(&mut self) -> bool {
        match self.rx.try_recv() {
            Ok(_) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    control: &mut LoopControl,
) -> Result<()> {
    draw_frame(terminal, app)?;

    if control.headless {
        return Ok(());
    }

    let tick_rate = Duration::from_millis(150);
    let mut last_tick = Instant::now();

    loop {
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.mode {
                        Mode::Filter => match key.code {
                            KeyCode::Esc => {
                                app.filter.clear();
                                app.mode = Mode::Browse;
                                app.clamp_selection();
                            }
                            KeyCode::Enter => app.mode = Mode::Browse,
                            KeyCode::Backspace => {
                                app.filter.pop();
                                app.clamp_selection();
                            }
                            KeyCode::Char(c) => {
                                app.filter.push(c);
                                app.clamp_selection();
                            }
                            _ => {}
                        },
                        Mode::Browse => match key.code {
                            KeyCode::Char('q') => return Ok(()),
                            KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
                            KeyCode::Down | KeyCode::Char('j') => app.select_next(),
                            KeyCode::Char('g') => app.select_first(),
                            KeyCode::Char('G') => app.select_last(),
                            KeyCode::Char('r') => app.load_initial()?,
                            KeyCode::Char('f') => {
                                app.follow = !app.follow;
                                if app.follow {
                                    control.ensure_follow_stop()?;
                                }
                            }
                            KeyCode::Char('/') => app.mode = Mode::Filter,
                            KeyCode::Esc => {
                                app.filter.clear();
                                app.clamp_selection();
                            }
                            KeyCode::F(1) | KeyCode::Char('?') => app.help = !app.help,
                            _ => {}
                        },
                    }
                }
            }
        }

        if let Some(stop) = control.follow_stop.as_mut() {
            if stop.should_stop() {
                return Ok(());
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.poll_updates();
            last_tick = Instant::now();
        }

        draw_frame(terminal, app)?;
    }
}

fn draw_frame<B: Backend>(terminal: &mut Terminal<B>, app: &App) -> Result<()> {
    terminal.draw(|f| {
        let size = f.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)].as_ref())
            .split(size);

        let block = Block::default()
            .title(Span::raw("Operations"))
            .borders(Borders::ALL);
        let items: Vec<ListItem> = app
            .visible()
            .into_iter()
            .map(|idx| {
                let entry = &app.entries[idx];
                let style = if is_removal(&entry.action) {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(Span::styled(row_line(entry), style)))
            })
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default();
        state.select(Some(app.selected));
        f.render_stateful_widget(list, chunks[0], &mut state);

        let status = Paragraph::new(Line::from(app.status_line())).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::raw("Status")),
        );
        f.render_widget(status, chunks[1]);

        if app.help {
            let help_text =
                "Keys: q=quit, j/k or arrows=move, g/G=ends, /=filter, Esc=clear, f=follow, r=reload";
            let area = centered_rect(60, 40, size);
            let help = Paragraph::new(help_text)
                .block(Block::default().title("Help").borders(Borders::ALL));
            f.render_widget(help, area);
        }
    })?;
    Ok(())
}

fn centered_rect(
    percent_x: u16,
    percent_y: u16,
    r: ratatui::layout::Rect,
) -> ratatui::layout::Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1]);
    horizontal[1]
}
