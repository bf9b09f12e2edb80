use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};
use vacuum_world_core::{
    Direction, Position,
    agent::{Action, StepOutcome},
    environment::{CellStatus, Environment, load_room_from_string},
    session::{Session, SessionConfig},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Room layout file to load instead of a random room
    #[arg(short, long, value_name = "ROOM_FILE")]
    map: Option<PathBuf>,

    /// Side length of a random room
    #[arg(long, default_value_t = 10)]
    size: usize,

    /// Dirt scattered on startup and on reset
    #[arg(long, default_value_t = 10)]
    dirt: usize,

    /// Seed for reproducible dirt placement
    #[arg(long)]
    seed: Option<u64>,

    /// Milliseconds between automatic steps
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
}

struct App {
    /// The simulated room and vacuum.
    session: Session,
    /// Whether the agent advances one auto step per tick.
    auto_running: bool,
    /// Last thing that happened, shown in the status panel.
    last_event: String,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let session = match &args.map {
            Some(path) => {
                let layout = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read room file {}", path.display()))?;
                let (environment, start) =
                    load_room_from_string(&layout).context("Failed to load room")?;
                Session::from_layout(environment, start, args.dirt, args.seed)
            }
            None => Session::new(&SessionConfig {
                size: args.size,
                dirt_count: args.dirt,
                seed: args.seed,
            })
            .context("Failed to create room")?,
        };

        Ok(App {
            session,
            auto_running: false,
            last_event: "Ready".to_string(),
            should_quit: false,
        })
    }

    /// Handles one tick of the animation.
    fn tick(&mut self) {
        if self.auto_running {
            self.step();
        }
    }

    fn step(&mut self) {
        match self.session.step_auto() {
            StepOutcome::Acted(action) => self.last_event = describe(&action),
            StepOutcome::Done(reason) => {
                self.auto_running = false;
                self.last_event = reason.message().to_string();
            }
        }
    }

    fn manual_move(&mut self, direction: Direction) {
        self.auto_running = false;
        self.last_event = match self.session.manual_move(direction) {
            Ok(moved) if moved.cleaned => format!("Moved to {} and cleaned", moved.position),
            Ok(moved) => format!("Moved to {}", moved.position),
            Err(err) => err.to_string(),
        };
    }

    fn finish(&mut self) {
        self.auto_running = false;
        let report = self.session.auto_clean();
        self.last_event = format!("Auto-clean ran {} actions", report.actions.len());
    }

    fn reset(&mut self) {
        self.auto_running = false;
        self.session.reset(None);
        self.last_event = "Reset".to_string();
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.manual_move(Direction::Up),
            KeyCode::Down | KeyCode::Char('j') => self.manual_move(Direction::Down),
            KeyCode::Left | KeyCode::Char('h') => self.manual_move(Direction::Left),
            KeyCode::Right | KeyCode::Char('l') => self.manual_move(Direction::Right),
            KeyCode::Char(' ') | KeyCode::Char('s') => {
                self.auto_running = false;
                self.step();
            }
            KeyCode::Char('a') => self.auto_running = !self.auto_running,
            KeyCode::Char('f') => self.finish(),
            KeyCode::Char('r') => self.reset(),
            _ => {}
        }
    }
}

fn describe(action: &Action) -> String {
    match action {
        Action::Move { position } => format!("Moved to {position}"),
        Action::Clean { position } => format!("Cleaned {position}"),
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Build the room before touching the terminal so errors print normally
    let mut app = App::new(&args)?;

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal)?;

    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Room
            Constraint::Percentage(20), // Agent status
            Constraint::Percentage(10), // Key help
        ])
        .split(frame.area());

    render_room(
        frame,
        main_layout[0],
        app.session.environment(),
        app.session.agent().position(),
    );
    render_status(frame, main_layout[1], app);

    let help_text =
        Paragraph::new("arrows/hjkl: move  space: step  a: animate  f: finish  r: reset  q: quit")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders the agent's position, move count and the last event.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.session.agent().state();
    let remaining = app.session.environment().dirt_count();
    let mode = if app.auto_running { "auto" } else { "manual" };

    let lines = vec![
        Line::from(format!(
            "Position: {}  Moves: {}  Dirt left: {}  Mode: {}",
            state.position, state.moves, remaining, mode
        )),
        Line::from(Span::styled(
            app.last_event.clone(),
            Style::default().fg(Color::Cyan),
        )),
    ];

    let status =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Vacuum"));
    frame.render_widget(status, area);
}

/// Renders the room grid: `V` for the vacuum, `D` for dirt, `.` for clean floor.
fn render_room(frame: &mut Frame, area: Rect, environment: &Environment, vacuum: Position) {
    let cells = environment.cells();
    let mut lines: Vec<Line> = Vec::with_capacity(cells.height());

    for (y, row) in cells.rows().enumerate() {
        let mut spans: Vec<Span> = Vec::with_capacity(row.len() * 2);
        for (x, status) in row.iter().enumerate() {
            let span = if (Position { x, y }) == vacuum {
                Span::styled("V", Style::default().fg(Color::Blue).bold())
            } else {
                match status {
                    CellStatus::Dirty => Span::styled("D", Style::default().fg(Color::Yellow)),
                    CellStatus::Clean => Span::styled(".", Style::default().fg(Color::DarkGray)),
                }
            };
            spans.push(span);
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }

    let room = Paragraph::new(lines)
        .block(Block::default().title("Vacuum World").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(room, area);
}
