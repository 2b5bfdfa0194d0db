use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dyna_maze_core::{
    Action, Agent, AgentConfig, Cell, DynaQAgent, DynaQPlusAgent, Episode, Maze, Position,
    StepOutcome, Timestep,
    driver::{draw_seeds, rank_seeds},
    maze::presets,
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Dyna-Q and Dyna-Q+ on changing grid mazes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch an agent learn in the terminal
    Run(RunArgs),
    /// Rank random seeds by the total reward a Dyna-Q+ agent collects
    SeedSearch(SeedSearchArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Maze to learn
    #[arg(short, long, value_enum, default_value_t = Preset::Blocking)]
    maze: Preset,
    /// Learning algorithm
    #[arg(short, long, value_enum, default_value_t = AgentKind::DynaQPlus)]
    agent: AgentKind,
    /// Random seed (defaults to the maze's reference seed)
    #[arg(short, long)]
    seed: Option<u64>,
    /// Stop stepping at this timestep (defaults to the maze's run length)
    #[arg(long)]
    steps: Option<Timestep>,
    /// Planning updates per real step
    #[arg(short = 'n', long, default_value_t = 50)]
    planning_steps: usize,
    /// Exploration-bonus coefficient (Dyna-Q+ only)
    #[arg(short, long, default_value_t = 1e-3)]
    kappa: f64,
    /// Exploration rate
    #[arg(short, long, default_value_t = 0.1)]
    epsilon: f64,
    /// Milliseconds between steps
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Write trace output here while the terminal is in use
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SeedSearchArgs {
    /// Maze to learn
    #[arg(short, long, value_enum, default_value_t = Preset::Blocking)]
    maze: Preset,
    /// Number of distinct seeds to evaluate
    #[arg(long, default_value_t = 31)]
    seeds: usize,
    /// Seed of the generator that draws the candidate seeds
    #[arg(long, default_value_t = 120)]
    master_seed: u64,
    /// Real steps per run
    #[arg(long, default_value_t = 5000)]
    steps: u64,
    /// Planning updates per real step
    #[arg(short = 'n', long, default_value_t = 50)]
    planning_steps: usize,
    /// Exploration-bonus coefficient
    #[arg(short, long, default_value_t = 1e-2)]
    kappa: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// Stationary 6x9 maze
    Dyna,
    /// The open gap moves to the other end at t = 1000
    Blocking,
    /// A shorter gap opens at t = 3000
    Shortcut,
}

impl Preset {
    fn build(self) -> dyna_maze_core::Result<Maze> {
        match self {
            Preset::Dyna => presets::dyna_maze(),
            Preset::Blocking => presets::blocking_maze(),
            Preset::Shortcut => presets::shortcut_maze(),
        }
    }

    fn title(self) -> &'static str {
        match self {
            Preset::Dyna => "Dyna Maze",
            Preset::Blocking => "Blocking Maze",
            Preset::Shortcut => "Shortcut Maze",
        }
    }

    fn default_steps(self) -> Timestep {
        match self {
            Preset::Dyna | Preset::Blocking => 3000,
            Preset::Shortcut => 6000,
        }
    }

    fn default_seed(self) -> u64 {
        match self {
            Preset::Dyna | Preset::Blocking => 1109577984,
            Preset::Shortcut => 1360610827,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AgentKind {
    DynaQ,
    DynaQPlus,
}

struct App {
    /// The learning agent, which owns the episode.
    agent: Box<dyn Agent>,
    title: String,
    max_timestep: Timestep,
    last_outcome: Option<StepOutcome>,
    /// Flag to control the main loop.
    should_quit: bool,
    paused: bool,
}

impl App {
    fn new(args: &RunArgs) -> Result<Self> {
        let maze = args.maze.build().context("building maze")?;
        let episode = Episode::new(maze).context("starting episode")?;
        let config = AgentConfig::default()
            .with_planning_steps(args.planning_steps)
            .with_kappa(args.kappa)
            .with_epsilon(args.epsilon);
        let seed = args.seed.unwrap_or(args.maze.default_seed());
        let max_timestep = args.steps.unwrap_or(args.maze.default_steps());

        let agent: Box<dyn Agent> = match args.agent {
            AgentKind::DynaQ => Box::new(DynaQAgent::with_seed(episode, config, seed)?),
            AgentKind::DynaQPlus => Box::new(DynaQPlusAgent::with_seed(episode, config, seed)?),
        };
        info!(maze = ?args.maze, agent = ?args.agent, seed, max_timestep, "starting run");

        Ok(App {
            agent,
            title: format!("{} ({} steps, seed {})", args.maze.title(), max_timestep, seed),
            max_timestep,
            last_outcome: None,
            should_quit: false,
            paused: false,
        })
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Result<()> {
        if self.paused || self.finished() {
            return Ok(());
        }
        self.last_outcome = Some(self.agent.step()?);
        Ok(())
    }

    fn finished(&self) -> bool {
        self.agent.episode().current_timestep() >= self.max_timestep
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
        Command::SeedSearch(args) => seed_search(args),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn run(args: RunArgs) -> Result<()> {
    // The terminal belongs to the UI, so logs only go to a file.
    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("creating log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    // Create the application state
    let mut app = App::new(&args)?;
    let tick_rate = Duration::from_millis(args.tick_ms);

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app, tick_rate);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
}

fn seed_search(args: SeedSearchArgs) -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();

    let maze = args.maze.build().context("building maze")?;
    let config = AgentConfig::default()
        .with_planning_steps(args.planning_steps)
        .with_kappa(args.kappa);
    let seeds = draw_seeds(args.master_seed, args.seeds);
    info!(
        maze = args.maze.title(),
        seeds = seeds.len(),
        steps = args.steps,
        "searching seeds"
    );

    let scores = rank_seeds(&maze, &config, &seeds, args.steps).context("ranking seeds")?;
    for score in &scores {
        println!("{:>10}  {:>6}", score.seed, score.total_reward);
    }
    if let Some(median) = scores.get(scores.len() / 2) {
        println!(
            "median: seed {} with total reward {}",
            median.seed, median.total_reward
        );
    }
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?; // Put terminal in raw mode
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
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.paused = !app.paused,
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
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
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),   // Area for the map
            Constraint::Length(5), // Area for run status
            Constraint::Length(2), // Area for help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], app);
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new("Press 'space' to pause, 'q' or 'Esc' to quit.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Arrow for a single greedy action, `+` for a partial tie, `·` when nothing
/// has been learned yet.
fn policy_glyph(actions: &[Action]) -> &'static str {
    match actions {
        [Action::Up] => "↑",
        [Action::Right] => "→",
        [Action::Down] => "↓",
        [Action::Left] => "←",
        _ if actions.len() == Action::ALL.len() => "·",
        _ => "+",
    }
}

/// Renders the maze as of the episode's current timestep onto the frame.
fn render_map(frame: &mut Frame, area: Rect, app: &App) {
    let episode = app.agent.episode();
    let maze = episode.maze();
    let agent_position = episode.current_position();

    let mut lines: Vec<Line> = Vec::with_capacity(maze.row_count());
    for row in 0..maze.row_count() {
        let mut spans: Vec<Span> = Vec::with_capacity(maze.column_count());
        for column in 0..maze.column_count() {
            let position = Position { row, column };
            let span = if position == agent_position {
                Span::styled(" @", Style::default().fg(Color::Red).bold())
            } else {
                match episode.current_cell(position) {
                    Ok(Cell::Wall) => Span::styled(" █", Style::default().fg(Color::DarkGray)),
                    Ok(Cell::Goal) => Span::styled(" G", Style::default().fg(Color::Green).bold()),
                    Ok(Cell::Free) | Ok(Cell::Start) => {
                        let glyph = app
                            .agent
                            .max_actions(position)
                            .map(|actions| policy_glyph(&actions))
                            .unwrap_or("?");
                        Span::styled(format!(" {}", glyph), Style::default().fg(Color::Cyan))
                    }
                    Err(_) => Span::raw(" ?"),
                }
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(app.title.as_str())
                .borders(Borders::ALL),
        )
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Renders the timestep, total reward, and the most recent transition.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let episode = app.agent.episode();
    let mut items = vec![
        ListItem::from(format!(
            "Timestep: {} / {}{}",
            episode.current_timestep(),
            app.max_timestep,
            if app.paused {
                "  (paused)"
            } else if app.finished() {
                "  (done)"
            } else {
                ""
            }
        )),
        ListItem::from(format!("Total reward: {}", episode.cumulative_reward())),
    ];
    if let Some(outcome) = app.last_outcome {
        items.push(ListItem::from(format!(
            "Last step: {} {} -> {} (reward {})",
            outcome.from, outcome.action, outcome.to, outcome.reward
        )));
    }

    let status_widget =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status_widget, area);
}
