use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::path::PathBuf;
use std::{io, time::Duration};
use tracing::{info, warn};

use prtree::{ui, update, App, Command, Config, FilterSelection, Message};

/// A terminal dashboard for Bitbucket pull requests and their Jira issues
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: (),

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Project to open (defaults to the first configured project)
    #[arg(long)]
    project: Option<String>,

    /// Filter query string, as shown by the share popup
    #[arg(long)]
    filter: Option<String>,

    /// Log file (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the configured projects and exit
    #[arg(long)]
    list_projects: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    if cli.list_projects {
        for project in config.list_projects() {
            println!("{}", project);
        }
        return Ok(());
    }

    init_logging(cli.log_file)?;

    let project = match cli.project {
        Some(name) => {
            config.project(&name)?;
            name
        }
        None => config
            .list_projects()
            .into_iter()
            .next()
            .context("no projects configured")?,
    };
    let selection = match cli.filter.as_deref() {
        Some(query) => FilterSelection::from_query_string(query, config.filter_mode),
        None => FilterSelection::new(config.filter_mode),
    };
    info!(project = %project, filter = %selection.to_query_string(), "starting");

    let mut app = App::new(config, project, selection)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.start_fetch(false);

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => dirs::cache_dir()
            .context("could not determine the cache directory")?
            .join("prtree")
            .join("prtree.log"),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file '{}'", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Drain async fetch results
        while let Some(result) = app.check_fetch_result() {
            if let Some(cmd) = update(app, Message::FetchComplete(result)) {
                if handle_command(app, cmd) {
                    return Ok(());
                }
            }
        }

        // Spinner and polling
        if let Some(cmd) = update(app, Message::Tick) {
            if handle_command(app, cmd) {
                return Ok(());
            }
        }

        terminal.draw(|f| ui(f, app))?;

        // Handle input
        if event::poll(Duration::from_millis(50))? {
            let msg = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => key_to_message(app, key.code),
                Event::FocusGained => Some(Message::FocusGained),
                Event::FocusLost => Some(Message::FocusLost),
                _ => None,
            };
            if let Some(msg) = msg {
                if let Some(cmd) = update(app, msg) {
                    if handle_command(app, cmd) {
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Handle a command returned from update; true means quit
fn handle_command(app: &mut App, cmd: Command) -> bool {
    match cmd {
        Command::Quit => true,
        Command::FetchProject { force } => {
            app.start_fetch(force);
            false
        }
        Command::CheckConflicts(checks) => {
            app.request_conflicts(checks);
            false
        }
        Command::OpenUrl(url) => {
            let opener = if cfg!(target_os = "macos") {
                "open"
            } else {
                "xdg-open"
            };
            if let Err(e) = std::process::Command::new(opener).arg(&url).spawn() {
                warn!(url = %url, error = %e, "failed to open browser");
            }
            false
        }
    }
}

/// Convert a key press to a message based on current app state
fn key_to_message(app: &App, key: KeyCode) -> Option<Message> {
    // Help popup - any key dismisses
    if app.show_help_popup {
        return Some(Message::DismissHelp);
    }

    // Error popup
    if app.show_error_popup {
        return match key {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Some(Message::DismissError),
            _ => None,
        };
    }

    // Share popup
    if app.show_share_popup {
        return match key {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('S') => {
                Some(Message::ToggleShare)
            }
            _ => None,
        };
    }

    // Project picker
    if app.show_project_picker {
        return match key {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('p') => {
                Some(Message::CloseProjectPicker)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(Message::ProjectPickerNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::ProjectPickerPrevious),
            KeyCode::Enter => Some(Message::SelectProject),
            _ => None,
        };
    }

    // Normal mode
    match key {
        KeyCode::Char('q') => Some(Message::Quit),
        KeyCode::Char('j') | KeyCode::Down => Some(Message::NextItem),
        KeyCode::Char('k') | KeyCode::Up => Some(Message::PreviousItem),
        KeyCode::Char('g') => Some(Message::GoToTop),
        KeyCode::Char('G') => Some(Message::GoToBottom),
        KeyCode::Char(' ') => Some(Message::ToggleCollapse),
        KeyCode::Char('o') | KeyCode::Enter => Some(Message::OpenSelected),
        KeyCode::Char('r') => Some(Message::Refresh),
        KeyCode::Char('p') => Some(Message::OpenProjectPicker),
        KeyCode::Char('a') => Some(Message::CycleAuthor),
        KeyCode::Char('v') => Some(Message::CycleReviewer),
        KeyCode::Char('s') => Some(Message::CycleSprint),
        KeyCode::Char('f') => Some(Message::CycleFixVersion),
        KeyCode::Char('y') => Some(Message::CycleSync),
        KeyCode::Char('R') => Some(Message::ToggleReadyForReviewer),
        KeyCode::Char('m') => Some(Message::ToggleFilterMode),
        KeyCode::Char('x') => Some(Message::ClearFilters),
        KeyCode::Char('S') => Some(Message::ToggleShare),
        KeyCode::Char('?') => Some(Message::ToggleHelp),
        _ => None,
    }
}
