mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use tracescope::app::{App, Command};
use tracescope::events::{self, AppEvent};
use tracescope::loader::{load_trace, TaskRef, TraceLoader};
use tracescope::store::fs::FsStore;
use tracescope::trace::analytics::{SummaryFormatter, TextFormatter};

#[derive(Parser, Debug)]
#[command(name = "tracescope", about = "Browse agent benchmark execution traces")]
struct Cli {
    /// Root directory of the trace store (benchmark/configuration/task tree).
    #[arg(short, long)]
    root: PathBuf,

    /// Print a text report for one trace (`benchmark/config/task`) and exit.
    #[arg(long)]
    report: Option<String>,

    /// Write logs to this file instead of discarding them.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref(), cli.report.is_some())?;

    let root = cli.root.canonicalize().unwrap_or(cli.root.clone());
    let runtime = tokio::runtime::Runtime::new()?;
    let store = Arc::new(FsStore::new(&root));

    if let Some(ref spec) = cli.report {
        return print_report(&runtime, store.as_ref(), spec);
    }

    // Launch TUI.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();
    let result = run_tui(&mut terminal, &mut app, store, runtime.handle().clone());

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

/// Logs go to the requested file, to stderr in report mode, or nowhere:
/// stderr would corrupt the alternate screen.
fn init_tracing(log_file: Option<&std::path::Path>, report_mode: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Some(path) = log_file {
        let file = std::fs::File::create(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else if report_mode {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

/// One-shot mode: load the named trace and print its analytics as text.
fn print_report(runtime: &tokio::runtime::Runtime, store: &FsStore, spec: &str) -> Result<()> {
    let mut parts = spec.splitn(3, '/');
    let (Some(benchmark), Some(config), Some(task)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(eyre!("expected benchmark/config/task, got `{spec}`"));
    };
    let name = if task.ends_with(".json") {
        task.to_string()
    } else {
        format!("{task}.json")
    };
    let task = TaskRef {
        path: format!("{benchmark}/{config}/{name}"),
        name,
    };

    let session = runtime.block_on(load_trace(store, &task))?;
    print!(
        "{}",
        TextFormatter.format(&session.record, &session.analytics)
    );
    Ok(())
}

fn run_tui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    store: Arc<FsStore>,
    runtime: tokio::runtime::Handle,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<AppEvent>();

    // Spawn key reader thread.
    events::spawn_key_reader(tx.clone());

    // Spawn tick timer (250ms).
    events::spawn_tick_timer(tx.clone(), Duration::from_millis(250));

    let loader = TraceLoader::new(store, runtime, tx);
    app.loading = true;
    app.status = Some("discovering traces...".into());
    loader.begin_discovery();

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(AppEvent::Key(key)) => match app.handle_key(key) {
                Some(Command::LoadTask(task)) => {
                    loader.begin_load(task);
                }
                Some(Command::Rediscover) => {
                    loader.begin_discovery();
                }
                None => {}
            },
            Ok(AppEvent::Mouse(mouse)) => app.handle_mouse(mouse),
            Ok(AppEvent::Tick) => {}
            Ok(AppEvent::IndexReady { generation, index }) => {
                if generation == loader.current_generation() {
                    app.set_index(index);
                }
            }
            Ok(AppEvent::TraceReady {
                generation,
                session,
            }) => {
                if generation == loader.current_generation() {
                    app.set_session(session);
                }
            }
            Ok(AppEvent::LoadFailed {
                generation,
                message,
            }) => {
                if generation == loader.current_generation() {
                    app.set_load_failed(message);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if app.should_quit {
            loader.cancel();
            break;
        }
    }

    Ok(())
}
