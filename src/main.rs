use anyhow::{Context, Result};
use chrono::{Duration, Local};
use chronolog::config::ChronologConfig;
use chronolog::controller::{Collaborators, FlowReport, WorkController};
use chronolog::domain::{Clock, FilterKind, ManualClock, SystemClock};
use chronolog::filters::FilterToggles;
use chronolog::notifications::{DesktopNotifier, NoticeLog, Notifier};
use chronolog::page::{DueState, HostPage, SimulatedTodoApp, TaskSpec};
use chronolog::persistence::{
    atomic_write, init_local_data_dir, load_completion_popup, load_filter, save_completion_popup,
    save_filter, CompletionPopupPreference, JsonFileStore, KeyValueStore, MemoryStore,
    SessionLogStore,
};
use chronolog::report::{reset_today, PopupView};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chronolog")]
#[command(about = "Per-task work timers and a daily activity log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .chronolog directory in the current directory
    Init,
    /// Show today's current session and log table
    Status,
    /// Write today's log table as Markdown
    Export {
        /// Output file path. Defaults to ./chronolog-YYYY-MM-DD.md
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Close the open session and start a new one
    Switch {
        label: String,
    },
    /// Switch back to the idle session
    Idle,
    /// Discard today's log and start over with an idle session
    Reset,
    /// Show or change a task filter (future, recurring)
    Filter {
        kind: String,
        #[arg(long, conflicts_with = "off")]
        on: bool,
        #[arg(long)]
        off: bool,
    },
    /// Turn the session-completed notice on or off
    CompletionPopup {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Drive the work chips on a simulated task list
    Demo,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CHRONOLOG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = ChronologConfig::load()?;

    match cli.command {
        Some(Commands::Init) => {
            let data_dir = init_local_data_dir()?;
            println!("Initialized chronolog directory: {}", data_dir.display());
            println!();
            println!("Chronolog will now keep its log in this directory.");
            Ok(())
        }
        None | Some(Commands::Status) => {
            let (_, log) = open_log(&config)?;
            print_status(&log, &config).await
        }
        Some(Commands::Export { output }) => {
            let (_, log) = open_log(&config)?;
            let view = PopupView::load(&log, &config.table).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(view.download_name()));
            atomic_write(&path, &format!("{}\n", view.markdown))?;
            println!("Exported: {}", path.display());
            Ok(())
        }
        Some(Commands::Switch { label }) => {
            let (_, log) = open_log(&config)?;
            let closed = log.switch_session(label.trim()).await?;
            if let Some(closed) = closed {
                println!("Closed: {}", closed.display_label());
            }
            println!("Now: {}", label.trim());
            Ok(())
        }
        Some(Commands::Idle) => {
            let (_, log) = open_log(&config)?;
            log.switch_session(log.idle_label()).await?;
            println!("Now: {}", log.idle_label());
            Ok(())
        }
        Some(Commands::Reset) => {
            let (_, log) = open_log(&config)?;
            reset_today(&log).await?;
            println!("Today's log reset.");
            Ok(())
        }
        Some(Commands::Filter { kind, on, off }) => {
            let kind = FilterKind::from_name(&kind)
                .with_context(|| format!("Unknown filter '{}' (use future or recurring)", kind))?;
            let (store, _) = open_log(&config)?;
            let state = match (on, off) {
                (true, _) => true,
                (_, true) => false,
                _ => !load_filter(&*store, kind).await?,
            };
            save_filter(&*store, kind, state).await?;
            println!("{}: {}", kind.name(), if state { "hidden" } else { "shown" });
            Ok(())
        }
        Some(Commands::CompletionPopup { state }) => {
            let (store, _) = open_log(&config)?;
            save_completion_popup(&*store, matches!(state, Switch::On)).await?;
            let enabled = load_completion_popup(&*store).await?;
            println!("Completion notice: {}", if enabled { "on" } else { "off" });
            Ok(())
        }
        Some(Commands::Demo) => run_demo(&config).await,
    }
}

fn open_log(config: &ChronologConfig) -> Result<(Arc<dyn KeyValueStore>, SessionLogStore)> {
    let data_dir = config.resolve_data_dir()?;
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::in_dir(&data_dir)?);
    tracing::debug!(dir = %data_dir.display(), "Using data directory");
    let log = SessionLogStore::new(store.clone(), Arc::new(SystemClock), config.idle_label.clone());
    Ok((store, log))
}

async fn print_status(log: &SessionLogStore, config: &ChronologConfig) -> Result<()> {
    let view = PopupView::load(log, &config.table).await?;
    println!("{}", view.date);
    println!(
        "Current: {} (since {}, {})",
        view.current.label, view.current.since, view.current.elapsed
    );
    println!();
    println!("{}", view.markdown);
    Ok(())
}

async fn run_demo(config: &ChronologConfig) -> Result<()> {
    let app = Arc::new(SimulatedTodoApp::new(
        "Work",
        &[
            TaskSpec::new("Write report [1h 5m]"),
            TaskSpec::new("Review pull requests"),
            TaskSpec::new("Plan sprint").due(DueState::Later),
            TaskSpec::new("Weekly sync").recurring(),
        ],
    ));
    let clock = Arc::new(ManualClock::new(Local::now()));
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let log = SessionLogStore::new(store.clone(), clock.clone(), config.idle_label.clone());
    let notices = Arc::new(NoticeLog::new());
    let completion_popup = CompletionPopupPreference::load(&*store).await;
    let _preference_listener = completion_popup.spawn_listener(&*store);

    let controller = WorkController::spawn(Collaborators {
        page: app.clone(),
        log: log.clone(),
        notifier: notices.clone(),
        completion_popup,
        wait_policy: config.wait_policy(),
    });
    let _chip_watcher = controller.boot().await?;
    let filters = Arc::new(FilterToggles::load(app.clone(), store.clone()).await);
    let _filter_watcher = filters.clone().spawn();

    let rows = app.rows();
    let steps: [(usize, i64); 3] = [(0, 25), (1, 70), (1, 0)];
    for (row, minutes) in steps {
        let outcome = controller
            .click(rows[row])?
            .await
            .context("Controller stopped")??;
        describe(&outcome);
        clock.advance(Duration::minutes(minutes));
    }

    filters.toggle(FilterKind::Future).await?;

    println!();
    for row in &rows {
        let hidden = app
            .parent(*row)
            .is_some_and(|task| app.has_class(task, FilterKind::Future.task_class()));
        println!("  {}{}", app.title(*row), if hidden { "  (hidden)" } else { "" });
    }
    println!();
    for notice in notices.notices() {
        DesktopNotifier.notify(notice);
    }
    println!("Session log at {}:", clock.now().format("%H:%M"));
    print_status(&log, config).await
}

fn describe(outcome: &FlowReport) {
    match outcome {
        FlowReport::Started { base_title, .. } => println!("Started: {}", base_title),
        FlowReport::Stopped(report) => println!(
            "Stopped: {} (+{}m, {:?})",
            report.base_title, report.minutes, report.rename
        ),
    }
}
