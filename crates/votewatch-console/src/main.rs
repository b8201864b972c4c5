//! `votewatch` - watch a voting cluster's tally and membership, and cast
//! votes, from the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use votewatch_console::coordinator::CycleOutcome;
use votewatch_console::render::text;
use votewatch_console::{
    console, HttpClient, MonitorConfig, RefreshCoordinator, SubmitOutcome, UiState,
    VoteSubmitter,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal monitor for a distributed voting cluster", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/votewatch/config.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Origin of the node to watch, e.g. http://127.0.0.1:8001
    #[arg(long)]
    origin: Option<String>,

    /// Poll to display and vote in
    #[arg(long)]
    poll: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(long)]
    refresh_ms: Option<u64>,

    /// Log filter directive (e.g. info, votewatch_console=debug)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive console (default)
    Watch,
    /// Fetch once, print both tables and exit
    Snapshot,
    /// Submit one vote, then print the refreshed tally
    Vote {
        /// Option to vote for
        #[arg(long)]
        option: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<MonitorConfig> {
    let mut config = MonitorConfig::load(cli.config.as_deref())?;
    config.apply_env()?;

    if let Some(origin) = &cli.origin {
        config.origin = origin.clone();
    }
    if let Some(poll) = &cli.poll {
        config.poll_id = poll.clone();
    }
    if let Some(ms) = cli.refresh_ms {
        config.refresh_interval_ms = ms;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Logs go to a file while the console owns the terminal, stderr otherwise.
fn init_tracing(config: &MonitorConfig, to_file: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.logging.level)
        .with_context(|| format!("invalid log filter '{}'", config.logging.level))?;

    if to_file {
        let path = config.log_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn print_views(state: &UiState) {
    if let Some(poll) = &state.poll {
        print!("{}", text::format_poll(poll));
    }
    if let Some(status) = &state.status {
        print!("{}", text::format_status(status));
    }
    if let Some(ts) = state.last_update {
        println!("Last update: {}", ts.format("%H:%M:%S"));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let command = cli.command.unwrap_or(Command::Watch);

    init_tracing(&config, matches!(command, Command::Watch))?;

    let client = HttpClient::new(&config.origin, config.request_timeout())?;
    let state = UiState::new(
        votewatch_console::MonitorBackend::origin(&client),
        config.poll_id.clone(),
    );
    let gate = state.submit_gate.clone();
    let coordinator = Arc::new(RefreshCoordinator::new(Arc::new(client), state.shared()));
    let submitter = Arc::new(VoteSubmitter::new(Arc::clone(&coordinator), gate));

    tracing::info!(
        origin = %config.origin,
        poll_id = %config.poll_id,
        command = ?command,
        "votewatch starting"
    );

    match command {
        Command::Watch => {
            let refresh = coordinator.spawn_refresh_loop(config.refresh_interval());
            let result = console::run_console(Arc::clone(&coordinator), submitter).await;
            refresh.abort();
            result
        }
        Command::Snapshot => match coordinator.refresh_all().await {
            CycleOutcome::Failed { error, .. } => Err(anyhow::anyhow!(error)),
            _ => {
                print_views(&*coordinator.state().read().await);
                Ok(())
            }
        },
        Command::Vote { option } => {
            match submitter.submit_vote(&config.poll_id, &option).await {
                SubmitOutcome::Accepted { refresh, .. } => {
                    println!("Vote for '{}' in {} accepted.", option.trim(), config.poll_id.trim());
                    if let CycleOutcome::Failed { error, .. } = refresh {
                        eprintln!("refresh after vote failed: {error}");
                    }
                    print_views(&*coordinator.state().read().await);
                    Ok(())
                }
                SubmitOutcome::Rejected(error) => Err(anyhow::anyhow!("vote rejected: {error}")),
                SubmitOutcome::Busy => Err(anyhow::anyhow!("another vote is in flight")),
            }
        }
    }
}
