// tapdeck - tap a tag, play an album
// Standby mode plays what a tag points at; --write binds new tags to folders

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
#[cfg(feature = "audio")]
use tapdeck::audio::{PlaybackController, RodioEngine};
use tapdeck::audio::PlayerEvent;
use tapdeck::config::{Config, DisplayMode, PathCheck};
use tapdeck::control::{
    BatchQueue, Interrupt, ProvisionController, ProvisionOptions, StandbyController,
    StandbyOptions,
};
use tapdeck::registry::TagRegistry;
use tapdeck::tag::SpoolReader;
use tapdeck::ui::{self, TerminalOperator};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tapdeck", version)]
#[command(about = "Plays the music folder an NFC tag points at, or writes new tags")]
struct Args {
    /// Reader location: `spool:<dir>` or a directory [default: reader/ under the config dir]
    #[arg(short, long)]
    location: Option<String>,

    /// Provision tags instead of playing them
    #[arg(short, long)]
    write: bool,

    /// Provision the folders listed in FILE, one per line, last line first
    #[arg(short, long, value_name = "FILE")]
    batch: Option<PathBuf>,

    /// Directory the folder picker opens in
    #[arg(short = 'd', long, value_name = "DIR")]
    default_directory: Option<PathBuf>,

    /// Always use the text prompt for picking folders
    #[arg(long, conflicts_with = "display")]
    terminal: bool,

    #[arg(long, value_enum)]
    display: Option<DisplayMode>,

    /// How a chosen folder is validated before it is written
    #[arg(long, value_enum)]
    path_check: Option<PathCheck>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print every registered tag and exit
    #[arg(long)]
    list: bool,

    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(location) = &self.location {
            config.reader.location = location.clone();
        }
        if let Some(dir) = &self.default_directory {
            config.provision.default_directory = Some(dir.clone());
        }
        if self.terminal {
            config.provision.display = DisplayMode::Terminal;
        } else if let Some(display) = self.display {
            config.provision.display = display;
        }
        if let Some(check) = self.path_check {
            config.provision.path_check = check;
        }
        if let Some(db) = &self.database {
            config.database_path = db.clone();
        }
    }

    fn provisioning(&self) -> bool {
        self.write || self.batch.is_some()
    }
}

fn init_logging(verbose: u8, directory: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,tapdeck={level}")));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // Optional daily rotating file next to the stderr output
    let (file_layer, guard) = match directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "tapdeck.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

/// Every Ctrl-C bumps the interrupt counter; the loops decide what it means.
async fn forward_interrupts(interrupt: Interrupt) {
    while tokio::signal::ctrl_c().await.is_ok() {
        interrupt.raise();
        debug!("Interrupt received ({} pending)", interrupt.pending());
    }
}

fn list_registrations(config: &Config) -> Result<()> {
    let registry = TagRegistry::open(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    let entries = registry.list_entries()?;

    if entries.is_empty() {
        println!("No tags registered in {}", config.database_path.display());
        return Ok(());
    }
    for (id, path) in entries {
        println!("{}\t{}", id, path.display());
    }
    Ok(())
}

#[cfg(feature = "audio")]
fn run_standby(
    config: &Config,
    interrupt: Interrupt,
    events: mpsc::UnboundedSender<PlayerEvent>,
) -> Result<()> {
    let reader = SpoolReader::connect(&config.reader)?;
    let registry = TagRegistry::open(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

    let engine = RodioEngine::new(1.0).context("No audio output")?;
    let mut player = PlaybackController::new(engine, &config.playback);
    player.set_event_sender(events);

    let mut standby = StandbyController::new(
        reader,
        registry,
        player,
        interrupt,
        StandbyOptions::from_config(config),
    );
    standby.run()?;
    Ok(())
}

#[cfg(not(feature = "audio"))]
fn run_standby(
    _config: &Config,
    _interrupt: Interrupt,
    _events: mpsc::UnboundedSender<PlayerEvent>,
) -> Result<()> {
    anyhow::bail!("tapdeck was built without the `audio` feature, standby mode cannot play")
}

fn run_provision(config: &Config, batch: Option<&Path>, interrupt: Interrupt) -> Result<()> {
    let reader = SpoolReader::connect(&config.reader)?;
    let registry = TagRegistry::open(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

    let operator = Box::new(TerminalOperator::new(interrupt.clone()));
    let picker = ui::folder_picker(config.provision.display);
    let mut provision = ProvisionController::new(
        reader,
        registry,
        operator,
        picker,
        interrupt,
        ProvisionOptions::from_config(config),
    );

    if let Some(list) = batch {
        let queue = BatchQueue::load(list)
            .with_context(|| format!("Failed to read batch list {}", list.display()))?;
        provision = provision.with_batch(queue);
    }

    let exit = provision.run()?;
    info!("Provisioning finished ({:?}), {} tags written", exit, provision.written());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    let _log_guard = init_logging(args.verbose, config.logging.directory.as_deref())?;

    if args.list {
        return list_registrations(&config);
    }

    let interrupt = Interrupt::new();
    tokio::spawn(forward_interrupts(interrupt.clone()));

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let display = tokio::spawn(ui::run_display(event_rx));

    // The control loops block on the reader, keep them off the runtime threads
    let provisioning = args.provisioning();
    let batch = args.batch.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        if provisioning {
            drop(event_tx);
            run_provision(&config, batch.as_deref(), interrupt)
        } else {
            run_standby(&config, interrupt, event_tx)
        }
    })
    .await
    .context("Control loop panicked")?;

    let _ = display.await;
    outcome
}
