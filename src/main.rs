//! cotask - partitioned parallel sums and a watchdog-supervised counter.
//!
//! `cotask sum` splits a matrix into row partitions, sums them on parallel
//! worker tasks and reports the breakdown. `cotask count` runs a ticking
//! counter that publishes every value to a terminal observer until it is
//! stopped by hand or by its watchdog.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime or configuration error

mod agent;
mod cli;
mod config;
mod dataset;
mod error;
mod models;
mod partition;
mod reduce;
mod report;

use agent::counter::AgentControl;
use agent::{CounterAgent, ObserverHandle, TerminalObserver, Watchdog};
use anyhow::{bail, Context, Result};
use cli::{Args, CountArgs, Mode, SumArgs};
use config::{Config, DEFAULT_CONFIG_FILE};
use models::{Command, CounterReport, ReductionReport, RunMetadata, StopSource};
use reduce::Coordinator;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Configuration decides the default verbosity, so it comes before logging
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("cotask v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    let result = match &args.mode {
        Some(Mode::Sum(sum)) => run_sum(&config, sum).await,
        Some(Mode::Count(count)) => run_count(&config, count, args.quiet).await,
        None => Ok(0),
    };

    match result {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cotask.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?.unwrap_or_default(),
    };

    config.merge_with_args(args);
    config.validate()?;

    Ok(config)
}

/// Sum a loaded or generated matrix and print the report. Returns exit code.
async fn run_sum(config: &Config, args: &SumArgs) -> Result<i32> {
    let (matrix, source) = match (&args.input, args.rows, args.cols) {
        (Some(path), _, _) => (dataset::load_matrix(path)?, path.display().to_string()),
        (None, Some(rows), Some(cols)) => (
            dataset::generate_matrix(rows, cols),
            format!("generated {}x{}", rows, cols),
        ),
        _ => bail!("No matrix source given"),
    };
    if matrix.is_empty() {
        warn!("Matrix from {} has no rows, the total is 0", source);
    }
    let matrix = Arc::new(matrix);

    if args.total_only {
        let total = reduce::sum(matrix, config.reduce.workers)
            .await
            .context("Parallel sum failed")?;
        emit(&format!("{}\n", total), args.output.as_deref())?;
        return Ok(0);
    }

    let coordinator = Coordinator::new(config.reduce.workers)?;
    info!(
        "Summing {} with {} worker(s)",
        source,
        coordinator.workers()
    );

    let reduction = coordinator
        .sum_detailed(matrix.clone())
        .await
        .context("Parallel sum failed")?;

    let report = ReductionReport {
        metadata: RunMetadata::now(),
        source,
        rows: matrix.rows(),
        cols: matrix.cols(),
        reduction,
    };

    emit(
        &report::render_reduction(&report, config.general.format)?,
        args.output.as_deref(),
    )?;
    Ok(0)
}

/// Run the counter agent under its watchdog until it halts. Returns exit code.
async fn run_count(config: &Config, args: &CountArgs, quiet: bool) -> Result<i32> {
    let (observer_handle, events) = agent::observer::channel(4);
    let observer = TerminalObserver::spawn(events, !args.no_spinner && !quiet);

    let agent = CounterAgent::new(config.agent_config(), observer_handle.clone()).spawn();
    let watchdog = Watchdog::new(
        config.watchdog_deadline(),
        agent.control(),
        observer_handle.clone(),
    )
    .spawn();
    debug!("Agent started: {:?}", agent.state());

    let interrupter = watchdog.interrupter();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupter.notify_one();
        }
    });

    let input_task = spawn_command_reader(agent.control(), observer.controls(), observer_handle);

    let agent_report = agent.join().await?;

    signal_task.abort();
    input_task.abort();
    let _ = input_task.await;

    // A watchdog that will stop nothing is disarmed instead of waited for.
    let watchdog_outcome = if agent_report.stopped_by == Some(StopSource::Watchdog) {
        Some(watchdog.join().await?)
    } else {
        watchdog.disarm().await;
        None
    };

    observer.finish().await;

    let report = CounterReport {
        metadata: RunMetadata::now(),
        tick_ms: config.agent.tick_ms,
        deadline_secs: config.watchdog.deadline_secs,
        agent: agent_report,
        watchdog: watchdog_outcome,
    };

    emit(&report::render_counter(&report, config.general.format)?, None)?;
    Ok(0)
}

/// Read `up` / `down` / `stop` lines from stdin and forward them to the agent.
fn spawn_command_reader(
    control: AgentControl,
    controls_enabled: Arc<AtomicBool>,
    observer: ObserverHandle,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("stdin closed, no more commands");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read command: {}", e);
                    break;
                }
            };

            if !forward_command(&line, &control, &controls_enabled, &observer).await {
                break;
            }
        }
    })
}

/// What a single input line did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    /// Blank line, or controls are no longer live.
    Ignored,
    Unknown,
    Applied { command: Command, accepted: bool },
}

fn apply_command_line(
    line: &str,
    control: &AgentControl,
    controls_enabled: &AtomicBool,
) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Ignored;
    }
    if !controls_enabled.load(Ordering::SeqCst) || !control.is_running() {
        debug!("Controls disabled, ignoring '{}'", line);
        return LineOutcome::Ignored;
    }

    match line.parse::<Command>() {
        Ok(command) => {
            let accepted = control.apply(command);
            debug!("Command {:?} accepted: {}", command, accepted);
            LineOutcome::Applied { command, accepted }
        }
        Err(e) => {
            warn!("{} (expected up, down or stop)", e);
            LineOutcome::Unknown
        }
    }
}

/// Handle one line. Returns false once no further input is wanted.
async fn forward_command(
    line: &str,
    control: &AgentControl,
    controls_enabled: &AtomicBool,
    observer: &ObserverHandle,
) -> bool {
    match apply_command_line(line, control, controls_enabled) {
        LineOutcome::Applied {
            command: Command::Stop,
            accepted: true,
        } => {
            observer.disable_controls().await;
            false
        }
        _ => true,
    }
}

/// Print `content` to stdout, or write it to `output` when given.
fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            report::write_report(content, path)?;
            info!("Report saved to: {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
