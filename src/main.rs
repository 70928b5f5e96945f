//! Salesboard - sales dashboard backed by a spreadsheet
//!
//! Loads product configuration, sales rows and notes, aggregates them
//! per product and renders yearly, monthly and per-platform views with
//! a growth forecast. Runs once, or keeps refreshing with `--watch`.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad config, data could not be loaded, etc.)

mod analysis;
mod cli;
mod config;
mod dashboard;
mod ingest;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::{Args, Command, OutputFormat, COMMAND_HELP};
use config::{Config, DEFAULT_CONFIG_FILE};
use dashboard::{rebuild, Dashboard, DashboardDefaults, RefreshGate, LOAD_ERROR_BANNER};
use indicatif::{ProgressBar, ProgressStyle};
use ingest::{IngestError, TableSource};
use models::{InsightTable, ProductCatalog};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

type RebuildResult = Result<ProductCatalog, IngestError>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config first: its verbose flag feeds the log level
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    if let Err(e) = config.validate() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    init_logging(&args, config.general.verbose);

    info!("Salesboard v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        "Selection from arguments: product={:?} view={:?} year={:?} platform={:?}",
        args.product, args.view, args.year, args.platform
    );

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Salesboard failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .salesboard.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the spreadsheet, source and key insights.");
    Ok(())
}

/// Initialize logging on stderr. `RUST_LOG` overrides the verbosity flags.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = if config_verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
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

/// Load configuration from file or use defaults. Runs before logging
/// is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!(
                "⚠️  Failed to load {}: {:#}. Using defaults.",
                DEFAULT_CONFIG_FILE, e
            );
            Ok(Config::default())
        }
    }
}

/// Load the data once, then either render and exit or start watching.
async fn run(args: Args, config: Config) -> Result<i32> {
    debug!("Source: {:?}, refresh every {}s", config.source.kind, config.refresh.interval_seconds);

    let source = Arc::new(TableSource::from_config(&config.source)?);
    let insights = Arc::new(config.insights.clone());
    let output = config.general.output.as_ref().map(PathBuf::from);

    let mut dashboard = Dashboard::new(DashboardDefaults::from(&config.dashboard));

    let spinner = (!args.quiet).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Loading data from {}", source.describe()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = rebuild(&source, &insights).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    dashboard.apply_rebuild(result);
    apply_initial_selection(&mut dashboard, &args);

    if !args.watch {
        if !dashboard.has_data() {
            eprintln!("❌ {}", dashboard.banner().unwrap_or(LOAD_ERROR_BANNER));
            return Ok(1);
        }
        render(&dashboard, args.format, output.as_deref())?;
        return Ok(0);
    }

    let interval = Duration::from_secs(config.refresh.interval_seconds);
    watch(dashboard, source, insights, interval, args.format, output.as_deref()).await?;
    Ok(0)
}

/// Apply --year/--platform, then the view so monthly can pick a year.
fn apply_initial_selection(dashboard: &mut Dashboard, args: &Args) {
    if let Some(ref year) = args.year {
        dashboard.set_year(year);
    }
    if let Some(ref platform) = args.platform {
        dashboard.set_platform(platform);
    }
    let view = dashboard.selection().view;
    dashboard.set_view(view);
}

/// Render the current selection to stdout or the output file.
fn render(dashboard: &Dashboard, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let Some(view) = dashboard.recompute() else {
        match dashboard.banner() {
            Some(banner) => eprintln!("❌ {}", banner),
            None => eprintln!("No data found for product: {}", dashboard.selection().product),
        }
        return Ok(());
    };

    let content = match format {
        OutputFormat::Json => report::generate_json_report(&view)?,
        OutputFormat::Markdown => report::generate_markdown_report(&view),
    };

    match output {
        Some(path) => {
            report::write_report(&content, path)?;
            info!("Dashboard written to {}", path.display());
        }
        None => println!("{}", content),
    }

    Ok(())
}

/// Start a background rebuild unless one is already running.
fn spawn_refresh(
    gate: &RefreshGate,
    source: &Arc<TableSource>,
    insights: &Arc<InsightTable>,
    tx: &mpsc::Sender<RebuildResult>,
) {
    let Some(permit) = gate.try_begin() else {
        info!("Refresh already in progress, skipping");
        return;
    };

    let source = Arc::clone(source);
    let insights = Arc::clone(insights);
    let tx = tx.clone();

    tokio::spawn(async move {
        let _permit = permit;
        let result = rebuild(&source, &insights).await;
        if tx.send(result).await.is_err() {
            debug!("Dashboard closed before refresh finished");
        }
    });
}

/// Keep the dashboard live: periodic refresh, stdin commands, and
/// rebuilds delivered from background tasks.
async fn watch(
    mut dashboard: Dashboard,
    source: Arc<TableSource>,
    insights: Arc<InsightTable>,
    interval: Duration,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let gate = RefreshGate::new();
    let (tx, mut rx) = mpsc::channel::<RebuildResult>(4);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately and the data was just loaded.
    ticker.tick().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    render(&dashboard, format, output)?;
    eprintln!("{}", COMMAND_HELP);
    info!("Refreshing every {}s", interval.as_secs());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                debug!("Scheduled refresh");
                spawn_refresh(&gate, &source, &insights, &tx);
            }
            Some(result) = rx.recv() => {
                dashboard.apply_rebuild(result);
                render(&dashboard, format, output)?;
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    debug!("stdin closed, still refreshing");
                    stdin_open = false;
                    continue;
                };

                match Command::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Help)) => eprintln!("{}", COMMAND_HELP),
                    Ok(Some(Command::Refresh)) => {
                        spawn_refresh(&gate, &source, &insights, &tx);
                    }
                    Ok(Some(command)) => {
                        apply_command(&mut dashboard, command);
                        render(&dashboard, format, output)?;
                    }
                    Err(message) => eprintln!("{}", message),
                }
            }
        }
    }

    info!("Stopped watching");
    Ok(())
}

/// Apply a selection command to the dashboard.
fn apply_command(dashboard: &mut Dashboard, command: Command) {
    match command {
        Command::Product(name) => {
            if !dashboard.select_product(&name) {
                let catalog = dashboard.catalog();
                let names: Vec<&str> = catalog.names().collect();
                eprintln!("Unknown product: {} (available: {})", name, names.join(", "));
            }
        }
        Command::View(view) => dashboard.set_view(view),
        Command::Year(year) => dashboard.set_year(&year),
        Command::Platform(platform) => dashboard.set_platform(&platform),
        Command::Refresh | Command::Help | Command::Quit => {}
    }
}
