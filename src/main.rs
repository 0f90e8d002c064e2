//! Feeding Tracker - time feeds and keep a local history of milk amounts.
//!
//! Each command loads the in-progress feed from the data directory, applies
//! one action and writes it back, so a feed can be started in one terminal
//! and saved from another.
//!
//!   feeding-tracker start               # start the timer
//!   feeding-tracker stop                # stop it, amount entry opens
//!   feeding-tracker amount up 3         # +3 steps (or `amount set 120`)
//!   feeding-tracker save                # store the feed, show history
//!   feeding-tracker history --limit 5   # most recent feeds
//!   feeding-tracker interactive         # keyboard-driven with live timer

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use colored::Colorize;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    connectivity_label, format_history, format_notice, format_status, format_sync_report,
    FeedingController, LocalOnlySync, OutputFormat, SaveOutcome, StatusView,
};
use cli::{interactive, AmountAction, Cli, Commands};
use domain::{AppConfig, AppError, Transition};
use infrastructure::{
    config_file_path, ensure_config_exists, haptics_for, load_config, SessionStore, StateFile,
    SystemClock, TrackerState,
};

/// Everything a command needs once configuration is loaded.
struct App {
    config: AppConfig,
    controller: FeedingController,
    state_file: StateFile,
    state: TrackerState,
    online: bool,
    format: OutputFormat,
}

impl App {
    fn save_state(&self) -> anyhow::Result<()> {
        self.state_file
            .save(&self.state)
            .context("Failed to save tracker state")
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), render_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// Main application logic.
async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let format = cli
        .output_format()
        .map_err(|message| AppError::Config { message })?;
    let data_dir = cli.data_dir.as_deref();

    if matches!(cli.command, Commands::Init) {
        cmd_init(data_dir)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(data_dir).context("Failed to load configuration")?;

    if matches!(cli.command, Commands::Paths) {
        cmd_paths(&config, data_dir);
        return Ok(ExitCode::SUCCESS);
    }

    let mut ctx = build_context(config, cli.offline, format).await?;

    // Apply the current connectivity the way a fresh start would; commands
    // that change or use connectivity explicitly handle it themselves.
    if !matches!(
        cli.command,
        Commands::Online | Commands::Offline | Commands::Sync
    ) {
        if let Some(report) = ctx.controller.handle_online_status(ctx.online).await {
            tracing::info!(synced = report.synced, "Startup sync");
        }
    }

    match cli.command {
        Commands::Start => cmd_start(&mut ctx)?,
        Commands::Stop => cmd_stop(&mut ctx)?,
        Commands::Toggle => cmd_toggle(&mut ctx)?,
        Commands::Amount { action } => cmd_amount(&mut ctx, action)?,
        Commands::Save { amount } => return cmd_save(&mut ctx, amount).await,
        Commands::History { limit } => cmd_history(&ctx, limit).await?,
        Commands::Status => cmd_status(&ctx).await?,
        Commands::Sync => cmd_sync(&ctx).await?,
        Commands::Online => cmd_connectivity(&mut ctx, true).await?,
        Commands::Offline => cmd_connectivity(&mut ctx, false).await?,
        Commands::Watch => cmd_watch(&ctx).await?,
        Commands::Interactive => cmd_interactive(&mut ctx, cli.offline).await?,
        Commands::Paths | Commands::Init => {}
    }

    Ok(ExitCode::SUCCESS)
}

async fn build_context(
    config: AppConfig,
    force_offline: bool,
    format: OutputFormat,
) -> anyhow::Result<App> {
    let store = match SessionStore::open(&config.storage_db_path()).await {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::error!(error = %e, "Continuing without persistence");
            None
        }
    };

    let controller = FeedingController::new(
        store,
        LocalOnlySync,
        Box::new(SystemClock),
        haptics_for(config.feedback.haptics),
        config.tracker.clone(),
    );

    let state_file = StateFile::new(config.state_file_path());
    let state = state_file
        .load_or_default()
        .context("Failed to load tracker state")?;
    let online = !force_offline && state.is_online(config.network.online);

    Ok(App {
        config,
        controller,
        state_file,
        state,
        online,
        format,
    })
}

/// Start a feed.
fn cmd_start(ctx: &mut App) -> anyhow::Result<()> {
    ctx.controller.start(&mut ctx.state.timer)?;
    ctx.save_state()?;

    println!(
        "{} Feed started at {}",
        "▶".green().bold(),
        Local::now().format("%H:%M:%S")
    );
    print_offline_indicator(ctx.online);
    Ok(())
}

/// Stop the running feed.
fn cmd_stop(ctx: &mut App) -> anyhow::Result<()> {
    ctx.controller.stop(&mut ctx.state.timer)?;
    ctx.save_state()?;
    print_stopped(ctx);
    Ok(())
}

/// Press the action button.
fn cmd_toggle(ctx: &mut App) -> anyhow::Result<()> {
    let transition = ctx.controller.press_action(&mut ctx.state.timer);
    ctx.save_state()?;

    match transition {
        Transition::Started => println!("{} Feed started", "▶".green().bold()),
        Transition::Stopped => print_stopped(ctx),
    }
    Ok(())
}

fn print_stopped(ctx: &App) {
    println!(
        "{} Feed stopped at {}",
        "⏹".yellow().bold(),
        ctx.controller.display(&ctx.state.timer).cyan()
    );
    println!(
        "   Amount: {} ml. Adjust with `amount up|down|set`, then `save`.",
        ctx.state.timer.pending_amount()
    );
}

/// Change the pending amount.
fn cmd_amount(ctx: &mut App, action: AmountAction) -> anyhow::Result<()> {
    let timer = &mut ctx.state.timer;
    let amount = match action {
        AmountAction::Up { steps } => ctx.controller.adjust_amount(timer, i64::from(steps)),
        AmountAction::Down { steps } => ctx.controller.adjust_amount(timer, -i64::from(steps)),
        AmountAction::Set { ml } => {
            ctx.controller.set_amount(timer, ml);
            ml
        }
    };
    ctx.save_state()?;

    println!("🍼 Amount: {} ml", amount.to_string().cyan());
    Ok(())
}

/// Save the stopped feed and show the refreshed history.
async fn cmd_save(ctx: &mut App, amount: Option<u32>) -> anyhow::Result<ExitCode> {
    if let Some(ml) = amount {
        ctx.controller.set_amount(&mut ctx.state.timer, ml);
    }

    let outcome = ctx.controller.save(&mut ctx.state.timer, ctx.online).await;
    ctx.save_state()?;

    match &outcome {
        SaveOutcome::Saved { session, history } => {
            println!("{}", format_notice(&outcome.notice()));
            if session.is_pending() {
                print_offline_indicator(false);
            }
            println!("{}", format_history(history, ctx.format)?);
            Ok(ExitCode::SUCCESS)
        }
        SaveOutcome::Failed { .. } => {
            eprintln!("{}", format_notice(&outcome.notice()));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Show the most recent feeds.
async fn cmd_history(ctx: &App, limit: Option<usize>) -> anyhow::Result<()> {
    if !ctx.controller.has_storage() {
        eprintln!("{} Storage is unavailable, no history to show", "⚠".yellow());
    }

    let limit = limit.unwrap_or(ctx.config.tracker.history_limit);
    let sessions = ctx.controller.load_recent(limit).await?;

    println!("{}", format_history(&sessions, ctx.format)?);
    Ok(())
}

/// Show the tracker status.
async fn cmd_status(ctx: &App) -> anyhow::Result<()> {
    let counts = if ctx.controller.has_storage() {
        Some(ctx.controller.counts().await?)
    } else {
        None
    };

    let timer = &ctx.state.timer;
    let view = StatusView {
        phase: timer.phase(),
        started_at: timer.start_time(),
        display: ctx.controller.display(timer),
        amount_ml: timer.pending_amount(),
        amount_input_visible: timer.amount_input_visible(),
        online: ctx.online,
        persistent: counts.is_some(),
        stored: counts.map(|(total, _)| total),
        pending: counts.map(|(_, pending)| pending),
    };

    println!("{}", format_status(&view, ctx.format)?);
    Ok(())
}

/// Sync pending feeds now.
async fn cmd_sync(ctx: &App) -> anyhow::Result<()> {
    if !ctx.online {
        print_offline_indicator(false);
        println!("Pending feeds will be synced once back online.");
        return Ok(());
    }

    let report = ctx.controller.sync_now().await?;
    println!("{}", format_sync_report(&report));
    Ok(())
}

/// Record a connectivity change.
async fn cmd_connectivity(ctx: &mut App, online: bool) -> anyhow::Result<()> {
    ctx.state.online = Some(online);
    ctx.save_state()?;

    println!("Network: {}", connectivity_label(online));

    if let Some(report) = ctx.controller.handle_online_status(online).await {
        println!("{}", format_sync_report(&report));
    }
    Ok(())
}

/// Live timer display until Ctrl-C or until the feed is stopped elsewhere.
async fn cmd_watch(ctx: &App) -> anyhow::Result<()> {
    if !ctx.state.timer.is_feeding() {
        println!(
            "⏱  {}  (no feed running)",
            ctx.controller.display(&ctx.state.timer)
        );
        return Ok(());
    }

    let mut tick = tokio::time::interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let state = ctx.state_file.load_or_default()?;
                write!(stdout, "\r⏱  {}  ", ctx.controller.display(&state.timer).cyan())?;
                stdout.flush()?;

                if !state.timer.is_feeding() {
                    writeln!(stdout, "(stopped)")?;
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                writeln!(stdout)?;
                break;
            }
        }
    }

    Ok(())
}

/// Keyboard-driven session.
async fn cmd_interactive(ctx: &mut App, force_offline: bool) -> anyhow::Result<()> {
    let mut session = interactive::Session {
        state: &mut ctx.state,
        state_file: &ctx.state_file,
        default_online: ctx.config.network.online,
        force_offline,
        format: ctx.format,
    };

    interactive::run(&ctx.controller, &mut session).await?;
    Ok(())
}

/// Show the file paths being used.
fn cmd_paths(config: &AppConfig, data_dir: Option<&Path>) {
    println!("{}", "📂 Feeding Tracker Paths".bold());
    println!();
    println!("  Data dir: {}", config.data_dir().display());
    println!("  Database: {}", config.storage_db_path().display());
    println!("  State:    {}", config.state_file_path().display());
    println!("  Config:   {}", config_file_path(data_dir).display());
}

/// Write the default configuration file.
fn cmd_init(data_dir: Option<&Path>) -> anyhow::Result<()> {
    let path = config_file_path(data_dir);

    if ensure_config_exists(data_dir)? {
        println!("{} Created {}", "✓".green(), path.display());
    } else {
        println!("Configuration already exists at {}", path.display());
    }
    Ok(())
}

fn print_offline_indicator(online: bool) {
    if !online {
        println!(
            "   {} saved feeds stay pending until back online",
            connectivity_label(false)
        );
    }
}

/// Joins the error chain, skipping causes whose text an outer error already
/// carries.
fn render_error(err: &anyhow::Error) -> String {
    let mut out = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
    }
    out
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
