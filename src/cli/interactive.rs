//! Keyboard-driven session.
//!
//! A single-threaded event loop over three sources: stdin lines, the
//! one-second display tick (armed only while a feed runs) and Ctrl-C.

use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use crate::application::{
    connectivity_label, format_history, format_notice, format_sync_report, FeedingController,
    OutputFormat, RemoteSync, SaveOutcome,
};
use crate::domain::{AppError, FeedingSession, Result, Transition};
use crate::infrastructure::{StateFile, TrackerState};

const TICK: Duration = Duration::from_secs(1);

const HELP: &str = "\
  <enter>   start / stop the feed
  + / -     adjust the amount by one step
  <number>  enter the amount directly
  s         save the stopped feed
  h         show the history
  on / off  connectivity came back / was lost
  ?         this help
  q         quit";

/// One line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Action,
    Increase,
    Decrease,
    SetAmount(u32),
    Save,
    History,
    Online,
    Offline,
    Help,
    Quit,
    Unknown,
}

impl Input {
    /// Parses a trimmed input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" | "t" => Self::Action,
            "+" => Self::Increase,
            "-" => Self::Decrease,
            "s" | "save" => Self::Save,
            "h" | "history" => Self::History,
            "on" | "online" => Self::Online,
            "off" | "offline" => Self::Offline,
            "?" | "help" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            other => other.parse().map_or(Self::Unknown, Self::SetAmount),
        }
    }
}

/// Everything the loop mutates besides the controller.
pub struct Session<'a> {
    pub state: &'a mut TrackerState,
    pub state_file: &'a StateFile,
    pub default_online: bool,
    pub force_offline: bool,
    pub format: OutputFormat,
}

impl Session<'_> {
    fn online(&self) -> bool {
        !self.force_offline && self.state.is_online(self.default_online)
    }
}

/// Runs the loop until `q`, end of input, or Ctrl-C.
///
/// # Errors
/// Returns error if stdin cannot be read or the state cannot be saved.
pub async fn run<R: RemoteSync>(
    controller: &FeedingController<R>,
    session: &mut Session<'_>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(TICK);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    println!("{}", "🍼 Feeding Tracker".bold());
    println!("{HELP}");
    println!("  Network: {}", connectivity_label(session.online()));

    loop {
        tokio::select! {
            _ = tick.tick(), if session.state.timer.is_feeding() => {
                print!("\r⏱  {}  ", controller.display(&session.state.timer).cyan());
                std::io::stdout()
                    .flush()
                    .map_err(|e| AppError::io("Failed to write to terminal", e))?;
            }
            line = lines.next_line() => {
                let line = line.map_err(|e| AppError::io("Failed to read input", e))?;
                let Some(line) = line else { break };

                let input = Input::parse(&line);
                if input == Input::Quit {
                    break;
                }

                handle(controller, session, input).await;
                session.state_file.save(session.state)?;
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                tracing::debug!("Interrupted");
                break;
            }
        }
    }

    session.state_file.save(session.state)
}

async fn handle<R: RemoteSync>(
    controller: &FeedingController<R>,
    session: &mut Session<'_>,
    input: Input,
) {
    match input {
        Input::Action => match controller.press_action(&mut session.state.timer) {
            Transition::Started => println!("{} Feed started", "▶".green()),
            Transition::Stopped => println!(
                "\r{} Feed stopped at {}. Enter the amount, then `s` to save.",
                "⏹".yellow(),
                controller.display(&session.state.timer)
            ),
        },
        Input::Increase => {
            let amount = controller.adjust_amount(&mut session.state.timer, 1);
            println!("Amount: {amount} ml");
        }
        Input::Decrease => {
            let amount = controller.adjust_amount(&mut session.state.timer, -1);
            println!("Amount: {amount} ml");
        }
        Input::SetAmount(ml) => {
            controller.set_amount(&mut session.state.timer, ml);
            println!("Amount: {ml} ml");
        }
        Input::Save => {
            let online = session.online();
            let outcome = controller.save(&mut session.state.timer, online).await;
            println!("{}", format_notice(&outcome.notice()));
            if let SaveOutcome::Saved { history, .. } = &outcome {
                print_history(history, session.format);
            }
        }
        Input::History => match controller.load_history().await {
            Ok(history) => print_history(&history, session.format),
            Err(e) => println!("{} {}", "✗".red(), e),
        },
        Input::Online => {
            session.state.online = Some(true);
            println!("Network: {}", connectivity_label(session.online()));
            if let Some(report) = controller.handle_online_status(session.online()).await {
                println!("{}", format_sync_report(&report));
            }
        }
        Input::Offline => {
            session.state.online = Some(false);
            controller.handle_online_status(false).await;
            println!("Network: {}", connectivity_label(false));
        }
        Input::Help => println!("{HELP}"),
        Input::Unknown => println!("Unknown input, `?` for help"),
        Input::Quit => {}
    }
}

fn print_history(history: &[FeedingSession], format: OutputFormat) {
    match format_history(history, format) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::warn!(error = %e, "Failed to render history"),
    }
}
