//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

pub mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;

/// Feeding Tracker - time feeds, record milk amounts, keep a local history.
#[derive(Parser, Debug)]
#[command(name = "feeding-tracker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: table, json, or compact.
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Data directory holding the database, state and config files.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Treat this invocation as offline without recording it.
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a feed.
    Start,

    /// Stop the running feed.
    Stop,

    /// Press the action button: start when idle, stop when feeding.
    Toggle,

    /// Change the milk amount of the stopped feed.
    Amount {
        #[command(subcommand)]
        action: AmountAction,
    },

    /// Save the stopped feed.
    Save {
        /// Amount in milliliters (keeps the entered amount if omitted).
        #[arg(short, long)]
        amount: Option<u32>,
    },

    /// Show the most recent feeds, newest first.
    History {
        /// Number of feeds to show (defaults to the configured limit).
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the timer, amount, connectivity and storage state.
    Status,

    /// Mark pending feeds as synced now.
    Sync,

    /// Record that connectivity is back; pending feeds are synced.
    Online,

    /// Record that connectivity is lost; new feeds are saved as pending.
    Offline,

    /// Show the running timer, updated every second, until Ctrl-C.
    Watch,

    /// Keyboard-driven session with a live timer.
    Interactive,

    /// Show the file paths being used.
    Paths,

    /// Write a default configuration file.
    Init,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum AmountAction {
    /// Increase by the configured step.
    Up {
        /// Number of steps.
        #[arg(default_value = "1")]
        steps: u32,
    },

    /// Decrease by the configured step, never below zero.
    Down {
        /// Number of steps.
        #[arg(default_value = "1")]
        steps: u32,
    },

    /// Enter the amount directly.
    Set {
        /// Amount in milliliters.
        ml: u32,
    },
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}
