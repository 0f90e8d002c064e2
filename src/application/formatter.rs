//! Output formatting for sessions, history and status.
//!
//! Supports multiple output formats: table, JSON and compact rows.

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::domain::{FeedingSession, Phase};

use super::controller::Notice;
use super::sync_service::SyncReport;

/// Marker shown next to sessions that still wait for sync.
pub const PENDING_MARKER: &str = "⚠️";

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Boxed table.
    #[default]
    Table,
    /// JSON format for programmatic use.
    Json,
    /// One line per session.
    Compact,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "compact" | "rows" => Ok(Self::Compact),
            _ => Err(format!("Unknown format: {s}. Use: table, json, compact")),
        }
    }
}

/// Start time in the local time zone.
fn local_start(session: &FeedingSession) -> String {
    session
        .start_time
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// `"N min | Xml"` plus the pending marker.
fn details(session: &FeedingSession) -> String {
    let mut out = format!("{} min | {}ml", session.whole_minutes(), session.amount_ml);
    if session.is_pending() {
        out.push(' ');
        out.push_str(PENDING_MARKER);
    }
    out
}

/// Formats one history row: local date/time, whole minutes, amount, marker.
#[must_use]
pub fn format_history_row(session: &FeedingSession) -> String {
    format!("{}  {}", local_start(session), details(session))
}

/// Formats the history as a table.
#[must_use]
pub fn format_history_table(sessions: &[FeedingSession]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Started", "Duration", "Amount", "Sync"]);

    for session in sessions {
        let sync = if session.is_pending() {
            format!("{PENDING_MARKER} pending")
        } else {
            "synced".to_string()
        };

        table.add_row(vec![
            session.id.to_string(),
            local_start(session),
            format!("{} min", session.whole_minutes()),
            format!("{} ml", session.amount_ml),
            sync,
        ]);
    }

    table.to_string()
}

/// Formats the history in the requested format.
///
/// # Errors
/// Returns error if JSON serialization fails.
pub fn format_history(
    sessions: &[FeedingSession],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    if sessions.is_empty() && format != OutputFormat::Json {
        return Ok("No feeding sessions recorded yet.".to_string());
    }

    Ok(match format {
        OutputFormat::Table => format_history_table(sessions),
        OutputFormat::Json => serde_json::to_string_pretty(sessions)?,
        OutputFormat::Compact => sessions
            .iter()
            .map(format_history_row)
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

/// Snapshot rendered by the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub phase: Phase,
    pub started_at: Option<DateTime<Utc>>,
    pub display: String,
    pub amount_ml: u32,
    pub amount_input_visible: bool,
    pub online: bool,
    pub persistent: bool,
    pub stored: Option<usize>,
    pub pending: Option<usize>,
}

/// Formats the status view.
///
/// # Errors
/// Returns error if JSON serialization fails.
pub fn format_status(view: &StatusView, format: OutputFormat) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(view);
    }

    let phase = match view.phase {
        Phase::Feeding => "feeding".green().bold(),
        Phase::Idle => "idle".normal(),
    };

    let mut out = format!(
        "{}\n  Timer: {} ({})\n  Amount: {} ml",
        "🍼 Feeding Tracker".bold(),
        view.display.cyan(),
        phase,
        view.amount_ml.to_string().cyan(),
    );

    if view.amount_input_visible {
        out.push_str(&format!(" {}", "(waiting to be saved)".yellow()));
    }

    if let Some(started) = view.started_at {
        out.push_str(&format!(
            "\n  Started: {}",
            started.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ));
    }

    out.push_str(&format!("\n  Network: {}", connectivity_label(view.online)));

    if view.persistent {
        out.push_str(&format!(
            "\n  Stored sessions: {}\n  Pending sync: {}",
            view.stored.unwrap_or_default().to_string().cyan(),
            view.pending.unwrap_or_default().to_string().yellow(),
        ));
    } else {
        out.push_str(&format!("\n  Storage: {}", "unavailable".red()));
    }

    Ok(out)
}

/// Online label, or the offline indicator.
#[must_use]
pub fn connectivity_label(online: bool) -> String {
    if online {
        "online".green().to_string()
    } else {
        "📴 offline".yellow().bold().to_string()
    }
}

/// Formats a transient notice.
#[must_use]
pub fn format_notice(notice: &Notice) -> String {
    match notice {
        Notice::Success(message) => format!("{} {}", "✓".green(), message),
        Notice::Error(message) => format!("{} {}", "✗".red(), message.red()),
    }
}

/// Formats the outcome of a sync run.
#[must_use]
pub fn format_sync_report(report: &SyncReport) -> String {
    if report.pending == 0 {
        return format!("{} Nothing to sync", "✓".green());
    }

    let mut out = format!(
        "{} Synced {} of {} pending session(s)",
        "🔄".bold(),
        report.synced.to_string().green(),
        report.pending
    );
    if report.failed > 0 {
        out.push_str(&format!(", {} failed", report.failed.to_string().red()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewSession, SyncStatus};
    use chrono::{Duration, TimeZone, Utc};

    fn session(secs: i64, amount: u32, status: SyncStatus) -> FeedingSession {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        NewSession::new(start, start + Duration::seconds(secs), amount, status)
            .unwrap()
            .with_id(1)
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("compact".parse::<OutputFormat>(), Ok(OutputFormat::Compact));
        assert!("markdown".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_row_rounds_minutes_down() {
        assert!(format_history_row(&session(30, 50, SyncStatus::Synced)).ends_with("0 min | 50ml"));
        assert!(format_history_row(&session(45, 80, SyncStatus::Synced)).ends_with("0 min | 80ml"));
        assert!(format_history_row(&session(119, 90, SyncStatus::Synced)).ends_with("1 min | 90ml"));
    }

    #[test]
    fn test_row_marks_pending() {
        let row = format_history_row(&session(600, 100, SyncStatus::Pending));
        assert!(row.ends_with(&format!("10 min | 100ml {PENDING_MARKER}")));
        assert!(!format_history_row(&session(600, 100, SyncStatus::Synced)).contains(PENDING_MARKER));
    }

    #[test]
    fn test_empty_history() {
        let text = format_history(&[], OutputFormat::Table).unwrap();
        assert_eq!(text, "No feeding sessions recorded yet.");
        assert_eq!(format_history(&[], OutputFormat::Json).unwrap(), "[]");
    }

    #[test]
    fn test_compact_keeps_order() {
        let newer = FeedingSession {
            id: 2,
            amount_ml: 80,
            ..session(45, 80, SyncStatus::Synced)
        };
        let older = session(30, 50, SyncStatus::Synced);

        let text = format_history(&[newer, older], OutputFormat::Compact).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("80ml"));
        assert!(lines[1].ends_with("50ml"));
    }
}
