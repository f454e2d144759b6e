//! Logs command - view and manage the event log

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_data_dir;
use crate::output;
use tododash_core::{EntryPoint, LoggingService};

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete log entries
    Clear {
        /// Only delete entries older than N days
        #[arg(long)]
        older_than_days: Option<i64>,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir)?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List { limit, errors, json } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Entry", "Event", "Context", "Error"]);

            for entry in &entries {
                let context = [entry.command.as_deref(), entry.resource.as_deref()]
                    .iter()
                    .filter_map(|&s| s)
                    .collect::<Vec<_>>()
                    .join(", ");

                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.entry_point.clone(),
                    entry.event.clone(),
                    context,
                    entry.error_message.clone().unwrap_or_default(),
                ]);
            }

            println!("{}", table);
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            if !force && !json {
                let prompt = match older_than_days {
                    Some(days) => format!("Delete logs older than {} days?", days),
                    None => "Delete all logs?".to_string(),
                };
                if !Confirm::new().with_prompt(prompt).default(false).interact()? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = match older_than_days {
                Some(days) => {
                    let cutoff = Utc::now() - Duration::days(days);
                    service.delete_before(cutoff.timestamp_millis())?
                }
                None => service.clear()?,
            };

            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                println!("Deleted {} log entries", deleted);
            }
        }
        LogsCommands::Stats { json } => {
            let stats = service.stats()?;
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total_entries": stats.total,
                        "error_count": stats.errors,
                        "by_event": stats.by_event,
                        "oldest": stats.oldest,
                        "newest": stats.newest,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    })
                );
                return Ok(());
            }

            println!("{}", "Log Statistics".bold());
            println!("  Total entries: {}", stats.total);
            println!("  Errors: {}", stats.errors);
            if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                println!(
                    "  Range: {} to {}",
                    format_timestamp(oldest),
                    format_timestamp(newest)
                );
            }
            println!("  Database: {}", db_path.display());
            println!("  Size: {}", output::format_size(size_bytes));

            if !stats.by_event.is_empty() {
                println!();
                println!("{}", "Events".bold());
                for (event, count) in stats.by_event.iter().take(10) {
                    println!("  {:<28} {}", event, count);
                }
            }
        }
    }

    Ok(())
}
