//! Event log stored in logs.duckdb
//!
//! Only event names, command names and resource kinds are recorded. Todo
//! titles, descriptions, emails and tokens never reach this table.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use duckdb::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;

const LOG_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform, \
                           event, command, resource, error_message, error_details";

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp in the high bits, a rolling counter in the low 16
fn generate_id() -> u64 {
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((now_ms() as u64) << 16) | counter
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Which surface produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Dashboard,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Dashboard => "dashboard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Kind of thing touched, e.g. `todo` or `session`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            command: None,
            resource: None,
            error_message: None,
            error_details: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A stored log row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub resource: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

impl LogEntry {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            entry_point: row.get(2)?,
            app_version: row.get(3)?,
            platform: row.get(4)?,
            event: row.get(5)?,
            command: row.get(6)?,
            resource: row.get(7)?,
            error_message: row.get(8)?,
            error_details: row.get(9)?,
        })
    }
}

/// Totals shown by `td logs stats`
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogStats {
    pub total: u64,
    pub errors: u64,
    /// Event name and count, most frequent first
    pub by_event: Vec<(String, u64)>,
    pub oldest: Option<i64>,
    pub newest: Option<i64>,
}

pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open (or create) logs.duckdb in `data_dir` and apply pending migrations
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open event log at {}", db_path.display()))?;

        let service = Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        };
        service.run_migrations()?;

        Ok(service)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;

        let bootstrapped: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !bootstrapped {
            if let Some((name, sql)) = LOG_MIGRATIONS.iter().find(|(n, _)| *n == "000_migrations.sql")
            {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                    [name],
                )?;
            }
        }

        let mut stmt = conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let applied: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for (name, sql) in LOG_MIGRATIONS.iter() {
            if applied.iter().any(|a| a == name) {
                continue;
            }
            conn.execute_batch(sql)
                .with_context(|| format!("Event log migration {} failed", name))?;
            conn.execute(
                "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                [name],
            )?;
        }

        Ok(())
    }

    /// Record an event; entry point, version and platform are filled in here
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            &format!(
                "INSERT INTO sys_logs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                LOG_COLUMNS
            ),
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.command,
                &event.resource,
                &event.error_message,
                &event.error_details,
            ],
        )?;

        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_command(command))
    }

    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut log_event = LogEvent::new(event).with_error(message);
        if let Some(d) = details {
            log_event = log_event.with_error_details(d);
        }
        self.log(log_event)
    }

    fn query(&self, filter: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_logs {} ORDER BY timestamp DESC, id DESC LIMIT ?",
            LOG_COLUMNS, filter
        ))?;
        let entries = stmt
            .query_map([limit as i64], LogEntry::from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    /// Most recent entries first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query("", limit)
    }

    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query("WHERE error_message IS NOT NULL", limit)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn stats(&self) -> Result<LogStats> {
        let conn = self.lock()?;

        let (total, errors, oldest, newest): (u64, u64, Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT COUNT(*), COUNT(error_message), MIN(timestamp), MAX(timestamp) FROM sys_logs",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        let mut stmt = conn.prepare(
            "SELECT event, COUNT(*) AS n FROM sys_logs GROUP BY event ORDER BY n DESC, event",
        )?;
        let by_event = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(LogStats {
            total,
            errors,
            by_event,
            oldest,
            newest,
        })
    }

    /// Delete entries older than `timestamp_ms` (unix ms)
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn clear(&self) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_logs", [])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
