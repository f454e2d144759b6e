//! CLI command implementations

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod health;
pub mod logs;
pub mod todos;

use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use serde::Serialize;
use tododash_core::ports::LoginRedirect;
use tododash_core::{EntryPoint, Error, LogEvent, LoggingService, OperationResult, TodoContext};

use crate::output;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the data directory from TODODASH_DIR or default to ~/.tododash
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TODODASH_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tododash")
    }
}

/// Tells the user to sign in again once the server rejects the session
pub struct TerminalRedirect;

impl LoginRedirect for TerminalRedirect {
    fn redirect_to_login(&self, reason: &str) {
        eprintln!(
            "{} {}",
            "Session expired:".yellow(),
            format!("{}. Run 'td login' to sign in again.", reason).dimmed()
        );
    }
}

/// Build the context for the data directory
///
/// With `verifyOnStartup` on, a restored session is checked against the
/// server before the command runs.
pub fn get_context() -> Result<TodoContext> {
    let data_dir = get_data_dir();
    let ctx = TodoContext::new(&data_dir, Arc::new(TerminalRedirect))
        .context("Failed to initialize tododash context")?;

    if let Some(warning) = ctx.session.restore_warning() {
        output::warning(warning);
    }

    if ctx.config.verify_on_startup && ctx.session.is_authenticated() {
        if let Err(e) = ctx.session.verify() {
            output::warning(&format!("Could not verify session: {}", e.user_message()));
        }
    }

    Ok(ctx)
}

/// Shared bookkeeping for a single command run
pub struct Invocation {
    logger: Option<LoggingService>,
    command: &'static str,
    resource: &'static str,
    json: bool,
}

impl Invocation {
    /// Record that `command` ran against `resource`
    pub fn start(command: &'static str, resource: &'static str, json: bool) -> Self {
        let logger = get_logger();
        log_event(
            &logger,
            LogEvent::new("command_executed")
                .with_command(command)
                .with_resource(resource),
        );
        Self {
            logger,
            command,
            resource,
            json,
        }
    }

    pub fn json(&self) -> bool {
        self.json
    }

    /// Log a named event for this command
    pub fn event(&self, event: &str) {
        log_event(
            &self.logger,
            LogEvent::new(event)
                .with_command(self.command)
                .with_resource(self.resource),
        );
    }

    /// Log a failure and turn it into the message shown to the user
    pub fn failed(&self, message: &str) -> anyhow::Error {
        log_event(
            &self.logger,
            LogEvent::new(format!("{}_failed", self.command))
                .with_command(self.command)
                .with_resource(self.resource)
                .with_error(message),
        );
        anyhow!("{}", message)
    }

    /// Print a result as JSON or hand the value to `render`
    ///
    /// In JSON mode a failure is printed as an `OperationResult` and the
    /// process exits with status 1.
    pub fn finish<T: Serialize>(
        &self,
        result: std::result::Result<T, Error>,
        render: impl FnOnce(&T),
    ) -> Result<()> {
        let result = result.map_err(|e| {
            let message = e.user_message();
            let _ = self.failed(&message);
            message
        });

        if self.json {
            let out = match result {
                Ok(data) => OperationResult::ok(data),
                Err(message) => OperationResult::fail(message),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            if !out.success {
                exit(1);
            }
            return Ok(());
        }

        let value = result.map_err(|message| anyhow!("{}", message))?;
        render(&value);
        Ok(())
    }
}
