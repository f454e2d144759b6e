//! Config command - show and change settings.json

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::{get_data_dir, Invocation};
use crate::output;
use tododash_core::config::Config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the todo API base URL
    SetBaseUrl {
        /// e.g. http://localhost:8000
        url: String,
    },
    /// Set the request timeout in seconds
    SetTimeout {
        secs: u64,
    },
    /// Check the stored session against the server on every command
    VerifyOnStartup {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let data_dir = get_data_dir();
    let mut config = Config::load(&data_dir)?;

    match command {
        ConfigCommands::Show { json } => {
            let _run = Invocation::start("config", "settings", json);
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }
            println!("{}", "Settings".bold());
            println!("  API base URL: {}", config.base_url);
            println!("  Timeout: {}s", config.timeout_secs);
            println!("  Verify session on startup: {}", config.verify_on_startup);
            println!("  Data directory: {}", data_dir.display().to_string().dimmed());
        }
        ConfigCommands::SetBaseUrl { url } => {
            let run = Invocation::start("config", "settings", false);
            config.set_base_url(&url).map_err(|e| run.failed(&e.to_string()))?;
            config.save(&data_dir)?;
            output::success(&format!("API base URL set to {}", config.base_url));
        }
        ConfigCommands::SetTimeout { secs } => {
            let run = Invocation::start("config", "settings", false);
            config.set_timeout_secs(secs).map_err(|e| run.failed(&e.to_string()))?;
            config.save(&data_dir)?;
            output::success(&format!("Timeout set to {}s", secs));
        }
        ConfigCommands::VerifyOnStartup { enabled } => {
            let _run = Invocation::start("config", "settings", false);
            config.verify_on_startup = enabled;
            config.save(&data_dir)?;
            let state = if enabled { "on" } else { "off" };
            output::success(&format!("Session verification on startup is {}", state));
        }
    }

    Ok(())
}
