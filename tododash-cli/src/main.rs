//! Tododash CLI - your todo list in the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{auth, config, dashboard, health, logs, todos};

/// Tododash - your todo list in the terminal
#[derive(Parser)]
#[command(name = "td", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted if omitted, or read from TODODASH_PASSWORD)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in
    Login {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted if omitted, or read from TODODASH_PASSWORD)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out; the local session is cleared even if the server is down
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show who is signed in
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or update your profile
    Profile {
        /// New email address
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List todos
    List {
        /// Page number, starting at 1
        #[arg(long)]
        page: Option<u32>,
        /// Todos per page (1-100)
        #[arg(long)]
        limit: Option<u32>,
        /// Only completed todos
        #[arg(long, conflicts_with = "open")]
        completed: bool,
        /// Only open todos
        #[arg(long)]
        open: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a todo
    Add {
        title: String,
        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Flip a todo between open and completed
    Toggle {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit a todo; fields not given keep their current value
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Set completion explicitly (true/false)
        #[arg(long)]
        completed: Option<bool>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a todo
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive dashboard
    Dashboard,

    /// Check that the todo API is reachable
    Health {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register { email, password, json } => auth::register(email, password, json),
        Commands::Login { email, password, json } => auth::login(email, password, json),
        Commands::Logout { json } => auth::logout(json),
        Commands::Whoami { json } => auth::whoami(json),
        Commands::Profile { email, json } => auth::profile(email, json),
        Commands::List { page, limit, completed, open, json } => {
            let filter = match (completed, open) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            todos::list(page, limit, filter, json)
        }
        Commands::Add { title, description, json } => todos::add(&title, description, json),
        Commands::Toggle { id, json } => todos::toggle(&id, json),
        Commands::Edit { id, title, description, completed, json } => {
            todos::edit(&id, title, description, completed, json)
        }
        Commands::Delete { id, force, json } => todos::delete(&id, force, json),
        Commands::Dashboard => dashboard::run(),
        Commands::Health { json } => health::run(json),
        Commands::Config { command } => config::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
