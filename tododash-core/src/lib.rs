//! Tododash Core - client-side logic for a remote todo service
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Todos, users and the client-side validation rules
//! - **ports**: Trait definitions for external dependencies (SessionStore, LoginRedirect)
//! - **services**: Session manager, dashboard state and the event log
//! - **adapters**: Concrete implementations (HTTP gateway, session file)
//! - **views**: Render models for todo items and the todo list

pub mod adapters;
pub mod config;
pub mod domain;
mod log_migrations;
pub mod ports;
pub mod services;
pub mod views;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::file_store::FileSessionStore;
use adapters::http::ApiClient;
use config::Config;
use ports::LoginRedirect;
use services::{Dashboard, SessionManager};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{Credentials, ListQuery, NewTodo, Todo, TodoDraft, User, UserUpdate};
pub use services::{EntryPoint, LogEvent, LoggingService};
pub use views::{TodoIntent, TodoItemView, TodoListView};

/// Everything a front end needs, wired against one data directory
///
/// The session store, gateway and session manager are built once and shared;
/// each dashboard gets its own state on top of them.
pub struct TodoContext {
    pub config: Config,
    pub store: Arc<FileSessionStore>,
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionManager>,
}

impl TodoContext {
    /// Create a context from settings.json and session.json in `data_dir`
    pub fn new(data_dir: &Path, redirect: Arc<dyn LoginRedirect>) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::with_config(data_dir, config, redirect)
    }

    /// Create a context with explicit settings
    pub fn with_config(
        data_dir: &Path,
        config: Config,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let store = Arc::new(FileSessionStore::new(data_dir));
        let api = Arc::new(ApiClient::new(
            &config.base_url,
            config.timeout(),
            store.clone(),
            redirect,
        )?);
        let session = Arc::new(SessionManager::new(api.clone(), store.clone())?);

        Ok(Self {
            config,
            store,
            api,
            session,
        })
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(Arc::clone(&self.session), Arc::clone(&self.api))
    }
}
