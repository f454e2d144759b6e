//! Configuration management
//!
//! settings.json in the data directory:
//! ```json
//! {
//!   "api": { "baseUrl": "http://localhost:8000", "timeoutSecs": 30 },
//!   "session": { "verifyOnStartup": false }
//! }
//! ```
//! Keys this crate does not know about are kept when saving, and values that
//! came from the environment are never written back.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::http::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

pub const BASE_URL_ENV: &str = "TODODASH_API_BASE_URL";
pub const VERIFY_SESSION_ENV: &str = "TODODASH_VERIFY_SESSION";

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(default)]
    session: SessionSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSettings {
    #[serde(default)]
    verify_on_startup: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Values taken from the environment at load time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EnvOverrides {
    base_url: Option<String>,
    verify_on_startup: Option<bool>,
}

/// Effective settings, after environment overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
    pub verify_on_startup: bool,
    #[serde(skip)]
    overrides: EnvOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_on_startup: false,
            overrides: EnvOverrides::default(),
        }
    }
}

impl Config {
    /// Load settings.json from `data_dir`, then apply environment overrides
    ///
    /// A missing file gives the defaults; an unreadable one is an error.
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    fn load_with_env(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let defaults = Self::default();

        let overrides = EnvOverrides {
            base_url: env(BASE_URL_ENV).filter(|v| !v.trim().is_empty()),
            verify_on_startup: match env(VERIFY_SESSION_ENV).as_deref() {
                Some("true" | "1" | "yes" | "TRUE" | "YES") => Some(true),
                Some("false" | "0" | "no" | "FALSE" | "NO") => Some(false),
                _ => None,
            },
        };

        let base_url = overrides
            .base_url
            .clone()
            .or(raw.api.base_url)
            .unwrap_or(defaults.base_url);
        let verify_on_startup = overrides
            .verify_on_startup
            .unwrap_or(raw.session.verify_on_startup);

        // A zero timeout would fail every request at once
        let timeout_secs = raw
            .api
            .timeout_secs
            .filter(|&secs| secs > 0)
            .unwrap_or(defaults.timeout_secs);

        Ok(Self {
            base_url,
            timeout_secs,
            verify_on_startup,
            overrides,
        })
    }

    /// Write the managed keys back, leaving everything else in the file alone
    ///
    /// A value still equal to its environment override keeps what the file
    /// had.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        if self.overrides.base_url.as_ref() != Some(&self.base_url) {
            settings.api.base_url = Some(self.base_url.clone());
        }
        settings.api.timeout_secs = Some(self.timeout_secs);
        if self.overrides.verify_on_startup != Some(self.verify_on_startup) {
            settings.session.verify_on_startup = self.verify_on_startup;
        }

        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(SETTINGS_FILE);
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn set_base_url(&mut self, url: &str) -> Result<()> {
        let parsed = url::Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("API base URL must use http or https: {}", url);
        }
        self.base_url = url.trim_end_matches('/').to_string();
        Ok(())
    }

    pub fn set_timeout_secs(&mut self, secs: u64) -> Result<()> {
        if secs == 0 {
            bail!("Timeout must be at least one second");
        }
        self.timeout_secs = secs;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let path = data_dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Malformed {}", path.display()))
}
