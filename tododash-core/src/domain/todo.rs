//! Todo domain model

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::result::{Error, Result};

/// Largest page size the todo API accepts
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A todo record as owned by the remote store
///
/// The client only ever holds a cached copy; the server assigns `id` and both
/// timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Todo {
    /// Description with empty strings treated as absent
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
    }
}

/// Timestamps come back either as RFC 3339 or as naive ISO strings
/// (the server stores UTC without an offset).
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw)))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Body of a create request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewTodo {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    /// Reject a blank title before anything goes over the wire
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)
    }
}

/// Full replacement body for `PUT /api/todos/{id}`
///
/// Also serves as the uncommitted edit draft held by an item view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoDraft {
    pub title: String,
    pub description: String,
    pub is_completed: bool,
}

impl TodoDraft {
    /// Seed a draft from the canonical todo
    pub fn from_todo(todo: &Todo) -> Self {
        Self {
            title: todo.title.clone(),
            description: todo.description.clone().unwrap_or_default(),
            is_completed: todo.is_completed,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::validation("Title is required"));
    }
    Ok(())
}

/// Query parameters for listing todos
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub completed: Option<bool>,
}

impl ListQuery {
    pub fn validate(&self) -> Result<()> {
        if self.page == Some(0) {
            return Err(Error::validation("Page must be at least 1"));
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_PAGE_LIMIT {
                return Err(Error::validation(format!(
                    "Limit must be between 1 and {}",
                    MAX_PAGE_LIMIT
                )));
            }
        }
        Ok(())
    }

    /// Query string pairs; unset fields are left to server defaults
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(completed) = self.completed {
            params.push(("completed", completed.to_string()));
        }
        params
    }
}

/// Pagination block returned alongside a todo list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub has_next: bool,
    pub has_prev: bool,
    pub pages: u64,
}

/// Response of `GET /api/todos`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoPage {
    pub todos: Vec<Todo>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}
