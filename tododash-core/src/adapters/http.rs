//! Todo API client
//!
//! Uniform request/response handling for every backend resource: the bearer
//! token is read from the session store on each call, error bodies are mined
//! for a readable message, and a 401 clears the stored session and asks the
//! `LoginRedirect` port to send the user back to sign-in.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{
    AuthResponse, Credentials, ListQuery, NewTodo, PartialUser, Todo, TodoDraft, TodoPage,
    UserUpdate,
};
use crate::ports::{LoginRedirect, SessionStore, AUTH_TOKEN_KEY, SESSION_KEYS};

/// Default backend address
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// `{ "todo": ... }`
#[derive(Debug, Deserialize)]
struct TodoEnvelope {
    todo: Todo,
}

/// `{ "user": ... }`
#[derive(Debug, Deserialize)]
struct UserEnvelope {
    #[serde(default)]
    user: PartialUser,
}

/// Response of `DELETE /api/todos/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Response of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Todo API client
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    store: Arc<dyn SessionStore>,
    redirect: Arc<dyn LoginRedirect>,
}

impl ApiClient {
    /// Create a client for the given backend
    ///
    /// The base URL must be absolute http(s); a trailing slash is dropped.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn SessionStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", base_url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Config(format!(
                "API base URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            store,
            redirect,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn stored_token(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(AUTH_TOKEN_KEY)?
            .filter(|t| !t.is_empty()))
    }

    /// Protected resources are never requested without a token
    fn require_token(&self) -> Result<String> {
        self.stored_token()?.ok_or(Error::NotAuthenticated)
    }

    /// Send a request with the stored bearer token (if any) attached
    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.stored_token()? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().map_err(|e| self.map_request_error(e))?;

        self.check_response_status(response)
    }

    fn send_protected(&self, request: RequestBuilder) -> Result<Response> {
        self.require_token()?;
        self.send(request)
    }

    /// Map transport errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Network(format!(
                "Request timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            Error::Network(format!("Unable to connect to the todo API at {}", self.base_url))
        } else {
            Error::Network(format!("Request failed: {}", error))
        }
    }

    fn check_response_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(&message);
            return Err(Error::Unauthorized(message));
        }

        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Drop the stored session and send the user back to sign-in
    fn handle_unauthorized(&self, reason: &str) {
        // The 401 itself is the error the caller sees; a storage failure here
        // must not replace it.
        let _ = self.store.remove_many(SESSION_KEYS);
        self.redirect.redirect_to_login(reason);
    }

    fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response
            .text()
            .map_err(|e| Error::Network(format!("Failed to read response: {}", e)))?;
        Ok(serde_json::from_str(&body)?)
    }

    // =========================================================================
    // Auth
    // =========================================================================

    pub fn register(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let response = self.send(self.client.post(self.url("/api/auth/register")).json(credentials))?;
        Self::decode(response)
    }

    pub fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let response = self.send(self.client.post(self.url("/api/auth/login")).json(credentials))?;
        Self::decode(response)
    }

    pub fn logout(&self) -> Result<()> {
        self.send(self.client.post(self.url("/api/auth/logout")))?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Partial update; returns the user fields the server echoed back
    pub fn update_user(&self, id: &str, update: &UserUpdate) -> Result<PartialUser> {
        let response = self.send_protected(
            self.client
                .put(self.url(&format!("/api/users/{}", id)))
                .json(update),
        )?;
        let envelope: UserEnvelope = Self::decode(response)?;
        Ok(envelope.user)
    }

    // =========================================================================
    // Todos
    // =========================================================================

    pub fn list_todos(&self, query: &ListQuery) -> Result<TodoPage> {
        query.validate()?;
        let response = self.send_protected(
            self.client
                .get(self.url("/api/todos"))
                .query(&query.to_params()),
        )?;
        Self::decode(response)
    }

    pub fn create_todo(&self, todo: &NewTodo) -> Result<Todo> {
        let response = self.send_protected(self.client.post(self.url("/api/todos")).json(todo))?;
        let envelope: TodoEnvelope = Self::decode(response)?;
        Ok(envelope.todo)
    }

    pub fn update_todo(&self, id: &str, draft: &TodoDraft) -> Result<Todo> {
        let response = self.send_protected(
            self.client
                .put(self.url(&format!("/api/todos/{}", id)))
                .json(draft),
        )?;
        let envelope: TodoEnvelope = Self::decode(response)?;
        Ok(envelope.todo)
    }

    pub fn delete_todo(&self, id: &str) -> Result<DeleteResponse> {
        let response =
            self.send_protected(self.client.delete(self.url(&format!("/api/todos/{}", id))))?;
        Self::decode(response)
    }

    pub fn toggle_todo(&self, id: &str) -> Result<Todo> {
        let response = self.send_protected(
            self.client
                .patch(self.url(&format!("/api/todos/{}/toggle-complete", id))),
        )?;
        let envelope: TodoEnvelope = Self::decode(response)?;
        Ok(envelope.todo)
    }

    // =========================================================================
    // Health
    // =========================================================================

    pub fn health(&self) -> Result<HealthStatus> {
        let response = self.send(self.client.get(self.url("/health")))?;
        Self::decode(response)
    }
}

/// Best-effort message from an error body
///
/// Order: a string `detail`, a list of validation `detail` entries, then
/// `error.message`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;

    match value.get("detail") {
        Some(JsonValue::String(detail)) if !detail.trim().is_empty() => {
            return Some(detail.clone());
        }
        Some(JsonValue::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}
