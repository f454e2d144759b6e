//! Session manager - authentication state and its broadcast
//!
//! The current user lives in a `watch` channel: the sender is the single
//! source of truth for "who is signed in", and every subscriber holds a
//! receiver that observes each change. Dropping a receiver detaches it.
//!
//! The persisted token and the in-memory user are always changed together.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::adapters::http::ApiClient;
use crate::domain::result::{Error, Result};
use crate::domain::{AuthResponse, Credentials, ListQuery, User, UserUpdate};
use crate::ports::{SessionStore, AUTH_TOKEN_KEY, SESSION_KEYS, USER_EMAIL_KEY, USER_ID_KEY};

/// Result of a logout; always a success from the caller's point of view
#[derive(Debug, Clone, Serialize)]
pub struct LogoutOutcome {
    pub success: bool,
    pub message: String,
    /// Problems that did not stop the local session from being cleared
    pub warnings: Vec<String>,
}

#[derive(Clone, Copy)]
enum AuthFlow {
    Register,
    Login,
}

impl AuthFlow {
    fn fallback_message(self) -> &'static str {
        match self {
            AuthFlow::Register => "Registration failed",
            AuthFlow::Login => "Login failed",
        }
    }
}

/// Tracks who is signed in and tells subscribers when that changes
pub struct SessionManager {
    api: Arc<ApiClient>,
    store: Arc<dyn SessionStore>,
    current: watch::Sender<Option<User>>,
    restore_warning: Option<String>,
}

impl SessionManager {
    /// Create the session, restoring a persisted one if a token is stored
    ///
    /// A stored token is trusted as-is; see [`SessionManager::verify`] for an
    /// explicit server check. An unreadable session file starts signed out
    /// and leaves a warning in [`SessionManager::restore_warning`].
    pub fn new(api: Arc<ApiClient>, store: Arc<dyn SessionStore>) -> Result<Self> {
        let (restored, restore_warning) = match Self::restore(store.as_ref()) {
            Ok(user) => (user, None),
            Err(e @ Error::Storage(_)) => (None, Some(format!("Stored session ignored: {}", e))),
            Err(e) => return Err(e),
        };
        let (current, _) = watch::channel(restored);

        Ok(Self {
            api,
            store,
            current,
            restore_warning,
        })
    }

    fn restore(store: &dyn SessionStore) -> Result<Option<User>> {
        if store.get(AUTH_TOKEN_KEY)?.filter(|t| !t.is_empty()).is_none() {
            return Ok(None);
        }
        Ok(Some(User::new(
            store.get(USER_ID_KEY)?.unwrap_or_default(),
            store.get(USER_EMAIL_KEY)?.unwrap_or_default(),
        )))
    }

    /// Why a persisted session could not be restored, if it could not
    pub fn restore_warning(&self) -> Option<&str> {
        self.restore_warning.as_deref()
    }

    /// Observe the current user; the receiver sees every later change
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.current.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// The persisted bearer token, if any
    pub fn token(&self) -> Result<Option<String>> {
        self.store.get(AUTH_TOKEN_KEY)
    }

    /// There is no refresh endpoint; the stored token is returned unchanged
    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.token()
    }

    pub fn register(&self, credentials: &Credentials) -> Result<AuthResponse> {
        self.authenticate(credentials, AuthFlow::Register)
    }

    pub fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
        self.authenticate(credentials, AuthFlow::Login)
    }

    fn authenticate(&self, credentials: &Credentials, flow: AuthFlow) -> Result<AuthResponse> {
        credentials.validate()?;

        let result = match flow {
            AuthFlow::Register => self.api.register(credentials),
            AuthFlow::Login => self.api.login(credentials),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.observe(&e)?;
                return Err(e.or_message(flow.fallback_message()));
            }
        };

        if let (Some(token), Some(user)) = (&response.access_token, &response.user) {
            self.store.set_many(&[
                (AUTH_TOKEN_KEY, token.as_str()),
                (USER_EMAIL_KEY, user.email.as_str()),
                (USER_ID_KEY, user.id.as_str()),
            ])?;
            self.current.send_replace(Some(user.clone()));
        }

        Ok(response)
    }

    /// Best-effort remote logout; the local session is cleared regardless
    pub fn logout(&self) -> LogoutOutcome {
        let mut warnings = Vec::new();

        if let Err(e) = self.api.logout() {
            warnings.push(format!("Remote logout failed: {}", e));
        }
        if let Err(e) = self.store.remove_many(SESSION_KEYS) {
            warnings.push(format!("Could not clear stored session: {}", e));
        }
        self.current.send_replace(None);

        LogoutOutcome {
            success: true,
            message: "Logged out successfully".to_string(),
            warnings,
        }
    }

    /// Send a merge-style profile update and fold the answer into the user
    pub fn update_user_profile(&self, updates: &UserUpdate) -> Result<User> {
        let user = self.current_user().ok_or(Error::NotAuthenticated)?;
        if user.id.is_empty() {
            return Err(Error::validation(
                "The stored session has no user id; log in again to update the profile",
            ));
        }

        let patch = match self.api.update_user(&user.id, updates) {
            Ok(patch) => patch,
            Err(e) => {
                self.observe(&e)?;
                return Err(e.or_message("Failed to update profile"));
            }
        };

        let merged = user.merged(&patch);
        if merged.email != user.email {
            self.store.set(USER_EMAIL_KEY, &merged.email)?;
        }
        self.current.send_replace(Some(merged.clone()));
        Ok(merged)
    }

    /// Ask the server whether the stored token still works
    ///
    /// Lists a single todo; a 401 expires the session. Returns whether the
    /// session is still valid afterwards.
    pub fn verify(&self) -> Result<bool> {
        if !self.is_authenticated() {
            return Ok(false);
        }
        let query = ListQuery {
            limit: Some(1),
            ..Default::default()
        };
        match self.api.list_todos(&query) {
            Ok(_) => Ok(true),
            Err(e) if e.is_unauthorized() || matches!(e, Error::NotAuthenticated) => {
                self.expire()?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Clear the session after the server rejected the token
    ///
    /// The user is signed out in memory even when the stored token could not
    /// be removed; that failure is returned.
    pub fn expire(&self) -> Result<()> {
        let removed = self.store.remove_many(SESSION_KEYS);
        self.current.send_if_modified(|current| current.take().is_some());
        removed
    }

    /// Keep the user in step with the gateway after a failed call
    pub fn observe(&self, error: &Error) -> Result<()> {
        if error.is_unauthorized() {
            self.expire()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapters::memory_store::MemorySessionStore;
    use crate::adapters::mock_api::MockTodoApi;
    use crate::adapters::redirect::RecordingRedirect;

    struct Harness {
        server: MockTodoApi,
        store: Arc<MemorySessionStore>,
        api: Arc<ApiClient>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_url(None)
        }

        fn with_url(url: Option<String>) -> Self {
            let server = MockTodoApi::start().unwrap();
            let store = Arc::new(MemorySessionStore::new());
            let api = Arc::new(
                ApiClient::new(
                    &url.unwrap_or_else(|| server.base_url()),
                    Duration::from_secs(5),
                    store.clone(),
                    Arc::new(RecordingRedirect::new()),
                )
                .unwrap(),
            );
            Self { server, store, api }
        }

        fn session(&self) -> SessionManager {
            SessionManager::new(self.api.clone(), self.store.clone()).unwrap()
        }
    }

    fn unreachable_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    #[test]
    fn test_login_persists_and_notifies_once() {
        let h = Harness::new();
        h.server.add_user("ann@example.com", "pw");
        let session = h.session();
        let mut rx = session.subscribe();
        assert!(!session.is_authenticated());

        let response = session
            .login(&Credentials::new("ann@example.com", "pw"))
            .unwrap();

        assert!(session.is_authenticated());
        assert_eq!(
            h.store.get(AUTH_TOKEN_KEY).unwrap(),
            response.access_token
        );
        assert_eq!(
            h.store.get(USER_EMAIL_KEY).unwrap().as_deref(),
            Some("ann@example.com")
        );

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.unwrap().email, "ann@example.com");
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_register_signs_in() {
        let h = Harness::new();
        let session = h.session();
        let response = session
            .register(&Credentials::new("new@example.com", "pw"))
            .unwrap();
        assert!(response.success);
        assert_eq!(session.current_user().unwrap().email, "new@example.com");
        assert!(session.token().unwrap().is_some());
    }

    #[test]
    fn test_register_duplicate_surfaces_detail() {
        let h = Harness::new();
        h.server.add_user("dup@example.com", "pw");
        let session = h.session();
        let err = session
            .register(&Credentials::new("dup@example.com", "pw"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_wrong_password_leaves_session_signed_out() {
        let h = Harness::new();
        h.server.add_user("ann@example.com", "pw");
        let session = h.session();
        let mut rx = session.subscribe();

        let err = session
            .login(&Credentials::new("ann@example.com", "nope"))
            .unwrap_err();

        assert_eq!(err.to_string(), "Incorrect email or password");
        assert!(!session.is_authenticated());
        assert_eq!(h.store.get(AUTH_TOKEN_KEY).unwrap(), None);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_blank_credentials_never_hit_the_server() {
        let h = Harness::new();
        let session = h.session();
        assert!(matches!(
            session.login(&Credentials::new("", "")),
            Err(Error::Validation(_))
        ));
        assert_eq!(h.server.request_count(), 0);
    }

    #[test]
    fn test_restores_persisted_session_without_contacting_server() {
        let h = Harness::new();
        h.store
            .set_many(&[
                (AUTH_TOKEN_KEY, "old-token"),
                (USER_EMAIL_KEY, "ann@example.com"),
                (USER_ID_KEY, "user-9"),
            ])
            .unwrap();

        let session = h.session();
        let user = session.current_user().unwrap();
        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.id, "user-9");
        assert_eq!(h.server.request_count(), 0);
    }

    #[test]
    fn test_logout_clears_everything_and_notifies() {
        let h = Harness::new();
        h.server.add_user("ann@example.com", "pw");
        let session = h.session();
        session.login(&Credentials::new("ann@example.com", "pw")).unwrap();
        let mut rx = session.subscribe();

        let outcome = session.logout();

        assert!(outcome.success);
        assert!(outcome.warnings.is_empty());
        assert!(!session.is_authenticated());
        for key in SESSION_KEYS {
            assert_eq!(h.store.get(key).unwrap(), None);
        }
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn test_logout_with_unreachable_backend_still_clears_session() {
        let h = Harness::with_url(Some(unreachable_url()));
        h.store
            .set_many(&[(AUTH_TOKEN_KEY, "tok"), (USER_EMAIL_KEY, "ann@example.com")])
            .unwrap();
        let session = h.session();
        assert!(session.is_authenticated());

        let outcome = session.logout();

        assert!(outcome.success);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(!session.is_authenticated());
        assert_eq!(h.store.get(AUTH_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_update_profile_requires_a_user() {
        let h = Harness::new();
        let session = h.session();
        let err = session
            .update_user_profile(&UserUpdate {
                email: Some("x@example.com".into()),
            })
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
        assert_eq!(h.server.request_count(), 0);
    }

    #[test]
    fn test_update_profile_merges_and_persists() {
        let h = Harness::new();
        h.server.add_user("ann@example.com", "pw");
        let session = h.session();
        session.login(&Credentials::new("ann@example.com", "pw")).unwrap();
        let id = session.current_user().unwrap().id;
        let mut rx = session.subscribe();

        let user = session
            .update_user_profile(&UserUpdate {
                email: Some("ann@new.example.com".into()),
            })
            .unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.email, "ann@new.example.com");
        assert_eq!(
            h.store.get(USER_EMAIL_KEY).unwrap().as_deref(),
            Some("ann@new.example.com")
        );
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().email, "ann@new.example.com");
    }

    #[test]
    fn test_update_profile_with_expired_token_expires_session() {
        let h = Harness::new();
        h.server.add_user("ann@example.com", "pw");
        let session = h.session();
        session.login(&Credentials::new("ann@example.com", "pw")).unwrap();
        h.server.revoke_all_tokens();

        let err = session
            .update_user_profile(&UserUpdate {
                email: Some("x@example.com".into()),
            })
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert!(!session.is_authenticated());
        assert_eq!(h.store.get(AUTH_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_verify_expires_revoked_token() {
        let h = Harness::new();
        h.server.add_user("ann@example.com", "pw");
        let session = h.session();
        session.login(&Credentials::new("ann@example.com", "pw")).unwrap();
        assert!(session.verify().unwrap());

        h.server.revoke_all_tokens();
        assert!(!session.verify().unwrap());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_expire_only_notifies_when_signed_in() {
        let h = Harness::new();
        let session = h.session();
        let rx = session.subscribe();
        session.expire().unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    /// Keeps values but refuses to delete them
    struct StickyStore(MemorySessionStore);

    impl SessionStore for StickyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
            self.0.set_many(entries)
        }

        fn remove_many(&self, _keys: &[&str]) -> Result<()> {
            Err(Error::storage("disk is read-only"))
        }
    }

    #[test]
    fn test_expire_reports_token_left_on_disk() {
        let h = Harness::new();
        let store = StickyStore(MemorySessionStore::new());
        store.set_many(&[(AUTH_TOKEN_KEY, "tok"), (USER_EMAIL_KEY, "ann@example.com")]).unwrap();
        let session = SessionManager::new(h.api.clone(), Arc::new(store)).unwrap();
        assert!(session.is_authenticated());

        let err = session.expire().unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(!session.is_authenticated());
    }

    /// Every read fails as if the file were corrupt
    struct CorruptStore;

    impl SessionStore for CorruptStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::storage("session.json is corrupt"))
        }

        fn set_many(&self, _entries: &[(&str, &str)]) -> Result<()> {
            Ok(())
        }

        fn remove_many(&self, _keys: &[&str]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unreadable_store_starts_signed_out() {
        let h = Harness::new();
        let session = SessionManager::new(h.api.clone(), Arc::new(CorruptStore)).unwrap();

        assert!(!session.is_authenticated());
        assert!(session.restore_warning().unwrap().contains("corrupt"));
        assert!(h.session().restore_warning().is_none());
    }

    #[test]
    fn test_refresh_returns_stored_token() {
        let h = Harness::new();
        h.store.set(AUTH_TOKEN_KEY, "tok").unwrap();
        let session = h.session();
        assert_eq!(session.refresh_token().unwrap().as_deref(), Some("tok"));
    }
}
