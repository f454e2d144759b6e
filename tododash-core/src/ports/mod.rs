//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The gateway and the
//! session depend only on these traits, not on concrete implementations.

mod login_redirect;
mod session_store;

pub use login_redirect::LoginRedirect;
pub use session_store::{SessionStore, AUTH_TOKEN_KEY, SESSION_KEYS, USER_EMAIL_KEY, USER_ID_KEY};
