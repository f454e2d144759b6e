//! Session store port - durable key-value client storage

use crate::domain::result::Result;

/// Key holding the bearer token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Key holding the signed-in user's email
pub const USER_EMAIL_KEY: &str = "user_email";

/// Key holding the signed-in user's id
pub const USER_ID_KEY: &str = "user_id";

/// Every key that belongs to a session; cleared together
pub const SESSION_KEYS: &[&str] = &[AUTH_TOKEN_KEY, USER_EMAIL_KEY, USER_ID_KEY];

/// Durable string key-value storage
///
/// Values carry no expiry. Implementations must make `set_many` and
/// `remove_many` visible as a single change so a token never outlives the
/// user it belongs to.
pub trait SessionStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    /// Remove a value; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()> {
        self.remove_many(&[key])
    }

    /// Write several values in one operation
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Remove several values in one operation
    fn remove_many(&self, keys: &[&str]) -> Result<()>;
}
