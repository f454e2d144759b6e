//! Login redirect port
//!
//! The gateway calls this after a 401 has cleared the persisted token. A
//! browser client would navigate to its login page; the terminal client tells
//! the user to sign in again.

/// Sends the user back to the sign-in flow
pub trait LoginRedirect: Send + Sync {
    /// `reason` is the server's message for the rejected request
    fn redirect_to_login(&self, reason: &str);
}
