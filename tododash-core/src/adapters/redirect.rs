//! Login redirect that only remembers it was asked to redirect

use std::sync::Mutex;

use crate::ports::LoginRedirect;

/// Records every redirect reason; for embedders that poll instead of react
#[derive(Debug, Default)]
pub struct RecordingRedirect {
    reasons: Mutex<Vec<String>>,
}

impl RecordingRedirect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reasons received so far, oldest first
    pub fn reasons(&self) -> Vec<String> {
        self.reasons
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.reasons.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl LoginRedirect for RecordingRedirect {
    fn redirect_to_login(&self, reason: &str) {
        if let Ok(mut reasons) = self.reasons.lock() {
            reasons.push(reason.to_string());
        }
    }
}
