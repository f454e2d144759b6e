//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on one area: who is signed in, the dashboard page, the event log.

mod dashboard;
pub mod logging;
mod session;

pub use dashboard::{Dashboard, SIGN_IN_PROMPT};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use session::{LogoutOutcome, SessionManager};
