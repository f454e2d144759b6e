//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest blocking client for the todo API
//! - JSON file in the data directory for the SessionStore port
//! - In-memory SessionStore for throwaway sessions
//! - Recording LoginRedirect for embedders without a UI

pub mod file_store;
pub mod http;
pub mod memory_store;
pub mod redirect;

#[cfg(test)]
pub mod mock_api;
