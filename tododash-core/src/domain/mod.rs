//! Core domain entities
//!
//! Plain data exchanged with the todo API plus the client-side validation
//! rules. No I/O happens here.

mod todo;
mod user;
pub mod result;

pub use todo::{ListQuery, NewTodo, Pagination, Todo, TodoDraft, TodoPage, MAX_PAGE_LIMIT};
pub use user::{AuthResponse, Credentials, PartialUser, User, UserUpdate};
