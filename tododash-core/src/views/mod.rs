//! Presentation models for the todo list
//!
//! Views never talk to the API. They render todos into plain render models
//! and turn user actions into [`TodoIntent`]s that the dashboard carries out.

mod item;
mod list;

pub use item::{ItemRender, TodoItemView};
pub use list::{ListRender, TodoListView, EMPTY_HINT, EMPTY_MESSAGE};

use crate::domain::TodoDraft;

/// A mutation requested from a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoIntent {
    Toggle(String),
    Delete(String),
    Edit(String, TodoDraft),
}
