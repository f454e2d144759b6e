//! Todo list view

use serde::Serialize;

use super::{ItemRender, TodoItemView};
use crate::domain::Todo;

pub const EMPTY_MESSAGE: &str = "No todos yet";
pub const EMPTY_HINT: &str = "Add your first todo using the form above";

/// Rendered list: either the empty state or one entry per todo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ListRender {
    Empty {
        message: String,
        hint: String,
    },
    Items {
        heading: String,
        items: Vec<ItemRender>,
    },
}

/// One item view per todo, in collection order
#[derive(Debug, Clone, Default)]
pub struct TodoListView {
    items: Vec<TodoItemView>,
}

impl TodoListView {
    pub fn new(todos: &[Todo]) -> Self {
        Self {
            items: todos.iter().cloned().map(TodoItemView::new).collect(),
        }
    }

    /// Rebuild from the collection, keeping edit state of items still present
    pub fn sync(&mut self, todos: &[Todo]) {
        let mut previous = std::mem::take(&mut self.items);
        self.items = todos
            .iter()
            .map(|todo| match previous.iter().position(|v| v.id() == todo.id) {
                Some(index) => {
                    let mut view = previous.swap_remove(index);
                    view.sync(todo.clone());
                    view
                }
                None => TodoItemView::new(todo.clone()),
            })
            .collect();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[TodoItemView] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&TodoItemView> {
        self.items.iter().find(|v| v.id() == id)
    }

    /// Item views are handed out directly so their intents pass through as-is
    pub fn item_mut(&mut self, id: &str) -> Option<&mut TodoItemView> {
        self.items.iter_mut().find(|v| v.id() == id)
    }

    pub fn render(&self) -> ListRender {
        if self.items.is_empty() {
            return ListRender::Empty {
                message: EMPTY_MESSAGE.to_string(),
                hint: EMPTY_HINT.to_string(),
            };
        }
        ListRender::Items {
            heading: format!("Your Todos ({})", self.items.len()),
            items: self.items.iter().map(TodoItemView::render).collect(),
        }
    }
}
