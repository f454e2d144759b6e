//! Single todo view with a local edit draft

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use super::TodoIntent;
use crate::domain::{Todo, TodoDraft};

/// What an item looks like right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRender {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created: String,
    pub updated: String,
    /// Present while the item is in edit mode
    pub editing: Option<TodoDraft>,
}

/// One todo plus its uncommitted edit state
///
/// The draft is independent of the canonical todo: nothing typed into it is
/// visible outside the view until [`TodoItemView::save`] hands it upward.
#[derive(Debug, Clone)]
pub struct TodoItemView {
    todo: Todo,
    draft: TodoDraft,
    editing: bool,
}

impl TodoItemView {
    pub fn new(todo: Todo) -> Self {
        let draft = TodoDraft::from_todo(&todo);
        Self {
            todo,
            draft,
            editing: false,
        }
    }

    pub fn todo(&self) -> &Todo {
        &self.todo
    }

    pub fn id(&self) -> &str {
        &self.todo.id
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn draft(&self) -> &TodoDraft {
        &self.draft
    }

    /// Take a newer copy of the canonical todo; an open draft is kept
    pub fn sync(&mut self, todo: Todo) {
        if !self.editing {
            self.draft = TodoDraft::from_todo(&todo);
        }
        self.todo = todo;
    }

    pub fn begin_edit(&mut self) {
        if !self.editing {
            self.draft = TodoDraft::from_todo(&self.todo);
            self.editing = true;
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.draft.is_completed = completed;
    }

    /// Hand the draft upward and leave edit mode
    pub fn save(&mut self) -> TodoIntent {
        self.editing = false;
        TodoIntent::Edit(self.todo.id.clone(), self.draft.clone())
    }

    /// Throw the draft away and leave edit mode
    pub fn cancel(&mut self) {
        self.draft = TodoDraft::from_todo(&self.todo);
        self.editing = false;
    }

    pub fn toggle(&self) -> TodoIntent {
        TodoIntent::Toggle(self.todo.id.clone())
    }

    pub fn delete(&self) -> TodoIntent {
        TodoIntent::Delete(self.todo.id.clone())
    }

    pub fn render(&self) -> ItemRender {
        ItemRender {
            id: self.todo.id.clone(),
            title: self.todo.title.clone(),
            description: self.todo.description().map(str::to_string),
            completed: self.todo.is_completed,
            created: format_local(&self.todo.created_at),
            updated: format_local(&self.todo.updated_at),
            editing: self.editing.then(|| self.draft.clone()),
        }
    }
}

fn format_local(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
