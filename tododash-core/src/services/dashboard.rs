//! Dashboard page state
//!
//! Holds the locally cached todos, the creation form, the list query and the
//! error banner. Every mutation is confirmed by the server before it shows up
//! locally; failures only ever change the banner.

use std::sync::Arc;

use tokio::sync::watch;

use super::session::{LogoutOutcome, SessionManager};
use crate::adapters::http::ApiClient;
use crate::domain::result::Error;
use crate::domain::{ListQuery, NewTodo, Pagination, Todo, TodoDraft, User};
use crate::views::{TodoIntent, TodoListView};

pub const SIGN_IN_PROMPT: &str = "Please sign in to access the dashboard";

/// State container behind the dashboard page
pub struct Dashboard {
    session: Arc<SessionManager>,
    api: Arc<ApiClient>,
    auth: watch::Receiver<Option<User>>,
    todos: Vec<Todo>,
    list: TodoListView,
    pagination: Option<Pagination>,
    form: NewTodo,
    query: ListQuery,
    loading: bool,
    error: Option<String>,
}

impl Dashboard {
    pub fn new(session: Arc<SessionManager>, api: Arc<ApiClient>) -> Self {
        let auth = session.subscribe();
        Self {
            session,
            api,
            auth,
            todos: Vec::new(),
            list: TodoListView::default(),
            pagination: None,
            form: NewTodo::default(),
            query: ListQuery::default(),
            loading: true,
            error: None,
        }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn list(&self) -> &TodoListView {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut TodoListView {
        &mut self.list
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn form(&self) -> &NewTodo {
        &self.form
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True until the first load has finished, whatever its outcome
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn is_authenticated(&mut self) -> bool {
        self.sync_auth();
        self.session.is_authenticated()
    }

    /// Load the first view of the page
    pub fn mount(&mut self) -> bool {
        if !self.is_authenticated() {
            self.loading = false;
            self.clear();
            return false;
        }
        self.refresh()
    }

    /// Reload the todo list with the current query
    pub fn refresh(&mut self) -> bool {
        if !self.require_auth() {
            self.loading = false;
            return false;
        }

        let result = self.api.list_todos(&self.query);
        self.loading = false;

        match result {
            Ok(page) => {
                self.todos = page.todos;
                self.pagination = page.pagination;
                self.list.sync(&self.todos);
                true
            }
            Err(e) => {
                self.fail("Failed to load todos", e);
                false
            }
        }
    }

    /// Change filters or paging; takes effect on the next refresh
    pub fn set_query(&mut self, query: ListQuery) {
        self.query = query;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.form.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.form = std::mem::take(&mut self.form).with_description(description);
    }

    /// Create a todo from the form
    pub fn submit(&mut self) -> Option<Todo> {
        if let Err(e) = self.form.validate() {
            self.error = Some(e.user_message());
            return None;
        }
        if !self.require_auth() {
            return None;
        }

        match self.api.create_todo(&self.form) {
            Ok(todo) => {
                self.todos.insert(0, todo.clone());
                self.list.sync(&self.todos);
                self.form = NewTodo::default();
                self.error = None;
                Some(todo)
            }
            Err(e) => {
                self.fail("Failed to add todo", e);
                None
            }
        }
    }

    /// Flip completion; returns the server's copy
    pub fn toggle(&mut self, id: &str) -> Option<Todo> {
        if !self.require_auth() {
            return None;
        }
        match self.api.toggle_todo(id) {
            Ok(todo) => {
                self.replace(todo.clone());
                Some(todo)
            }
            Err(e) => {
                self.fail("Failed to update todo", e);
                None
            }
        }
    }

    /// Save an edited draft
    pub fn update(&mut self, id: &str, draft: &TodoDraft) -> Option<Todo> {
        if let Err(e) = draft.validate() {
            self.error = Some(e.user_message());
            return None;
        }
        if !self.require_auth() {
            return None;
        }
        match self.api.update_todo(id, draft) {
            Ok(todo) => {
                self.replace(todo.clone());
                Some(todo)
            }
            Err(e) => {
                self.fail("Failed to update todo", e);
                None
            }
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        if !self.require_auth() {
            return false;
        }
        match self.api.delete_todo(id) {
            Ok(_) => {
                self.todos.retain(|t| t.id != id);
                self.list.sync(&self.todos);
                true
            }
            Err(e) => {
                self.fail("Failed to delete todo", e);
                false
            }
        }
    }

    /// Carry out an intent raised by a todo view
    pub fn dispatch(&mut self, intent: TodoIntent) -> bool {
        match intent {
            TodoIntent::Toggle(id) => self.toggle(&id).is_some(),
            TodoIntent::Delete(id) => self.delete(&id),
            TodoIntent::Edit(id, draft) => self.update(&id, &draft).is_some(),
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn sign_out(&mut self) -> LogoutOutcome {
        let outcome = self.session.logout();
        self.sync_auth();
        self.clear();
        outcome
    }

    fn replace(&mut self, todo: Todo) {
        if let Some(slot) = self.todos.iter_mut().find(|t| t.id == todo.id) {
            *slot = todo;
        }
        self.list.sync(&self.todos);
    }

    fn require_auth(&mut self) -> bool {
        if self.is_authenticated() {
            return true;
        }
        self.error = Some(SIGN_IN_PROMPT.to_string());
        false
    }

    fn fail(&mut self, context: &str, error: Error) {
        let error = match self.session.observe(&error) {
            Ok(()) => error,
            Err(storage) => storage,
        };
        self.error = Some(format!("{}: {}", context, error.user_message()));
        self.sync_auth();
    }

    /// Drop cached todos once the session goes away
    fn sync_auth(&mut self) {
        if !self.auth.has_changed().unwrap_or(false) {
            return;
        }
        if self.auth.borrow_and_update().is_none() {
            self.clear();
        }
    }

    fn clear(&mut self) {
        self.todos.clear();
        self.pagination = None;
        self.list.sync(&self.todos);
    }
}
