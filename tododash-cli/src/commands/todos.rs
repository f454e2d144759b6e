//! Todo commands - list, add, toggle, edit, delete
//!
//! Each command drives a dashboard page so the messages match the
//! interactive view.

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use serde::Serialize;

use super::{get_context, Invocation};
use crate::output;
use tododash_core::domain::{Pagination, MAX_PAGE_LIMIT};
use tododash_core::services::Dashboard;
use tododash_core::views::{ItemRender, ListRender};
use tododash_core::{Error, ListQuery, Todo};

/// The banner left by a failed page operation
fn banner(page: &Dashboard) -> Error {
    Error::Other(page.error().unwrap_or("Request failed").to_string())
}

#[derive(Serialize)]
struct ListOutput {
    todos: Vec<Todo>,
    pagination: Option<Pagination>,
}

pub fn list(page_no: Option<u32>, limit: Option<u32>, completed: Option<bool>, json: bool) -> Result<()> {
    let run = Invocation::start("list", "todo", json);
    let ctx = get_context()?;
    let mut page = ctx.dashboard();

    page.set_query(ListQuery {
        page: page_no,
        limit,
        completed,
    });
    let result = if page.refresh() {
        Ok(ListOutput {
            todos: page.todos().to_vec(),
            pagination: page.pagination().cloned(),
        })
    } else {
        Err(banner(&page))
    };

    run.finish(result, |_| {
        print_list(&page.list().render());
        if let Some(p) = page.pagination() {
            if p.pages > 1 {
                println!(
                    "{}",
                    format!("Page {} of {} ({} todos)", p.page, p.pages, p.total).dimmed()
                );
            }
        }
    })
}

pub fn print_list(render: &ListRender) {
    match render {
        ListRender::Empty { message, hint } => {
            println!("{}", message.bold());
            println!("{}", hint.dimmed());
        }
        ListRender::Items { heading, items } => {
            println!("{}", heading.bold());
            let mut table = output::create_table();
            table.set_header(vec!["ID", "Done", "Title", "Description", "Updated"]);
            for item in items {
                table.add_row(vec![
                    item.id.clone(),
                    done_marker(item),
                    item.title.clone(),
                    item.description.clone().unwrap_or_default(),
                    item.updated.clone(),
                ]);
            }
            println!("{}", table);
        }
    }
}

fn done_marker(item: &ItemRender) -> String {
    if item.completed {
        "✓".green().to_string()
    } else {
        String::new()
    }
}

fn print_todo(prefix: &str, todo: &Todo) {
    let state = if todo.is_completed {
        "done".green()
    } else {
        "open".yellow()
    };
    println!("{} {} [{}]", prefix.green(), todo.title.bold(), state);
    println!("  ID: {}", todo.id.dimmed());
    if let Some(description) = todo.description() {
        println!("  {}", description);
    }
}

pub fn add(title: &str, description: Option<String>, json: bool) -> Result<()> {
    let run = Invocation::start("add", "todo", json);
    let ctx = get_context()?;
    let mut page = ctx.dashboard();

    page.set_title(title);
    page.set_description(description.unwrap_or_default());
    let result = page.submit().ok_or_else(|| banner(&page));
    if result.is_ok() {
        run.event("todo_created");
    }

    run.finish(result, |todo| print_todo("Added", todo))
}

pub fn toggle(id: &str, json: bool) -> Result<()> {
    let run = Invocation::start("toggle", "todo", json);
    let ctx = get_context()?;
    let mut page = ctx.dashboard();

    let result = page.toggle(id).ok_or_else(|| banner(&page));
    run.finish(result, |todo| {
        let prefix = if todo.is_completed {
            "Completed"
        } else {
            "Reopened"
        };
        print_todo(prefix, todo);
    })
}

/// Load pages until the todo shows up in the list view
fn locate(page: &mut Dashboard, id: &str) -> Result<(), Error> {
    let mut page_no = 1;
    loop {
        page.set_query(ListQuery {
            page: Some(page_no),
            limit: Some(MAX_PAGE_LIMIT),
            completed: None,
        });
        if !page.refresh() {
            return Err(banner(page));
        }
        if page.list().item(id).is_some() {
            return Ok(());
        }
        match page.pagination() {
            Some(p) if p.has_next => page_no += 1,
            _ => return Err(Error::Other("Todo not found".to_string())),
        }
    }
}

pub fn edit(
    id: &str,
    title: Option<String>,
    description: Option<String>,
    completed: Option<bool>,
    json: bool,
) -> Result<()> {
    let run = Invocation::start("edit", "todo", json);
    let ctx = get_context()?;
    let mut page = ctx.dashboard();

    let result = locate(&mut page, id).and_then(|()| {
        let intent = match page.list_mut().item_mut(id) {
            Some(item) => {
                item.begin_edit();
                if let Some(title) = title {
                    item.set_title(title);
                }
                if let Some(description) = description {
                    item.set_description(description);
                }
                if let Some(completed) = completed {
                    item.set_completed(completed);
                }
                item.save()
            }
            None => return Err(Error::Other("Todo not found".to_string())),
        };
        if !page.dispatch(intent) {
            return Err(banner(&page));
        }
        page.list()
            .item(id)
            .map(|item| item.todo().clone())
            .ok_or_else(|| Error::Other("Todo not found".to_string()))
    });

    run.finish(result, |todo| print_todo("Updated", todo))
}

pub fn delete(id: &str, force: bool, json: bool) -> Result<()> {
    let run = Invocation::start("delete", "todo", json);

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete todo {}?", id))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let ctx = get_context()?;
    let mut page = ctx.dashboard();

    let result = if page.delete(id) {
        Ok(serde_json::json!({ "id": id }))
    } else {
        Err(banner(&page))
    };
    if result.is_ok() {
        run.event("todo_deleted");
    }

    run.finish(result, |_| output::success(&format!("Deleted todo {}", id)))
}
