//! Dashboard command - interactive todo page in the terminal

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};

use super::todos::print_list;
use super::{get_context, Invocation};
use tododash_core::services::{Dashboard, SIGN_IN_PROMPT};
use tododash_core::ListQuery;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Action {
    Add,
    Toggle,
    Edit,
    Delete,
    Filter,
    NextPage,
    PrevPage,
    Refresh,
    Dismiss,
    SignOut,
    Quit,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Add => "Add todo",
            Action::Toggle => "Toggle completion",
            Action::Edit => "Edit todo",
            Action::Delete => "Delete todo",
            Action::Filter => "Filter",
            Action::NextPage => "Next page",
            Action::PrevPage => "Previous page",
            Action::Refresh => "Refresh",
            Action::Dismiss => "Dismiss error",
            Action::SignOut => "Sign out",
            Action::Quit => "Quit",
        }
    }
}

/// Load with a spinner on screen
fn refresh_with_spinner(page: &mut Dashboard) -> bool {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Loading todos...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    let loaded = page.refresh();
    spinner.finish_and_clear();
    loaded
}

fn render(page: &Dashboard) {
    println!();
    if let Some(error) = page.error() {
        println!("{}", error.red());
        println!();
    }
    print_list(&page.list().render());
    if let Some(filter) = page.query().completed {
        let label = if filter { "completed" } else { "open" };
        println!("{}", format!("Showing {} todos only", label).dimmed());
    }
    if let Some(p) = page.pagination() {
        if p.pages > 1 {
            println!("{}", format!("Page {} of {}", p.page, p.pages).dimmed());
        }
    }
    println!();
}

fn actions(page: &Dashboard) -> Vec<Action> {
    let mut actions = vec![Action::Add];
    if !page.list().is_empty() {
        actions.extend([Action::Toggle, Action::Edit, Action::Delete]);
    }
    actions.push(Action::Filter);
    if let Some(p) = page.pagination() {
        if p.has_next {
            actions.push(Action::NextPage);
        }
        if p.has_prev {
            actions.push(Action::PrevPage);
        }
    }
    actions.push(Action::Refresh);
    if page.error().is_some() {
        actions.push(Action::Dismiss);
    }
    actions.extend([Action::SignOut, Action::Quit]);
    actions
}

/// Ask which todo to act on; returns its id
fn pick_todo(page: &Dashboard, prompt: &str) -> Result<Option<String>> {
    let items = page.list().items();
    let labels: Vec<String> = items
        .iter()
        .map(|item| {
            let marker = if item.todo().is_completed { "[x]" } else { "[ ]" };
            format!("{} {}", marker, item.todo().title)
        })
        .collect();
    let choice = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact_opt()?;
    Ok(choice.map(|i| items[i].id().to_string()))
}

fn add(page: &mut Dashboard) -> Result<()> {
    let title: String = Input::new()
        .with_prompt("Title")
        .allow_empty(true)
        .interact_text()?;
    let description: String = Input::new()
        .with_prompt("Description (optional)")
        .allow_empty(true)
        .interact_text()?;
    page.set_title(title);
    page.set_description(description);
    page.submit();
    Ok(())
}

fn edit(page: &mut Dashboard, id: &str) -> Result<()> {
    let Some(item) = page.list_mut().item_mut(id) else {
        return Ok(());
    };
    item.begin_edit();

    let draft = item.draft().clone();
    let title: String = Input::new()
        .with_prompt("Title")
        .with_initial_text(draft.title)
        .allow_empty(true)
        .interact_text()?;
    let description: String = Input::new()
        .with_prompt("Description")
        .with_initial_text(draft.description)
        .allow_empty(true)
        .interact_text()?;
    let completed = Confirm::new()
        .with_prompt("Completed?")
        .default(draft.is_completed)
        .interact()?;
    item.set_title(title);
    item.set_description(description);
    item.set_completed(completed);

    let save = Confirm::new()
        .with_prompt("Save changes?")
        .default(true)
        .interact()?;
    if save {
        let intent = item.save();
        page.dispatch(intent);
    } else {
        item.cancel();
    }
    Ok(())
}

fn filter(page: &mut Dashboard) -> Result<()> {
    let options = ["All", "Open", "Completed"];
    let Some(choice) = Select::new()
        .with_prompt("Show")
        .items(&options)
        .default(0)
        .interact_opt()?
    else {
        return Ok(());
    };
    let completed = match choice {
        1 => Some(false),
        2 => Some(true),
        _ => None,
    };
    page.set_query(ListQuery {
        page: None,
        completed,
        ..page.query().clone()
    });
    refresh_with_spinner(page);
    Ok(())
}

fn turn_page(page: &mut Dashboard, delta: i64) {
    let current = page.pagination().map(|p| p.page).unwrap_or(1) as i64;
    let target = (current + delta).max(1) as u32;
    page.set_query(ListQuery {
        page: Some(target),
        ..page.query().clone()
    });
    refresh_with_spinner(page);
}

pub fn run() -> Result<()> {
    let run = Invocation::start("dashboard", "todo", false);
    let ctx = get_context()?;
    let mut page = ctx.dashboard();

    if !page.is_authenticated() {
        println!("{}", SIGN_IN_PROMPT.yellow());
        println!("{}", "Run 'td login' or 'td register' first.".dimmed());
        return Ok(());
    }
    page.mount();
    let mut last_logged: Option<String> = None;

    loop {
        if page.error() != last_logged.as_deref() {
            if let Some(error) = page.error() {
                let _ = run.failed(error);
            }
            last_logged = page.error().map(str::to_string);
        }
        if !page.is_authenticated() {
            if let Some(error) = page.error() {
                println!("{}", error.red());
            }
            println!("{}", SIGN_IN_PROMPT.yellow());
            return Ok(());
        }
        render(&page);

        let actions = actions(&page);
        let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
        let Some(choice) = Select::new()
            .with_prompt("What next?")
            .items(&labels)
            .default(0)
            .interact_opt()?
        else {
            return Ok(());
        };

        match actions[choice] {
            Action::Add => {
                add(&mut page)?;
                if page.error().is_none() {
                    run.event("todo_created");
                }
            }
            Action::Toggle => {
                if let Some(id) = pick_todo(&page, "Toggle which todo?")? {
                    let intent = page.list().item(&id).map(|item| item.toggle());
                    if let Some(intent) = intent {
                        page.dispatch(intent);
                    }
                }
            }
            Action::Edit => {
                if let Some(id) = pick_todo(&page, "Edit which todo?")? {
                    edit(&mut page, &id)?;
                }
            }
            Action::Delete => {
                if let Some(id) = pick_todo(&page, "Delete which todo?")? {
                    let confirmed = Confirm::new()
                        .with_prompt("Delete this todo?")
                        .default(false)
                        .interact()?;
                    let intent = page.list().item(&id).map(|item| item.delete());
                    if let (true, Some(intent)) = (confirmed, intent) {
                        if page.dispatch(intent) {
                            run.event("todo_deleted");
                        }
                    }
                }
            }
            Action::Filter => filter(&mut page)?,
            Action::NextPage => turn_page(&mut page, 1),
            Action::PrevPage => turn_page(&mut page, -1),
            Action::Refresh => {
                refresh_with_spinner(&mut page);
            }
            Action::Dismiss => page.dismiss_error(),
            Action::SignOut => {
                let outcome = page.sign_out();
                println!("{}", outcome.message.green());
                return Ok(());
            }
            Action::Quit => return Ok(()),
        }
    }
}
