//! Auth commands - register, login, logout, whoami, profile

use std::io::{self, BufRead};

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, Password};

use super::{get_context, Invocation};
use tododash_core::{Credentials, UserUpdate};

/// Use the given value or prompt for it
fn email_or_prompt(email: Option<String>) -> Result<String> {
    if let Some(e) = email {
        return Ok(e);
    }
    let e: String = Input::new().with_prompt("Email").interact_text()?;
    Ok(e)
}

fn password_or_prompt(password: Option<String>, confirm: bool) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    if let Ok(p) = std::env::var("TODODASH_PASSWORD") {
        return Ok(p);
    }
    // Piped input: first line is the password
    if atty::isnt(atty::Stream::Stdin) {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

pub fn register(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let run = Invocation::start("register", "session", json);
    let ctx = get_context()?;
    let credentials = Credentials::new(email_or_prompt(email)?, password_or_prompt(password, true)?);

    let result = ctx.session.register(&credentials);
    if result.is_ok() {
        run.event("register_succeeded");
    }
    run.finish(result, |response| {
        let email = response.user.as_ref().map(|u| u.email.as_str()).unwrap_or("");
        println!("{} {}", "Registered and signed in as".green(), email.bold());
    })
}

pub fn login(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let run = Invocation::start("login", "session", json);
    let ctx = get_context()?;
    let credentials = Credentials::new(email_or_prompt(email)?, password_or_prompt(password, false)?);

    let result = ctx.session.login(&credentials);
    if result.is_ok() {
        run.event("login_succeeded");
    }
    run.finish(result, |response| {
        let email = response.user.as_ref().map(|u| u.email.as_str()).unwrap_or("");
        println!("{} {}", "Signed in as".green(), email.bold());
    })
}

pub fn logout(json: bool) -> Result<()> {
    let run = Invocation::start("logout", "session", json);
    let ctx = get_context()?;
    let outcome = ctx.session.logout();

    for warning in &outcome.warnings {
        let _ = run.failed(warning);
    }
    run.finish(Ok(outcome), |outcome| {
        println!("{}", outcome.message.green());
        for warning in &outcome.warnings {
            println!("  {}", warning.dimmed());
        }
    })
}

pub fn whoami(json: bool) -> Result<()> {
    let run = Invocation::start("whoami", "session", json);
    let ctx = get_context()?;

    run.finish(Ok(ctx.session.current_user()), |user| match user {
        Some(user) => {
            println!("Signed in as {}", user.email.bold());
            if !user.id.is_empty() {
                println!("  User ID: {}", user.id.dimmed());
            }
        }
        None => println!("{}", "Not signed in. Use 'td login' to sign in.".yellow()),
    })
}

pub fn profile(email: Option<String>, json: bool) -> Result<()> {
    let run = Invocation::start("profile", "user", json);
    let ctx = get_context()?;
    let updates = UserUpdate { email };

    if updates.is_empty() {
        return run.finish(Ok(ctx.session.current_user()), |user| match user {
            Some(user) => println!("Email: {}", user.email),
            None => println!("{}", "Not signed in. Use 'td login' to sign in.".yellow()),
        });
    }

    run.finish(ctx.session.update_user_profile(&updates), |user| {
        println!("{} {}", "Profile updated:".green(), user.email.bold());
    })
}
