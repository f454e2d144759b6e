//! Health command - check that the todo API answers

use anyhow::Result;
use colored::Colorize;

use super::{get_context, Invocation};

pub fn run(json: bool) -> Result<()> {
    let run = Invocation::start("health", "api", json);
    let ctx = get_context()?;

    run.finish(ctx.api.health(), |health| {
        let status = if health.status == "healthy" {
            health.status.green()
        } else {
            health.status.yellow()
        };
        println!("API at {} is {}", ctx.api.base_url().bold(), status);
        if let Some(ts) = &health.timestamp {
            println!("  Server time: {}", ts.dimmed());
        }
    })
}
