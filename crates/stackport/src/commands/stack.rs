//! Operations shared by every resource kind

use crate::context::Context;
use crate::flash::Flash;
use colored::Colorize;
use stackport_cloud::{EngineClient, ResourceKind, Summary};
use std::process::ExitCode;

pub async fn list<K: ResourceKind>(
    ctx: &Context,
    kind: &K,
    owner: Option<&str>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let reconciler = ctx.orchestrator().reconciler();
    let result = match owner {
        Some(owner) => reconciler.list_for_owner(kind, owner).await,
        None => reconciler.list(kind).await,
    };

    let summaries = match result {
        Ok(summaries) => summaries,
        Err(e) => return Ok(Flash::failure(kind.label(), &e).print()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_summaries(kind, &summaries);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summaries<K: ResourceKind>(kind: &K, summaries: &[Summary]) {
    if summaries.is_empty() {
        println!("{}", format!("No {} yet", kind.key()).yellow());
        return;
    }

    println!(
        "{}",
        format!("{} ({}):", kind.key(), summaries.len()).bold()
    );
    for summary in summaries {
        println!(
            "  • {}  {}",
            summary.name.cyan(),
            summary.endpoint().unwrap_or("-")
        );
        println!("    {}", summary.console_url.dimmed());
    }
}

pub async fn show<K: ResourceKind>(ctx: &Context, kind: &K, name: &str) -> anyhow::Result<ExitCode> {
    let details = match ctx.orchestrator().show(kind, name).await {
        Ok(details) => details,
        Err(e) => return Ok(Flash::failure(kind.label(), &e).print()),
    };

    println!("{} {}", kind.label().bold(), name.cyan());
    if let serde_json::Value::Object(fields) = serde_json::to_value(&details)? {
        for (key, value) in fields {
            let text = match value {
                serde_json::Value::Null => "-".dimmed().to_string(),
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            if text.contains('\n') {
                println!("  {}:", key);
                for line in text.lines() {
                    println!("    {}", line);
                }
            } else {
                println!("  {}: {}", key, text);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn delete<K: ResourceKind>(
    ctx: &Context,
    kind: &K,
    name: &str,
) -> anyhow::Result<ExitCode> {
    println!("{}", format!("Destroying {} '{}'...", kind.label(), name).yellow());

    let flash = match ctx.orchestrator().delete(kind, name).await {
        Ok(()) => Flash::success(format!("{} '{}' deleted", kind.label(), name)),
        Err(e) => Flash::failure(kind.label(), &e),
    };
    Ok(flash.print())
}

pub async fn refresh<K: ResourceKind>(ctx: &Context, kind: &K) -> anyhow::Result<ExitCode> {
    println!("{}", format!("Rebuilding {} listing...", kind.key()).blue());

    let flash = match ctx.orchestrator().reconciler().refresh(kind).await {
        Ok(summaries) => Flash::success(format!(
            "Listing of {} rebuilt ({} found)",
            kind.key(),
            summaries.len()
        )),
        Err(e) => Flash::failure(kind.label(), &e),
    };
    Ok(flash.print())
}

pub async fn whoami(ctx: &Context) -> anyhow::Result<ExitCode> {
    let engine = ctx.orchestrator().engine();
    let status = engine.check_auth().await?;
    let settings = ctx.settings();

    println!("{}: {}", "Engine".bold(), engine.name());
    println!(
        "{}: {}/{} ({})",
        "Project".bold(),
        settings.organization,
        settings.project,
        settings.region
    );

    if status.authenticated {
        println!(
            "{}: {}",
            "Account".bold(),
            status.account_info.as_deref().unwrap_or("unknown").green()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{}: {}",
            "Account".bold(),
            status
                .error
                .as_deref()
                .unwrap_or("not authenticated")
                .red()
        );
        Ok(ExitCode::FAILURE)
    }
}
