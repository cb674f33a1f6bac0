//! Repository commands - enable, disable and list.

use crate::context::Context;
use crate::output::{Table, header, info, success, url};
use anyhow::Result;
use clap::Args;

/// Arguments for the enable command
#[derive(Args, Debug, Clone)]
pub struct EnableArgs {
    /// Repository URL
    pub url: String,

    /// Queue a refresh of every branch and tag right away
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for the disable command
#[derive(Args, Debug, Clone)]
pub struct DisableArgs {
    /// Repository URL
    pub url: String,
}

/// Arguments for the repositories command
#[derive(Args, Debug, Clone)]
pub struct RepositoriesArgs {
    /// Resume after this repository URL
    #[arg(long)]
    pub after: Option<String>,

    /// Maximum number of rows (0 lists everything)
    #[arg(short, long, default_value_t = 0)]
    pub limit: usize,
}

/// Run the enable command
pub async fn enable(args: EnableArgs, ctx: &Context) -> Result<()> {
    let record = ctx.repositories.enable(&args.url).await?;
    success(&format!("Enabled {} ({})", url(&record.url), record.kind));

    if args.refresh {
        ctx.packages.refresh_packages(&record.url, false).await?;
        info("Queued a refresh of every branch and tag");
    }
    Ok(())
}

/// Run the disable command
pub async fn disable(args: DisableArgs, ctx: &Context) -> Result<()> {
    match ctx.repositories.disable(&args.url).await? {
        Some(record) => success(&format!("Disabled {}", url(&record.url))),
        None => info(&format!("{} is not enabled", args.url)),
    }
    Ok(())
}

/// Run the repositories command
pub async fn list(args: RepositoriesArgs, ctx: &Context) -> Result<()> {
    let page = ctx
        .repositories
        .list(args.after.as_deref(), args.limit)
        .await?;

    if page.items.is_empty() {
        info("No repository enabled");
        return Ok(());
    }

    header("Enabled repositories");
    let mut table = Table::new();
    table.headers(["URL", "Kind", "Package", "Default branch", "Updated"]);
    for record in &page.items {
        table.row([
            record.url.clone(),
            record.kind.clone(),
            record
                .package_name
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            record.last_root_identifier.clone().unwrap_or_else(|| "-".to_string()),
            record.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table.print();

    if let Some(last) = page.last_id {
        info(&format!("More repositories follow, continue with --after {last}"));
    }
    Ok(())
}
