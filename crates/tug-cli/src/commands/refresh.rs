//! Refresh commands.

use crate::context::Context;
use crate::output::{Table, header, info, success, url, warning};
use anyhow::Result;
use clap::Args;
use tug_repository::RefreshOutcome;

/// Arguments for the refresh command
#[derive(Args, Debug, Clone)]
pub struct RefreshArgs {
    /// Repository URL; every enabled repository when omitted
    #[arg(long)]
    pub url: Option<String>,

    /// Refresh one version only (tag name or dev-<branch>)
    #[arg(long, requires = "url")]
    pub version: Option<String>,

    /// Rewrite versions even when their reference did not move
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the refresh-cache command
#[derive(Args, Debug, Clone)]
pub struct RefreshCacheArgs {
    /// Repository URL; every repository when omitted
    #[arg(long)]
    pub url: Option<String>,
}

/// Run the refresh command
pub async fn run(args: RefreshArgs, ctx: &Context) -> Result<()> {
    let packages = &ctx.packages;

    match (args.url, args.version) {
        (Some(repository), Some(version)) => {
            let refresh = packages.refresh_package(&repository, &version, args.force).await?;
            let verb = match refresh.outcome {
                RefreshOutcome::Created => "Created",
                RefreshOutcome::Updated => "Updated",
                RefreshOutcome::Unchanged => "Unchanged",
                RefreshOutcome::Skipped => "Skipped",
            };
            success(&format!("{verb} {version} of {}", url(&refresh.record.url)));
        }
        (Some(repository), None) => {
            let record = packages.refresh_packages(&repository, args.force).await?;
            success(&format!("Queued refresh of {}", url(&record.url)));
        }
        (None, _) => {
            let results = packages.refresh_all_packages(args.force).await?;
            if results.is_empty() {
                info("No repository enabled");
                return Ok(());
            }

            header("Queued refreshes");
            let mut table = Table::new();
            table.headers(["Repository", "Status"]);
            for (repository, result) in &results {
                let status = match result {
                    Ok(_) => "queued".to_string(),
                    Err(e) => {
                        warning(&format!("{repository}: {e}"));
                        format!("failed: {e}")
                    }
                };
                table.row([repository.clone(), status]);
            }
            table.print();
        }
    }
    Ok(())
}

/// Run the refresh-cache command
pub async fn run_cache(args: RefreshCacheArgs, ctx: &Context) -> Result<()> {
    match args.url {
        Some(repository) => {
            let record = ctx.packages.refresh_cache_packages(&repository).await?;
            success(&format!("Dropped cached data of {}", url(&record.url)));
        }
        None => {
            let count = ctx.packages.refresh_all_cache_packages().await;
            success(&format!("Dropped cached data of {count} repositories"));
        }
    }
    Ok(())
}
