//! Package commands - delete and list versions.

use crate::context::Context;
use crate::output::{Table, header, info, success};
use anyhow::{Result, anyhow};
use clap::Args;
use tug_core::PackageName;

/// Arguments for the delete command
#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Repository URL or vendor/name
    #[arg(long)]
    pub url: String,

    /// Delete one version only; every version when omitted
    #[arg(long)]
    pub version: Option<String>,
}

/// Arguments for the versions command
#[derive(Args, Debug, Clone)]
pub struct VersionsArgs {
    /// Package name (vendor/name)
    pub package: String,

    /// Only versions containing this text
    #[arg(short, long)]
    pub search: Option<String>,

    /// Resume after this version id
    #[arg(long)]
    pub after: Option<String>,

    /// Maximum number of rows (0 lists everything)
    #[arg(short, long, default_value_t = 0)]
    pub limit: usize,
}

/// Run the delete command
pub async fn delete(args: DeleteArgs, ctx: &Context) -> Result<()> {
    let deletion = match &args.version {
        Some(version) => ctx.packages.delete_package(&args.url, version).await?,
        None => ctx.packages.delete_packages(&args.url).await?,
    };

    match deletion.package_name {
        Some(name) => success(&format!("Deleted {} version(s) of {name}", deletion.removed)),
        None => info(&format!("No package found for {}", args.url)),
    }
    Ok(())
}

/// Run the versions command
pub async fn versions(args: VersionsArgs, ctx: &Context) -> Result<()> {
    let name = PackageName::parse(&args.package)
        .ok_or_else(|| anyhow!("invalid package name \"{}\", expected vendor/name", args.package))?;
    let page = ctx
        .packages
        .list_versions(&name, args.search.as_deref(), args.after.as_deref(), args.limit)
        .await?;

    if page.items.is_empty() {
        match &args.search {
            Some(search) => info(&format!("No version of {name} matches \"{search}\"")),
            None => info(&format!("No version stored for {name}")),
        }
        return Ok(());
    }

    header(&format!("Versions of {name}"));
    let mut table = Table::new();
    table.headers(["Version", "Normalized", "Stability", "Reference", "Updated"]);
    for version in &page.items {
        table.row([
            version.pretty_version.clone(),
            version.version.clone(),
            version.stability().to_string(),
            version.reference.clone(),
            version.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table.print();

    if let Some(last) = page.last_id {
        info(&format!("More versions follow, continue with --after {last}"));
    }
    Ok(())
}
