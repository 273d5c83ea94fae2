use anyhow::Result;
use colored::Colorize;

use super::CommandContext;
use super::utils::print_json;
use crate::cache::{ApiCache, CachedResource};
use crate::cli::commands::CacheAction;
use crate::config::PlaneConfig;
use crate::error::PlaneError;
use serde_json::json;

/// `cache clear` works without credentials; every key lives under one directory.
pub fn handle_cache_clear(config: &PlaneConfig) -> Result<()> {
    let Some(dir) = config.cache_dir() else {
        println!("Cache is disabled.");
        return Ok(());
    };
    if dir.exists() {
        let base_url = config.base_url.as_deref().unwrap_or_default();
        ApiCache::open(&dir, base_url, false).invalidate_all();
    }
    println!("{} {}", "Cleared".green(), dir.display());
    Ok(())
}

pub fn handle_cache_path(config: &PlaneConfig, json: bool) -> Result<()> {
    let dir = config.cache_dir();
    if json {
        return print_json(&json!({ "path": dir, "enabled": dir.is_some() }));
    }
    match dir {
        Some(dir) => println!("{}", dir.display()),
        None => println!("Cache is disabled."),
    }
    Ok(())
}

pub async fn handle_cache(ctx: &CommandContext, action: CacheAction) -> Result<()> {
    let CacheAction::Invalidate { resource, project } = action else {
        anyhow::bail!("cache clear and cache path do not need a session");
    };
    let resource: CachedResource = resource.parse()?;

    let project_id = match (resource.is_project_scoped(), project) {
        (true, Some(project)) => Some(ctx.project_id(&project).await?),
        (true, None) => {
            return Err(PlaneError::validation(
                format!("{} are cached per project", resource),
                "Specify --project.",
            )
            .into());
        }
        (false, _) => None,
    };

    ctx.session
        .cache()
        .invalidate(resource, &ctx.workspace, project_id.as_deref());
    println!("{} {}", "Invalidated".green(), resource);
    Ok(())
}
