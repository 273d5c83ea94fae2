use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::cache::ApiCache;
use crate::config::{Overrides, PlaneConfig, normalize_base_url};

/// Prompt for connection settings, save them, and drop cached data.
///
/// Values given as flags or environment variables are taken without prompting.
pub fn handle_configure(path: &Path, current: PlaneConfig, overrides: Overrides) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let base_url = match overrides.base_url {
        Some(value) => value,
        None => prompt(&mut input, "Base URL", current.base_url.as_deref(), false)?,
    };
    let api_key = match overrides.api_key {
        Some(value) => value,
        None => prompt(&mut input, "API key", current.api_key.as_deref(), true)?,
    };
    let workspace = match overrides.workspace {
        Some(value) => value,
        None => prompt(&mut input, "Workspace slug", current.workspace.as_deref(), false)?,
    };

    let config = PlaneConfig {
        base_url: Some(normalize_base_url(&base_url)?),
        api_key: Some(api_key),
        workspace: Some(workspace),
        cache: current.cache,
    };
    config.credentials()?;
    config
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    // the cached data may belong to another instance or account
    if let (Some(dir), Some(base_url)) = (config.cache_dir(), config.base_url.as_deref()) {
        if dir.exists() {
            ApiCache::open(&dir, base_url, false).invalidate_all();
        }
    }

    println!("{} {}", "Saved".green(), path.display());
    Ok(())
}

fn prompt(
    input: &mut impl BufRead,
    label: &str,
    current: Option<&str>,
    secret: bool,
) -> Result<String> {
    match current {
        Some(value) if secret => print!("{} [{}]: ", label, mask(value)),
        Some(value) => print!("{} [{}]: ", label, value),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        return current
            .map(str::to_string)
            .with_context(|| format!("{} is required", label));
    }
    Ok(line.to_string())
}

fn mask(secret: &str) -> String {
    let skip = secret.chars().count().saturating_sub(4);
    let visible: String = secret.chars().skip(skip).collect();
    format!("****{}", visible)
}
