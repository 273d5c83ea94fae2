use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use planecli::cli::commands::CacheAction;
use planecli::cli::handlers::{self, CommandContext};
use planecli::cli::{Cli, Commands};
use planecli::config::{Overrides, PlaneConfig};
use planecli::error::PlaneError;
use planecli::session::Session;

fn main() {
    let cli = Cli::parse();
    planecli::logging::init(cli.verbose, cli.log_file.clone());

    if let Err(err) = run(cli) {
        std::process::exit(report(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => PlaneConfig::default_path().ok_or_else(|| {
            PlaneError::Config("Cannot determine the config directory".to_string())
        })?,
    };
    let config = PlaneConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let overrides = Overrides {
        base_url: cli.base_url,
        api_key: cli.api_key,
        workspace: cli.workspace,
    };

    // These work without credentials
    match cli.command {
        Commands::Configure => return handlers::handle_configure(&config_path, config, overrides),
        Commands::Cache {
            action: CacheAction::Clear,
        } => return handlers::handle_cache_clear(&config),
        Commands::Cache {
            action: CacheAction::Path,
        } => return handlers::handle_cache_path(&config, cli.json),
        _ => {}
    }

    let config = config.with_overrides(overrides);
    let credentials = config.credentials()?;
    let session = Session::connect(&credentials, config.cache_dir().as_deref(), cli.no_cache);
    let ctx = CommandContext::new(session, credentials.workspace, cli.json);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        tokio::select! {
            result = dispatch(&ctx, cli.command) => result,
            _ = tokio::signal::ctrl_c() => Err(PlaneError::Interrupted.into()),
        }
    });
    // don't wait on in-flight blocking requests after an interrupt
    runtime.shutdown_background();
    result
}

async fn dispatch(ctx: &CommandContext, command: Commands) -> Result<()> {
    match command {
        Commands::Whoami => handlers::handle_whoami(ctx).await,
        Commands::Configure => anyhow::bail!("configure runs before a session is created"),
        Commands::Cache { action } => handlers::handle_cache(ctx, action).await,
        Commands::Project { action } => handlers::handle_project(ctx, action).await,
        Commands::WorkItem { action } => handlers::handle_work_item(ctx, action).await,
        Commands::State { action } => handlers::handle_state(ctx, action).await,
        Commands::Label { action } => handlers::handle_label(ctx, action).await,
        Commands::Module { action } => handlers::handle_module(ctx, action).await,
        Commands::Cycle { action } => handlers::handle_cycle(ctx, action).await,
        Commands::User { action } => handlers::handle_user(ctx, action).await,
        Commands::Comment { action } => handlers::handle_comment(ctx, action).await,
        Commands::Document { action } => handlers::handle_document(ctx, action).await,
    }
}

/// Print the error with its hint and pick the exit code.
fn report(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PlaneError>() {
        Some(plane) => {
            eprintln!("{} {}", "Error:".red().bold(), plane);
            if let Some(hint) = plane.hint() {
                eprintln!("{} {}", "Hint:".yellow(), hint);
            }
            plane.exit_code()
        }
        None => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            1
        }
    }
}
