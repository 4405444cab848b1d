//! libstage - Stage native libraries for Android application packages
//!
//! Thin CLI over the staging engine: loads configuration, builds a request
//! from a request file or flags, runs it, and logs engine events.

mod cli;
mod display;
mod error;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::{CommandResult, OutputRenderer};
use crate::error::CliError;
use clap::Parser;
use libstage_config::Config;
use libstage_events::{EventReceiver, EventSender};
use libstage_platform::Platform;
use libstage_staging::{NativeLibraryStager, StagingLayout};
use libstage_types::ProjectRootResolver;
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if json_mode {
            println!(
                "{}",
                serde_json::json!({ "status": "error", "code": e.code(), "message": e.to_string() })
            );
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting libstage v{}", env!("CARGO_PKG_VERSION"));

    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global, &cli.command);

    let (event_sender, event_receiver) = libstage_events::channel();
    let stager = build_stager(&config, event_sender);
    let renderer = OutputRenderer::new(cli.global.json, config.general.color);

    let result = execute_command_with_events(cli.command, stager, event_receiver).await?;
    renderer.render_result(&result)?;

    if let CommandResult::Verified { diff, .. } = &result {
        if !diff.is_clean() {
            return Err(CliError::Drift {
                paths: diff.added.len() + diff.removed.len() + diff.changed.len(),
            });
        }
    }

    info!("Command completed successfully");
    Ok(())
}

fn build_stager(config: &Config, event_sender: EventSender) -> NativeLibraryStager {
    NativeLibraryStager::new(
        Platform::local(),
        Arc::new(ProjectRootResolver::new(config.project_root())),
        config.scratch_root(),
    )
    .with_hash_jobs(config.hash_jobs())
    .with_event_sender(event_sender)
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    stager: NativeLibraryStager,
    mut event_receiver: EventReceiver,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, stager));

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(message) = event_receiver.try_recv() {
                    logging::log_event_with_tracing(&message);
                }
                return result;
            }

            message = event_receiver.recv() => {
                if let Some(message) = message {
                    logging::log_event_with_tracing(&message);
                }
            }
        }
    }
}

/// Execute one subcommand
async fn execute_command(
    command: Commands,
    stager: NativeLibraryStager,
) -> Result<CommandResult, CliError> {
    match command {
        Commands::Stage { request, .. } => {
            let request = request.into_request_file().await?.into_request()?;
            let outcome = stager.stage(&request).await?;
            Ok(CommandResult::Staged(outcome))
        }
        Commands::Plan { request, .. } => {
            let request = request.into_request_file().await?.into_request()?;
            let plan = stager.plan(&request)?;
            Ok(CommandResult::Planned {
                layout: stager.layout(&request),
                plan,
            })
        }
        Commands::Verify { run_dir, .. } => {
            let layout = StagingLayout::from_run_dir(run_dir);
            let diff = stager.verify(&layout).await?;
            Ok(CommandResult::Verified { layout, diff })
        }
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs, command: &Commands) {
    if let Some(color) = global.color {
        config.general.color = color;
    }

    match command {
        Commands::Stage {
            scratch_root, jobs, ..
        } => {
            if let Some(root) = scratch_root {
                config.staging.scratch_root.clone_from(root);
            }
            if let Some(jobs) = jobs {
                config.staging.hash_jobs = *jobs;
            }
        }
        Commands::Plan { scratch_root, .. } => {
            if let Some(root) = scratch_root {
                config.staging.scratch_root.clone_from(root);
            }
        }
        Commands::Verify { jobs, .. } => {
            if let Some(jobs) = jobs {
                config.staging.hash_jobs = *jobs;
            }
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "info,libstage=debug,libstage_staging=debug,libstage_events=debug"
    } else {
        "warn,libstage=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        // JSON mode: structured logs on stderr, results on stdout
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else if debug_enabled {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
        eprintln!(
            "Debug logging enabled at {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_env_filter(filter)
            .init();
    }
}
