//! Reportd CLI entry point.

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use reportd::cli::{Cli, Commands, RunArgs};
use reportd::domain::error::{DownloadError, WorkflowError};
use reportd::domain::models::Config;
use reportd::domain::ports::{FileWatcher, ScriptedTrigger};
use reportd::infrastructure::browser::ChromiumDriver;
use reportd::infrastructure::config::ConfigLoader;
use reportd::infrastructure::logging;
use reportd::infrastructure::watcher::NotifyFileWatcher;
use reportd::services::{DownloadCoordinator, WorkflowEngine};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err:#}");
            std::process::exit(2);
        }
    };

    let _logging = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("logging setup failed: {err:#}");
            std::process::exit(2);
        }
    };

    match cli.command {
        Commands::Config => print_config(config),
        Commands::Run(args) => {
            if let Err(err) = run(config, &args).await {
                error!(error = %err, "fatal error, exiting");
                std::process::exit(err.exit_code());
            }
        }
    }
}

/// Print the effective configuration with the password masked.
fn print_config(mut config: Config) {
    if !config.target.password.is_empty() {
        config.target.password = "<redacted>".to_string();
    }
    match serde_yaml::to_string(&config) {
        Ok(yaml) => print!("{yaml}"),
        Err(err) => eprintln!("failed to render configuration: {err}"),
    }
}

/// Wire the adapters together and run the workflow engine.
async fn run(config: Config, args: &RunArgs) -> Result<(), WorkflowError> {
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_token.cancel();
        }
    });

    DownloadCoordinator::prepare(&config.download)
        .await
        .map_err(WorkflowError::Startup)?;

    // The watch must outlive the engine run; dropping it ends the stream.
    let mut watcher = NotifyFileWatcher::new();
    let events = watcher
        .watch(&config.download.temp_dir())
        .map_err(|err| WorkflowError::Startup(DownloadError::Watch(err.to_string())))?;
    let downloads = DownloadCoordinator::new(events, &config.download);

    let driver = Arc::new(
        ChromiumDriver::launch(&config.browser)
            .await
            .map_err(|err| WorkflowError::Browser(err.to_string()))?,
    );
    let trigger = Arc::new(ScriptedTrigger::new(config.workflow.export_script.clone()));

    let mut engine = WorkflowEngine::new(driver, trigger, downloads, config, shutdown);
    if args.once {
        engine.run_once().await
    } else {
        engine.run().await
    }
}
