use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use buildbridge::backend::JenkinsBackend;
use buildbridge::command::CommandDispatcher;
use buildbridge::core::config::{ConfigProvider, EnvConfigProvider, FileConfigProvider};
use buildbridge::queue::{PollScheduler, QueueProfile, ReceiverCycle, verify_connection};
use buildbridge::slack::{SlackClient, SlackNotifier};

#[derive(Parser)]
#[command(name = "buildbridge", version, about = "Run Jenkins commands sent from Slack via SQS")]
struct Cli {
    /// TOML configuration file, reread on every poll. Defaults to BUILDBRIDGE_* variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the queue until interrupted
    Run,
    /// Validate the configuration and test the SQS and Slack connections
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    buildbridge::setup_logging();
    let cli = Cli::parse();

    let config: Arc<dyn ConfigProvider> = match cli.config {
        Some(path) => Arc::new(FileConfigProvider::new(path)),
        None => Arc::new(EnvConfigProvider),
    };

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Check => check(config.as_ref()).await,
    }
}

async fn run(config: Arc<dyn ConfigProvider>) -> Result<()> {
    let snapshot = config.snapshot().context("failed to load configuration")?;
    for warning in snapshot.validate() {
        warn!("{}", warning);
    }

    let backend = Arc::new(JenkinsBackend::from_config(&snapshot)?);
    let notifier = Arc::new(SlackNotifier::new(Arc::clone(&config)));
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::clone(&config),
        backend,
        notifier,
    ));
    let scheduler = PollScheduler::new(config, Arc::new(ReceiverCycle::new(dispatcher)));

    info!("buildbridge started");
    scheduler.run(shutdown_signal()).await;
    info!("buildbridge stopped");
    Ok(())
}

async fn check(config: &dyn ConfigProvider) -> Result<()> {
    let snapshot = config.snapshot().context("failed to load configuration")?;
    let warnings = snapshot.validate();
    for warning in &warnings {
        println!("warning: {warning}");
    }

    let profile = QueueProfile::from_config(&snapshot);
    let mut failed = false;
    match verify_connection(&profile).await {
        Ok(message) => println!("{message}"),
        Err(e) => {
            println!("SQS: {e}");
            failed = true;
        }
    }

    if let Some(token) = snapshot.slack_token.clone() {
        match SlackClient::new(token, snapshot.slack_team.as_deref())
            .auth_test()
            .await
        {
            Ok(user_id) => println!("Verified Slack token (bot user {user_id})"),
            Err(e) => {
                println!("Slack: {e}");
                failed = true;
            }
        }
    }

    if failed {
        bail!("connection check failed");
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => error!("Cannot listen for SIGTERM: {}", e),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
    }
}
