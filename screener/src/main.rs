use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use data_ingestion::{MexcClient, NewsApiClient};
use research_agents::{build_selector, LexiconScorer};
use screener::{build_sink, Collaborators, Scheduler, Screener, ScreenerSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "screener",
    version,
    about = "Multi-stage short-signal screener for MEXC USDT perpetuals"
)]
struct Cli {
    /// TOML settings file; `screener.toml` is used when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single run and print the report as JSON
    RunOnce,
    /// Run immediately, then on the configured interval until Ctrl-C
    Schedule,
    /// Print the effective settings with secrets masked
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = ScreenerSettings::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    if let Commands::ShowConfig = cli.command {
        println!("{}", settings.to_toml_redacted()?);
        return Ok(());
    }

    let collaborators = Collaborators {
        source: Arc::new(MexcClient::new(&settings.mexc)),
        news: Arc::new(NewsApiClient::new(&settings.news)?),
        scorer: Arc::new(LexiconScorer::default()),
        advisor: build_selector(&settings.advisory)?,
        notifier: build_sink(&settings.telegram)?,
    };
    let screener = Arc::new(Screener::new(&settings, collaborators)?);

    match cli.command {
        Commands::RunOnce => {
            let report = screener.run_once().await;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize run report")?
            );
        }
        Commands::Schedule => {
            info!("🚀 Starting short-signal screener");
            let (stop, shutdown) = watch::channel(false);
            let scheduler = Arc::new(Scheduler::new(
                screener,
                settings.scheduler.interval(),
                shutdown,
            ));

            let runner = tokio::spawn({
                let scheduler = scheduler.clone();
                async move { scheduler.run().await }
            });

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            info!("👋 Shutting down gracefully...");
            stop.send(true).ok();
            runner.await.context("Scheduler task failed")?;
        }
        Commands::ShowConfig => {}
    }

    Ok(())
}
