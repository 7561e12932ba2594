use clap::Parser;
use std::time::Duration;
use tallycast::cli::Cli;
use tallycast::config::{self, StoreConfig};
use tallycast::db::{self, PgVoteSource};
use tallycast::logging::{init_logging, LoggingConfig};
use tallycast::poller::TallyPoller;
use tallycast::web::broadcast::Broadcaster;
use tallycast::web::registry::SubscriberRegistry;
use tallycast::web::server::WebServer;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LoggingConfig::from_args(cli.quiet, cli.verbose > 0, cli.json);
    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "fatal startup error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let credentials = config::load_credentials(&cli.credentials_file)?;
    tracing::info!(
        "loaded store credentials from {}",
        cli.credentials_file.display()
    );

    let store = StoreConfig::new(cli.db_host, cli.db_name, credentials);
    tracing::info!(host = %store.host, user = %store.credentials.username, "connecting to vote store");

    // Blocking startup phase: nothing is served until the store handle exists
    let pool = db::connect_with_retry(
        &store.url(),
        cli.connect_attempts,
        Duration::from_millis(cli.connect_interval_ms),
    )
    .await?;

    let registry = SubscriberRegistry::new();
    let broadcaster = Broadcaster::new(registry.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let seed_labels: Vec<String> = cli
        .seed_labels
        .into_iter()
        .filter(|label| !label.is_empty())
        .collect();
    let poller = TallyPoller::new(
        PgVoteSource::new(pool.clone()),
        broadcaster,
        Duration::from_millis(cli.poll_interval_ms),
        seed_labels,
    );
    let poll_task = tokio::spawn(poller.run(shutdown_rx.clone()));

    let server = WebServer::new(cli.port, cli.static_dir, registry);
    server.run(shutdown_rx).await?;

    // The server only returns once the shutdown signal fired; let the poller
    // reach its next scheduling point, then release the store handle.
    let _ = poll_task.await;
    pool.close().await;
    tracing::info!("shutdown complete");

    Ok(())
}
