//! satlink-ingest binary entry point

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use satlink_ingest::batch::Batcher;
use satlink_ingest::broadcast::{run_subscriber_server, SubscriberRegistry};
use satlink_ingest::listener::{run_flush_worker, ChannelWorker};
use satlink_ingest::sink::{create_pool, run_migrations, TelemetrySink};
use satlink_ingest::{Config, IngestError};

#[derive(Parser, Debug)]
#[command(name = "satlink-ingest")]
#[command(about = "Satellite telemetry ingestion: UDP channels to PostgreSQL with live fanout")]
struct Args {
    /// Path to service configuration file
    #[arg(short, long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config).map_err(|e| {
        error!(error = %e, "Failed to load config");
        e
    })?;

    info!(
        ports = ?config.channels.ports,
        batch_size = config.batch.max_records,
        flush_interval_secs = config.batch.flush_interval_secs,
        subscribers = %config.subscribers.listen_addr,
        "Starting satlink-ingest"
    );

    // Shared persistence pool, bounded across all channels
    let pool = create_pool(
        &config.database.url,
        config.database.pool_size,
        config.acquire_timeout(),
    )?;
    run_migrations(&pool).await.map_err(IngestError::Storage)?;
    let sink = Arc::new(TelemetrySink::new(pool, config.write_timeout()));

    let registry = Arc::new(SubscriberRegistry::new());
    let shutdown = CancellationToken::new();

    // Subscriber fanout server
    let subscriber_listener =
        tokio::net::TcpListener::bind(&config.subscribers.listen_addr).await?;
    info!(addr = %config.subscribers.listen_addr, "Subscriber server listening");
    let subscriber_task = tokio::spawn(run_subscriber_server(
        subscriber_listener,
        Arc::clone(&registry),
        shutdown.clone(),
    ));

    // One listener plus one flush worker per channel
    let mut tasks: JoinSet<()> = JoinSet::new();
    for port in config.channels.ports.clone() {
        let batcher = Arc::new(Batcher::new(config.batch.max_records));
        let (worker, flush_rx) = ChannelWorker::bind(
            &config.channels.listen_addr,
            port,
            batcher,
            config.flush_interval(),
        )
        .await?;

        tasks.spawn(worker.run(shutdown.clone()));

        let sink = Arc::clone(&sink);
        let registry = Arc::clone(&registry);
        tasks.spawn(run_flush_worker(port, flush_rx, sink, registry));
    }

    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to create SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to create SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("SIGTERM received, shutting down gracefully");
            shutdown.cancel();
        }
        _ = sigint.recv() => {
            info!("SIGINT received, shutting down gracefully");
            shutdown.cancel();
        }
        result = tasks.join_next() => {
            match result {
                Some(Ok(())) => info!("Channel task completed, shutting down"),
                Some(Err(e)) => error!(error = %e, "Channel task panicked, shutting down"),
                None => info!("All channel tasks completed"),
            }
            shutdown.cancel();
        }
    }

    // Listeners perform their final flush on the way out; flush workers
    // drain the queues before their senders drop
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Channel task panicked during shutdown");
        }
    }

    if let Err(e) = subscriber_task.await {
        error!(error = %e, "Subscriber server task panicked");
    }

    info!("satlink-ingest stopped");
    Ok(())
}
