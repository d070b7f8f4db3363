//! satlink-api binary entry point

use std::time::Duration;

use axum::{routing::get, Router};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

mod routes;

use satlink_ingest::sink::create_pool;

#[derive(Parser)]
#[command(name = "satlink-api")]
#[command(about = "REST query API over persisted satlink telemetry")]
struct Args {
    /// Listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    listen_addr: String,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Max pooled connections
    #[arg(long, env = "POOL_SIZE", default_value = "8")]
    pool_size: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let pool = create_pool(&args.database_url, args.pool_size, Duration::from_secs(5))?;

    // Operator dashboards run on a different origin
    let app = Router::new()
        .route("/telemetry/satellite", get(routes::get_telemetry))
        .route(
            "/telemetry/satellite/:id",
            get(routes::get_telemetry_for_satellite),
        )
        .layer(CorsLayer::permissive())
        .with_state(pool);

    let listener = tokio::net::TcpListener::bind(&args.listen_addr).await?;
    tracing::info!(addr = %args.listen_addr, "satlink-api listening");

    axum::serve(listener, app).await?;
    Ok(())
}
