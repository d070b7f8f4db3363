//! satlink-sim: sends random CSP telemetry packets over UDP
//!
//! Emulates satellite downlinks for local testing: one sender task per
//! configured port, each pushing a random packet at a randomized
//! sub-second cadence.

use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tokio::net::UdpSocket;
use tracing::info;
use tracing_subscriber::EnvFilter;

use satlink_wire::{encode, CspHeader, TelemetryRecord, PACKET_LEN};

#[derive(Parser)]
#[command(name = "satlink-sim")]
#[command(about = "Random telemetry generator for the satlink ingest pipeline")]
struct Args {
    /// Target host running the ingest listeners
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Channel ports to send on, one sender task each
    #[arg(long, value_delimiter = ',', default_value = "5005,5006,5007")]
    ports: Vec<u16>,

    /// Upper bound on the random delay between packets, milliseconds
    #[arg(long, default_value = "1000")]
    max_delay_ms: u64,
}

fn random_telemetry(rng: &mut impl Rng) -> (CspHeader, TelemetryRecord) {
    let header = CspHeader {
        priority: rng.random_range(0..=3),
        destination: rng.random_range(0..=63),
        source: rng.random_range(0..=63),
        reserved: 0,
        port: rng.random_range(0..=63),
        hmac: rng.random_bool(0.5),
        rdp: rng.random_bool(0.5),
    };
    let record = TelemetryRecord {
        satellite_id: rng.random_range(1000..=9999),
        temperature: rng.random_range(-100.0..100.0),
        battery_voltage: rng.random_range(0.0..100.0),
        altitude: rng.random_range(200.0..400.0),
    };
    (header, record)
}

fn random_packet(rng: &mut impl Rng) -> [u8; PACKET_LEN] {
    let (header, record) = random_telemetry(rng);
    encode(&header, &record).expect("generated fields fit their bit widths")
}

async fn send_telemetry(host: String, port: u16, max_delay_ms: u64) -> std::io::Result<()> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let target = format!("{}:{}", host, port);
    info!(target = %target, "Sending telemetry");

    loop {
        // Thread-local rng must not live across the await points below
        let (packet, delay_ms) = {
            let mut rng = rand::rng();
            packet_and_delay(&mut rng, max_delay_ms)
        };
        socket.send_to(&packet, &target).await?;
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

fn packet_and_delay(rng: &mut impl Rng, max_delay_ms: u64) -> ([u8; PACKET_LEN], u64) {
    (random_packet(rng), rng.random_range(0..=max_delay_ms))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    for port in args.ports.clone() {
        let host = args.host.clone();
        let max_delay_ms = args.max_delay_ms;
        tokio::spawn(async move {
            if let Err(e) = send_telemetry(host, port, max_delay_ms).await {
                tracing::error!(port, error = %e, "Sender stopped");
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("satlink-sim stopped");
    Ok(())
}
