//! satlink-ingest: satellite telemetry downlink pipeline
//!
//! One UDP listener per configured channel decodes 19-byte CSP telemetry
//! packets, accumulates records into per-channel batches (size or time
//! triggered), persists each batch to PostgreSQL through a bounded
//! connection pool, and pushes every persisted batch to the live
//! WebSocket subscribers.

pub mod batch;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod listener;
pub mod sink;

pub use config::Config;
pub use error::{IngestError, StorageError};

pub type Result<T> = std::result::Result<T, IngestError>;
