//! Error types for satlink-ingest

use thiserror::Error;

/// Error type for service setup and channel workers
#[derive(Error, Debug)]
pub enum IngestError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (socket bind/receive)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database pool could not be built
    #[error("Pool setup error: {0}")]
    PoolSetup(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error type for the persistence sink.
///
/// A failed batch is rolled back and logged, never requeued; the
/// connection always returns to the pool.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No pooled connection became available within the bounded wait
    #[error("connection pool exhausted: {0}")]
    PoolExhausted(String),

    /// Pool failure other than exhaustion (closed, backend setup)
    #[error("pool error: {0}")]
    Pool(String),

    /// PostgreSQL error
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Write did not complete within the configured bound
    #[error("write timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_wraps_into_ingest_error() {
        // Setup-time storage failures surface through the service error
        let err = IngestError::from(StorageError::Pool("pool closed".into()));
        assert!(matches!(err, IngestError::Storage(_)));
        assert_eq!(err.to_string(), "Storage error: pool error: pool closed");
    }
}
