//! Error types for satlink-wire

use thiserror::Error;

/// Encoding failed because a header field does not fit its bit width
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{field} value {value} exceeds {bits}-bit field width")]
    FieldOverflow {
        field: &'static str,
        value: u8,
        bits: u8,
    },

    #[error("reserved bits must be zero, got {0}")]
    ReservedNotZero(u8),
}

/// Decoding failed because the datagram is malformed
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid packet length: expected {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },
}
