//! satlink-wire: codec for the 19-byte CSP telemetry packet
//!
//! Wire layout (multi-byte fields little-endian on both sides):
//! 3-byte CSP header, then satellite id (u32), temperature, battery
//! voltage and altitude (f32 each). The format carries no checksum, so
//! the only decode failure is a wrong-length datagram.

pub mod csp;
pub mod error;
pub mod packet;

pub use csp::CspHeader;
pub use error::{DecodeError, EncodeError};
pub use packet::{decode, encode, TelemetryRecord, PACKET_LEN};
