//! Telemetry payload and whole-packet codec

use crate::csp::CspHeader;
use crate::error::{DecodeError, EncodeError};

/// Exact on-wire size: 3-byte header + u32 + three f32
pub const PACKET_LEN: usize = 19;

/// One decoded telemetry sample.
///
/// Values are taken as-is from the wire; physically implausible readings
/// are still accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    pub satellite_id: u32,
    pub temperature: f32,
    pub battery_voltage: f32,
    pub altitude: f32,
}

/// Encode a header and record into the 19-byte wire form
pub fn encode(header: &CspHeader, record: &TelemetryRecord) -> Result<[u8; PACKET_LEN], EncodeError> {
    let mut buf = [0u8; PACKET_LEN];
    buf[0..3].copy_from_slice(&header.pack()?);
    buf[3..7].copy_from_slice(&record.satellite_id.to_le_bytes());
    buf[7..11].copy_from_slice(&record.temperature.to_le_bytes());
    buf[11..15].copy_from_slice(&record.battery_voltage.to_le_bytes());
    buf[15..19].copy_from_slice(&record.altitude.to_le_bytes());
    Ok(buf)
}

/// Decode a datagram into header and record.
///
/// Pure: identical bytes always yield identical values. The only failure
/// is a wrong-length input.
pub fn decode(bytes: &[u8]) -> Result<(CspHeader, TelemetryRecord), DecodeError> {
    if bytes.len() != PACKET_LEN {
        return Err(DecodeError::Length {
            expected: PACKET_LEN,
            got: bytes.len(),
        });
    }

    let header = CspHeader::unpack([bytes[0], bytes[1], bytes[2]]);
    let le_u32 = |i: usize| u32::from_le_bytes(bytes[i..i + 4].try_into().unwrap());
    let record = TelemetryRecord {
        satellite_id: le_u32(3),
        temperature: f32::from_bits(le_u32(7)),
        battery_voltage: f32::from_bits(le_u32(11)),
        altitude: f32::from_bits(le_u32(15)),
    };
    Ok((header, record))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (CspHeader, TelemetryRecord) {
        (
            CspHeader {
                priority: 2,
                destination: 10,
                source: 5,
                reserved: 0,
                port: 7,
                hmac: true,
                rdp: false,
            },
            TelemetryRecord {
                satellite_id: 4242,
                temperature: 21.5,
                battery_voltage: 87.25,
                altitude: 312.0,
            },
        )
    }

    #[test]
    fn test_encode_known_bytes() {
        let (h, r) = sample();
        let bytes = encode(&h, &r).unwrap();
        assert_eq!(
            bytes,
            [
                0x8a, 0x14, 0x1e, // header
                0x92, 0x10, 0x00, 0x00, // 4242
                0x00, 0x00, 0xac, 0x41, // 21.5
                0x00, 0x80, 0xae, 0x42, // 87.25
                0x00, 0x00, 0x9c, 0x43, // 312.0
            ]
        );
    }

    #[test]
    fn test_decode_known_bytes() {
        let (h, r) = sample();
        let bytes = encode(&h, &r).unwrap();
        assert_eq!(decode(&bytes).unwrap(), (h, r));
    }

    #[test]
    fn test_round_trip_edge_values() {
        let headers = [
            CspHeader {
                priority: 0,
                destination: 0,
                source: 0,
                reserved: 0,
                port: 0,
                hmac: false,
                rdp: false,
            },
            CspHeader {
                priority: 3,
                destination: 63,
                source: 63,
                reserved: 0,
                port: 63,
                hmac: true,
                rdp: true,
            },
        ];
        let records = [
            TelemetryRecord {
                satellite_id: 0,
                temperature: 0.0,
                battery_voltage: 0.0,
                altitude: 0.0,
            },
            TelemetryRecord {
                satellite_id: u32::MAX,
                temperature: -273.15,
                battery_voltage: f32::MAX,
                altitude: f32::MIN_POSITIVE,
            },
        ];
        for h in headers {
            for r in records {
                let bytes = encode(&h, &r).unwrap();
                assert_eq!(decode(&bytes).unwrap(), (h, r));
            }
        }
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        for len in [0usize, 1, 18, 20, 32] {
            let buf = vec![0u8; len];
            assert_eq!(
                decode(&buf),
                Err(DecodeError::Length {
                    expected: PACKET_LEN,
                    got: len
                })
            );
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let bytes = [0x8a; PACKET_LEN];
        assert_eq!(decode(&bytes).unwrap(), decode(&bytes).unwrap());
    }
}
