//! CSP header bit packing
//!
//! Three bytes, fields packed most-significant-first:
//! byte 0 = priority(2) | destination(6)
//! byte 1 = source(6) | reserved(2)
//! byte 2 = port(6) | hmac(1) | rdp(1)

use crate::error::EncodeError;

/// Routing/metadata prefix preceding the telemetry payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CspHeader {
    /// 2 bits, 0-3
    pub priority: u8,
    /// 6 bits, 0-63
    pub destination: u8,
    /// 6 bits, 0-63
    pub source: u8,
    /// 2 bits, must be zero on encode
    pub reserved: u8,
    /// 6 bits, 0-63
    pub port: u8,
    pub hmac: bool,
    pub rdp: bool,
}

fn check_width(field: &'static str, value: u8, bits: u8) -> Result<u8, EncodeError> {
    if value >> bits != 0 {
        return Err(EncodeError::FieldOverflow { field, value, bits });
    }
    Ok(value)
}

impl CspHeader {
    /// Pack into the 3-byte wire form.
    ///
    /// Fails if any field exceeds its declared bit width or the reserved
    /// bits are non-zero.
    pub fn pack(&self) -> Result<[u8; 3], EncodeError> {
        let priority = check_width("priority", self.priority, 2)?;
        let destination = check_width("destination", self.destination, 6)?;
        let source = check_width("source", self.source, 6)?;
        let port = check_width("port", self.port, 6)?;
        if self.reserved != 0 {
            return Err(EncodeError::ReservedNotZero(self.reserved));
        }

        Ok([
            priority << 6 | destination,
            source << 2,
            port << 2 | (self.hmac as u8) << 1 | self.rdp as u8,
        ])
    }

    /// Unpack from the 3-byte wire form.
    ///
    /// Never fails: every field is masked to its width, never
    /// sign-extended. Reserved bits are kept as received.
    pub fn unpack(bytes: [u8; 3]) -> Self {
        Self {
            priority: bytes[0] >> 6,
            destination: bytes[0] & 0x3f,
            source: bytes[1] >> 2,
            reserved: bytes[1] & 0x03,
            port: bytes[2] >> 2,
            hmac: bytes[2] & 0x02 != 0,
            rdp: bytes[2] & 0x01 != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> CspHeader {
        CspHeader {
            priority: 2,
            destination: 10,
            source: 5,
            reserved: 0,
            port: 7,
            hmac: true,
            rdp: false,
        }
    }

    #[test]
    fn test_pack_layout() {
        let bytes = header().pack().unwrap();
        assert_eq!(bytes, [0x8a, 0x14, 0x1e]);
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let h = header();
        assert_eq!(CspHeader::unpack(h.pack().unwrap()), h);
    }

    #[test]
    fn test_pack_rejects_overflow() {
        let mut h = header();
        h.priority = 4;
        assert_eq!(
            h.pack(),
            Err(EncodeError::FieldOverflow {
                field: "priority",
                value: 4,
                bits: 2
            })
        );

        let mut h = header();
        h.destination = 64;
        assert!(h.pack().is_err());

        let mut h = header();
        h.source = 255;
        assert!(h.pack().is_err());

        let mut h = header();
        h.port = 64;
        assert!(h.pack().is_err());
    }

    #[test]
    fn test_pack_rejects_reserved_bits() {
        let mut h = header();
        h.reserved = 1;
        assert_eq!(h.pack(), Err(EncodeError::ReservedNotZero(1)));
    }

    #[test]
    fn test_unpack_masks_all_fields() {
        // All bits set: every field must come back masked to its width
        let h = CspHeader::unpack([0xff, 0xff, 0xff]);
        assert_eq!(h.priority, 3);
        assert_eq!(h.destination, 63);
        assert_eq!(h.source, 63);
        assert_eq!(h.reserved, 3);
        assert_eq!(h.port, 63);
        assert!(h.hmac);
        assert!(h.rdp);
    }
}
