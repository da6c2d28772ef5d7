//! Two-byte record prefix shared by every storage key.
//!
//! ```text
//! ┌─────────┬────────────┬─────────────────────┐
//! │ version │ record_tag │  ... record fields  │
//! │ 1 byte  │   1 byte   │    (varies)         │
//! └─────────┴────────────┴─────────────────────┘
//! ```
//!
//! The record tag keeps the record type in its high nibble. Keys of one record
//! type therefore form a single contiguous range of the keyspace.

use bytes::{BufMut, BytesMut};

use super::DeserializeError;

/// Version byte plus record tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPrefix {
    version: u8,
    tag: RecordTag,
}

impl KeyPrefix {
    pub const fn new(version: u8, tag: RecordTag) -> Self {
        Self { version, tag }
    }

    /// Parses a prefix and checks it against the expected version and tag.
    pub fn expect(data: &[u8], expected: KeyPrefix) -> Result<(), DeserializeError> {
        if data.len() < 2 {
            return Err(DeserializeError {
                message: format!(
                    "buffer too short for key prefix: need 2 bytes, got {}",
                    data.len()
                ),
            });
        }
        if data[0] != expected.version {
            return Err(DeserializeError {
                message: format!(
                    "invalid key version: expected 0x{:02x}, got 0x{:02x}",
                    expected.version, data[0]
                ),
            });
        }
        let tag = RecordTag::from_byte(data[1])?;
        if tag != expected.tag {
            return Err(DeserializeError {
                message: format!(
                    "invalid record tag: expected 0x{:02x}, got 0x{:02x}",
                    expected.tag.as_byte(),
                    tag.as_byte()
                ),
            });
        }
        Ok(())
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.version);
        buf.put_u8(self.tag.as_byte());
    }
}

/// Record type in the high nibble, low nibble reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTag(u8);

impl RecordTag {
    /// # Panics
    ///
    /// Panics if `record_type` is outside 1-15.
    pub const fn new(record_type: u8) -> Self {
        assert!(
            record_type > 0 && record_type <= 0x0F,
            "record type must be in range 1-15"
        );
        RecordTag(record_type << 4)
    }

    pub fn from_byte(byte: u8) -> Result<Self, DeserializeError> {
        if byte >> 4 == 0 {
            return Err(DeserializeError {
                message: format!(
                    "invalid record tag: 0x{:02x} (record type 0 is reserved)",
                    byte
                ),
            });
        }
        Ok(RecordTag(byte))
    }

    pub fn as_byte(&self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: KeyPrefix = KeyPrefix::new(0x01, RecordTag::new(0x01));

    #[test]
    fn should_place_record_type_in_high_nibble() {
        let tag = RecordTag::new(0x03);

        assert_eq!(tag.as_byte(), 0x30);
        assert_eq!(RecordTag::from_byte(0x30), Ok(tag));
    }

    #[test]
    #[should_panic(expected = "record type must be in range 1-15")]
    fn should_panic_on_zero_record_type() {
        RecordTag::new(0);
    }

    #[test]
    fn should_reject_reserved_record_type() {
        let result = RecordTag::from_byte(0x05);

        assert!(result.unwrap_err().message.contains("record type 0"));
    }

    #[test]
    fn should_write_prefix_bytes() {
        // given
        let mut buf = BytesMut::new();

        // when
        HASH.write_to(&mut buf);

        // then
        assert_eq!(buf.as_ref(), &[0x01, 0x10]);
    }

    #[test]
    fn should_accept_matching_prefix() {
        assert!(KeyPrefix::expect(&[0x01, 0x10, b'k'], HASH).is_ok());
    }

    #[test]
    fn should_reject_short_prefix() {
        let err = KeyPrefix::expect(&[0x01], HASH).unwrap_err();
        assert!(err.message.contains("too short"));
    }

    #[test]
    fn should_reject_wrong_version() {
        let err = KeyPrefix::expect(&[0x09, 0x10], HASH).unwrap_err();
        assert!(err.message.contains("invalid key version"));
    }

    #[test]
    fn should_reject_wrong_tag() {
        let err = KeyPrefix::expect(&[0x01, 0x20], HASH).unwrap_err();
        assert!(err.message.contains("invalid record tag"));
    }
}
