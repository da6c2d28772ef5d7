//! Self-delimiting byte strings for composite storage keys.
//!
//! A store key is embedded in front of other key components (a hash field, a
//! sorted-set member). To keep `"a"` from being a key prefix of `"ab"`, the
//! embedded bytes are escaped and closed with a `0x00` terminator:
//!
//! - `0x00` → `0x01 0x01`
//! - `0x01` → `0x01 0x02`
//! - all other bytes unchanged
//! - followed by `0x00`
//!
//! The terminator is the lowest byte, so the encoding keeps the ordering of the
//! raw strings and shorter strings sort first (`"/foo"` < `"/foo/bar"`).

use bytes::{BufMut, Bytes, BytesMut};

use super::DeserializeError;

const TERMINATOR_BYTE: u8 = 0x00;

const ESCAPE_BYTE: u8 = 0x01;

/// Escapes `data` into `buf` and appends the terminator.
pub fn serialize(data: &[u8], buf: &mut BytesMut) {
    buf.reserve(data.len() + 1);
    for &byte in data {
        match byte {
            TERMINATOR_BYTE => buf.put_slice(&[ESCAPE_BYTE, 0x01]),
            ESCAPE_BYTE => buf.put_slice(&[ESCAPE_BYTE, 0x02]),
            _ => buf.put_u8(byte),
        }
    }
    buf.put_u8(TERMINATOR_BYTE);
}

/// Reads one terminated string from the front of `buf`.
///
/// On success `buf` is advanced past the terminator and the unescaped bytes
/// are returned.
///
/// # Errors
///
/// Returns an error on a truncated or unknown escape sequence, or when the
/// terminator is missing.
pub fn deserialize(buf: &mut &[u8]) -> Result<Bytes, DeserializeError> {
    let mut result = BytesMut::new();
    let mut i = 0;

    while i < buf.len() {
        match buf[i] {
            TERMINATOR_BYTE => {
                *buf = &buf[i + 1..];
                return Ok(result.freeze());
            }
            ESCAPE_BYTE => {
                let Some(&next) = buf.get(i + 1) else {
                    return Err(DeserializeError {
                        message: "truncated escape sequence in terminated bytes".to_string(),
                    });
                };
                match next {
                    0x01 => result.put_u8(TERMINATOR_BYTE),
                    0x02 => result.put_u8(ESCAPE_BYTE),
                    _ => {
                        return Err(DeserializeError {
                            message: format!("invalid escape sequence: 0x01 0x{:02x}", next),
                        });
                    }
                }
                i += 2;
            }
            byte => {
                result.put_u8(byte);
                i += 1;
            }
        }
    }

    Err(DeserializeError {
        message: "unterminated bytes sequence (missing 0x00 terminator)".to_string(),
    })
}
