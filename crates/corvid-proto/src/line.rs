//! Line-based codec.
//!
//! Reassembles a stream of byte chunks into CRLF-terminated lines,
//! regardless of how chunk boundaries fall relative to delimiters.
//! The unterminated tail of the most recent read stays in the buffer
//! until the rest of its line arrives.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, Result};

/// Default maximum line length in bytes, delimiter included (IRC standard).
pub const MAX_LINE_LEN: usize = 512;

/// Codec for CRLF-delimited protocol lines.
///
/// Decoded lines are returned with the delimiter stripped. A bare LF
/// also terminates a line; servers in the wild are not uniform about
/// the CR.
pub struct LineCodec {
    /// Index of next byte to check for the delimiter.
    next_index: usize,
    /// Maximum line length.
    max_len: usize,
}

impl LineCodec {
    /// Create a new codec with the default line limit.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: MAX_LINE_LEN,
        }
    }

    /// Create a new codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        // Look for the terminator starting from where the last scan stopped
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            // Strip the delimiter: LF, preceded by CR when present
            let mut end = line.len() - 1;
            if end > 0 && line[end - 1] == b'\r' {
                end -= 1;
            }

            let text = std::str::from_utf8(&line[..end]).map_err(|e| {
                ProtocolError::InvalidUtf8 {
                    byte_pos: e.valid_up_to(),
                }
            })?;

            Ok(Some(text.to_owned()))
        } else {
            // No complete line yet - remember where the scan stopped
            self.next_index = src.len();

            // A partial line over the limit can never become valid
            if src.len() > self.max_len {
                return Err(ProtocolError::LineTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<()> {
        if line.len() + 2 > self.max_len {
            return Err(ProtocolError::LineTooLong {
                actual: line.len() + 2,
                limit: self.max_len,
            });
        }
        dst.reserve(line.len() + 2);
        dst.put(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PING :test\r\n"[..]);

        let result = codec.decode(&mut buf).unwrap();
        assert_eq!(result, Some("PING :test".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PING :"[..]);

        let result = codec.decode(&mut buf).unwrap();
        assert_eq!(result, None);
        // The fragment stays buffered until the rest of the line arrives
        assert_eq!(&buf[..], b"PING :");
    }

    #[test]
    fn test_decode_delimiter_split_at_chunk_boundary() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b":a PRIVMSG #x :hi\r"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"\n:b PRIVMSG");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(":a PRIVMSG #x :hi".to_string())
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b":b PRIVMSG");
    }

    #[test]
    fn test_decode_multiple_lines_in_one_chunk() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"one\r\ntwo\r\nthr"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("one".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("two".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"thr");
    }

    #[test]
    fn test_decode_byte_at_a_time() {
        // Reassembly must not depend on chunk size at all
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        let mut lines = Vec::new();

        for b in b"ab\r\ncd\r\n" {
            buf.extend_from_slice(&[*b]);
            while let Some(line) = codec.decode(&mut buf).unwrap() {
                lines.push(line);
            }
        }
        assert_eq!(lines, vec!["ab".to_string(), "cd".to_string()]);
    }

    #[test]
    fn test_decode_bare_lf() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"NOTICE x :y\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("NOTICE x :y".to_string())
        );
    }

    #[test]
    fn test_decode_empty_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"\r\n"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(String::new()));
    }

    #[test]
    fn test_decode_too_long() {
        let mut codec = LineCodec::with_max_len(10);
        let mut buf = BytesMut::from(&b"this is way too long\n"[..]);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::LineTooLong { .. })));
    }

    #[test]
    fn test_decode_partial_over_limit() {
        let mut codec = LineCodec::with_max_len(10);
        let mut buf = BytesMut::from(&b"no delimiter here at all"[..]);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::LineTooLong { .. })));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&[0xff, 0xfe, b'\r', b'\n'][..]);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::InvalidUtf8 { .. })));
    }

    #[test]
    fn test_encode_appends_delimiter() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();

        codec.encode("PONG :test".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG :test\r\n");
    }

    #[test]
    fn test_encode_too_long() {
        let mut codec = LineCodec::with_max_len(8);
        let mut buf = BytesMut::new();

        let result = codec.encode("way over the limit".to_string(), &mut buf);
        assert!(matches!(result, Err(ProtocolError::LineTooLong { .. })));
    }
}
