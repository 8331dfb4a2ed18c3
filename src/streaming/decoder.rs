use bytes::{Buf, BytesMut};
use std::char::REPLACEMENT_CHARACTER;

/// Incremental UTF-8 decoder for a chunked response body.
///
/// Bytes of a multi-byte character that is cut by a transport boundary are
/// held back until the rest of the sequence arrives, so no character is ever
/// decoded from half of its bytes. Genuinely invalid bytes decode to U+FFFD.
#[derive(Debug)]
pub struct Utf8Reassembler {
    pending: BytesMut,
}

impl Utf8Reassembler {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(8),
        }
    }

    /// Feed a transport chunk and return all text that is now decodable
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut text = String::with_capacity(self.pending.len());

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));

                    match e.error_len() {
                        Some(invalid_len) => {
                            text.push(REPLACEMENT_CHARACTER);
                            self.pending.advance(valid_up_to + invalid_len);
                        }
                        None => {
                            // Incomplete sequence at the end, wait for the next chunk
                            self.pending.advance(valid_up_to);
                            break;
                        }
                    }
                }
            }
        }

        text
    }

    /// Flush held bytes at end of stream, replacing a truncated sequence
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }

    /// Number of bytes held back waiting for the rest of a character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for Utf8Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8Reassembler::new();
        assert_eq!(decoder.push(b"data: {}\n"), "data: {}\n");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_two_byte_char_split() {
        let mut decoder = Utf8Reassembler::new();
        let bytes = "café".as_bytes();
        let (head, tail) = bytes.split_at(bytes.len() - 1);

        assert_eq!(decoder.push(head), "caf");
        assert_eq!(decoder.pending_len(), 1);
        assert_eq!(decoder.push(tail), "é");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_four_byte_char_one_byte_at_a_time() {
        let mut decoder = Utf8Reassembler::new();
        let mut out = String::new();

        for byte in "🦀".as_bytes() {
            out.push_str(&decoder.push(std::slice::from_ref(byte)));
        }

        assert_eq!(out, "🦀");
    }

    #[test]
    fn test_cjk_split_across_three_chunks() {
        let mut decoder = Utf8Reassembler::new();
        let bytes = "你好".as_bytes();

        let mut out = decoder.push(&bytes[..2]);
        out.push_str(&decoder.push(&bytes[2..4]));
        out.push_str(&decoder.push(&bytes[4..]));

        assert_eq!(out, "你好");
    }

    #[test]
    fn test_invalid_byte_is_replaced_and_decoding_continues() {
        let mut decoder = Utf8Reassembler::new();
        let out = decoder.push(b"ab\xFFcd");
        assert_eq!(out, "ab\u{FFFD}cd");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_finish_replaces_truncated_sequence() {
        let mut decoder = Utf8Reassembler::new();
        let bytes = "é".as_bytes();

        assert_eq!(decoder.push(&bytes[..1]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decoder.finish(), "");
    }
}
