//! Line framing for the iWrap command protocol.
//!
//! Every message to and from the module is one ASCII line terminated by
//! `\n`. The module usually sends `\r\n`; the carriage return is stripped on
//! decode. Tokens are separated by runs of spaces.

/// Line terminator byte.
pub const TERMINATOR: u8 = b'\n';

/// Default upper bound on a decoded line, terminator excluded.
pub const DEFAULT_MAX_LINE_LEN: usize = 128;

/// Result of attempting to decode one line from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete line was decoded.
    Line {
        /// Line text without terminator or trailing `\r`.
        text: String,
        /// Number of bytes consumed from the input buffer.
        consumed: usize,
    },

    /// A complete line was found but it is not valid UTF-8.
    Error(usize),

    /// More than `max_len` bytes arrived without a terminator, or a
    /// terminated line exceeded `max_len`. The bytes should be dropped.
    Overflow(usize),

    /// No terminator yet.
    Incomplete,
}

/// Decode one line from the front of `buf`.
pub fn decode_line(buf: &[u8], max_len: usize) -> DecodeResult {
    let term_pos = match buf.iter().position(|&b| b == TERMINATOR) {
        Some(pos) => pos,
        // allow room for a trailing \r
        None if buf.len() > max_len + 1 => return DecodeResult::Overflow(buf.len()),
        None => return DecodeResult::Incomplete,
    };

    let consumed = term_pos + 1;
    let mut body = &buf[..term_pos];
    if let Some((&b'\r', rest)) = body.split_last() {
        body = rest;
    }

    if body.len() > max_len {
        return DecodeResult::Overflow(consumed);
    }

    match std::str::from_utf8(body) {
        Ok(text) => DecodeResult::Line {
            text: text.to_string(),
            consumed,
        },
        Err(_) => DecodeResult::Error(consumed),
    }
}

/// Encode `text` as one outgoing line.
pub fn encode_line(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text.as_bytes());
    bytes.push(TERMINATOR);
    bytes
}

/// Split a line on runs of spaces, dropping empty tokens.
///
/// ```
/// use bttrx_line_io::protocol::tokenize;
/// assert_eq!(tokenize("HFP-AG  0 READY"), vec!["HFP-AG", "0", "READY"]);
/// ```
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(' ').filter(|t| !t.is_empty()).collect()
}

/// First token of a line, or `""` for a blank line.
pub fn first_word(line: &str) -> &str {
    line.split(' ').find(|t| !t.is_empty()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_empty_buffer() {
        assert_eq!(decode_line(b"", 128), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_no_terminator() {
        assert_eq!(decode_line(b"HFP-AG 0 REA", 128), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_strips_carriage_return() {
        assert_eq!(
            decode_line(b"OK\r\n", 128),
            DecodeResult::Line {
                text: "OK".into(),
                consumed: 4,
            }
        );
    }

    #[test]
    fn decode_blank_line() {
        assert_eq!(
            decode_line(b"\r\nREADY.\r\n", 128),
            DecodeResult::Line {
                text: "".into(),
                consumed: 2,
            }
        );
    }

    #[test]
    fn decode_first_of_several() {
        let buf = b"INQUIRY 1\nINQUIRY de:ad:be:ef:ca:fe 240404\n";
        assert_eq!(
            decode_line(buf, 128),
            DecodeResult::Line {
                text: "INQUIRY 1".into(),
                consumed: 10,
            }
        );
    }

    #[test]
    fn decode_non_utf8_is_error() {
        assert_eq!(decode_line(&[0xFF, 0xFE, b'\n'], 128), DecodeResult::Error(3));
    }

    #[test]
    fn decode_overlong_unterminated() {
        let buf = [b'A'; 20];
        assert_eq!(decode_line(&buf, 16), DecodeResult::Overflow(20));
    }

    #[test]
    fn decode_overlong_terminated() {
        let mut buf = vec![b'A'; 20];
        buf.push(b'\n');
        assert_eq!(decode_line(&buf, 16), DecodeResult::Overflow(21));
    }

    #[test]
    fn encode_appends_newline() {
        assert_eq!(encode_line("AT"), b"AT\n");
    }

    #[test]
    fn tokenize_collapses_spaces() {
        assert_eq!(
            tokenize(" SET  CONTROL GAIN 8 8 "),
            vec!["SET", "CONTROL", "GAIN", "8", "8"]
        );
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn first_word_of_line() {
        assert_eq!(first_word("CALL 0"), "CALL");
        assert_eq!(first_word("  OK"), "OK");
        assert_eq!(first_word(""), "");
    }
}
