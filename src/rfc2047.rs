//! Decoder for RFC 2047 "encoded-words" as they appear in S3 user metadata.
//!
//! Object stores only accept US-ASCII in `x-amz-meta-*` headers, so uploaders
//! wrap non-ASCII values as `=?utf-8?Q?...?=`. Only the UTF-8 charset with the
//! `Q` encoding is understood; anything else is passed through untouched.

const ENCODED_WORD_PREFIX: &[u8] = b"=?utf-8?q?";
const ENCODED_WORD_SUFFIX: &str = "?=";

/// Returns true when `value` starts with a UTF-8 / Q encoded-word envelope.
pub fn is_encoded_word(value: &str) -> bool {
    value
        .as_bytes()
        .get(..ENCODED_WORD_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(ENCODED_WORD_PREFIX))
}

/// Decode every `=?utf-8?Q?...?=` word found in `input`.
///
/// Text outside encoded words is copied as-is. Linear whitespace that only
/// separates two adjacent encoded words is dropped (RFC 2047 §6.2), which is
/// how long values get folded into several words.
pub fn decode_mime_words(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut after_word = false;

    while let Some((start, end)) = find_encoded_word(rest) {
        let between = &rest[..start];
        if !(after_word && between.chars().all(char::is_whitespace)) {
            out.push_str(between);
        }

        let payload = &rest[start + ENCODED_WORD_PREFIX.len()..end - ENCODED_WORD_SUFFIX.len()];
        out.push_str(&decode_q(payload));

        rest = &rest[end..];
        after_word = true;
    }

    out.push_str(rest);
    out
}

/// Decode a Q-encoded payload: `_` is a space, `=XX` is a raw byte.
///
/// The resulting bytes are read as UTF-8; invalid sequences are replaced
/// rather than rejected.
pub fn decode_q(payload: &str) -> String {
    let bytes = payload.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                decoded.push(b' ');
                i += 1;
            }
            b'=' => {
                match (hex_value(bytes.get(i + 1)), hex_value(bytes.get(i + 2))) {
                    (Some(hi), Some(lo)) => {
                        decoded.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        decoded.push(b'=');
                        i += 1;
                    }
                }
            }
            other => {
                decoded.push(other);
                i += 1;
            }
        }
    }

    match String::from_utf8(decoded) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// Byte offsets `(start, end)` of the first complete encoded word in `text`,
/// where `end` is just past the closing `?=`.
fn find_encoded_word(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = bytes
        .windows(ENCODED_WORD_PREFIX.len())
        .position(|window| window.eq_ignore_ascii_case(ENCODED_WORD_PREFIX))?;
    let payload_start = start + ENCODED_WORD_PREFIX.len();
    let close = text[payload_start..].find(ENCODED_WORD_SUFFIX)?;
    Some((start, payload_start + close + ENCODED_WORD_SUFFIX.len()))
}

fn hex_value(byte: Option<&u8>) -> Option<u8> {
    byte.and_then(|b| (*b as char).to_digit(16)).map(|d| d as u8)
}
