//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, UUEncode, RFC 2047 header words and
//! charset conversion of decoded bodies.

use crate::error::{Error, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use std::fmt::Write as _;

/// Base64 engine that tolerates missing or superfluous padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Maximum line length for encoded bodies.
const MAX_LINE_LENGTH: usize = 76;

/// Bytes of input carried by one encoded word, before encoding.
const ENCODED_WORD_CHUNK: usize = 45;

/// How non-ASCII characters in header values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeaderEncoding {
    /// RFC 2047 `B` (Base64) encoded words.
    #[default]
    Base64,
    /// RFC 2047 `Q` encoded words.
    QuotedPrintable,
    /// Raw UTF-8, no encoding.
    None,
}

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into CRLF-terminated lines.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        // Base64 output is ASCII.
        result.push_str(&String::from_utf8_lossy(chunk));
        result.push_str("\r\n");
    }
    result
}

/// Decodes Base64 data, ignoring embedded whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    LENIENT.decode(cleaned).map_err(Into::into)
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input are kept as CRLF hard breaks; long lines get
/// soft breaks.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::new();
    let normalized = text.replace("\r\n", "\n");

    for (index, line) in normalized.split('\n').enumerate() {
        if index > 0 {
            result.push_str("\r\n");
        }
        let bytes = line.as_bytes();
        let mut line_length = 0;

        for (pos, &byte) in bytes.iter().enumerate() {
            let is_last = pos + 1 == bytes.len();
            let literal = match byte {
                b'!'..=b'<' | b'>'..=b'~' => true,
                // Trailing whitespace must be encoded.
                b' ' | b'\t' => !is_last,
                _ => false,
            };
            let width = if literal { 1 } else { 3 };

            if line_length + width > MAX_LINE_LENGTH - 1 {
                result.push_str("=\r\n");
                line_length = 0;
            }

            if literal {
                result.push(byte as char);
            } else {
                let _ = write!(result, "={byte:02X}");
            }
            line_length += width;
        }
    }

    result
}

/// Decodes Quoted-Printable text (RFC 2045) into a UTF-8 string.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or the
/// result is not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'=' {
            result.push(bytes[pos]);
            pos += 1;
            continue;
        }
        match bytes.get(pos + 1..pos + 3) {
            Some([b'\r', b'\n']) => pos += 3,
            Some([b'\n', _]) => pos += 2,
            Some(&[hi, lo]) => {
                let byte = hex_pair(hi, lo).ok_or_else(|| {
                    Error::InvalidEncoding(format!("Invalid hex: {}{}", hi as char, lo as char))
                })?;
                result.push(byte);
                pos += 3;
            }
            _ if bytes.get(pos + 1) == Some(&b'\n') || pos + 1 == bytes.len() => pos += 2,
            _ => {
                return Err(Error::InvalidEncoding(
                    "Incomplete escape sequence".to_string(),
                ));
            }
        }
    }

    String::from_utf8(result).map_err(Into::into)
}

/// Decodes Quoted-Printable bytes, keeping malformed escapes literally.
#[must_use]
pub fn decode_quoted_printable_lenient(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut pos = 0;

    while pos < data.len() {
        let byte = data[pos];
        if byte != b'=' {
            result.push(byte);
            pos += 1;
            continue;
        }

        // Soft line break, possibly with trailing whitespace before it.
        let mut lookahead = pos + 1;
        while matches!(data.get(lookahead), Some(b' ' | b'\t')) {
            lookahead += 1;
        }
        match data.get(lookahead) {
            Some(b'\r') if data.get(lookahead + 1) == Some(&b'\n') => {
                pos = lookahead + 2;
                continue;
            }
            Some(b'\n') => {
                pos = lookahead + 1;
                continue;
            }
            None => break,
            _ => {}
        }

        match (data.get(pos + 1), data.get(pos + 2)) {
            (Some(&hi), Some(&lo)) if hex_pair(hi, lo).is_some() => {
                result.extend(hex_pair(hi, lo));
                pos += 3;
            }
            _ => {
                result.push(b'=');
                pos += 1;
            }
        }
    }

    result
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    u8::try_from(hi * 16 + lo).ok()
}

/// Encodes a header value using RFC 2047 encoded words when it contains
/// non-ASCII characters.
///
/// Long values are split into several encoded words joined by folding
/// whitespace, never splitting a UTF-8 sequence.
#[must_use]
pub fn encode_rfc2047(text: &str, mode: HeaderEncoding) -> String {
    if text.is_ascii() || mode == HeaderEncoding::None {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(encode_word(&chunk, mode));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(encode_word(&chunk, mode));
    }

    words.join("\r\n ")
}

fn encode_word(chunk: &str, mode: HeaderEncoding) -> String {
    if mode == HeaderEncoding::QuotedPrintable {
        let mut encoded = String::new();
        for &byte in chunk.as_bytes() {
            match byte {
                b' ' => encoded.push('_'),
                b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'!' | b'*' | b'+' | b'-' | b'/' => {
                    encoded.push(byte as char);
                }
                _ => {
                    let _ = write!(encoded, "={byte:02X}");
                }
            }
        }
        format!("=?utf-8?Q?{encoded}?=")
    } else {
        format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes()))
    }
}

/// Decodes every RFC 2047 encoded word in a header value.
///
/// Whitespace between adjacent encoded words is dropped. Words that fail
/// to decode are kept verbatim.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_space = String::new();
    let mut previous_was_word = false;
    let mut rest = text;

    while !rest.is_empty() {
        let ws_len = rest.len() - rest.trim_start().len();
        if ws_len > 0 {
            pending_space.push_str(&rest[..ws_len]);
            rest = &rest[ws_len..];
            continue;
        }

        let token_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let token = &rest[..token_len];
        rest = &rest[token_len..];

        if let Some(decoded) = decode_word(token) {
            if !previous_was_word {
                result.push_str(&pending_space);
            }
            result.push_str(&decoded);
            previous_was_word = true;
        } else {
            result.push_str(&pending_space);
            result.push_str(token);
            previous_was_word = false;
        }
        pending_space.clear();
    }

    result.push_str(&pending_space);
    result
}

/// Decodes a single `=?charset?enc?text?=` token.
fn decode_word(token: &str) -> Option<String> {
    let inner = token.strip_prefix("=?")?.strip_suffix("?=")?;
    let mut fields = inner.splitn(3, '?');
    let charset = fields.next()?;
    let encoding = fields.next()?;
    let payload = fields.next()?;

    // RFC 2231 language suffix, e.g. utf-8*en.
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload).ok()?,
        "Q" | "q" => decode_quoted_printable_lenient(payload.replace('_', " ").as_bytes()),
        _ => return None,
    };

    Some(decode_charset(&bytes, Some(charset)))
}

/// Converts bytes in the named charset to a string.
///
/// Unknown or missing charsets fall back to lossy UTF-8.
#[must_use]
pub fn decode_charset(data: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| encoding_rs::Encoding::for_label_no_replacement(label.trim().as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);
    encoding.decode_with_bom_removal(data).0.into_owned()
}

/// UUEncodes `data` as a `begin 644 <name>` block.
#[must_use]
pub fn encode_uuencode(data: &[u8], name: &str) -> String {
    fn uu_char(bits: u8) -> char {
        if bits == 0 { '`' } else { (bits + 32) as char }
    }

    let mut result = format!("begin 644 {name}\r\n");
    for line in data.chunks(45) {
        // Chunks never exceed 45 bytes.
        result.push(uu_char(u8::try_from(line.len()).unwrap_or(45)));
        for group in line.chunks(3) {
            let b0 = group[0];
            let b1 = group.get(1).copied().unwrap_or(0);
            let b2 = group.get(2).copied().unwrap_or(0);
            result.push(uu_char(b0 >> 2));
            result.push(uu_char(((b0 << 4) | (b1 >> 4)) & 0x3f));
            result.push(uu_char(((b1 << 2) | (b2 >> 6)) & 0x3f));
            result.push(uu_char(b2 & 0x3f));
        }
        result.push_str("\r\n");
    }
    result.push_str("`\r\nend\r\n");
    result
}

/// Decodes a UUEncoded block, returning the file name and payload.
///
/// Returns `None` when no `begin` line is present.
#[must_use]
pub fn decode_uuencode(text: &str) -> Option<(String, Vec<u8>)> {
    let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));
    let header = lines.find(|l| l.starts_with("begin "))?;
    let name = header.splitn(3, ' ').nth(2).unwrap_or_default().to_string();

    let mut data = Vec::new();
    for line in lines {
        if line == "end" {
            break;
        }
        let bytes = line.as_bytes();
        let Some((&len_char, body)) = bytes.split_first() else {
            continue;
        };
        let expected = usize::from(len_char.wrapping_sub(32) & 0x3f);
        if expected == 0 {
            continue;
        }

        let mut decoded = Vec::with_capacity(expected + 2);
        for group in body.chunks(4) {
            let v: Vec<u8> = (0..4)
                .map(|i| group.get(i).map_or(0, |c| c.wrapping_sub(32) & 0x3f))
                .collect();
            decoded.push((v[0] << 2) | (v[1] >> 4));
            decoded.push((v[1] << 4) | (v[2] >> 2));
            decoded.push((v[2] << 6) | v[3]);
        }
        decoded.truncate(expected);
        data.extend_from_slice(&decoded);
    }

    Some((name, data))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_decode_ignores_line_breaks() {
        let decoded = decode_base64("SGVsbG8s\r\nIFdvcmxkIQ==\r\n").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_base64_lines_wrap() {
        let encoded = encode_base64_lines(&[0u8; 100]);
        for line in encoded.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= 76);
        }
        assert_eq!(decode_base64(&encoded).unwrap(), vec![0u8; 100]);
    }

    #[test]
    fn test_quoted_printable_encode() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
        assert!(encode_quoted_printable("Héllo").contains("=C3=A9"));
    }

    #[test]
    fn test_quoted_printable_keeps_line_breaks() {
        let encoded = encode_quoted_printable("one\ntwo \nthree");
        assert_eq!(encoded, "one\r\ntwo=20\r\nthree");
    }

    #[test]
    fn test_quoted_printable_soft_breaks_long_lines() {
        let text = "x".repeat(200);
        let encoded = encode_quoted_printable(&text);
        assert!(encoded.lines().all(|l| l.len() <= 76));
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text);
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable("H=C3=A9llo").unwrap(), "Héllo");
        assert_eq!(decode_quoted_printable("Hello=\r\nWorld").unwrap(), "HelloWorld");
        assert!(decode_quoted_printable("bad=ZZ").is_err());
    }

    #[test]
    fn test_quoted_printable_lenient_keeps_garbage() {
        assert_eq!(decode_quoted_printable_lenient(b"50=%"), b"50=%");
        assert_eq!(decode_quoted_printable_lenient(b"a=  \r\nb"), b"ab");
    }

    #[test]
    fn test_rfc2047_ascii_untouched() {
        assert_eq!(encode_rfc2047("Hello", HeaderEncoding::Base64), "Hello");
    }

    #[test]
    fn test_rfc2047_base64_word() {
        let encoded = encode_rfc2047("Héllo", HeaderEncoding::Base64);
        assert_eq!(encoded, "=?utf-8?B?SMOpbGxv?=");
        assert_eq!(decode_rfc2047(&encoded), "Héllo");
    }

    #[test]
    fn test_rfc2047_q_word() {
        let encoded = encode_rfc2047("Grüße aus Köln", HeaderEncoding::QuotedPrintable);
        assert!(encoded.starts_with("=?utf-8?Q?Gr=C3=BC"));
        assert_eq!(decode_rfc2047(&encoded), "Grüße aus Köln");
    }

    #[test]
    fn test_rfc2047_raw_mode() {
        assert_eq!(encode_rfc2047("Привет", HeaderEncoding::None), "Привет");
    }

    #[test]
    fn test_rfc2047_long_value_splits_words() {
        let text = "Съешь же ещё этих мягких французских булок, да выпей чаю";
        let encoded = encode_rfc2047(text, HeaderEncoding::Base64);
        assert!(encoded.contains("\r\n "));
        assert_eq!(decode_rfc2047(&encoded), text);
    }

    #[test]
    fn test_rfc2047_decode_mixed_text() {
        let decoded = decode_rfc2047("Re: =?iso-8859-1?Q?caf=E9?= time");
        assert_eq!(decoded, "Re: café time");
    }

    #[test]
    fn test_rfc2047_decode_invalid_word_kept() {
        assert_eq!(decode_rfc2047("=?utf-8?X?abc?="), "=?utf-8?X?abc?=");
    }

    #[test]
    fn test_decode_charset() {
        assert_eq!(decode_charset(&[0x63, 0x61, 0x66, 0xe9], Some("latin1")), "café");
        assert_eq!(decode_charset("ok".as_bytes(), Some("no-such-charset")), "ok");
        assert_eq!(decode_charset("ok".as_bytes(), None), "ok");
    }

    #[test]
    fn test_uuencode_known_vector() {
        let encoded = encode_uuencode(b"Cat", "cat.txt");
        assert_eq!(encoded, "begin 644 cat.txt\r\n#0V%T\r\n`\r\nend\r\n");
    }

    #[test]
    fn test_uudecode_known_vector() {
        let (name, data) = decode_uuencode("begin 644 cat.txt\n#0V%T\n`\nend\n").unwrap();
        assert_eq!(name, "cat.txt");
        assert_eq!(data, b"Cat");
        assert!(decode_uuencode("no block here").is_none());
    }

    proptest! {
        #[test]
        fn uuencode_preserves_payload(data in proptest::collection::vec(any::<u8>(), 0..200)) {
            let encoded = encode_uuencode(&data, "blob.bin");
            let (_, decoded) = decode_uuencode(&encoded).unwrap();
            prop_assert_eq!(decoded, data);
        }

        #[test]
        fn rfc2047_preserves_text(text in "\\PC{0,80}") {
            let encoded = encode_rfc2047(&text, HeaderEncoding::Base64);
            prop_assert_eq!(decode_rfc2047(&encoded), text);
        }
    }
}
