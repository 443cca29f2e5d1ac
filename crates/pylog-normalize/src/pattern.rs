use regex::bytes::Regex;
use std::sync::LazyLock;

use pylog_types::is_word_byte;

/// Quoted field name written by Python JSON formatters
const FIELD_NAME: &[u8] = b"\"levelname\"";

/// `"levelname" : "TOKEN"` with ASCII whitespace around the colon
pub(crate) static LEVELNAME_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?-u)"levelname"\s*:\s*"([A-Za-z0-9_]+)""#)
        .expect("levelname field pattern is valid")
});

/// Check whether `tail` is a strict prefix of some `"levelname":"TOKEN"` match,
/// i.e. more input could still complete it.
pub(crate) fn is_partial_field(tail: &[u8]) -> bool {
    if tail.len() <= FIELD_NAME.len() {
        return !tail.is_empty() && FIELD_NAME.starts_with(tail);
    }
    let Some(rest) = tail.strip_prefix(FIELD_NAME) else {
        return false;
    };

    let rest = skip_whitespace(rest);
    let Some(rest) = rest.strip_prefix(b":") else {
        return rest.is_empty();
    };

    let rest = skip_whitespace(rest);
    let Some(token) = rest.strip_prefix(b"\"") else {
        return rest.is_empty();
    };

    // A closing quote would have completed the match
    token.iter().copied().all(is_word_byte)
}

/// Find where a trailing partial candidate begins in `buf`.
///
/// Only positions at or after `from` and within the last `limit` bytes are
/// considered, so the held-back tail never exceeds `limit`.
pub(crate) fn partial_field_start(buf: &[u8], from: usize, limit: usize) -> Option<usize> {
    if limit == 0 {
        return None;
    }
    let floor = from.max(buf.len().saturating_sub(limit));
    (floor..buf.len()).find(|&i| buf[i] == b'"' && is_partial_field(&buf[i..]))
}

fn skip_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !is_regex_space(*b))
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// ASCII whitespace as `\s` matches it in non-Unicode mode
fn is_regex_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0B' | b'\x0C' | b'\r')
}
