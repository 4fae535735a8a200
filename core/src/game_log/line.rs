use chrono::NaiveDateTime;
use encoding_rs::UTF_8;
use std::borrow::Cow;
use memchr::memchr;

/// Format of the bracketed prefix, e.g. `[Mon Jan 01 12:00:00 2024]`.
const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// A single line from the game log with its timestamp prefix removed.
///
/// Lines are borrowed from the reader's buffer and never retained past
/// classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLine<'a> {
    pub raw: &'a str,
    /// Text after the `[...] ` prefix, trimmed.
    pub content: &'a str,
    pub timestamp: Option<NaiveDateTime>,
}

impl<'a> LogLine<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        match split_prefix(trimmed) {
            Some((stamp, rest)) => LogLine {
                raw,
                content: rest.trim(),
                timestamp: NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok(),
            },
            None => LogLine {
                raw,
                content: trimmed,
                timestamp: None,
            },
        }
    }
}

/// Decode raw bytes from the log, replacing invalid sequences and dropping
/// the line terminator.
pub fn decode_line(bytes: &[u8]) -> String {
    decode_lossy(bytes).trim_end_matches(['\r', '\n']).to_string()
}

/// Decode game text, replacing invalid UTF-8 instead of failing.
pub(crate) fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
    UTF_8.decode_without_bom_handling(bytes).0
}

// returns (timestamp text, remainder after "] ")
fn split_prefix(line: &str) -> Option<(&str, &str)> {
    let b = line.as_bytes();
    if b.first() != Some(&b'[') {
        return None;
    }
    let close = memchr(b']', b)?;
    if b.get(close + 1) != Some(&b' ') {
        return None;
    }

    let stamp = &line[1..close];
    if !is_timestamp_shape(stamp) {
        return None;
    }
    Some((stamp, &line[close + 2..]))
}

// \w+ \w+ \d+ \d+:\d+:\d+ \d+
fn is_timestamp_shape(stamp: &str) -> bool {
    let parts: Vec<&str> = stamp.split(' ').collect();
    if parts.len() != 5 {
        return false;
    }

    let is_word = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());

    let clock: Vec<&str> = parts[3].split(':').collect();

    is_word(parts[0])
        && is_word(parts[1])
        && is_digits(parts[2])
        && clock.len() == 3
        && clock.iter().copied().all(is_digits)
        && is_digits(parts[4])
}
