//! Heuristic field extraction over free listing text.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::models::{KANTO_PREFECTURES, OTHER_PREFECTURE};

static RENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9,]+)円").expect("rent pattern is valid"));

static LABELLED_ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"所在地\s+([^\n\r]+)").expect("address label pattern is valid"));

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// NFKC-fold text so full-width digits, commas and spaces match the ASCII patterns
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    raw.nfkc().collect()
}

/// Collapse whitespace runs into single spaces and trim
#[must_use]
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First yen amount in `text`, e.g. `賃料 98,000円` -> `98000`
#[must_use]
pub fn parse_rent(text: &str) -> Option<i64> {
    let captures = RENT_PATTERN.captures(text)?;
    let digits: String = captures[1].chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Regex matching one of `prefectures` followed by the rest of the whitespace-free token
pub fn address_pattern(prefectures: &[&str]) -> Result<Regex> {
    let alternatives = prefectures.iter().map(|p| regex::escape(p)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"(?:{alternatives})\S*"))
        .map_err(|e| ScrapeError::InvalidConfig(format!("address pattern: {e}")))
}

/// Address token starting at the first prefecture name
#[must_use]
pub fn find_address(pattern: &Regex, text: &str) -> Option<String> {
    pattern.find(text).map(|m| m.as_str().to_string())
}

/// Address following a `所在地` label, up to the end of the line
#[must_use]
pub fn labelled_address(text: &str) -> Option<String> {
    LABELLED_ADDRESS_PATTERN
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|a| !a.is_empty())
}

/// Prefecture named in `address`, or the catch-all label
#[must_use]
pub fn classify_prefecture(address: &str) -> &'static str {
    KANTO_PREFECTURES
        .iter()
        .find(|p| address.contains(*p))
        .copied()
        .unwrap_or(OTHER_PREFECTURE)
}

/// Trailing non-empty path segment of a detail URL
#[must_use]
pub fn source_id_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .map(ToString::to_string)
}

/// Random base-36 identifier for listings that expose none
#[must_use]
pub fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| char::from(TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())]))
        .collect()
}

/// Cut `text` to at most `max_chars` characters
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
