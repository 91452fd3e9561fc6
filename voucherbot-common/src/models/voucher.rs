// File: voucherbot-common/src/models/voucher.rs

use serde::{Deserialize, Serialize};

/// Tokens must be at least this long to be treated as a code.
pub const DEFAULT_MIN_CODE_LEN: usize = 5;

/// One redemption code under protection in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherRecord {
    pub code: String,
    pub paused: bool,
}

impl VoucherRecord {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            paused: false,
        }
    }
}

pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Pulls candidate codes out of free-form text.
///
/// Commas and any whitespace (including newlines) separate codes. Every token
/// is uppercased; tokens shorter than `min_len` are dropped so that ordinary
/// chatter is not mistaken for a code. Order and duplicates are preserved,
/// deduplication is the registry's job.
pub fn parse_codes(text: &str, min_len: usize) -> Vec<String> {
    text.replace(',', " ")
        .split_whitespace()
        .map(normalize_code)
        .filter(|c| c.chars().count() >= min_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_splits_on_commas_and_lines() {
        let codes = parse_codes("svh1234ab, SVC5678CD\nsva0000zz", DEFAULT_MIN_CODE_LEN);
        assert_eq!(codes, vec!["SVH1234AB", "SVC5678CD", "SVA0000ZZ"]);
    }

    #[test]
    fn test_parse_codes_drops_short_tokens() {
        let codes = parse_codes("hi there SVH12 ok", DEFAULT_MIN_CODE_LEN);
        assert_eq!(codes, vec!["THERE", "SVH12"]);
        assert!(parse_codes("a bb ccc dddd", DEFAULT_MIN_CODE_LEN).is_empty());
    }

    #[test]
    fn test_parse_codes_keeps_duplicates_in_order() {
        let codes = parse_codes("SVH1234AB svh1234ab", DEFAULT_MIN_CODE_LEN);
        assert_eq!(codes, vec!["SVH1234AB", "SVH1234AB"]);
    }
}
