// File: voucherbot-common/src/models/value.rs

use std::fmt;
use serde::{Deserialize, Serialize};

/// Face value of a code, as resolved from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoucherValue {
    Known(u32),
    Unknown,
}

impl fmt::Display for VoucherValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoucherValue::Known(v) => write!(f, "{v}"),
            VoucherValue::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Static prefix -> face value mapping.
///
/// When several prefixes match a code, the longest one wins (so a table holding
/// both `SVI` and `SVIB` resolves `SVIB...` to the `SVIB` entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTable {
    // kept sorted by descending prefix length
    prefixes: Vec<(String, u32)>,
}

impl ValueTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut prefixes: Vec<(String, u32)> = entries
            .into_iter()
            .map(|(p, v)| (p.into().trim().to_uppercase(), v))
            .filter(|(p, _)| !p.is_empty())
            .collect();
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        prefixes.dedup_by(|a, b| a.0 == b.0);
        Self { prefixes }
    }

    pub fn lookup(&self, code: &str) -> VoucherValue {
        let upper = code.to_uppercase();
        self.prefixes
            .iter()
            .find(|(prefix, _)| upper.starts_with(prefix.as_str()))
            .map(|(_, value)| VoucherValue::Known(*value))
            .unwrap_or(VoucherValue::Unknown)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl Default for ValueTable {
    fn default() -> Self {
        ValueTable::new([
            ("SVH", 4000),
            ("SV3", 5000),
            ("SVC", 1000),
            ("SVD", 2000),
            ("SVA", 500),
            ("SVG", 500),
        ])
    }
}
