// File: voucherbot-common/src/models/session.rs

use std::fmt;
use serde::{Deserialize, Serialize};
use super::value::VoucherValue;

/// Identifies one isolated protection context (a user or a chat).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

/// What an add/protect call did to the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    pub added: Vec<String>,
    /// Codes that were already present (their `paused` flag untouched).
    pub skipped: Vec<String>,
    /// Registry size after the call.
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedCode {
    pub code: String,
    pub paused: bool,
    pub value: VoucherValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeListing {
    pub codes: Vec<ListedCode>,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub total: usize,
    pub active: usize,
    pub paused: usize,
    pub running: bool,
    pub interval_secs: u64,
    pub credential_loaded: bool,
}
