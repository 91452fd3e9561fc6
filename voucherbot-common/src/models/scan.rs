// File: voucherbot-common/src/models/scan.rs

use serde::{Deserialize, Serialize};
use super::value::VoucherValue;

/// Result of checking a single code against the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckOutcome {
    /// The service accepted the code.
    Alive,
    /// The service answered and flagged the code as used, expired or invalid.
    Dead,
    /// We never got a usable answer. Not a verdict on the code.
    NetworkError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub code: String,
    pub outcome: CheckOutcome,
    pub value: VoucherValue,
}

/// One scan pass, partitioned by outcome. Each bucket keeps input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub alive: Vec<ScanResult>,
    pub dead: Vec<ScanResult>,
    pub errors: Vec<ScanResult>,
}

impl ScanReport {
    pub fn record(&mut self, result: ScanResult) {
        match result.outcome {
            CheckOutcome::Alive => self.alive.push(result),
            CheckOutcome::Dead => self.dead.push(result),
            CheckOutcome::NetworkError => self.errors.push(result),
        }
    }

    pub fn total(&self) -> usize {
        self.alive.len() + self.dead.len() + self.errors.len()
    }

    pub fn alive_codes(&self) -> Vec<String> {
        self.alive.iter().map(|r| r.code.clone()).collect()
    }

    pub fn dead_codes(&self) -> Vec<String> {
        self.dead.iter().map(|r| r.code.clone()).collect()
    }

    pub fn error_codes(&self) -> Vec<String> {
        self.errors.iter().map(|r| r.code.clone()).collect()
    }
}

const BAR_WIDTH: usize = 20;

/// Live progress snapshot emitted by the scan engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub done: usize,
    pub total: usize,
    /// Code about to be checked, or `None` once the pass is complete.
    pub current: Option<String>,
    pub alive: usize,
    pub dead: usize,
}

impl ScanProgress {
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        self.done * 100 / self.total
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    /// Plain-text rendering. Two snapshots that render identically are the
    /// same update as far as the user can tell.
    pub fn render(&self) -> String {
        let pct = self.percent();
        let filled = (pct / 5).min(BAR_WIDTH);
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
        let current = self.current.as_deref().unwrap_or("Done");
        format!(
            "Scanning... {pct}%\n[{bar}]\nChecked: {}/{}\nAlive: {}  Dead: {}\nCurrent: {current}",
            self.done, self.total, self.alive, self.dead
        )
    }
}
