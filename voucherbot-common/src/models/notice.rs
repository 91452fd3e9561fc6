// File: voucherbot-common/src/models/notice.rs

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use super::scan::ScanReport;

/// Opaque handle to a message the transport already delivered, used as the
/// target of later progress edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef(pub u64);

/// Summary published after every protection cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub scan: ScanReport,
    pub next_scan_at: DateTime<Local>,
    /// Size of the whole registry (paused codes included) at report time.
    pub registry_size: usize,
}

/// Semantic notifications pushed from the core to the chat transport.
/// The transport decides how each one looks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// A one-shot check of `count` codes is starting.
    CheckStarted { count: usize },
    /// A protection cycle is about to scan `active` codes.
    CycleStarted { cycle: u64, active: usize },
    CycleReport(CycleReport),
    /// The loop is running but every code is paused or the registry is empty.
    NoActiveCodes,
    /// The protection loop died; the user has to restart it.
    ProtectionCrashed { error: String },
}
