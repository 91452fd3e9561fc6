// File: voucherbot-core/src/services/scan_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};
use voucherbot_common::models::{ScanProgress, ScanReport, ScanResult, ValueTable};
use voucherbot_common::traits::VoucherChecker;

use crate::services::pacer::Pacer;

/// Receives live progress snapshots during a scan. Delivery is best-effort;
/// a sink must never make the scan fail.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn publish(&self, progress: &ScanProgress);
}

/// Drops a snapshot when it renders exactly like the one forwarded before it,
/// so the transport is not asked to "edit" a message into the text it
/// already shows.
pub struct DedupProgress<'a> {
    inner: &'a dyn ProgressSink,
    last_rendered: Mutex<Option<String>>,
}

impl<'a> DedupProgress<'a> {
    pub fn new(inner: &'a dyn ProgressSink) -> Self {
        Self {
            inner,
            last_rendered: Mutex::new(None),
        }
    }

    fn admit(&self, progress: &ScanProgress) -> bool {
        let rendered = progress.render();
        let mut last = self.last_rendered.lock();
        if last.as_deref() == Some(rendered.as_str()) {
            return false;
        }
        *last = Some(rendered);
        true
    }
}

#[async_trait]
impl ProgressSink for DedupProgress<'_> {
    async fn publish(&self, progress: &ScanProgress) {
        if self.admit(progress) {
            self.inner.publish(progress).await;
        }
    }
}

/// Runs one sequential pass over a list of codes.
pub struct ScanEngine {
    checker: Arc<dyn VoucherChecker>,
    pacer: Pacer,
    values: Arc<ValueTable>,
}

impl ScanEngine {
    pub fn new(checker: Arc<dyn VoucherChecker>, pacer: Pacer, values: Arc<ValueTable>) -> Self {
        Self { checker, pacer, values }
    }

    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    /// Checks every code in order and partitions the results.
    ///
    /// Always returns a report covering every input code exactly once; a
    /// network error on one code just lands it in `errors`. Before each check
    /// a progress snapshot goes to `sink`, and a final "done" snapshot follows
    /// the last one. Nothing is published for an empty input.
    pub async fn scan(&self, codes: &[String], sink: Option<&dyn ProgressSink>) -> ScanReport {
        let total = codes.len();
        let mut report = ScanReport::default();
        let progress = sink.map(DedupProgress::new);

        for (idx, code) in codes.iter().enumerate() {
            if let Some(p) = &progress {
                p.publish(&ScanProgress {
                    done: idx,
                    total,
                    current: Some(code.clone()),
                    alive: report.alive.len(),
                    dead: report.dead.len(),
                })
                .await;
            }

            let outcome = self.checker.check_one(code).await;
            debug!(code = %code, ?outcome, "checked {}/{}", idx + 1, total);
            report.record(ScanResult {
                code: code.clone(),
                outcome,
                value: self.values.lookup(code),
            });

            self.pacer.wait_between_checks().await;
        }

        if total > 0 {
            if let Some(p) = &progress {
                p.publish(&ScanProgress {
                    done: total,
                    total,
                    current: None,
                    alive: report.alive.len(),
                    dead: report.dead.len(),
                })
                .await;
            }
        }

        info!(
            total,
            alive = report.alive.len(),
            dead = report.dead.len(),
            errors = report.errors.len(),
            "scan finished"
        );
        report
    }
}
