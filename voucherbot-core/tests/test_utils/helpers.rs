// File: voucherbot-core/tests/test_utils/helpers.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{sleep, Instant};
use voucherbot_common::models::{CheckOutcome, MessageRef, Notice, SessionId, ValueTable};
use voucherbot_common::traits::{Notifier, VoucherChecker};
use voucherbot_core::config::{BotConfig, NotifyRetryPolicy, ProtectionConfig};
use voucherbot_core::services::{CommandService, MessageSender, Pacer, ScanEngine, SessionStore};
use voucherbot_core::tasks::{ProtectionContext, ProtectionSupervisor};
use voucherbot_core::Error;

/// Records every notice and edit; never fails.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(SessionId, Notice)>>,
    edits: Mutex<Vec<(SessionId, MessageRef, String)>>,
    next_id: AtomicU64,
}

impl RecordingNotifier {
    pub fn notices_for(&self, session: &SessionId) -> Vec<Notice> {
        self.sent
            .lock()
            .iter()
            .filter(|(s, _)| s == session)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn edits_for(&self, session: &SessionId) -> Vec<String> {
        self.edits
            .lock()
            .iter()
            .filter(|(s, _, _)| s == session)
            .map(|(_, _, t)| t.clone())
            .collect()
    }

    pub fn count_for(&self, session: &SessionId, pred: impl Fn(&Notice) -> bool) -> usize {
        self.notices_for(session).iter().filter(|n| pred(n)).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, session: &SessionId, notice: &Notice) -> Result<MessageRef, Error> {
        self.sent.lock().push((session.clone(), notice.clone()));
        Ok(MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn edit(&self, session: &SessionId, message: MessageRef, text: &str) -> Result<(), Error> {
        self.edits.lock().push((session.clone(), message, text.to_string()));
        Ok(())
    }
}

/// Answers from a fixed table (unknown codes are `Dead`), optionally
/// sleeping per check or panicking on one code.
#[derive(Default)]
pub struct ScriptedChecker {
    outcomes: HashMap<String, CheckOutcome>,
    delay: Duration,
    panic_on: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedChecker {
    pub fn new(outcomes: &[(&str, CheckOutcome)]) -> Self {
        Self {
            outcomes: outcomes.iter().map(|(c, o)| (c.to_string(), *o)).collect(),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn panicking_on(mut self, code: &str) -> Self {
        self.panic_on = Some(code.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl VoucherChecker for ScriptedChecker {
    async fn check_one(&self, code: &str) -> CheckOutcome {
        self.calls.lock().push(code.to_string());
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.panic_on.as_deref() == Some(code) {
            panic!("checker exploded on {code}");
        }
        self.outcomes.get(code).copied().unwrap_or(CheckOutcome::Dead)
    }
}

pub fn fast_protection() -> ProtectionConfig {
    ProtectionConfig {
        interval: Duration::from_millis(60),
        sleep_increment: Duration::from_millis(10),
    }
}

pub fn fast_policy() -> NotifyRetryPolicy {
    NotifyRetryPolicy {
        attempts: 3,
        flood_backoff: Duration::from_millis(2),
        retry_delay: Duration::from_millis(1),
    }
}

pub struct Harness {
    pub store: Arc<SessionStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub sender: Arc<MessageSender>,
    pub engine: Arc<ScanEngine>,
    pub supervisor: Arc<ProtectionSupervisor>,
    pub config: BotConfig,
}

impl Harness {
    pub fn new(checker: Arc<dyn VoucherChecker>, protection: ProtectionConfig) -> Self {
        let config = BotConfig {
            protection: protection.clone(),
            notify: fast_policy(),
            ..BotConfig::default()
        };
        let store = Arc::new(SessionStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let sender = Arc::new(MessageSender::new(notifier.clone(), config.notify.clone()));
        let engine = Arc::new(ScanEngine::new(
            checker,
            Pacer::new(Duration::ZERO),
            Arc::new(ValueTable::default()),
        ));
        let supervisor = Arc::new(ProtectionSupervisor::new(ProtectionContext {
            store: store.clone(),
            engine: engine.clone(),
            sender: sender.clone(),
            config: protection,
        }));
        Self {
            store,
            notifier,
            sender,
            engine,
            supervisor,
            config,
        }
    }

    pub fn commands(&self, credential_loaded: bool) -> CommandService {
        CommandService::new(
            self.store.clone(),
            self.engine.clone(),
            self.sender.clone(),
            self.supervisor.clone(),
            self.config.clone(),
            credential_loaded,
        )
    }

    pub fn cycle_reports(&self, session: &SessionId) -> usize {
        self.notifier
            .count_for(session, |n| matches!(n, Notice::CycleReport(_)))
    }
}

pub fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

/// Polls `cond` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }
    cond()
}
