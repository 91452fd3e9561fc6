// File: voucherbot-core/src/services/session_store.rs
//
// Per-session mutable state, shared between command handlers and the
// session's own protection loop.
//
// The map itself is a DashMap, so creating/looking up sessions never tears.
// Each session sits behind its own parking_lot mutex; it is only ever held for
// short synchronous sections and never across an `.await`.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;
use voucherbot_common::models::{
    AddOutcome, CodeListing, ListedCode, SessionId, ValueTable, VoucherRecord,
};

use crate::Error;

/// The session's grip on its running protection loop.
#[derive(Debug)]
pub struct ProtectionHandle {
    run_id: Uuid,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ProtectionHandle {
    pub fn new(run_id: Uuid, cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { run_id, cancel, task }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the loop to stop and aborts the task in case it is stuck
    /// somewhere that does not watch the token.
    pub fn cancel(self) -> JoinHandle<()> {
        self.cancel.cancel();
        self.task.abort();
        self.task
    }
}

#[derive(Debug, Default)]
pub struct Session {
    /// Insertion order is display order.
    codes: Vec<VoucherRecord>,
    protection: Option<ProtectionHandle>,
    stop_requested: bool,
    busy_scanning: bool,
}

impl Session {
    fn position(&self, code: &str) -> Option<usize> {
        self.codes.iter().position(|r| r.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.position(code).is_some()
    }

    /// Adds unknown codes; known ones are reported as skipped and left alone.
    pub fn add_codes(&mut self, codes: &[String]) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        for code in codes {
            if self.contains(code) {
                outcome.skipped.push(code.clone());
            } else {
                self.codes.push(VoucherRecord::new(code.clone()));
                outcome.added.push(code.clone());
            }
        }
        outcome.total = self.codes.len();
        outcome
    }

    pub fn set_paused(&mut self, code: &str, paused: bool) -> Result<(), Error> {
        match self.position(code) {
            Some(idx) => {
                self.codes[idx].paused = paused;
                Ok(())
            }
            None => Err(Error::Validation(format!("{code} is not in the protection list"))),
        }
    }

    /// Removes every code. Returns how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.codes.len();
        self.codes.clear();
        count
    }

    pub fn codes(&self) -> &[VoucherRecord] {
        &self.codes
    }

    pub fn active_codes(&self) -> Vec<String> {
        self.codes
            .iter()
            .filter(|r| !r.paused)
            .map(|r| r.code.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn is_protecting(&self) -> bool {
        self.protection.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// A new loop may only be installed when none is running.
    pub fn can_start_protection(&self) -> bool {
        !self.is_protecting()
    }

    pub fn set_protection(&mut self, handle: ProtectionHandle) {
        self.protection = Some(handle);
    }

    pub fn take_protection(&mut self) -> Option<ProtectionHandle> {
        self.protection.take()
    }

    /// Clears the handle only if it still belongs to `run_id`; a loop that is
    /// winding down must not clobber its successor.
    pub fn clear_protection_if(&mut self, run_id: Uuid) -> bool {
        if self.protection.as_ref().is_some_and(|h| h.run_id() == run_id) {
            self.protection = None;
            return true;
        }
        false
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn set_stop_requested(&mut self, requested: bool) {
        self.stop_requested = requested;
    }

    pub fn busy_scanning(&self) -> bool {
        self.busy_scanning
    }
}

/// Releases the session's one-shot scan slot when dropped.
pub struct ScanGuard {
    session: Arc<Mutex<Session>>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.session.lock().busy_scanning = false;
    }
}

/// Process-wide session registry. Built once at startup and handed around
/// behind an `Arc`.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Arc<Mutex<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session, creating an empty one on first access.
    pub fn get(&self, id: &SessionId) -> Arc<Mutex<Session>> {
        if let Some(existing) = self.sessions.get(id) {
            return Arc::clone(existing.value());
        }
        let entry = self.sessions.entry(id.clone()).or_insert_with(|| {
            debug!(session = %id, "creating session");
            Arc::new(Mutex::new(Session::default()))
        });
        Arc::clone(entry.value())
    }

    /// Looks up a session without creating it.
    pub fn existing(&self, id: &SessionId) -> Result<Arc<Mutex<Session>>, Error> {
        self.sessions
            .get(id)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| Error::NotFound(format!("session {id} does not exist")))
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn add_codes(&self, id: &SessionId, codes: &[String]) -> AddOutcome {
        self.get(id).lock().add_codes(codes)
    }

    pub fn pause(&self, id: &SessionId, code: &str) -> Result<(), Error> {
        self.get(id).lock().set_paused(code, true)
    }

    pub fn resume(&self, id: &SessionId, code: &str) -> Result<(), Error> {
        self.get(id).lock().set_paused(code, false)
    }

    pub fn clear_all(&self, id: &SessionId) -> usize {
        self.get(id).lock().clear()
    }

    /// Live read of the unpaused codes.
    pub fn active_codes(&self, id: &SessionId) -> Result<Vec<String>, Error> {
        Ok(self.existing(id)?.lock().active_codes())
    }

    pub fn registry_size(&self, id: &SessionId) -> Result<usize, Error> {
        Ok(self.existing(id)?.lock().len())
    }

    pub fn stop_requested(&self, id: &SessionId) -> Result<bool, Error> {
        Ok(self.existing(id)?.lock().stop_requested())
    }

    pub fn set_stop_requested(&self, id: &SessionId, requested: bool) {
        self.get(id).lock().set_stop_requested(requested);
    }

    pub fn is_protecting(&self, id: &SessionId) -> bool {
        self.get(id).lock().is_protecting()
    }

    /// `(total, active)` code counts.
    pub fn counts(&self, id: &SessionId) -> (usize, usize) {
        let session = self.get(id);
        let s = session.lock();
        (s.len(), s.codes().iter().filter(|r| !r.paused).count())
    }

    pub fn listing(&self, id: &SessionId, values: &ValueTable) -> CodeListing {
        let session = self.get(id);
        let s = session.lock();
        CodeListing {
            codes: s
                .codes()
                .iter()
                .map(|r| ListedCode {
                    code: r.code.clone(),
                    paused: r.paused,
                    value: values.lookup(&r.code),
                })
                .collect(),
            running: s.is_protecting(),
        }
    }

    /// Claims the session's one-shot scan slot, or `None` if a check is
    /// already in flight.
    pub fn try_begin_scan(&self, id: &SessionId) -> Option<ScanGuard> {
        let session = self.get(id);
        {
            let mut s = session.lock();
            if s.busy_scanning {
                return None;
            }
            s.busy_scanning = true;
        }
        Some(ScanGuard { session })
    }
}
