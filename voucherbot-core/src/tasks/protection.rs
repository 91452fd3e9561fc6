// File: voucherbot-core/src/tasks/protection.rs
//
// One background protection loop per session. The loop re-reads the session's
// active codes every cycle, scans them, publishes a cycle report and sleeps the
// configured interval in small increments so a stop request is seen quickly.
//
// Stopping is two-pronged: the session's `stop_requested` flag is checked at
// every increment boundary, and the loop's CancellationToken (plus a hard
// abort of the task) covers the time spent inside a scan.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;
use voucherbot_common::models::{CycleReport, Notice, SessionId};

use crate::config::ProtectionConfig;
use crate::services::message_sender::{MessageProgress, MessageSender};
use crate::services::scan_service::{ProgressSink, ScanEngine};
use crate::services::session_store::{ProtectionHandle, SessionStore};
use crate::Error;

/// Everything a running loop needs, cheaply cloneable into the spawned task.
#[derive(Clone)]
pub struct ProtectionContext {
    pub store: Arc<SessionStore>,
    pub engine: Arc<ScanEngine>,
    pub sender: Arc<MessageSender>,
    pub config: ProtectionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

/// Starts and stops per-session protection loops.
pub struct ProtectionSupervisor {
    ctx: ProtectionContext,
}

impl ProtectionSupervisor {
    pub fn new(ctx: ProtectionContext) -> Self {
        Self { ctx }
    }

    /// Spawns the session's loop unless one is already running.
    ///
    /// The check and the installation of the new handle happen under the same
    /// session lock, so two concurrent starts can never both spawn.
    pub fn start(&self, session: &SessionId) -> StartOutcome {
        let slot = self.ctx.store.get(session);
        let mut s = slot.lock();
        if !s.can_start_protection() {
            debug!(session = %session, "Protection already running");
            return StartOutcome::AlreadyRunning;
        }

        s.set_stop_requested(false);
        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_protection_loop(
            self.ctx.clone(),
            session.clone(),
            run_id,
            cancel.clone(),
        ));
        s.set_protection(ProtectionHandle::new(run_id, cancel, task));

        info!(session = %session, %run_id, "Protection started");
        StartOutcome::Started
    }

    /// Requests a stop and cancels the running task. Silent: the loop does
    /// not report anything when it is stopped this way.
    pub fn stop(&self, session: &SessionId) -> StopOutcome {
        let handle = {
            let slot = self.ctx.store.get(session);
            let mut s = slot.lock();
            if !s.is_protecting() {
                // a finished handle may still be lying around
                s.take_protection();
                return StopOutcome::NotRunning;
            }
            s.set_stop_requested(true);
            s.take_protection()
        };

        if let Some(h) = handle {
            let run_id = h.run_id();
            h.cancel();
            info!(session = %session, %run_id, "Protection stopped");
        }
        StopOutcome::Stopped
    }

    pub fn is_running(&self, session: &SessionId) -> bool {
        self.ctx.store.is_protecting(session)
    }

    /// Stops every running loop. Returns how many were running.
    pub fn stop_all(&self) -> usize {
        self.ctx
            .store
            .session_ids()
            .iter()
            .filter(|id| self.stop(id) == StopOutcome::Stopped)
            .count()
    }
}

/// Clears the session's handle when the loop exits by any path, including
/// the task being aborted mid-await.
struct HandleSlot {
    store: Arc<SessionStore>,
    session: SessionId,
    run_id: Uuid,
}

impl Drop for HandleSlot {
    fn drop(&mut self) {
        if let Ok(slot) = self.store.existing(&self.session) {
            slot.lock().clear_protection_if(self.run_id);
        }
    }
}

enum LoopExit {
    Cancelled,
    Stopped(u64),
    Crashed(String),
}

async fn run_protection_loop(
    ctx: ProtectionContext,
    session: SessionId,
    run_id: Uuid,
    cancel: CancellationToken,
) {
    let slot = HandleSlot {
        store: ctx.store.clone(),
        session: session.clone(),
        run_id,
    };

    let exit = tokio::select! {
        _ = cancel.cancelled() => LoopExit::Cancelled,
        res = AssertUnwindSafe(protection_cycles(&ctx, &session)).catch_unwind() => match res {
            Ok(Ok(cycles)) => LoopExit::Stopped(cycles),
            Ok(Err(e)) => LoopExit::Crashed(e.to_string()),
            Err(panic) => LoopExit::Crashed(panic_message(panic.as_ref())),
        },
    };

    // Release the session before talking to the user so a restart is
    // possible the moment the crash notice arrives.
    drop(slot);

    match exit {
        LoopExit::Cancelled => debug!(session = %session, %run_id, "Protection loop cancelled"),
        LoopExit::Stopped(cycles) => {
            info!(session = %session, %run_id, cycles, "Protection loop finished")
        }
        LoopExit::Crashed(err) => {
            error!(session = %session, %run_id, "Protection crashed: {}", err);
            ctx.sender
                .send_notice(&session, &Notice::ProtectionCrashed { error: err })
                .await;
        }
    }
}

/// The cycle body. Returns the number of completed cycles once a stop is
/// requested; an `Err` is treated as a crash of this loop.
async fn protection_cycles(ctx: &ProtectionContext, session: &SessionId) -> Result<u64, Error> {
    let mut cycle: u64 = 1;

    while !ctx.store.stop_requested(session)? {
        // 1) Live read, so codes added or resumed mid-protection are picked up.
        let active = ctx.store.active_codes(session)?;

        if active.is_empty() {
            debug!(session = %session, "No active codes; idling");
            ctx.sender.send_notice(session, &Notice::NoActiveCodes).await;
            wait_interval(&ctx.store, session, &ctx.config).await?;
            continue;
        }

        // 2) Announce the cycle; that message doubles as the progress target.
        let started = Notice::CycleStarted { cycle, active: active.len() };
        let progress = ctx
            .sender
            .send_notice(session, &started)
            .await
            .map(|msg| MessageProgress::new(ctx.sender.clone(), session.clone(), msg));

        // 3) Scan.
        let sink = progress.as_ref().map(|p| p as &dyn ProgressSink);
        let scan = ctx.engine.scan(&active, sink).await;

        // 4) Report. Nothing is ever removed from the registry here.
        let wait = chrono::Duration::from_std(ctx.config.interval)
            .map_err(|e| Error::Internal(format!("interval out of range: {e}")))?;
        let report = CycleReport {
            cycle,
            scan,
            next_scan_at: chrono::Local::now() + wait,
            registry_size: ctx.store.registry_size(session)?,
        };
        ctx.sender.send_notice(session, &Notice::CycleReport(report)).await;
        cycle += 1;

        // 5) Sleep until the next cycle.
        wait_interval(&ctx.store, session, &ctx.config).await?;
    }

    Ok(cycle - 1)
}

/// Sleeps `interval` in `sleep_increment` steps, returning early once the
/// session asks to stop.
async fn wait_interval(
    store: &SessionStore,
    session: &SessionId,
    config: &ProtectionConfig,
) -> Result<(), Error> {
    let mut remaining = config.interval;
    while !remaining.is_zero() {
        if store.stop_requested(session)? {
            return Ok(());
        }
        let step = if config.sleep_increment.is_zero() {
            remaining
        } else {
            remaining.min(config.sleep_increment)
        };
        sleep(step).await;
        remaining -= step;
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
