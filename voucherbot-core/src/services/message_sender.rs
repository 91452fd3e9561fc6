use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};
use voucherbot_common::models::{MessageRef, Notice, ScanProgress, SessionId};
use voucherbot_common::traits::Notifier;

use crate::config::NotifyRetryPolicy;
use crate::services::scan_service::ProgressSink;

/// Outbound side of the core. Every notice goes through a bounded retry; a
/// notice that still fails after the last attempt is logged and dropped, so a
/// flaky chat channel never takes a scan or a protection loop down with it.
pub struct MessageSender {
    notifier: Arc<dyn Notifier>,
    policy: NotifyRetryPolicy,
}

impl MessageSender {
    pub fn new(notifier: Arc<dyn Notifier>, policy: NotifyRetryPolicy) -> Self {
        Self { notifier, policy }
    }

    /// Delivers `notice`, retrying per the policy. Returns the delivered
    /// message, or `None` once every attempt has failed.
    pub async fn send_notice(&self, session: &SessionId, notice: &Notice) -> Option<MessageRef> {
        let attempts = self.policy.attempts.max(1);

        for attempt in 1..=attempts {
            match self.notifier.send(session, notice).await {
                Ok(msg) => return Some(msg),
                Err(e) => {
                    let flood = e.is_flood();
                    warn!(
                        session = %session,
                        attempt,
                        attempts,
                        flood,
                        "Failed to deliver notice: {}",
                        e
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff(attempt, flood)).await;
                    }
                }
            }
        }

        error!(session = %session, "Giving up on notice after {} attempts", attempts);
        None
    }

    /// Linear backoff on flood, flat delay otherwise.
    fn backoff(&self, attempt: u32, flood: bool) -> Duration {
        if flood {
            self.policy.flood_backoff.saturating_mul(attempt)
        } else {
            self.policy.retry_delay
        }
    }

    /// Single best-effort edit of a progress message. Never retried: the next
    /// snapshot supersedes this one anyway.
    pub async fn edit_progress(&self, session: &SessionId, message: MessageRef, text: &str) {
        if let Err(e) = self.notifier.edit(session, message, text).await {
            debug!(session = %session, ?message, "progress edit dropped: {}", e);
        }
    }
}

/// Routes scan progress into edits of one already-sent message.
pub struct MessageProgress {
    sender: Arc<MessageSender>,
    session: SessionId,
    message: MessageRef,
}

impl MessageProgress {
    pub fn new(sender: Arc<MessageSender>, session: SessionId, message: MessageRef) -> Self {
        Self { sender, session, message }
    }
}

#[async_trait]
impl ProgressSink for MessageProgress {
    async fn publish(&self, progress: &ScanProgress) {
        self.sender
            .edit_progress(&self.session, self.message, &progress.render())
            .await;
    }
}
