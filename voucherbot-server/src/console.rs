//! voucherbot-server/src/console.rs
//!
//! Stdout chat transport. Every notice becomes a numbered "message"; progress
//! edits are printed against that number.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use voucherbot_common::models::{MessageRef, Notice, SessionId};
use voucherbot_common::traits::Notifier;
use voucherbot_core::Error;

use crate::render::render_notice;

#[derive(Default)]
pub struct ConsoleNotifier {
    next_id: AtomicU64,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, header: &str, body: &str) -> Result<(), Error> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{header}\n{body}\n")?;
        out.flush()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, session: &SessionId, notice: &Notice) -> Result<MessageRef, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.print(&format!("[{session}] #{id}"), &render_notice(notice))?;
        Ok(MessageRef(id))
    }

    async fn edit(&self, session: &SessionId, message: MessageRef, text: &str) -> Result<(), Error> {
        self.print(&format!("[{session}] #{} (edited)", message.0), text)
    }
}

/// Prints a command reply for `session`. Empty replies print nothing.
pub fn print_reply(session: &SessionId, text: &str) {
    if text.is_empty() {
        return;
    }
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "[{session}]\n{text}\n");
    let _ = out.flush();
}
