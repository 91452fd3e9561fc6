// File: voucherbot-common/src/traits/notifier_traits.rs

use async_trait::async_trait;
use crate::Error;
use crate::models::{MessageRef, Notice, SessionId};

/// Outbound side of the chat transport.
///
/// Implementations report a flood condition as [`Error::RateLimited`] so the
/// caller can back off before retrying.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notice to the session, returning a handle that later
    /// progress edits can target.
    async fn send(&self, session: &SessionId, notice: &Notice) -> Result<MessageRef, Error>;

    /// Replace the text of a previously delivered message.
    async fn edit(&self, session: &SessionId, message: MessageRef, text: &str) -> Result<(), Error>;
}
