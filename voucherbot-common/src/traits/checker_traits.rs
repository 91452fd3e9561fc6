// File: voucherbot-common/src/traits/checker_traits.rs

use async_trait::async_trait;
use crate::models::CheckOutcome;

/// Verifies one code against the remote service.
///
/// Implementations never fail: transport problems are reported as
/// [`CheckOutcome::NetworkError`] so that one bad request cannot abort a scan.
#[async_trait]
pub trait VoucherChecker: Send + Sync {
    async fn check_one(&self, code: &str) -> CheckOutcome;
}
