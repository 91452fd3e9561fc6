// File: voucherbot-core/src/services/pacer.rs

use std::time::Duration;
use tokio::time::sleep;

/// Flat per-item delay between remote checks.
///
/// Not a token bucket: the wait is the same no matter how long the check
/// itself took, which keeps the aggregate request rate predictable.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn wait_between_checks(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_waits_configured_delay() {
        let pacer = Pacer::new(Duration::from_millis(30));
        let started = Instant::now();
        pacer.wait_between_checks().await;
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_zero_delay_is_ready_on_first_poll() {
        let pacer = Pacer::new(Duration::ZERO);
        let mut wait = tokio_test::task::spawn(pacer.wait_between_checks());
        tokio_test::assert_ready!(wait.poll());
    }
}
