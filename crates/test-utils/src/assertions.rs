//! Polling-based assertions for async tests.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Polling interval for [`assert_eventually`].
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls `condition` until it holds or `timeout` expires.
///
/// Returns whether the condition became true. Prefer this over fixed sleeps
/// for anything that settles asynchronously (sweeper reclamation, background
/// task shutdown).
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        sleep(POLL_INTERVAL).await;
    }
    condition()
}
