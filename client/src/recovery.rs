//! Blunt recovery policy for network failures.
//!
//! The hosted-store UI does not retry individual calls: on a timeout or
//! transport failure it blocks interaction behind a "reconnecting" overlay
//! and forces a full reload after a short grace. This module is that policy
//! as data: callers ask what to do with a `StoreError` and, if told to
//! reload, wait out the grace first.

use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use stakebook_types::constants::RELOAD_GRACE_MS;
use stakebook_types::StoreError;

/// What the caller should do after a failed store call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// Benign or user-level failure; show the transient message and move on.
    None,
    /// Network-level failure; the session should reload once the grace
    /// period has elapsed.
    ReloadRequired,
}

/// Fixed-grace reload policy. No backoff, no partial retry.
#[derive(Clone, Copy, Debug)]
pub struct RecoveryPolicy {
    grace: Duration,
}

impl RecoveryPolicy {
    pub fn new() -> Self {
        Self {
            grace: Duration::from_millis(RELOAD_GRACE_MS),
        }
    }

    /// Classifies the error and, for network failures, waits out the grace
    /// period so the overlay is visible before the reload.
    pub async fn on_error(&self, err: &StoreError) -> Recovery {
        if !err.needs_recovery() {
            return Recovery::None;
        }
        warn!(error = %err, grace_ms = self.grace.as_millis() as u64, "network failure; reload pending");
        sleep(self.grace).await;
        Recovery::ReloadRequired
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn network_failures_reload_after_the_grace() {
        let policy = RecoveryPolicy::new();
        let decision = policy.on_error(&StoreError::Timeout).await;
        assert_eq!(decision, Recovery::ReloadRequired);
    }

    #[tokio::test]
    async fn benign_and_user_failures_do_not_reload() {
        let policy = RecoveryPolicy::new();
        assert_eq!(policy.on_error(&StoreError::NotFound).await, Recovery::None);
        assert_eq!(
            policy.on_error(&StoreError::Rejected("bad".into())).await,
            Recovery::None
        );
    }
}
