//! Realtime balance reconciliation.
//!
//! One spawned task per subscription consumes the store's change feed and
//! publishes the latest points value on a watch channel. This is how a
//! second session observes a spin performed elsewhere without polling:
//! eventually consistent, within the feed's notification latency.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use stakebook_types::{StoreError, UserId};

use crate::store::PointsStore;

/// A standing subscription to one user's balance row.
///
/// Dropping the listener aborts the consuming task, tearing the
/// subscription down; re-subscribing on user change goes through
/// [`BalanceListener::resubscribe`], which drops the old listener first.
pub struct BalanceListener {
    user: UserId,
    balance: watch::Receiver<i64>,
    handle: JoinHandle<()>,
}

impl BalanceListener {
    /// Subscribes to `user`'s balance row. `initial` seeds the watch value
    /// until the first event arrives (callers pass the last read, or the
    /// signup default when no row exists yet).
    pub async fn subscribe<S: PointsStore + 'static>(
        store: Arc<S>,
        user: UserId,
        initial: i64,
    ) -> Result<Self, StoreError> {
        let mut feed = store.subscribe(user).await?;
        let (tx, balance) = watch::channel(initial);
        let handle = tokio::spawn(async move {
            while let Some(event) = feed.recv().await {
                // The feed is already row-filtered; this guards against a
                // misbehaving store implementation.
                if event.user_id().is_some_and(|u| u != user) {
                    continue;
                }
                let points = event.effective_points();
                debug!(%user, points, kind = ?event.kind, "balance change observed");
                if tx.send(points).is_err() {
                    break; // No watchers left.
                }
            }
        });
        Ok(Self {
            user,
            balance,
            handle,
        })
    }

    /// Tears down `previous` before establishing the new subscription, so a
    /// user switch never leaves two live feeds.
    pub async fn resubscribe<S: PointsStore + 'static>(
        previous: Option<Self>,
        store: Arc<S>,
        user: UserId,
        initial: i64,
    ) -> Result<Self, StoreError> {
        drop(previous);
        Self::subscribe(store, user, initial).await
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    /// Watch handle over the reconciled points value.
    pub fn balance(&self) -> watch::Receiver<i64> {
        self.balance.clone()
    }

    /// Waits for the next reconciled value.
    pub async fn changed(&mut self) -> Result<i64, watch::error::RecvError> {
        self.balance.changed().await?;
        Ok(*self.balance.borrow_and_update())
    }
}

impl Drop for BalanceListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
