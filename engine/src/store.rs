//! The single seam between the economy and the hosted store.
//!
//! Every balance mutator (spin, claim, diary bonus) goes through
//! [`PointsStore`]; no caller touches rows directly. Implementations:
//! the HTTP adapter in `stakebook-client`, the in-memory [`crate::mocks::MemoryStore`],
//! and the simulator's tables.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use stakebook_types::{ChangeEvent, ClaimRecord, DiaryEntry, StoreError, UserId};

/// Row-level CRUD plus the change-feed subscription for the balance table.
#[async_trait]
pub trait PointsStore: Send + Sync {
    /// Current points for the user. `StoreError::NotFound` when no row
    /// exists yet; callers default rather than treating it as a failure.
    async fn get_balance(&self, user: UserId) -> Result<i64, StoreError>;

    /// Unconditional overwrite of the user's points. Bumps `updated_at`.
    /// Last writer wins; prefer [`Self::adjust_balance`] for mutations.
    async fn set_balance(&self, user: UserId, points: i64) -> Result<(), StoreError>;

    /// Creates the balance row with `initial` points if absent; returns the
    /// row's points either way. Called once at account creation instead of
    /// upserting defensively on every read.
    async fn ensure_balance(&self, user: UserId, initial: i64) -> Result<i64, StoreError>;

    /// Atomic relative increment; returns the new points value.
    /// `StoreError::NotFound` when the row does not exist.
    async fn adjust_balance(&self, user: UserId, delta: i64) -> Result<i64, StoreError>;

    /// Appends an immutable claim record.
    async fn append_claim(&self, record: ClaimRecord) -> Result<(), StoreError>;

    /// All claim records for the user, oldest first.
    async fn claims_for(&self, user: UserId) -> Result<Vec<ClaimRecord>, StoreError>;

    /// Inserts a diary entry row. The entry bonus is the caller's job
    /// (see [`crate::diary::record_entry`]).
    async fn insert_entry(&self, entry: DiaryEntry) -> Result<(), StoreError>;

    /// Standing subscription to change events for the user's balance row.
    /// Dropping the returned feed tears the subscription down.
    async fn subscribe(&self, user: UserId) -> Result<BalanceFeed, StoreError>;
}

/// A live change-feed subscription.
///
/// Wraps the receiving half of a channel fed by a reader task; dropping the
/// feed aborts the task so subscriptions never leak.
pub struct BalanceFeed {
    receiver: mpsc::Receiver<ChangeEvent>,
    handle: JoinHandle<()>,
}

impl BalanceFeed {
    /// Feed backed by a reader task that must die with the feed.
    pub fn new(receiver: mpsc::Receiver<ChangeEvent>, handle: JoinHandle<()>) -> Self {
        Self { receiver, handle }
    }

    /// Next change event; `None` once the feed is closed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }
}

impl Drop for BalanceFeed {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
