//! Test doubles for the points store.
//!
//! `MemoryStore` keeps the tables in process, applies `adjust_balance`
//! atomically under one lock, and fans change events out on a broadcast
//! channel, which makes it a faithful stand-in for the hosted store in unit
//! tests. It also records every write and can be told to fail a specific
//! write, for the ordering and partial-failure tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use stakebook_types::{
    now_ms, Balance, ChangeEvent, ClaimRecord, DiaryEntry, StoreError, UserId,
};

use crate::store::{BalanceFeed, PointsStore};

const FEED_CAPACITY: usize = 64;

/// One recorded write against the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Set { user: UserId, points: i64 },
    Ensure { user: UserId, initial: i64 },
    Adjust { user: UserId, delta: i64 },
    AppendClaim { user: UserId, reward_name: String },
    InsertEntry { user: UserId },
}

#[derive(Default)]
struct Tables {
    balances: HashMap<UserId, Balance>,
    claims: Vec<ClaimRecord>,
    entries: Vec<DiaryEntry>,
}

/// In-memory [`PointsStore`] with a broadcast change feed.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    feed: broadcast::Sender<ChangeEvent>,
    ops: Mutex<Vec<WriteOp>>,
    adjust_calls: AtomicU64,
    fail_adjust_at: AtomicU64,
    fail_append_at: AtomicU64,
    append_calls: AtomicU64,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            tables: Mutex::new(Tables::default()),
            feed,
            ops: Mutex::new(Vec::new()),
            adjust_calls: AtomicU64::new(0),
            fail_adjust_at: AtomicU64::new(0),
            fail_append_at: AtomicU64::new(0),
            append_calls: AtomicU64::new(0),
            latency: Mutex::new(None),
        }
    }

    /// Creates or overwrites a balance row without recording a write op.
    pub async fn seed_balance(&self, user: UserId, points: i64) {
        let row = Balance::new(user, points);
        let old = self
            .tables
            .lock()
            .expect("tables lock poisoned")
            .balances
            .insert(user, row.clone());
        let event = match old {
            Some(old) => ChangeEvent::updated(old, row),
            None => ChangeEvent::inserted(row),
        };
        let _ = self.feed.send(event);
    }

    /// Full balance row, for serving reads over the wire.
    pub fn balance_row(&self, user: UserId) -> Option<Balance> {
        self.tables
            .lock()
            .expect("tables lock poisoned")
            .balances
            .get(&user)
            .cloned()
    }

    /// Deletes the balance row, emitting a DELETE change event.
    pub async fn delete_balance(&self, user: UserId) {
        let removed = self
            .tables
            .lock()
            .expect("tables lock poisoned")
            .balances
            .remove(&user);
        if let Some(row) = removed {
            let _ = self.feed.send(ChangeEvent::deleted(row));
        }
    }

    /// Every successful write so far, in order.
    pub fn write_ops(&self) -> Vec<WriteOp> {
        self.ops.lock().expect("ops lock poisoned").clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().expect("ops lock poisoned").clear();
    }

    /// Fails the next `adjust_balance` call with a timeout.
    pub fn fail_next_adjust(&self) {
        let next = self.adjust_calls.load(Ordering::SeqCst) + 1;
        self.fail_adjust_at.store(next, Ordering::SeqCst);
    }

    /// Fails the nth `adjust_balance` call (1-based) with a timeout.
    pub fn fail_adjust_number(&self, n: u64) {
        self.fail_adjust_at.store(n, Ordering::SeqCst);
    }

    /// Fails the next `append_claim` call with a timeout.
    pub fn fail_next_append(&self) {
        let next = self.append_calls.load(Ordering::SeqCst) + 1;
        self.fail_append_at.store(next, Ordering::SeqCst);
    }

    /// Adds an artificial await before every store call, so tests can hold
    /// operations in flight.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("latency lock poisoned") = Some(latency);
    }

    async fn pause(&self) {
        let latency = *self.latency.lock().expect("latency lock poisoned");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record(&self, op: WriteOp) {
        self.ops.lock().expect("ops lock poisoned").push(op);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PointsStore for MemoryStore {
    async fn get_balance(&self, user: UserId) -> Result<i64, StoreError> {
        self.pause().await;
        self.tables
            .lock()
            .expect("tables lock poisoned")
            .balances
            .get(&user)
            .map(|row| row.points)
            .ok_or(StoreError::NotFound)
    }

    async fn set_balance(&self, user: UserId, points: i64) -> Result<(), StoreError> {
        self.pause().await;
        let event = {
            let mut tables = self.tables.lock().expect("tables lock poisoned");
            let row = Balance::new(user, points);
            match tables.balances.insert(user, row.clone()) {
                Some(old) => ChangeEvent::updated(old, row),
                None => ChangeEvent::inserted(row),
            }
        };
        self.record(WriteOp::Set { user, points });
        let _ = self.feed.send(event);
        Ok(())
    }

    async fn ensure_balance(&self, user: UserId, initial: i64) -> Result<i64, StoreError> {
        self.pause().await;
        let (points, event) = {
            let mut tables = self.tables.lock().expect("tables lock poisoned");
            if let Some(row) = tables.balances.get(&user) {
                (row.points, None)
            } else {
                let row = Balance::new(user, initial);
                tables.balances.insert(user, row.clone());
                (initial, Some(ChangeEvent::inserted(row)))
            }
        };
        if let Some(event) = event {
            self.record(WriteOp::Ensure { user, initial });
            let _ = self.feed.send(event);
        }
        Ok(points)
    }

    async fn adjust_balance(&self, user: UserId, delta: i64) -> Result<i64, StoreError> {
        self.pause().await;
        let call = self.adjust_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_adjust_at.load(Ordering::SeqCst) == call {
            return Err(StoreError::Timeout);
        }
        let (points, event) = {
            let mut tables = self.tables.lock().expect("tables lock poisoned");
            let row = tables.balances.get_mut(&user).ok_or(StoreError::NotFound)?;
            let old = row.clone();
            row.points += delta;
            row.updated_at = now_ms();
            (row.points, ChangeEvent::updated(old, row.clone()))
        };
        self.record(WriteOp::Adjust { user, delta });
        let _ = self.feed.send(event);
        Ok(points)
    }

    async fn append_claim(&self, record: ClaimRecord) -> Result<(), StoreError> {
        self.pause().await;
        let call = self.append_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_append_at.load(Ordering::SeqCst) == call {
            return Err(StoreError::Timeout);
        }
        self.record(WriteOp::AppendClaim {
            user: record.user_id,
            reward_name: record.reward_name.clone(),
        });
        self.tables
            .lock()
            .expect("tables lock poisoned")
            .claims
            .push(record);
        Ok(())
    }

    async fn claims_for(&self, user: UserId) -> Result<Vec<ClaimRecord>, StoreError> {
        self.pause().await;
        Ok(self
            .tables
            .lock()
            .expect("tables lock poisoned")
            .claims
            .iter()
            .filter(|record| record.user_id == user)
            .cloned()
            .collect())
    }

    async fn insert_entry(&self, entry: DiaryEntry) -> Result<(), StoreError> {
        self.pause().await;
        self.record(WriteOp::InsertEntry {
            user: entry.user_id,
        });
        self.tables
            .lock()
            .expect("tables lock poisoned")
            .entries
            .push(entry);
        Ok(())
    }

    async fn subscribe(&self, user: UserId) -> Result<BalanceFeed, StoreError> {
        let mut source = self.feed.subscribe();
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let handle = tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if event.user_id() != Some(user) {
                            continue;
                        }
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(BalanceFeed::new(rx, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PointsStore;

    #[tokio::test]
    async fn adjust_is_atomic_under_contention() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let user = UserId::random();
        store.seed_balance(user, 0).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    store.adjust_balance(user, 1).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.get_balance(user).await.unwrap(), 16 * 50);
    }

    #[tokio::test]
    async fn adjust_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = store.adjust_balance(UserId::random(), 10).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let store = MemoryStore::new();
        let user = UserId::random();
        assert_eq!(store.ensure_balance(user, 50).await.unwrap(), 50);
        store.adjust_balance(user, 25).await.unwrap();
        // Second ensure returns the live value, not the initial.
        assert_eq!(store.ensure_balance(user, 50).await.unwrap(), 75);
    }

    #[tokio::test]
    async fn feed_carries_only_the_subscribed_user() {
        let store = MemoryStore::new();
        let user = UserId::random();
        let other = UserId::random();
        store.seed_balance(user, 10).await;
        store.seed_balance(other, 10).await;

        let mut feed = store.subscribe(user).await.unwrap();
        store.adjust_balance(other, 5).await.unwrap();
        store.adjust_balance(user, 7).await.unwrap();

        let event = feed.recv().await.unwrap();
        assert_eq!(event.user_id(), Some(user));
        assert_eq!(event.effective_points(), 17);
    }
}
