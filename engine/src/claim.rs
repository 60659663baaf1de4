//! Reward claim flow.
//!
//! Claims debit the balance and append an immutable record. A per-reward
//! in-flight guard makes a double-click a no-op; a cooldown timestamp after
//! success is cosmetic UI state, not a uniqueness rule — rewards are
//! claimable again once it lapses.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info, warn};

use stakebook_types::constants::{CLAIM_COOLDOWN_MS, INITIAL_POINTS};
use stakebook_types::{now_ms, ClaimRecord, RewardDefinition, StoreError, UserId};

use crate::store::PointsStore;

#[derive(Debug, Error, PartialEq)]
pub enum ClaimError {
    /// A claim for this reward is already in flight; the request is a no-op.
    #[error("claim already in flight for this reward")]
    AlreadyClaiming,
    #[error("insufficient points: have {have}, need {need}")]
    InsufficientPoints { have: i64, need: i64 },
    /// The debit failed; no balance change occurred.
    #[error("claim aborted before any balance change: {0}")]
    Store(#[from] StoreError),
    /// Points were deducted but the claim record was not written. Not
    /// refunded; surfaced so the user sees the partial failure.
    #[error("points deducted but reward not recorded: {source}")]
    RecordNotWritten { deducted: i64, source: StoreError },
}

/// A successful claim.
#[derive(Clone, Debug, PartialEq)]
pub struct ClaimReceipt {
    pub record: ClaimRecord,
    pub balance: i64,
    /// End of the cosmetic cooldown window, ms since the Unix epoch.
    pub cooldown_until: u64,
}

/// Serializes claims per reward for one user session.
pub struct ClaimDesk<S> {
    store: Arc<S>,
    in_flight: Mutex<HashSet<u8>>,
    cooldowns: Mutex<HashMap<u8, u64>>,
}

impl<S: PointsStore> ClaimDesk<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
            cooldowns: Mutex::new(HashMap::new()),
        }
    }

    /// True while the reward sits in its post-claim cooldown window.
    pub fn on_cooldown(&self, reward: &RewardDefinition) -> bool {
        self.cooldowns
            .lock()
            .expect("cooldown lock poisoned")
            .get(&reward.id)
            .is_some_and(|until| *until > now_ms())
    }

    /// Claims `reward` for `user`: gate, debit, append, cooldown.
    pub async fn claim(
        &self,
        user: UserId,
        reward: &RewardDefinition,
    ) -> Result<ClaimReceipt, ClaimError> {
        let _guard =
            ClaimGuard::acquire(&self.in_flight, reward.id).ok_or(ClaimError::AlreadyClaiming)?;

        let balance = match self.store.get_balance(user).await {
            Ok(points) => points,
            // No row yet: the signup seed is never enough for any reward in
            // the catalog, but gate on it rather than erroring.
            Err(StoreError::NotFound) => INITIAL_POINTS,
            Err(err) => return Err(err.into()),
        };
        if balance < reward.cost {
            debug!(%user, reward = reward.name, balance, cost = reward.cost, "claim rejected");
            return Err(ClaimError::InsufficientPoints {
                have: balance,
                need: reward.cost,
            });
        }

        let balance = self.store.adjust_balance(user, -reward.cost).await?;

        let record = ClaimRecord {
            user_id: user,
            reward_name: reward.name.to_string(),
            cost: reward.cost,
            claimed_at: now_ms(),
        };
        if let Err(err) = self.store.append_claim(record.clone()).await {
            warn!(
                %user,
                reward = reward.name,
                deducted = reward.cost,
                error = %err,
                "claim record append failed after debit"
            );
            return Err(ClaimError::RecordNotWritten {
                deducted: reward.cost,
                source: err,
            });
        }

        let cooldown_until = now_ms() + CLAIM_COOLDOWN_MS;
        self.cooldowns
            .lock()
            .expect("cooldown lock poisoned")
            .insert(reward.id, cooldown_until);

        info!(%user, reward = reward.name, cost = reward.cost, balance, "reward claimed");
        Ok(ClaimReceipt {
            record,
            balance,
            cooldown_until,
        })
    }
}

/// RAII membership in the per-reward in-flight set.
struct ClaimGuard<'a> {
    set: &'a Mutex<HashSet<u8>>,
    reward_id: u8,
}

impl<'a> ClaimGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<u8>>, reward_id: u8) -> Option<Self> {
        let mut held = set.lock().expect("in-flight lock poisoned");
        if !held.insert(reward_id) {
            return None;
        }
        Some(Self { set, reward_id })
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .expect("in-flight lock poisoned")
            .remove(&self.reward_id);
    }
}
