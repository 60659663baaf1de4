//! The static reward catalog and the append-only claim ledger rows.

use serde::{Deserialize, Serialize};

use crate::balance::UserId;

/// A claimable reward. The catalog is static; nothing here is persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardDefinition {
    pub id: u8,
    pub name: &'static str,
    pub cost: i64,
}

/// Rewards on offer, in shop display order.
pub const CATALOG: [RewardDefinition; 6] = [
    RewardDefinition {
        id: 0,
        name: "Virtual Trophy",
        cost: 200,
    },
    RewardDefinition {
        id: 1,
        name: "Profile Badge",
        cost: 150,
    },
    RewardDefinition {
        id: 2,
        name: "Bonus Spin",
        cost: 300,
    },
    RewardDefinition {
        id: 3,
        name: "Tax Report Skin",
        cost: 100,
    },
    RewardDefinition {
        id: 4,
        name: "Gambling Diary Theme",
        cost: 250,
    },
    RewardDefinition {
        id: 5,
        name: "Exclusive Avatar",
        cost: 350,
    },
];

/// Looks a reward up by id.
pub fn reward_by_id(id: u8) -> Option<&'static RewardDefinition> {
    CATALOG.iter().find(|reward| reward.id == id)
}

/// One successful claim. Append-only; never mutated or deleted, and there is
/// no uniqueness constraint — rewards are claimable multiple times.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub user_id: UserId,
    pub reward_name: String,
    pub cost: i64,
    /// Milliseconds since the Unix epoch.
    pub claimed_at: u64,
}
