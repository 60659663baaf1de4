//! Diary entry persistence and its balance trigger.
//!
//! Every successful insert awards a fixed bonus, unconditionally. The bonus
//! goes through the same store seam as the spin and claim mutators.

use tracing::info;

use stakebook_types::constants::{DIARY_ENTRY_BONUS, INITIAL_POINTS};
use stakebook_types::{DiaryEntry, StoreError};

use crate::store::PointsStore;

/// Inserts a diary entry and credits the entry bonus; returns the new
/// balance.
///
/// The bonus is credited only after the entry row is in; an insert failure
/// leaves the balance untouched. A bonus failure after a successful insert
/// surfaces as the store error (the entry stays — entries are append-only).
pub async fn record_entry<S: PointsStore>(store: &S, entry: DiaryEntry) -> Result<i64, StoreError> {
    let user = entry.user_id;
    let amount = entry.amount;
    store.insert_entry(entry).await?;

    let balance = match store.adjust_balance(user, DIARY_ENTRY_BONUS).await {
        Ok(points) => points,
        Err(StoreError::NotFound) => {
            // Signup trigger has not seeded the row yet.
            store.ensure_balance(user, INITIAL_POINTS).await?;
            store.adjust_balance(user, DIARY_ENTRY_BONUS).await?
        }
        Err(err) => return Err(err),
    };
    info!(%user, amount, bonus = DIARY_ENTRY_BONUS, balance, "diary entry recorded");
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryStore;
    use stakebook_types::{EntryKind, UserId};

    fn entry(user: UserId, amount: i64) -> DiaryEntry {
        DiaryEntry::new(
            user,
            "2025-10-31".into(),
            EntryKind::Casino,
            amount,
            "blackjack session".into(),
        )
    }

    #[tokio::test]
    async fn insert_awards_the_fixed_bonus() {
        let store = MemoryStore::new();
        let user = UserId::random();
        store.seed_balance(user, 100).await;

        let balance = record_entry(&store, entry(user, -250)).await.unwrap();
        assert_eq!(balance, 100 + DIARY_ENTRY_BONUS);
        assert_eq!(store.get_balance(user).await.unwrap(), 150);
    }

    #[tokio::test]
    async fn bonus_is_unconditional_on_win_or_loss() {
        let store = MemoryStore::new();
        let user = UserId::random();
        store.seed_balance(user, 0).await;

        record_entry(&store, entry(user, 900)).await.unwrap();
        record_entry(&store, entry(user, -900)).await.unwrap();
        assert_eq!(
            store.get_balance(user).await.unwrap(),
            2 * DIARY_ENTRY_BONUS
        );
    }

    #[tokio::test]
    async fn missing_row_is_seeded_before_the_bonus() {
        let store = MemoryStore::new();
        let user = UserId::random();

        let balance = record_entry(&store, entry(user, 10)).await.unwrap();
        assert_eq!(balance, INITIAL_POINTS + DIARY_ENTRY_BONUS);
    }

    #[tokio::test]
    async fn failed_bonus_leaves_balance_untouched() {
        let store = MemoryStore::new();
        let user = UserId::random();
        store.seed_balance(user, 100).await;
        store.fail_next_adjust();

        let err = record_entry(&store, entry(user, 10)).await.unwrap_err();
        assert_eq!(err, StoreError::Timeout);
        // Entry row persisted; bonus missing; balance untouched.
        assert_eq!(store.get_balance(user).await.unwrap(), 100);
    }
}
