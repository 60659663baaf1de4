//! Gambling diary rows. Peripheral to the points economy, but every insert
//! triggers a fixed balance bonus, so the row shape is shared.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::balance::UserId;

/// Kind of gambling session logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Casino,
    Sports,
    Poker,
    Lottery,
    Other,
}

/// One diary entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: Uuid,
    pub user_id: UserId,
    /// Session date, ISO `YYYY-MM-DD`.
    pub date: String,
    pub kind: EntryKind,
    /// Signed stake result: positive = win, negative = loss.
    pub amount: i64,
    /// Free-form result note.
    pub result: String,
}

impl DiaryEntry {
    pub fn new(user_id: UserId, date: String, kind: EntryKind, amount: i64, result: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            kind,
            amount,
            result,
        }
    }

    pub fn is_win(&self) -> bool {
        self.amount > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_entries_carry_negative_amounts() {
        let entry = DiaryEntry::new(
            UserId::random(),
            "2025-11-02".into(),
            EntryKind::Sports,
            -120,
            "parlay busted".into(),
        );
        assert!(!entry.is_win());
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"sports\""));
        assert_eq!(serde_json::from_str::<DiaryEntry>(&json).unwrap(), entry);
    }
}
