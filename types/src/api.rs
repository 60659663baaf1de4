//! Wire types shared by the store API (simulator) and its consumers
//! (client SDK, change-feed listener).

use serde::{Deserialize, Serialize};

use crate::balance::{Balance, UserId};

/// Row-level mutation kinds emitted on the change feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One change-feed event for a balance row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub new: Option<Balance>,
    pub old: Option<Balance>,
}

impl ChangeEvent {
    pub fn inserted(row: Balance) -> Self {
        Self {
            kind: ChangeKind::Insert,
            new: Some(row),
            old: None,
        }
    }

    pub fn updated(old: Balance, new: Balance) -> Self {
        Self {
            kind: ChangeKind::Update,
            new: Some(new),
            old: Some(old),
        }
    }

    pub fn deleted(row: Balance) -> Self {
        Self {
            kind: ChangeKind::Delete,
            new: None,
            old: Some(row),
        }
    }

    /// The user this event belongs to.
    pub fn user_id(&self) -> Option<UserId> {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(|row| row.user_id)
    }

    /// Points value an observer should reconcile to: the new row's points,
    /// or 0 when the row was deleted.
    pub fn effective_points(&self) -> i64 {
        match self.kind {
            ChangeKind::Delete => 0,
            _ => self.new.as_ref().map(|row| row.points).unwrap_or(0),
        }
    }
}

/// Body of `PUT /balance/:user`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SetBalanceRequest {
    pub points: i64,
}

/// Body of `POST /balance/:user/ensure`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EnsureBalanceRequest {
    pub initial: i64,
}

/// Body of `POST /balance/:user/adjust`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AdjustBalanceRequest {
    pub delta: i64,
}

/// Error body returned by the store API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_kind_uses_feed_casing() {
        let json = serde_json::to_string(&ChangeKind::Update).unwrap();
        assert_eq!(json, "\"UPDATE\"");
    }

    #[test]
    fn delete_reconciles_to_zero() {
        let row = Balance::new(UserId::random(), 400);
        let event = ChangeEvent::deleted(row.clone());
        assert_eq!(event.effective_points(), 0);
        assert_eq!(event.user_id(), Some(row.user_id));
    }

    #[test]
    fn update_reconciles_to_new_points() {
        let old = Balance::new(UserId::random(), 100);
        let new = Balance {
            points: 500,
            ..old.clone()
        };
        let event = ChangeEvent::updated(old, new);
        assert_eq!(event.effective_points(), 500);
    }
}
