//! Shared types for the stakebook points economy.
//!
//! Everything that crosses a crate boundary lives here: the persisted row
//! shapes (`Balance`, `ClaimRecord`, `DiaryEntry`), the static catalogs
//! (`SpinDistribution`, the reward `CATALOG`), the change-feed wire types,
//! and the store error taxonomy.

pub mod api;
pub mod balance;
pub mod constants;
pub mod diary;
pub mod error;
pub mod reward;
pub mod spin;

pub use api::{ChangeEvent, ChangeKind};
pub use balance::{now_ms, Balance, UserId};
pub use diary::{DiaryEntry, EntryKind};
pub use error::StoreError;
pub use reward::{ClaimRecord, RewardDefinition, CATALOG};
pub use spin::{AnimationPlan, DistributionError, ReelStop, SpinDistribution, SpinOutcome};
