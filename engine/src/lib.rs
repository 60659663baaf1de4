//! Stakebook points economy.
//!
//! This crate contains the state machines behind the rewards page: the
//! weighted outcome selector, the spin orchestrator, the claim flow, the
//! diary-entry bonus trigger, and the realtime balance listener. All of them
//! mutate the shared balance through one seam, [`PointsStore`].
//!
//! ## Consistency contract
//! - Within a spin, debit strictly precedes the draw, which strictly
//!   precedes the credit. Ordering is enforced by sequential awaits inside
//!   one driving task, not by a store transaction.
//! - There is no atomicity across debit and credit. A credit that fails
//!   after a successful debit is surfaced as a partial settlement and never
//!   rolled back or retried.
//! - Single-flight guards stop double submission inside one process. There
//!   is no cross-process locking; concurrent writers race last-writer-wins
//!   on `set_balance`, which is why every mutator here goes through the
//!   atomic `adjust_balance` instead.

pub mod claim;
pub mod diary;
pub mod selector;
pub mod spin;
pub mod store;
pub mod sync;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use claim::{ClaimDesk, ClaimError, ClaimReceipt};
pub use diary::record_entry;
pub use selector::select_outcome;
pub use spin::{SpinEngine, SpinError, SpinPhase, SpinReport};
pub use store::{BalanceFeed, PointsStore};
pub use sync::BalanceListener;
