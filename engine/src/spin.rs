//! Spin orchestrator.
//!
//! One paid invocation of the multi-reel draw mechanic, driven as an
//! explicit state machine by a single task:
//!
//! Idle → Debiting → Drawing → Crediting → Settled | Rejected | Failed
//!
//! Settlement is eager: the credit is persisted immediately after the draw.
//! The reel animation is returned as data ([`AnimationPlan`]) for the UI to
//! replay; the payout never waits on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use stakebook_types::constants::{INITIAL_POINTS, REEL_COUNT, SPIN_COST};
use stakebook_types::{AnimationPlan, SpinDistribution, SpinOutcome, StoreError, UserId};

use crate::selector::select_outcome;
use crate::store::PointsStore;

/// Observable lifecycle of a spin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpinPhase {
    Idle,
    Debiting,
    Drawing,
    Crediting,
    Settled,
    Rejected,
    Failed,
}

/// Everything a settled spin produced.
#[derive(Clone, Debug, PartialEq)]
pub struct SpinReport {
    pub outcomes: Vec<SpinOutcome>,
    /// Sum of the drawn values; the payout, independent of label matching.
    pub total_delta: i64,
    /// Balance after debit and credit both persisted.
    pub balance: i64,
    pub message: String,
    pub animation: AnimationPlan,
}

#[derive(Debug, Error, PartialEq)]
pub enum SpinError {
    /// A spin is already in flight on this engine; the request is a no-op.
    #[error("a spin is already in flight")]
    AlreadySpinning,
    #[error("insufficient points: have {have}, need {need}")]
    InsufficientPoints { have: i64, need: i64 },
    /// The debit (or the pre-spin read) failed; no balance change occurred.
    #[error("spin aborted before any balance change: {0}")]
    Store(#[from] StoreError),
    /// The debit persisted but the credit did not. The user-visible balance
    /// may be stale; nothing is rolled back or retried.
    #[error("points were deducted but the payout was not credited: {source}")]
    PartialSettlement { debited: i64, source: StoreError },
}

/// Orchestrates spins for one user session against a [`PointsStore`].
pub struct SpinEngine<S> {
    store: Arc<S>,
    cost: i64,
    reels: usize,
    in_flight: AtomicBool,
    phase: watch::Sender<SpinPhase>,
}

impl<S: PointsStore> SpinEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_rules(store, SPIN_COST, REEL_COUNT)
    }

    pub fn with_rules(store: Arc<S>, cost: i64, reels: usize) -> Self {
        let (phase, _) = watch::channel(SpinPhase::Idle);
        Self {
            store,
            cost,
            reels,
            in_flight: AtomicBool::new(false),
            phase,
        }
    }

    /// Watch the spin lifecycle (for UI state, tests, logging).
    pub fn phase(&self) -> watch::Receiver<SpinPhase> {
        self.phase.subscribe()
    }

    pub fn cost(&self) -> i64 {
        self.cost
    }

    /// Runs one spin to settlement.
    pub async fn spin(
        &self,
        user: UserId,
        distribution: &SpinDistribution,
    ) -> Result<SpinReport, SpinError> {
        let mut rng = StdRng::from_entropy();
        self.spin_with_rng(user, distribution, &mut rng).await
    }

    /// [`Self::spin`] with a caller-supplied generator, for deterministic
    /// draws in tests and bots.
    pub async fn spin_with_rng<R: Rng + Send>(
        &self,
        user: UserId,
        distribution: &SpinDistribution,
        rng: &mut R,
    ) -> Result<SpinReport, SpinError> {
        // Double-submission guard; released on every exit path.
        let _guard = InFlight::acquire(&self.in_flight).ok_or(SpinError::AlreadySpinning)?;

        // Affordability gate. A missing row means the signup trigger has not
        // run yet; seed it explicitly instead of upserting on the debit path.
        let balance = match self.store.get_balance(user).await {
            Ok(points) => points,
            Err(StoreError::NotFound) => {
                match self.store.ensure_balance(user, INITIAL_POINTS).await {
                    Ok(points) => points,
                    Err(err) => {
                        self.phase.send_replace(SpinPhase::Failed);
                        return Err(err.into());
                    }
                }
            }
            Err(err) => {
                self.phase.send_replace(SpinPhase::Failed);
                return Err(err.into());
            }
        };
        if balance < self.cost {
            debug!(%user, balance, cost = self.cost, "spin rejected: insufficient points");
            self.phase.send_replace(SpinPhase::Rejected);
            return Err(SpinError::InsufficientPoints {
                have: balance,
                need: self.cost,
            });
        }

        // Debit strictly before any draw. If the write fails nothing has
        // been applied and the spin aborts.
        self.phase.send_replace(SpinPhase::Debiting);
        let after_debit = match self.store.adjust_balance(user, -self.cost).await {
            Ok(points) => points,
            Err(err) => {
                warn!(%user, error = %err, "spin debit failed");
                self.phase.send_replace(SpinPhase::Failed);
                return Err(err.into());
            }
        };

        self.phase.send_replace(SpinPhase::Drawing);
        let outcomes: Vec<SpinOutcome> = (0..self.reels)
            .map(|_| select_outcome(rng, distribution).clone())
            .collect();
        let total_delta: i64 = outcomes.iter().map(|o| o.value).sum();

        // Eager settlement: persist the payout now; the animation replays it.
        self.phase.send_replace(SpinPhase::Crediting);
        let balance = match self.store.adjust_balance(user, total_delta).await {
            Ok(points) => points,
            Err(err) => {
                warn!(
                    %user,
                    debited = self.cost,
                    total_delta,
                    error = %err,
                    "spin credit failed after debit; balance left stale"
                );
                self.phase.send_replace(SpinPhase::Failed);
                return Err(SpinError::PartialSettlement {
                    debited: self.cost,
                    source: err,
                });
            }
        };

        let message = result_message(&outcomes, distribution, total_delta);
        let animation = AnimationPlan::for_draw(distribution, &outcomes);
        info!(%user, total_delta, balance, after_debit, "spin settled");
        self.phase.send_replace(SpinPhase::Settled);

        Ok(SpinReport {
            outcomes,
            total_delta,
            balance,
            message,
            animation,
        })
    }
}

/// Derives the user-facing result line. Cosmetic only: the payout is always
/// the sum of the drawn values, matching labels or not.
fn result_message(
    outcomes: &[SpinOutcome],
    distribution: &SpinDistribution,
    total_delta: i64,
) -> String {
    let all_match = outcomes
        .windows(2)
        .all(|pair| pair[0].label == pair[1].label);
    if all_match && !outcomes.is_empty() {
        let label = &outcomes[0].label;
        let top = distribution
            .outcomes()
            .iter()
            .max_by_key(|o| o.value)
            .map(|o| &o.label);
        if top == Some(label) {
            return format!("UNBELIEVABLE! Triple {label}! {total_delta:+} points");
        }
        return format!("Triple {label}! {total_delta:+} points");
    }
    format!("Spin result: {total_delta:+} points")
}

/// RAII flag for single-flight spins.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
