//! Weighted outcome selection.
//!
//! One call per reel; reels are statistically independent and share no draw.

use rand::Rng;

use stakebook_types::{SpinDistribution, SpinOutcome};

/// Draws one outcome from the table.
///
/// Walks the list subtracting each declared probability from a uniform draw
/// over the total mass. Tolerates float drift in the declared sum; if the
/// walk exhausts the list the last outcome is returned deterministically.
pub fn select_outcome<'a, R: Rng + ?Sized>(
    rng: &mut R,
    distribution: &'a SpinDistribution,
) -> &'a SpinOutcome {
    let outcomes = distribution.outcomes();
    let total = distribution.total_probability();
    let mut r = rng.gen::<f64>() * total;
    for outcome in outcomes {
        if r < outcome.probability {
            return outcome;
        }
        r -= outcome.probability;
    }
    // Float edge case: fall through to the final segment.
    outcomes
        .last()
        .expect("validated distribution is non-empty")
}
