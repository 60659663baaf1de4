//! Spin outcome tables and the presentation plan derived from a draw.
//!
//! A distribution is validated once at construction; the selector and the
//! orchestrator can then assume probabilities are sane instead of re-checking
//! at every draw.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{PROBABILITY_SUM_TOLERANCE, SPIN_ANIMATION_MS};

/// One weighted possibility in a spin's probability table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub label: String,
    /// Signed point delta applied to the balance when drawn.
    pub value: i64,
    /// Draw probability in (0, 1]; the table sums to 1.0.
    pub probability: f64,
    /// Equal angular slice of the visual wheel this outcome occupies.
    pub segment_index: u8,
}

#[derive(Debug, Error, PartialEq)]
pub enum DistributionError {
    #[error("distribution has no outcomes")]
    Empty,
    #[error("outcome {label:?} has probability {probability} outside (0, 1]")]
    ProbabilityOutOfRange { label: String, probability: f64 },
    #[error("probabilities sum to {sum}, expected 1.0")]
    BadSum { sum: f64 },
    #[error("segment index {segment_index} appears more than once")]
    DuplicateSegment { segment_index: u8 },
}

/// A validated spin probability table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SpinOutcome>", into = "Vec<SpinOutcome>")]
pub struct SpinDistribution {
    outcomes: Vec<SpinOutcome>,
}

impl SpinDistribution {
    /// Validates and wraps an outcome table.
    pub fn new(outcomes: Vec<SpinOutcome>) -> Result<Self, DistributionError> {
        if outcomes.is_empty() {
            return Err(DistributionError::Empty);
        }
        let mut sum = 0.0;
        let mut seen = [false; 256];
        for outcome in &outcomes {
            if outcome.probability <= 0.0 || outcome.probability > 1.0 {
                return Err(DistributionError::ProbabilityOutOfRange {
                    label: outcome.label.clone(),
                    probability: outcome.probability,
                });
            }
            if seen[outcome.segment_index as usize] {
                return Err(DistributionError::DuplicateSegment {
                    segment_index: outcome.segment_index,
                });
            }
            seen[outcome.segment_index as usize] = true;
            sum += outcome.probability;
        }
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(DistributionError::BadSum { sum });
        }
        Ok(Self { outcomes })
    }

    /// The six-segment table used by the rewards wheel.
    pub fn standard() -> Self {
        let outcomes = vec![
            SpinOutcome {
                label: "BIG JACKPOT!".into(),
                value: 500,
                probability: 0.02,
                segment_index: 0,
            },
            SpinOutcome {
                label: "Gold Rush".into(),
                value: 200,
                probability: 0.08,
                segment_index: 1,
            },
            SpinOutcome {
                label: "Nice Hit".into(),
                value: 100,
                probability: 0.15,
                segment_index: 2,
            },
            SpinOutcome {
                label: "Spin Refund".into(),
                value: 50,
                probability: 0.20,
                segment_index: 3,
            },
            SpinOutcome {
                label: "Dust".into(),
                value: 0,
                probability: 0.30,
                segment_index: 4,
            },
            SpinOutcome {
                label: "Gold Leak".into(),
                value: -50,
                probability: 0.25,
                segment_index: 5,
            },
        ];
        Self::new(outcomes).expect("standard table is valid")
    }

    pub fn outcomes(&self) -> &[SpinOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Declared total probability mass (1.0 up to float drift).
    pub fn total_probability(&self) -> f64 {
        self.outcomes.iter().map(|o| o.probability).sum()
    }

    /// Terminal wheel angle, in degrees, for an outcome's segment.
    ///
    /// Segments are equal slices of the circle; the indicator points at the
    /// middle of the slice.
    pub fn segment_angle(&self, outcome: &SpinOutcome) -> f64 {
        let slice = 360.0 / self.outcomes.len() as f64;
        slice * outcome.segment_index as f64 + slice / 2.0
    }
}

impl TryFrom<Vec<SpinOutcome>> for SpinDistribution {
    type Error = DistributionError;

    fn try_from(outcomes: Vec<SpinOutcome>) -> Result<Self, Self::Error> {
        Self::new(outcomes)
    }
}

impl From<SpinDistribution> for Vec<SpinOutcome> {
    fn from(distribution: SpinDistribution) -> Self {
        distribution.outcomes
    }
}

/// Terminal position for one reel's indicator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReelStop {
    pub segment_index: u8,
    pub angle_degrees: f64,
}

/// Pure presentation data replaying an already-settled draw.
///
/// The payout never waits on this; the UI animates for `duration_ms` and
/// parks each reel at its stop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationPlan {
    pub duration_ms: u64,
    pub stops: Vec<ReelStop>,
}

impl AnimationPlan {
    pub fn for_draw(distribution: &SpinDistribution, drawn: &[SpinOutcome]) -> Self {
        let stops = drawn
            .iter()
            .map(|outcome| ReelStop {
                segment_index: outcome.segment_index,
                angle_degrees: distribution.segment_angle(outcome),
            })
            .collect();
        Self {
            duration_ms: SPIN_ANIMATION_MS,
            stops,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(label: &str, probability: f64, segment_index: u8) -> SpinOutcome {
        SpinOutcome {
            label: label.into(),
            value: 0,
            probability,
            segment_index,
        }
    }

    #[test]
    fn standard_table_sums_to_one() {
        let table = SpinDistribution::standard();
        assert!((table.total_probability() - 1.0).abs() < PROBABILITY_SUM_TOLERANCE);
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn empty_table_rejected() {
        assert_eq!(
            SpinDistribution::new(vec![]).unwrap_err(),
            DistributionError::Empty
        );
    }

    #[test]
    fn out_of_range_probability_rejected() {
        let err = SpinDistribution::new(vec![outcome("bad", 0.0, 0)]).unwrap_err();
        assert!(matches!(
            err,
            DistributionError::ProbabilityOutOfRange { .. }
        ));
        let err = SpinDistribution::new(vec![outcome("bad", 1.5, 0)]).unwrap_err();
        assert!(matches!(
            err,
            DistributionError::ProbabilityOutOfRange { .. }
        ));
    }

    #[test]
    fn bad_sum_rejected() {
        let err =
            SpinDistribution::new(vec![outcome("a", 0.5, 0), outcome("b", 0.4, 1)]).unwrap_err();
        assert!(matches!(err, DistributionError::BadSum { .. }));
    }

    #[test]
    fn duplicate_segment_rejected() {
        let err =
            SpinDistribution::new(vec![outcome("a", 0.5, 2), outcome("b", 0.5, 2)]).unwrap_err();
        assert_eq!(err, DistributionError::DuplicateSegment { segment_index: 2 });
    }

    #[test]
    fn segment_angles_cover_equal_slices() {
        let table = SpinDistribution::standard();
        let outcomes = table.outcomes();
        // Six segments, 60 degrees each, indicator at slice midpoints.
        assert_eq!(table.segment_angle(&outcomes[0]), 30.0);
        assert_eq!(table.segment_angle(&outcomes[5]), 330.0);
    }

    #[test]
    fn animation_plan_replays_the_draw() {
        let table = SpinDistribution::standard();
        let drawn = vec![
            table.outcomes()[0].clone(),
            table.outcomes()[3].clone(),
            table.outcomes()[5].clone(),
        ];
        let plan = AnimationPlan::for_draw(&table, &drawn);
        assert_eq!(plan.duration_ms, SPIN_ANIMATION_MS);
        assert_eq!(plan.stops.len(), 3);
        assert_eq!(plan.stops[0].segment_index, 0);
        assert_eq!(plan.stops[2].angle_degrees, 330.0);
    }

    #[test]
    fn invalid_table_rejected_when_deserialized() {
        let json = r#"[{"label":"a","value":0,"probability":0.5,"segment_index":0}]"#;
        assert!(serde_json::from_str::<SpinDistribution>(json).is_err());
    }
}
