//! Economy-wide constants.

/// Cost of one spin, in points.
pub const SPIN_COST: i64 = 50;

/// Independent draw slots per spin.
pub const REEL_COUNT: usize = 3;

/// Points seeded into a fresh balance row at signup.
pub const INITIAL_POINTS: i64 = 50;

/// Fixed bonus awarded for every diary entry insert.
pub const DIARY_ENTRY_BONUS: i64 = 50;

/// Duration of the reel animation the UI replays after settlement.
pub const SPIN_ANIMATION_MS: u64 = 4_000;

/// Cosmetic per-reward cooldown after a successful claim.
pub const CLAIM_COOLDOWN_MS: u64 = 10_000;

/// Deadline for ordinary store calls.
pub const STORE_CALL_TIMEOUT_MS: u64 = 5_000;

/// Deadline for lightweight connectivity probes.
pub const PROBE_TIMEOUT_MS: u64 = 3_000;

/// Grace period shown to the user before a forced reload on network failure.
pub const RELOAD_GRACE_MS: u64 = 1_500;

/// Tolerated drift when checking that outcome probabilities sum to 1.0.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;
