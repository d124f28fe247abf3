use super::Cents;

/// Lower bound of the credit score range.
pub const MIN_SCORE: i64 = 300;

/// Upper bound of the credit score range.
pub const MAX_SCORE: i64 = 900;

/// Derive a credit score from monthly income and outstanding debt count.
///
/// The raw value is (income / (debt_count + 1)) * 10, truncated toward
/// zero, then clamped to [300, 900]. With income in cents this reduces to
/// a single integer division: income_cents / (10 * (debt_count + 1)).
pub fn compute_score(income_cents: Cents, debt_count: u32) -> i64 {
    let raw = income_cents / (10 * (i64::from(debt_count) + 1));
    raw.clamp(MIN_SCORE, MAX_SCORE)
}
