use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, Sats, compute_score};

/// A registered participant holding a derived credit score and a
/// dual-currency balance. Registrations are append-only: duplicate names
/// are not rejected, and name lookups resolve to the earliest entry, so a
/// later registration under the same name is unreachable by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Monotonically increasing registration order, set by the repository.
    /// Not an identifier: the name is the only lookup key.
    pub sequence: i64,
    pub name: String,
    pub income_cents: Cents,
    pub debt_count: u32,
    /// Credit score computed once at registration, immutable thereafter.
    pub score: i64,
    pub fiat_cents: Cents,
    pub crypto_sats: Sats,
    pub registered_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with zeroed balances and a freshly computed score.
    /// Sequence number must be assigned by the repository.
    pub fn new(name: impl Into<String>, income_cents: Cents, debt_count: u32) -> Self {
        assert!(income_cents >= 0, "Income must be non-negative");
        Self {
            sequence: 0, // Will be set by repository
            name: name.into(),
            income_cents,
            debt_count,
            score: compute_score(income_cents, debt_count),
            fiat_cents: 0,
            crypto_sats: 0,
            registered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_starts_with_zero_balances() {
        let user = User::new("Ana", 500_000, 1);
        assert_eq!(user.fiat_cents, 0);
        assert_eq!(user.crypto_sats, 0);
        assert_eq!(user.score, 900);
    }

    #[test]
    fn test_score_snapshot_taken_at_construction() {
        let user = User::new("Bruno", 60_00, 0);
        assert_eq!(user.score, 600);
    }

    #[test]
    #[should_panic(expected = "Income must be non-negative")]
    fn test_user_requires_non_negative_income() {
        User::new("Mallory", -1, 0);
    }
}
