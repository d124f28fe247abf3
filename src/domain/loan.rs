use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BasisPoints, Cents, round_div};

/// Loans are addressed by their 0-based position in the append-only loan
/// book. Indices are never reused or compacted.
pub type LoanIndex = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Requested and priced, waiting for an investor to fund it
    AwaitingInvestor,
    /// Funded by an investor
    Approved,
    /// Settled in installments
    Paid,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::AwaitingInvestor => "awaiting_investor",
            LoanStatus::Approved => "approved",
            LoanStatus::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "awaiting_investor" => Some(LoanStatus::AwaitingInvestor),
            "approved" => Some(LoanStatus::Approved),
            "paid" => Some(LoanStatus::Paid),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Interest tier for a credit score, in basis points.
/// The quoted rate is fixed at request time and never re-priced.
pub fn rate_for_score(score: i64) -> BasisPoints {
    if score >= 700 {
        200
    } else if score >= 500 {
        500
    } else {
        1000
    }
}

/// Repayment amounts for a loan settled in equal installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub installment_cents: Cents,
    pub total_cents: Cents,
}

/// Compute the per-installment and total repayment for a principal at the
/// given rate: per = principal * (1 + rate) / n, total = per * n, each
/// rounded to whole cents. The intermediate value (principal times
/// 10_000 + rate basis points) is kept in i128 so large principals
/// cannot overflow.
pub fn settlement(principal_cents: Cents, rate_bps: BasisPoints, installments: u32) -> Settlement {
    assert!(installments > 0, "Installment count must be positive");
    let scaled = i128::from(principal_cents) * i128::from(10_000 + rate_bps);
    Settlement {
        installment_cents: round_div(scaled, 10_000 * i128::from(installments)),
        total_cents: round_div(scaled, 10_000),
    }
}

/// A transition was attempted from the wrong status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub expected: LoanStatus,
    pub actual: LoanStatus,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "loan is {}, transition requires {}",
            self.actual, self.expected
        )
    }
}

impl std::error::Error for TransitionError {}

/// A loan record. The lifecycle is forward-only:
/// AwaitingInvestor -> Approved -> Paid, with no reversals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    /// Position in the loan book, set by the repository. This is the
    /// loan's external handle.
    pub index: LoanIndex,
    /// Borrower name. Weak reference: resolved against the user ledger at
    /// request time only.
    pub borrower: String,
    pub principal_cents: Cents,
    /// Borrower's score as snapshotted at request time, never re-read.
    pub score: i64,
    /// Rate quoted from the score snapshot, fixed for the loan's lifetime.
    pub rate_bps: BasisPoints,
    pub status: LoanStatus,
    pub investor: Option<String>,
    pub installments: Option<u32>,
    pub installment_cents: Option<Cents>,
    pub total_paid_cents: Option<Cents>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// Create a new loan priced from the borrower's score snapshot.
    /// Index must be assigned by the repository.
    pub fn new(borrower: impl Into<String>, principal_cents: Cents, score: i64) -> Self {
        Self {
            index: 0, // Will be set by repository
            borrower: borrower.into(),
            principal_cents,
            score,
            rate_bps: rate_for_score(score),
            status: LoanStatus::AwaitingInvestor,
            investor: None,
            installments: None,
            installment_cents: None,
            total_paid_cents: None,
            requested_at: Utc::now(),
            approved_at: None,
            paid_at: None,
        }
    }

    /// Fund the loan. Only valid while awaiting an investor.
    pub fn approve(
        &mut self,
        investor: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.status != LoanStatus::AwaitingInvestor {
            return Err(TransitionError {
                expected: LoanStatus::AwaitingInvestor,
                actual: self.status,
            });
        }
        self.status = LoanStatus::Approved;
        self.investor = Some(investor.into());
        self.approved_at = Some(now);
        Ok(())
    }

    /// Settle the loan in the given number of installments. Only valid
    /// once approved. The caller must reject `installments = 0` before
    /// calling; the settlement arithmetic asserts it.
    pub fn pay(&mut self, installments: u32, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != LoanStatus::Approved {
            return Err(TransitionError {
                expected: LoanStatus::Approved,
                actual: self.status,
            });
        }
        let amounts = settlement(self.principal_cents, self.rate_bps, installments);
        self.status = LoanStatus::Paid;
        self.installments = Some(installments);
        self.installment_cents = Some(amounts.installment_cents);
        self.total_paid_cents = Some(amounts.total_cents);
        self.paid_at = Some(now);
        Ok(())
    }
}
