use thiserror::Error;

use crate::domain::{Cents, LoanIndex, LoanStatus};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No loan at index {0}")]
    LoanIndexOutOfRange(LoanIndex),

    #[error("Loan {index} is {actual}, expected {expected}")]
    InvalidLoanState {
        index: LoanIndex,
        expected: LoanStatus,
        actual: LoanStatus,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Installment count must be at least 1")]
    InvalidInstallments,

    #[error("Insufficient funds for {name}: balance {balance}, required {required}")]
    InsufficientFunds {
        name: String,
        balance: Cents,
        required: Cents,
    },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
