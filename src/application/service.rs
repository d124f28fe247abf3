use chrono::Utc;

use crate::domain::{Cents, Loan, LoanIndex, Sats, User, fiat_to_sats};
use crate::storage::Repository;

use super::AppError;

/// Application service providing the lending and wallet operations.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct LendingService {
    repo: Repository,
}

/// A user's balances after a wallet operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balances {
    pub name: String,
    pub fiat_cents: Cents,
    pub crypto_sats: Sats,
}

impl LendingService {
    /// Create a new lending service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // User operations
    // ========================

    /// Register a new user. The score is computed here, once; it never
    /// changes afterwards. Duplicate names are not rejected: the second
    /// registration appends a row that name lookups never reach.
    pub async fn register_user(
        &self,
        name: String,
        income_cents: Cents,
        debt_count: u32,
    ) -> Result<User, AppError> {
        if income_cents < 0 {
            return Err(AppError::InvalidAmount(
                "Income must be non-negative".to_string(),
            ));
        }

        let mut user = User::new(name, income_cents, debt_count);
        self.repo.save_user(&mut user).await?;
        Ok(user)
    }

    /// Get a user by name: first match in registration order.
    pub async fn get_user(&self, name: &str) -> Result<User, AppError> {
        self.repo
            .get_user_by_name(name)
            .await?
            .ok_or_else(|| AppError::UserNotFound(name.to_string()))
    }

    /// List all users in registration order.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.repo.list_users().await?)
    }

    // ========================
    // Loan operations
    // ========================

    /// Request a loan. The rate is quoted from the borrower's current
    /// score and fixed for the loan's lifetime. The principal is taken as
    /// supplied: positivity is the caller's contract, not checked here.
    pub async fn request_loan(
        &self,
        borrower: &str,
        principal_cents: Cents,
    ) -> Result<Loan, AppError> {
        let user = self.get_user(borrower).await?;

        let mut loan = Loan::new(user.name, principal_cents, user.score);
        self.repo.save_loan(&mut loan).await?;
        Ok(loan)
    }

    /// Get a loan by its index.
    pub async fn get_loan(&self, index: LoanIndex) -> Result<Loan, AppError> {
        self.repo
            .get_loan(index)
            .await?
            .ok_or(AppError::LoanIndexOutOfRange(index))
    }

    /// List all loans in index order.
    pub async fn list_loans(&self) -> Result<Vec<Loan>, AppError> {
        Ok(self.repo.list_loans().await?)
    }

    /// Fund a loan. Valid only while the loan awaits an investor.
    /// No check that the investor differs from the borrower.
    pub async fn approve_loan(
        &self,
        index: LoanIndex,
        investor: &str,
    ) -> Result<Loan, AppError> {
        let mut loan = self.get_loan(index).await?;
        let from = loan.status;

        loan.approve(investor, Utc::now())
            .map_err(|e| AppError::InvalidLoanState {
                index,
                expected: e.expected,
                actual: e.actual,
            })?;

        if !self.repo.update_loan_status(&loan, from).await? {
            // Lost the guarded write: re-read for the actual status.
            let current = self.get_loan(index).await?;
            return Err(AppError::InvalidLoanState {
                index,
                expected: from,
                actual: current.status,
            });
        }

        Ok(loan)
    }

    /// Settle a loan in equal installments. Valid only once approved.
    pub async fn pay_loan(&self, index: LoanIndex, installments: u32) -> Result<Loan, AppError> {
        if installments == 0 {
            return Err(AppError::InvalidInstallments);
        }

        let mut loan = self.get_loan(index).await?;
        let from = loan.status;

        loan.pay(installments, Utc::now())
            .map_err(|e| AppError::InvalidLoanState {
                index,
                expected: e.expected,
                actual: e.actual,
            })?;

        if !self.repo.update_loan_status(&loan, from).await? {
            let current = self.get_loan(index).await?;
            return Err(AppError::InvalidLoanState {
                index,
                expected: from,
                actual: current.status,
            });
        }

        Ok(loan)
    }

    // ========================
    // Wallet operations
    // ========================

    /// Deposit fiat into a user's balance.
    pub async fn deposit(&self, name: &str, amount_cents: Cents) -> Result<Balances, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(
                "Deposit amount must be positive".to_string(),
            ));
        }

        let user = self.get_user(name).await?;
        self.repo.credit_fiat(user.sequence, amount_cents).await?;

        self.balances_for(user.sequence).await
    }

    /// Convert fiat into crypto at the fixed quote. Debits the fiat
    /// balance by the full amount and credits the crypto balance with the
    /// converted value, exactly.
    pub async fn convert(&self, name: &str, amount_cents: Cents) -> Result<Balances, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(
                "Conversion amount must be positive".to_string(),
            ));
        }

        let user = self.get_user(name).await?;
        if user.fiat_cents < amount_cents {
            return Err(AppError::InsufficientFunds {
                name: user.name,
                balance: user.fiat_cents,
                required: amount_cents,
            });
        }

        let amount_sats = fiat_to_sats(amount_cents);
        let applied = self
            .repo
            .convert_funds(user.sequence, amount_cents, amount_sats)
            .await?;

        if !applied {
            // The guarded debit found less balance than we just read.
            let current = self
                .repo
                .get_user_by_sequence(user.sequence)
                .await?
                .ok_or_else(|| AppError::UserNotFound(name.to_string()))?;
            return Err(AppError::InsufficientFunds {
                name: current.name,
                balance: current.fiat_cents,
                required: amount_cents,
            });
        }

        self.balances_for(user.sequence).await
    }

    /// Get a user's current balances.
    pub async fn balances(&self, name: &str) -> Result<Balances, AppError> {
        let user = self.get_user(name).await?;
        Ok(Balances {
            name: user.name,
            fiat_cents: user.fiat_cents,
            crypto_sats: user.crypto_sats,
        })
    }

    async fn balances_for(&self, sequence: i64) -> Result<Balances, AppError> {
        let user = self
            .repo
            .get_user_by_sequence(sequence)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User row vanished at sequence {}", sequence))?;

        Ok(Balances {
            name: user.name,
            fiat_cents: user.fiat_cents,
            crypto_sats: user.crypto_sats,
        })
    }
}
