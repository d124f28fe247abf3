use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::{Cents, Loan, LoanIndex, LoanStatus, Sats, User};

use super::MIGRATION_001_INITIAL;

/// Repository for persisting and querying users and loans.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Get the next value of a named counter and increment it.
    async fn next_counter(&self, counter: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counters
            SET value = value + 1
            WHERE name = ?
            RETURNING value
            "#,
        )
        .bind(counter)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to advance counter '{counter}'"))?;

        Ok(row.get("value"))
    }

    // ========================
    // User operations
    // ========================

    /// Save a new user. Automatically assigns the next sequence number.
    /// Deliberately no uniqueness check on the name: duplicate
    /// registrations append a second row that name lookups never reach.
    pub async fn save_user(&self, user: &mut User) -> Result<()> {
        let sequence = self.next_counter("user_sequence").await?;
        user.sequence = sequence;

        sqlx::query(
            r#"
            INSERT INTO users (sequence, name, income_cents, debt_count, score, fiat_cents, crypto_sats, registered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.sequence)
        .bind(&user.name)
        .bind(user.income_cents)
        .bind(user.debt_count)
        .bind(user.score)
        .bind(user.fiat_cents)
        .bind(user.crypto_sats)
        .bind(user.registered_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;

        Ok(())
    }

    /// Get a user by name: first match in registration order.
    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT sequence, name, income_cents, debt_count, score, fiat_cents, crypto_sats, registered_at
            FROM users
            WHERE name = ?
            ORDER BY sequence
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by name")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a user by its storage sequence.
    pub async fn get_user_by_sequence(&self, sequence: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT sequence, name, income_cents, debt_count, score, fiat_cents, crypto_sats, registered_at
            FROM users
            WHERE sequence = ?
            "#,
        )
        .bind(sequence)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by sequence")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// List all users in registration order.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT sequence, name, income_cents, debt_count, score, fiat_cents, crypto_sats, registered_at
            FROM users
            ORDER BY sequence
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        rows.iter().map(Self::row_to_user).collect()
    }

    /// Credit a user's fiat balance in a single atomic increment.
    pub async fn credit_fiat(&self, sequence: i64, amount_cents: Cents) -> Result<()> {
        sqlx::query("UPDATE users SET fiat_cents = fiat_cents + ? WHERE sequence = ?")
            .bind(amount_cents)
            .bind(sequence)
            .execute(&self.pool)
            .await
            .context("Failed to credit fiat balance")?;
        Ok(())
    }

    /// Debit fiat and credit crypto in one statement. The balance check is
    /// part of the WHERE clause, so a concurrent debit cannot overdraw.
    /// Returns false when the balance no longer covers the amount.
    pub async fn convert_funds(
        &self,
        sequence: i64,
        amount_cents: Cents,
        amount_sats: Sats,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET fiat_cents = fiat_cents - ?, crypto_sats = crypto_sats + ?
            WHERE sequence = ? AND fiat_cents >= ?
            "#,
        )
        .bind(amount_cents)
        .bind(amount_sats)
        .bind(sequence)
        .bind(amount_cents)
        .execute(&self.pool)
        .await
        .context("Failed to convert funds")?;

        Ok(result.rows_affected() == 1)
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let registered_at_str: String = row.get("registered_at");

        Ok(User {
            sequence: row.get("sequence"),
            name: row.get("name"),
            income_cents: row.get("income_cents"),
            debt_count: row.get("debt_count"),
            score: row.get("score"),
            fiat_cents: row.get("fiat_cents"),
            crypto_sats: row.get("crypto_sats"),
            registered_at: DateTime::parse_from_rfc3339(&registered_at_str)
                .context("Invalid registered_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Loan operations
    // ========================

    /// Save a new loan. Automatically assigns the next loan index.
    pub async fn save_loan(&self, loan: &mut Loan) -> Result<()> {
        let index = self.next_counter("loan_index").await?;
        loan.index = index;

        sqlx::query(
            r#"
            INSERT INTO loans (loan_index, borrower, principal_cents, score, rate_bps, status, investor, installments, installment_cents, total_paid_cents, requested_at, approved_at, paid_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(loan.index)
        .bind(&loan.borrower)
        .bind(loan.principal_cents)
        .bind(loan.score)
        .bind(loan.rate_bps)
        .bind(loan.status.as_str())
        .bind(&loan.investor)
        .bind(loan.installments)
        .bind(loan.installment_cents)
        .bind(loan.total_paid_cents)
        .bind(loan.requested_at.to_rfc3339())
        .bind(loan.approved_at.map(|dt| dt.to_rfc3339()))
        .bind(loan.paid_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save loan")?;

        Ok(())
    }

    /// Get a loan by its index.
    pub async fn get_loan(&self, index: LoanIndex) -> Result<Option<Loan>> {
        let row = sqlx::query(
            r#"
            SELECT loan_index, borrower, principal_cents, score, rate_bps, status, investor, installments, installment_cents, total_paid_cents, requested_at, approved_at, paid_at
            FROM loans
            WHERE loan_index = ?
            "#,
        )
        .bind(index)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch loan")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_loan(&row)?)),
            None => Ok(None),
        }
    }

    /// List all loans in index order.
    pub async fn list_loans(&self) -> Result<Vec<Loan>> {
        let rows = sqlx::query(
            r#"
            SELECT loan_index, borrower, principal_cents, score, rate_bps, status, investor, installments, installment_cents, total_paid_cents, requested_at, approved_at, paid_at
            FROM loans
            ORDER BY loan_index
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list loans")?;

        rows.iter().map(Self::row_to_loan).collect()
    }

    /// Persist a status transition already applied to `loan`. The write
    /// only lands if the stored status still equals `from`, so two
    /// concurrent transitions on one index have at most one winner.
    /// Returns false when another writer got there first.
    pub async fn update_loan_status(&self, loan: &Loan, from: LoanStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET status = ?, investor = ?, installments = ?, installment_cents = ?, total_paid_cents = ?, approved_at = ?, paid_at = ?
            WHERE loan_index = ? AND status = ?
            "#,
        )
        .bind(loan.status.as_str())
        .bind(&loan.investor)
        .bind(loan.installments)
        .bind(loan.installment_cents)
        .bind(loan.total_paid_cents)
        .bind(loan.approved_at.map(|dt| dt.to_rfc3339()))
        .bind(loan.paid_at.map(|dt| dt.to_rfc3339()))
        .bind(loan.index)
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to update loan status")?;

        Ok(result.rows_affected() == 1)
    }

    fn row_to_loan(row: &sqlx::sqlite::SqliteRow) -> Result<Loan> {
        let status_str: String = row.get("status");
        let requested_at_str: String = row.get("requested_at");
        let approved_at_str: Option<String> = row.get("approved_at");
        let paid_at_str: Option<String> = row.get("paid_at");

        Ok(Loan {
            index: row.get("loan_index"),
            borrower: row.get("borrower"),
            principal_cents: row.get("principal_cents"),
            score: row.get("score"),
            rate_bps: row.get("rate_bps"),
            status: LoanStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid loan status: {}", status_str))?,
            investor: row.get("investor"),
            installments: row.get("installments"),
            installment_cents: row.get("installment_cents"),
            total_paid_cents: row.get("total_paid_cents"),
            requested_at: DateTime::parse_from_rfc3339(&requested_at_str)
                .context("Invalid requested_at timestamp")?
                .with_timezone(&Utc),
            approved_at: approved_at_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid approved_at timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
            paid_at: paid_at_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid paid_at timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }
}
