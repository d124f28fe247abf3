use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crate::application::{Balances, LendingService};
use crate::domain::{LoanIndex, format_cents, format_rate, format_sats, parse_cents};

/// Prestito - Peer-to-peer micro-lending playground
#[derive(Parser)]
#[command(name = "prestito")]
#[command(about = "A minimal peer-to-peer micro-lending and wallet service")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "prestito.db")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// User registration and listing
    #[command(subcommand)]
    User(UserCommands),

    /// Loan lifecycle commands
    #[command(subcommand)]
    Loan(LoanCommands),

    /// Wallet funding and conversion commands
    #[command(subcommand)]
    Wallet(WalletCommands),
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user and compute their credit score
    Register {
        /// User name (also the lookup key for all later operations)
        name: String,

        /// Monthly income (e.g., "5000.00" or "5000")
        #[arg(short, long)]
        income: String,

        /// Number of outstanding debts
        #[arg(short, long, default_value = "0")]
        debts: u32,
    },

    /// List all registered users
    List {
        /// Output as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum LoanCommands {
    /// Request a loan priced by the borrower's score
    Request {
        /// Borrower name
        borrower: String,

        /// Principal amount (e.g., "2000.00" or "2000")
        amount: String,
    },

    /// List all loans with their indices
    List {
        /// Output as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Fund a loan that is awaiting an investor
    Approve {
        /// Loan index as shown by `loan list`
        index: LoanIndex,

        /// Investor name
        #[arg(short, long)]
        investor: String,
    },

    /// Settle an approved loan in equal installments
    Pay {
        /// Loan index as shown by `loan list`
        index: LoanIndex,

        /// Number of installments
        #[arg(short = 'n', long)]
        installments: u32,
    },
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Deposit fiat into a user's wallet
    Deposit {
        /// User name
        name: String,

        /// Amount to deposit (e.g., "100.00")
        amount: String,
    },

    /// Convert fiat to crypto at the fixed quote
    Convert {
        /// User name
        name: String,

        /// Fiat amount to convert (e.g., "100.00")
        amount: String,
    },

    /// Show a user's balances
    Show {
        /// User name
        name: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LendingService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::User(user_cmd) => {
                let service = LendingService::connect(&self.database).await?;
                run_user_command(&service, user_cmd).await?;
            }

            Commands::Loan(loan_cmd) => {
                let service = LendingService::connect(&self.database).await?;
                run_loan_command(&service, loan_cmd).await?;
            }

            Commands::Wallet(wallet_cmd) => {
                let service = LendingService::connect(&self.database).await?;
                run_wallet_command(&service, wallet_cmd).await?;
            }
        }

        Ok(())
    }
}

async fn run_user_command(service: &LendingService, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Register {
            name,
            income,
            debts,
        } => {
            let income_cents =
                parse_cents(&income).context("Invalid income format. Use '5000.00' or '5000'")?;

            let user = service.register_user(name, income_cents, debts).await?;
            println!("Registered user: {} (score {})", user.name, user.score);
        }

        UserCommands::List { json } => {
            let users = service.list_users().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else if users.is_empty() {
                println!("No users registered.");
            } else {
                println!(
                    "{:<20} {:>6} {:>12} {:>6} {:>12} {:>14}",
                    "NAME", "SCORE", "INCOME", "DEBTS", "FIAT", "CRYPTO"
                );
                println!("{}", "-".repeat(74));
                for user in users {
                    println!(
                        "{:<20} {:>6} {:>12} {:>6} {:>12} {:>14}",
                        user.name,
                        user.score,
                        format_cents(user.income_cents),
                        user.debt_count,
                        format_cents(user.fiat_cents),
                        format_sats(user.crypto_sats)
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_loan_command(service: &LendingService, cmd: LoanCommands) -> Result<()> {
    match cmd {
        LoanCommands::Request { borrower, amount } => {
            let principal_cents =
                parse_cents(&amount).context("Invalid amount format. Use '2000.00' or '2000'")?;

            // The loan book takes the principal as supplied; positivity is
            // this caller's contract.
            if principal_cents <= 0 {
                bail!("Loan amount must be positive");
            }

            let loan = service.request_loan(&borrower, principal_cents).await?;
            println!(
                "Loan {} requested by {}: {} at {} ({})",
                loan.index,
                loan.borrower,
                format_cents(loan.principal_cents),
                format_rate(loan.rate_bps),
                loan.status
            );
        }

        LoanCommands::List { json } => {
            let loans = service.list_loans().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&loans)?);
            } else if loans.is_empty() {
                println!("No loans requested.");
            } else {
                println!(
                    "{:>5} {:<20} {:>12} {:>8} {:<18} {:<20}",
                    "INDEX", "BORROWER", "PRINCIPAL", "RATE", "STATUS", "INVESTOR"
                );
                println!("{}", "-".repeat(88));
                for loan in loans {
                    println!(
                        "{:>5} {:<20} {:>12} {:>8} {:<18} {:<20}",
                        loan.index,
                        loan.borrower,
                        format_cents(loan.principal_cents),
                        format_rate(loan.rate_bps),
                        loan.status.as_str(),
                        loan.investor.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        LoanCommands::Approve { index, investor } => {
            let loan = service.approve_loan(index, &investor).await?;
            println!(
                "Loan {} approved by {}",
                loan.index,
                loan.investor.as_deref().unwrap_or(&investor)
            );
        }

        LoanCommands::Pay {
            index,
            installments,
        } => {
            let loan = service.pay_loan(index, installments).await?;
            println!(
                "Loan {} settled in {} installments of {} (total {})",
                loan.index,
                installments,
                format_cents(loan.installment_cents.unwrap_or_default()),
                format_cents(loan.total_paid_cents.unwrap_or_default())
            );
        }
    }
    Ok(())
}

async fn run_wallet_command(service: &LendingService, cmd: WalletCommands) -> Result<()> {
    match cmd {
        WalletCommands::Deposit { name, amount } => {
            let amount_cents =
                parse_cents(&amount).context("Invalid amount format. Use '100.00' or '100'")?;

            let balances = service.deposit(&name, amount_cents).await?;
            println!("Deposited {} for {}", format_cents(amount_cents), name);
            print_balances(&balances);
        }

        WalletCommands::Convert { name, amount } => {
            let amount_cents =
                parse_cents(&amount).context("Invalid amount format. Use '100.00' or '100'")?;

            let balances = service.convert(&name, amount_cents).await?;
            println!(
                "Converted {} fiat for {}",
                format_cents(amount_cents),
                name
            );
            print_balances(&balances);
        }

        WalletCommands::Show { name } => {
            let balances = service.balances(&name).await?;
            print_balances(&balances);
        }
    }
    Ok(())
}

fn print_balances(balances: &Balances) {
    println!("Balances for {}:", balances.name);
    println!("  Fiat:   {}", format_cents(balances.fiat_cents));
    println!("  Crypto: {}", format_sats(balances.crypto_sats));
}
