mod common;

use anyhow::Result;
use common::{SampleUsers, test_service};
use prestito::application::AppError;
use prestito::domain::LoanStatus;

#[tokio::test]
async fn test_rate_is_quoted_from_the_borrowers_tier() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;

    let prime = service.request_loan("Ana", 200_000).await?;
    assert_eq!(prime.score, 900);
    assert_eq!(prime.rate_bps, 200);

    let mid = service.request_loan("Bruno", 200_000).await?;
    assert_eq!(mid.score, 600);
    assert_eq!(mid.rate_bps, 500);

    let sub = service.request_loan("Carla", 200_000).await?;
    assert_eq!(sub.score, 450);
    assert_eq!(sub.rate_bps, 1000);

    Ok(())
}

#[tokio::test]
async fn test_loan_indices_are_assigned_in_request_order() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;

    let first = service.request_loan("Ana", 100_000).await?;
    let second = service.request_loan("Bruno", 50_000).await?;
    let third = service.request_loan("Ana", 25_000).await?;

    assert_eq!(first.index, 0);
    assert_eq!(second.index, 1);
    assert_eq!(third.index, 2);

    let loans = service.list_loans().await?;
    let indices: Vec<i64> = loans.iter().map(|l| l.index).collect();
    assert_eq!(indices, [0, 1, 2]);

    Ok(())
}

#[tokio::test]
async fn test_request_for_unknown_borrower_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.request_loan("Nobody", 100_000).await.unwrap_err();
    assert!(matches!(err, AppError::UserNotFound(_)));
    assert!(service.list_loans().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_new_loan_awaits_investor() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;

    let loan = service.request_loan("Ana", 200_000).await?;
    assert_eq!(loan.status, LoanStatus::AwaitingInvestor);
    assert!(loan.investor.is_none());
    assert!(loan.approved_at.is_none());

    Ok(())
}

#[tokio::test]
async fn test_approve_records_the_investor() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;
    service.request_loan("Ana", 200_000).await?;

    let loan = service.approve_loan(0, "Banco").await?;
    assert_eq!(loan.status, LoanStatus::Approved);
    assert_eq!(loan.investor.as_deref(), Some("Banco"));
    assert!(loan.approved_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_approve_twice_fails_and_leaves_the_record_unchanged() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;
    service.request_loan("Ana", 200_000).await?;
    service.approve_loan(0, "Banco").await?;

    let err = service.approve_loan(0, "Fundo").await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidLoanState {
            index: 0,
            actual: LoanStatus::Approved,
            ..
        }
    ));

    let loan = service.get_loan(0).await?;
    assert_eq!(loan.investor.as_deref(), Some("Banco"));
    assert_eq!(loan.status, LoanStatus::Approved);

    Ok(())
}

#[tokio::test]
async fn test_approve_out_of_range_index_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;
    service.request_loan("Ana", 200_000).await?;

    let err = service.approve_loan(5, "Banco").await.unwrap_err();
    assert!(matches!(err, AppError::LoanIndexOutOfRange(5)));

    let err = service.approve_loan(-1, "Banco").await.unwrap_err();
    assert!(matches!(err, AppError::LoanIndexOutOfRange(-1)));

    Ok(())
}

#[tokio::test]
async fn test_pay_computes_installments_and_total() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;

    // 1000.00 at the prime rate over 2 installments
    service.request_loan("Ana", 100_000).await?;
    service.approve_loan(0, "Banco").await?;

    let loan = service.pay_loan(0, 2).await?;
    assert_eq!(loan.status, LoanStatus::Paid);
    assert_eq!(loan.installments, Some(2));
    assert_eq!(loan.installment_cents, Some(51_000));
    assert_eq!(loan.total_paid_cents, Some(102_000));
    assert!(loan.paid_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_pay_requires_an_approved_loan() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;
    service.request_loan("Ana", 100_000).await?;

    let err = service.pay_loan(0, 2).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidLoanState {
            expected: LoanStatus::Approved,
            actual: LoanStatus::AwaitingInvestor,
            ..
        }
    ));

    Ok(())
}

#[tokio::test]
async fn test_pay_twice_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;
    service.request_loan("Ana", 100_000).await?;
    service.approve_loan(0, "Banco").await?;
    service.pay_loan(0, 2).await?;

    let err = service.pay_loan(0, 4).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidLoanState {
            actual: LoanStatus::Paid,
            ..
        }
    ));

    // The settled amounts were not recomputed by the failed attempt
    let loan = service.get_loan(0).await?;
    assert_eq!(loan.installments, Some(2));

    Ok(())
}

#[tokio::test]
async fn test_zero_installments_is_rejected_before_any_arithmetic() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;
    service.request_loan("Ana", 100_000).await?;
    service.approve_loan(0, "Banco").await?;

    let err = service.pay_loan(0, 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInstallments));

    let loan = service.get_loan(0).await?;
    assert_eq!(loan.status, LoanStatus::Approved);

    Ok(())
}

#[tokio::test]
async fn test_rate_stays_on_the_score_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleUsers::register_all(&service).await?;

    // A second "Bruno" with prime income does not affect loans quoted for
    // the first Bruno: lookups keep resolving to the first match.
    service.request_loan("Bruno", 100_000).await?;
    service.register_user("Bruno".into(), 500_000, 0).await?;
    let loan = service.request_loan("Bruno", 100_000).await?;

    assert_eq!(loan.score, 600);
    assert_eq!(loan.rate_bps, 500);

    Ok(())
}
