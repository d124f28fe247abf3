// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use prestito::application::LendingService;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LendingService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LendingService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Test fixture: one user per rate tier
pub struct SampleUsers;

impl SampleUsers {
    /// Ana lands in the prime tier (score 900), Bruno in the middle tier
    /// (score 600), Carla below it (score 450).
    pub async fn register_all(service: &LendingService) -> Result<()> {
        service.register_user("Ana".into(), 500_000, 1).await?;
        service.register_user("Bruno".into(), 60_00, 0).await?;
        service.register_user("Carla".into(), 45_00, 0).await?;
        Ok(())
    }

    /// Register Ana and fund her wallet in one step.
    pub async fn funded_ana(service: &LendingService, amount_cents: i64) -> Result<()> {
        service.register_user("Ana".into(), 500_000, 1).await?;
        service.deposit("Ana", amount_cents).await?;
        Ok(())
    }
}
