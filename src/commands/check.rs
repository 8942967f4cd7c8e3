// ABOUTME: Pre-flight check command for migration readiness
// ABOUTME: Verifies engine compatibility, connectivity and client tooling

use crate::config::MigrationRequest;
use crate::driver::DriverRegistry;
use crate::migrator::Migrator;
use anyhow::Result;

/// Run the checks a migration performs before touching any data
pub async fn check(registry: &DriverRegistry, request: &MigrationRequest) -> Result<()> {
    tracing::info!("Starting pre-flight checks...");

    let driver = Migrator::new(registry).preflight(request).await?;

    tracing::info!(
        "✅ Ready to migrate with the {} driver - source and destination are reachable",
        driver.name()
    );
    Ok(())
}
