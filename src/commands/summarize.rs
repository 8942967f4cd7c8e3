// ABOUTME: Summarize command implementation - per-table row counts
// ABOUTME: Prints the same summary the migrator uses for validation

use crate::driver::{DriverRegistry, Endpoint, Target};
use crate::dsn::ConnectionDescriptor;
use crate::migration::RowCountSummary;
use anyhow::Result;

/// Print the row count of every table in one database
pub async fn summarize(
    registry: &DriverRegistry,
    descriptor: &ConnectionDescriptor,
) -> Result<RowCountSummary> {
    let driver = registry.resolve(&descriptor.scheme)?;
    let target = Target::new(Endpoint::Source, descriptor.clone());

    driver.ping(&target).await?;
    let summary = driver.summary(&target).await?;

    if summary.is_empty() {
        tracing::warn!("⚠ No tables found in {}", descriptor);
        return Ok(summary);
    }

    println!("{:<40} {:>12}", "Table", "Rows");
    println!("{}", "─".repeat(53));
    for table in summary.tables() {
        println!("{:<40} {:>12}", table, summary.get(table).unwrap_or(0));
    }
    println!("{}", "─".repeat(53));
    println!(
        "{:<40} {:>12}",
        format!("Total ({} tables)", summary.len()),
        summary.total_rows()
    );

    Ok(summary)
}
