// ABOUTME: Wrapper for psql to import a plain SQL dump
// ABOUTME: Streams the dump file to psql stdin and stops on the first error

use super::client_invocation;
use crate::dsn::ConnectionDescriptor;
use crate::process::ProcessRunner;
use anyhow::{Context, Result};
use std::path::Path;

/// Restore a plain SQL dump into an existing database
pub async fn restore_database(
    runner: &dyn ProcessRunner,
    target: &ConnectionDescriptor,
    input_path: &Path,
) -> Result<()> {
    tracing::info!(
        "Restoring database '{}' from {}",
        target.database,
        input_path.display()
    );

    let invocation = client_invocation("psql", target)
        .arg("--set=ON_ERROR_STOP=1")
        .arg("--quiet")
        .arg("--no-psqlrc")
        .stdin(input_path);

    runner.run(&invocation).await.context(
        "Restore failed.\n\
         \n\
         Common causes:\n\
         - Objects already exist on the destination (migrations are not idempotent)\n\
         - User lacks CREATE privileges on the destination\n\
         - Version incompatibility between source and destination",
    )?;

    tracing::info!("✓ Database restored");
    Ok(())
}
