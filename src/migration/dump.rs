// ABOUTME: Wrapper for pg_dump to export a complete database
// ABOUTME: Writes a plain SQL dump and rejects empty output

use super::client_invocation;
use crate::dsn::ConnectionDescriptor;
use crate::process::ProcessRunner;
use anyhow::{Context, Result};
use std::path::Path;

/// Dump schema and data of one database to a plain SQL file
///
/// Ownership and privilege statements are left out so the dump restores
/// cleanly under a different role on the destination server.
/// Returns the size of the written file.
pub async fn dump_database(
    runner: &dyn ProcessRunner,
    source: &ConnectionDescriptor,
    output_path: &Path,
) -> Result<u64> {
    tracing::info!(
        "Dumping database '{}' to {}",
        source.database,
        output_path.display()
    );

    let invocation = client_invocation("pg_dump", source)
        .arg("--no-owner")
        .arg("--no-privileges")
        .arg(format!("--file={}", output_path.display()));

    let stdout = runner
        .run(&invocation)
        .await
        .context("pg_dump did not complete")?;
    if !stdout.is_empty() {
        tracing::debug!("pg_dump output: {}", String::from_utf8_lossy(&stdout));
    }

    let size = std::fs::metadata(output_path)
        .with_context(|| format!("pg_dump did not create {}", output_path.display()))?
        .len();

    tracing::info!("✓ Database dumped ({} bytes)", size);
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandRunner;
    use tempfile::tempdir;

    #[tokio::test]
    #[ignore]
    async fn test_dump_database() {
        let url = std::env::var("TEST_SOURCE_URL").unwrap();
        let source = ConnectionDescriptor::parse(&url).unwrap();
        let dir = tempdir().unwrap();
        let output = dir.path().join("dump.sql");

        let size = dump_database(&CommandRunner, &source, &output).await.unwrap();

        assert!(size > 0);
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("PostgreSQL database dump"));
    }
}
