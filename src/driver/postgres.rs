// ABOUTME: PostgreSQL implementation of the Driver contract
// ABOUTME: Shells out to pg_dump/psql and uses tokio-postgres for everything else

use super::{Driver, ExportArtifact, Target};
use crate::error::{Error, Result};
use crate::migration::{self, RowCountSummary};
use crate::postgres::{connect, connect_maintenance};
use crate::process::{CommandRunner, ProcessRunner};
use crate::utils::{missing_tools, sanitize_identifier};
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::Client;

/// Client tools the driver shells out to
pub const REQUIRED_TOOLS: &[&str] = &["pg_dump", "psql"];

/// Fixed so database names never leak into filesystem paths
const DUMP_FILE_NAME: &str = "dump.sql";

/// Driver for PostgreSQL servers.
///
/// A table lock lives in a transaction, so the session holding it is kept
/// here, keyed by the target's connection string, until `unlock` ends it.
pub struct PostgresDriver {
    runner: Arc<dyn ProcessRunner>,
    lock_sessions: Mutex<HashMap<String, Client>>,
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(CommandRunner))
    }

    /// Driver that runs pg_dump/psql through the given runner
    pub fn with_runner(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            lock_sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Run pg_dump into a fresh scratch directory
    async fn dump(&self, target: &Target) -> Result<ExportArtifact> {
        let database = target.database().to_string();
        let export_failed = |source: anyhow::Error| Error::ExportFailed {
            database: database.clone(),
            source,
        };

        let dir = tempfile::Builder::new()
            .prefix("db-migrator-")
            .tempdir()
            .context("Failed to create temp directory")
            .map_err(export_failed)?;
        tracing::debug!("Using temp directory: {}", dir.path().display());

        let artifact = ExportArtifact::in_temp_dir(dir, DUMP_FILE_NAME);
        let size = migration::dump_database(self.runner.as_ref(), target.descriptor(), artifact.path())
            .await
            .map_err(export_failed)?;

        if size == 0 {
            tracing::error!("pg_dump wrote nothing for database '{}'", database);
            return Err(Error::EmptyExport { database });
        }

        Ok(artifact)
    }

    /// Run psql against an existing database
    async fn restore(&self, target: &Target, artifact: &ExportArtifact) -> Result<()> {
        migration::restore_database(self.runner.as_ref(), target.descriptor(), artifact.path())
            .await
            .map_err(|source| Error::ImportFailed {
                database: target.database().to_string(),
                source,
            })
    }

    async fn open_lock_session(&self, target: &Target) -> anyhow::Result<Client> {
        let client = connect(target.descriptor()).await?;
        let tables = migration::list_tables(&client).await?;

        client
            .batch_execute("BEGIN")
            .await
            .context("Failed to start lock transaction")?;

        if let Some(statement) = migration::lock_tables_statement(&tables) {
            client
                .batch_execute(&statement)
                .await
                .context("LOCK TABLE was rejected")?;
        }

        tracing::debug!("Locked {} tables", tables.len());
        Ok(client)
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn check_dependency(&self) -> Result<()> {
        tracing::info!("Checking tool dependencies: {}", REQUIRED_TOOLS.join(", "));

        let missing = missing_tools(REQUIRED_TOOLS);
        if !missing.is_empty() {
            tracing::error!(
                "Missing PostgreSQL client tools: {}. Install the postgresql-client package.",
                missing.join(", ")
            );
            return Err(Error::DependencyMissing { tools: missing });
        }

        Ok(())
    }

    async fn ping(&self, target: &Target) -> Result<()> {
        let connection_failed = |source: anyhow::Error| Error::ConnectionFailed {
            endpoint: target.endpoint(),
            target: target.descriptor().to_string(),
            source,
        };

        let client = connect_maintenance(target.descriptor())
            .await
            .map_err(connection_failed)?;
        client
            .simple_query("SELECT 1")
            .await
            .context("Server did not answer SELECT 1")
            .map_err(connection_failed)?;

        Ok(())
    }

    async fn export(&self, target: &Target) -> Result<ExportArtifact> {
        self.dump(target).await
    }

    async fn import(&self, target: &Target, artifact: &ExportArtifact) -> Result<()> {
        let database = target.database();
        let import_failed = |source: anyhow::Error| Error::ImportFailed {
            database: database.to_string(),
            source,
        };

        let admin = connect_maintenance(target.descriptor())
            .await
            .map_err(import_failed)?;
        migration::create_database_if_not_exists(&admin, database)
            .await
            .map_err(import_failed)?;

        self.restore(target, artifact).await
    }

    async fn lock(&self, target: &Target) -> Result<()> {
        let key = target.descriptor().to_dsn();
        let mut sessions = self.lock_sessions.lock().await;
        if sessions.contains_key(&key) {
            return Err(Error::LockFailed {
                database: target.database().to_string(),
                source: anyhow::anyhow!("a lock is already held for {}", target.descriptor()),
            });
        }

        let client = self
            .open_lock_session(target)
            .await
            .map_err(|source| Error::LockFailed {
                database: target.database().to_string(),
                source,
            })?;
        sessions.insert(key, client);

        tracing::info!("Locked database {}", target.descriptor());
        Ok(())
    }

    async fn unlock(&self, target: &Target) -> Result<()> {
        let unlock_failed = |source: anyhow::Error| Error::UnlockFailed {
            database: target.database().to_string(),
            source,
        };

        let client = self
            .lock_sessions
            .lock()
            .await
            .remove(&target.descriptor().to_dsn())
            .ok_or_else(|| unlock_failed(anyhow::anyhow!("no lock is held")))?;

        // Dropping the client closes the session, which releases the locks too
        client
            .batch_execute("ROLLBACK")
            .await
            .context("ROLLBACK failed")
            .map_err(unlock_failed)?;

        tracing::info!("Unlocked database {}", target.descriptor());
        Ok(())
    }

    async fn summary(&self, target: &Target) -> Result<RowCountSummary> {
        let summary_failed = |source: anyhow::Error| Error::SummaryFailed {
            database: target.database().to_string(),
            source,
        };

        let client = connect(target.descriptor())
            .await
            .map_err(summary_failed)?;
        let summary = migration::summarize_tables(&client)
            .await
            .map_err(summary_failed)?;

        for table in summary.tables() {
            tracing::debug!(
                "  {} {}: {:?} rows",
                target.endpoint(),
                sanitize_identifier(table),
                summary.get(table)
            );
        }
        tracing::info!(
            "Summarized {} ({} tables, {} rows)",
            target,
            summary.len(),
            summary.total_rows()
        );

        Ok(summary)
    }
}
