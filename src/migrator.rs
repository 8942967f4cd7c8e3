// ABOUTME: Migration orchestrator driving checks, export, import and validation
// ABOUTME: Sequences driver calls and guarantees unlock once a source lock is taken

use crate::config::{MigrationMethod, MigrationRequest};
use crate::driver::{Driver, DriverRegistry, Target};
use crate::error::{Error, Result};
use crate::migration::RowCountSummary;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Steps of a migration run, in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Init,
    CompatibilityChecked,
    ConnectivityChecked,
    DependencyChecked,
    Locked,
    SourceSummarized,
    Unlocked,
    Exported,
    Imported,
    DestinationSummarized,
    Validated,
    Done,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationState::Init => "init",
            MigrationState::CompatibilityChecked => "compatibility checked",
            MigrationState::ConnectivityChecked => "connectivity checked",
            MigrationState::DependencyChecked => "dependencies checked",
            MigrationState::Locked => "source locked",
            MigrationState::SourceSummarized => "source summarized",
            MigrationState::Unlocked => "source unlocked",
            MigrationState::Exported => "exported",
            MigrationState::Imported => "imported",
            MigrationState::DestinationSummarized => "destination summarized",
            MigrationState::Validated => "validated",
            MigrationState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful migration
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub method: MigrationMethod,
    pub validated: bool,
    /// Present only when validation was requested
    pub source_summary: Option<RowCountSummary>,
    pub destination_summary: Option<RowCountSummary>,
    pub export_bytes: u64,
    pub elapsed: Duration,
}

/// Runs migrations with drivers taken from a registry.
///
/// Each call to [`Migrator::migrate`] is one sequential run:
/// 1. Fails if source and destination schemes differ (no network access yet)
/// 2. Resolves the driver and pings source, then destination
/// 3. Checks the driver's external tooling
/// 4. With validation: locks the source, summarizes it, unlocks it
/// 5. Exports the source
/// 6. Imports into the destination
/// 7. With validation: summarizes the destination and compares
///
/// The source lock is released before export, so writes landing between
/// unlock and export can make validation fail. Nothing is rolled back on
/// failure and running the same migration twice is not idempotent.
pub struct Migrator<'a> {
    registry: &'a DriverRegistry,
}

impl<'a> Migrator<'a> {
    pub fn new(registry: &'a DriverRegistry) -> Self {
        Self { registry }
    }

    /// Run the compatibility, connectivity and dependency checks only
    pub async fn preflight(&self, request: &MigrationRequest) -> Result<Arc<dyn Driver>> {
        let mut run = Run::new();
        let result = self.checks(request, &mut run).await;
        run.finish(&result);
        result
    }

    /// Run a complete migration
    pub async fn migrate(&self, request: &MigrationRequest) -> Result<MigrationReport> {
        let mut run = Run::new();
        let result = self.execute(request, &mut run).await;
        run.finish(&result);
        result
    }

    async fn execute(&self, request: &MigrationRequest, run: &mut Run) -> Result<MigrationReport> {
        tracing::info!(
            "Starting {} migration from {} to {}",
            request.method,
            request.source,
            request.destination
        );
        let started = Instant::now();

        let driver = self.checks(request, run).await?;
        let source = Target::source(request.source.clone());
        let destination = Target::destination(request.destination.clone());

        let (source_summary, destination_summary, export_bytes) = match request.method {
            MigrationMethod::FullDump => {
                self.full_dump(driver.as_ref(), &source, &destination, request.validate, run)
                    .await?
            }
        };

        run.advance(MigrationState::Done);
        let report = MigrationReport {
            method: request.method,
            validated: request.validate,
            source_summary,
            destination_summary,
            export_bytes,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "✅ Migration complete in {:.1}s ({} bytes transferred)",
            report.elapsed.as_secs_f64(),
            report.export_bytes
        );
        Ok(report)
    }

    async fn checks(&self, request: &MigrationRequest, run: &mut Run) -> Result<Arc<dyn Driver>> {
        tracing::info!("Step 1/3: Checking engine compatibility...");
        check_compatibility(request)?;
        run.advance(MigrationState::CompatibilityChecked);

        tracing::info!("Step 2/3: Checking connectivity...");
        let driver = self.registry.resolve(&request.source.scheme)?;
        let source = Target::source(request.source.clone());
        let destination = Target::destination(request.destination.clone());
        for target in [&source, &destination] {
            if let Err(e) = driver.ping(target).await {
                tracing::error!("Failed to ping {}", target);
                return Err(e);
            }
            tracing::info!("✓ Connected to {}", target.endpoint());
        }
        run.advance(MigrationState::ConnectivityChecked);

        tracing::info!("Step 3/3: Checking {} tooling...", driver.name());
        driver.check_dependency().await?;
        tracing::info!("✓ Required tools available");
        run.advance(MigrationState::DependencyChecked);

        Ok(driver)
    }

    async fn full_dump(
        &self,
        driver: &dyn Driver,
        source: &Target,
        destination: &Target,
        validate: bool,
        run: &mut Run,
    ) -> Result<(Option<RowCountSummary>, Option<RowCountSummary>, u64)> {
        let source_summary = if validate {
            tracing::info!("Summarizing source under read lock...");
            Some(self.locked_summary(driver, source, run).await?)
        } else {
            None
        };

        tracing::info!("Exporting {}...", source);
        let artifact = driver.export(source).await?;
        let export_bytes = match artifact.size() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    "⚠ Could not read size of {}: {}",
                    artifact.path().display(),
                    e
                );
                0
            }
        };
        tracing::info!("✓ Export written to {}", artifact.path().display());
        run.advance(MigrationState::Exported);

        tracing::info!("Importing into {}...", destination);
        driver.import(destination, &artifact).await?;
        tracing::info!("✓ Import complete");
        run.advance(MigrationState::Imported);
        drop(artifact);

        let destination_summary = match source_summary {
            Some(ref expected) => {
                let actual = driver.summary(destination).await?;
                run.advance(MigrationState::DestinationSummarized);

                if !expected.matches(&actual) {
                    tracing::error!(
                        "Source and destination have different summaries: {} vs {}",
                        expected,
                        actual
                    );
                    return Err(Error::ValidationMismatch {
                        source_summary: expected.clone(),
                        destination_summary: actual,
                    });
                }

                tracing::info!("✓ Validated {} tables", actual.len());
                run.advance(MigrationState::Validated);
                Some(actual)
            }
            None => None,
        };

        Ok((source_summary, destination_summary, export_bytes))
    }

    /// Lock, summarize and unlock the source; unlock runs exactly once
    ///
    /// A summary failure is returned even when unlocking fails too; the unlock
    /// failure is then only logged.
    async fn locked_summary(
        &self,
        driver: &dyn Driver,
        source: &Target,
        run: &mut Run,
    ) -> Result<RowCountSummary> {
        driver.lock(source).await?;
        run.advance(MigrationState::Locked);

        let summary = driver.summary(source).await;
        if summary.is_ok() {
            run.advance(MigrationState::SourceSummarized);
        }

        match (summary, driver.unlock(source).await) {
            (Ok(summary), Ok(())) => {
                run.advance(MigrationState::Unlocked);
                tracing::info!("✓ Source summary: {}", summary);
                Ok(summary)
            }
            (Ok(_), Err(unlock_err)) => Err(unlock_err),
            (Err(summary_err), Ok(())) => {
                run.advance(MigrationState::Unlocked);
                Err(summary_err)
            }
            (Err(summary_err), Err(unlock_err)) => {
                tracing::warn!("⚠ Failed to unlock {} after error: {}", source, unlock_err);
                Err(summary_err)
            }
        }
    }
}

/// Source and destination must use the same engine scheme
///
/// Server versions and schemas are not compared.
pub fn check_compatibility(request: &MigrationRequest) -> Result<()> {
    if request.source.scheme != request.destination.scheme {
        return Err(Error::IncompatibleEngines {
            source_scheme: request.source.scheme.clone(),
            destination_scheme: request.destination.scheme.clone(),
        });
    }
    Ok(())
}

/// Tracks the state reached so failures can say where they happened
struct Run {
    state: MigrationState,
}

impl Run {
    fn new() -> Self {
        Self {
            state: MigrationState::Init,
        }
    }

    fn advance(&mut self, next: MigrationState) {
        tracing::debug!("Migration state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn finish<T>(&self, result: &Result<T>) {
        if let Err(e) = result {
            tracing::error!("Migration stopped after '{}': {}", self.state, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsn::ConnectionDescriptor;

    #[test]
    fn test_check_compatibility_rejects_different_schemes() {
        let request = MigrationRequest::new(
            ConnectionDescriptor::parse("mysql://u@h/a").unwrap(),
            ConnectionDescriptor::parse("postgres://u@h/a").unwrap(),
        );

        let err = check_compatibility(&request).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Incompatible engines: source is 'mysql' but destination is 'postgres'"
        );
    }

    #[test]
    fn test_check_compatibility_accepts_same_scheme() {
        let request = MigrationRequest::new(
            ConnectionDescriptor::parse("postgres://u@h1/a").unwrap(),
            ConnectionDescriptor::parse("postgres://u@h2/b").unwrap(),
        );
        assert!(check_compatibility(&request).is_ok());
    }

    #[tokio::test]
    async fn test_unregistered_scheme_is_unsupported_engine() {
        let registry = DriverRegistry::new();
        let request = MigrationRequest::new(
            ConnectionDescriptor::parse("oracle://u@h1/a").unwrap(),
            ConnectionDescriptor::parse("oracle://u@h2/a").unwrap(),
        );

        let err = Migrator::new(&registry).migrate(&request).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedEngine { ref scheme, .. } if scheme == "oracle"));
    }
}
