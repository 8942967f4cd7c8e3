// ABOUTME: In-memory fake driver shared by the migrator tests
// ABOUTME: Simulates databases as table->count maps and records every call

#![allow(dead_code)]

use async_trait::async_trait;
use db_migrator::driver::{Driver, Endpoint, ExportArtifact, Target};
use db_migrator::{ConnectionDescriptor, Error, MigrationRequest, Result, RowCountSummary};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    CheckDependency,
    Ping(Endpoint),
    Export(Endpoint),
    Import(Endpoint),
    Lock(Endpoint),
    Unlock(Endpoint),
    Summary(Endpoint),
}

/// Fake engine: each database is a map of table name to row count.
///
/// Dumps are text files of `table=count` lines. Importing a table that
/// already exists fails, like restoring a plain SQL dump twice would.
#[derive(Default)]
pub struct FakeDriver {
    pub databases: Mutex<HashMap<String, BTreeMap<String, u64>>>,
    pub locked: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<Call>>,
    pub unreachable: Option<Endpoint>,
    pub missing_tools: Vec<String>,
    pub empty_export: bool,
    /// Export hands back a path that was never written
    pub unsized_export: bool,
    pub fail_export: bool,
    pub fail_lock: bool,
    pub fail_unlock: bool,
    pub fail_summary: Option<Endpoint>,
    /// Every imported table loses one row
    pub lossy_import: bool,
}

fn key(descriptor: &ConnectionDescriptor) -> String {
    format!("{}/{}", descriptor.address(), descriptor.database)
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(self, dsn: &str, tables: &[(&str, u64)]) -> Self {
        let descriptor = ConnectionDescriptor::parse(dsn).unwrap();
        self.databases.lock().unwrap().insert(
            key(&descriptor),
            tables.iter().map(|(t, n)| (t.to_string(), *n)).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn tables(&self, dsn: &str) -> Option<BTreeMap<String, u64>> {
        let descriptor = ConnectionDescriptor::parse(dsn).unwrap();
        self.databases.lock().unwrap().get(&key(&descriptor)).cloned()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Driver for FakeDriver {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_dependency(&self) -> Result<()> {
        self.record(Call::CheckDependency);
        if !self.missing_tools.is_empty() {
            return Err(Error::DependencyMissing {
                tools: self.missing_tools.clone(),
            });
        }
        Ok(())
    }

    async fn ping(&self, target: &Target) -> Result<()> {
        self.record(Call::Ping(target.endpoint()));
        if self.unreachable == Some(target.endpoint()) {
            return Err(Error::ConnectionFailed {
                endpoint: target.endpoint(),
                target: target.descriptor().to_string(),
                source: anyhow::anyhow!("connection refused"),
            });
        }
        Ok(())
    }

    async fn export(&self, target: &Target) -> Result<ExportArtifact> {
        self.record(Call::Export(target.endpoint()));
        let database = target.database().to_string();
        if self.fail_export {
            return Err(Error::ExportFailed {
                database,
                source: anyhow::anyhow!("dump tool crashed"),
            });
        }

        if self.unsized_export {
            let dir = tempfile::tempdir()?;
            return Ok(ExportArtifact::at_path(dir.path().join("gone.txt")));
        }

        let dir = tempfile::tempdir()?;
        let artifact = ExportArtifact::in_temp_dir(dir, "dump.txt");

        let mut content = String::new();
        if !self.empty_export {
            content.push_str("-- fake dump\n");
            let databases = self.databases.lock().unwrap();
            for (table, rows) in databases.get(&key(target.descriptor())).into_iter().flatten() {
                content.push_str(&format!("{}={}\n", table, rows));
            }
        }
        std::fs::write(artifact.path(), content)?;

        if artifact.size()? == 0 {
            return Err(Error::EmptyExport { database });
        }
        Ok(artifact)
    }

    async fn import(&self, target: &Target, artifact: &ExportArtifact) -> Result<()> {
        self.record(Call::Import(target.endpoint()));
        let content = if self.unsized_export {
            String::new()
        } else {
            std::fs::read_to_string(artifact.path())?
        };

        let mut databases = self.databases.lock().unwrap();
        let tables = databases.entry(key(target.descriptor())).or_default();

        for line in content.lines().filter(|l| !l.starts_with("--")) {
            let (table, rows) = line.split_once('=').unwrap();
            if tables.contains_key(table) {
                return Err(Error::ImportFailed {
                    database: target.database().to_string(),
                    source: anyhow::anyhow!("relation \"{}\" already exists", table),
                });
            }
            let rows: u64 = rows.parse().unwrap();
            let rows = if self.lossy_import { rows.saturating_sub(1) } else { rows };
            tables.insert(table.to_string(), rows);
        }
        Ok(())
    }

    async fn lock(&self, target: &Target) -> Result<()> {
        self.record(Call::Lock(target.endpoint()));
        if self.fail_lock {
            return Err(Error::LockFailed {
                database: target.database().to_string(),
                source: anyhow::anyhow!("permission denied"),
            });
        }
        self.locked.lock().unwrap().insert(key(target.descriptor()));
        Ok(())
    }

    async fn unlock(&self, target: &Target) -> Result<()> {
        self.record(Call::Unlock(target.endpoint()));
        let was_locked = self.locked.lock().unwrap().remove(&key(target.descriptor()));
        if self.fail_unlock || !was_locked {
            return Err(Error::UnlockFailed {
                database: target.database().to_string(),
                source: anyhow::anyhow!("session lost"),
            });
        }
        Ok(())
    }

    async fn summary(&self, target: &Target) -> Result<RowCountSummary> {
        self.record(Call::Summary(target.endpoint()));
        let failed = |reason: &str| Error::SummaryFailed {
            database: target.database().to_string(),
            source: anyhow::anyhow!("{}", reason),
        };

        if self.fail_summary == Some(target.endpoint()) {
            return Err(failed("query canceled"));
        }
        let databases = self.databases.lock().unwrap();
        let tables = databases
            .get(&key(target.descriptor()))
            .ok_or_else(|| failed("database does not exist"))?;
        Ok(tables.iter().map(|(t, n)| (t.clone(), *n)).collect())
    }
}

pub const SOURCE: &str = "postgres://app:pw@old-host:5432/shop";
pub const DESTINATION: &str = "postgres://app:pw@new-host:5432/shop";

pub fn request(validate: bool) -> MigrationRequest {
    MigrationRequest::new(SOURCE.parse().unwrap(), DESTINATION.parse().unwrap())
        .with_validation(validate)
}

pub fn summary(entries: &[(&str, u64)]) -> RowCountSummary {
    entries.iter().map(|(t, n)| (t.to_string(), *n)).collect()
}
