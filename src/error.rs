// ABOUTME: Error types shared by drivers, the registry and the migrator
// ABOUTME: Each migration step fails with its own distinguishable kind

use crate::driver::Endpoint;
use crate::migration::RowCountSummary;
use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No driver is registered for the requested scheme
    #[error(
        "Unsupported database engine '{scheme}': no driver registered (available: {})",
        registered_list(.registered)
    )]
    UnsupportedEngine {
        scheme: String,
        registered: Vec<String>,
    },

    /// Source and destination use different engines
    #[error(
        "Incompatible engines: source is '{source_scheme}' but destination is '{destination_scheme}'"
    )]
    IncompatibleEngines {
        source_scheme: String,
        destination_scheme: String,
    },

    /// Required external tooling is not installed
    #[error("Missing required tools: {}", .tools.join(", "))]
    DependencyMissing { tools: Vec<String> },

    /// Database server could not be reached
    #[error("Failed to connect to {endpoint} database {target}")]
    ConnectionFailed {
        endpoint: Endpoint,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    /// Dump tool failed
    #[error("Export of database '{database}' failed")]
    ExportFailed {
        database: String,
        #[source]
        source: anyhow::Error,
    },

    /// Dump tool reported success but wrote nothing
    #[error("Export of database '{database}' produced an empty dump")]
    EmptyExport { database: String },

    /// Restore into the destination failed
    #[error("Import into database '{database}' failed")]
    ImportFailed {
        database: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to lock tables of database '{database}'")]
    LockFailed {
        database: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to unlock tables of database '{database}'")]
    UnlockFailed {
        database: String,
        #[source]
        source: anyhow::Error,
    },

    /// Row counts could not be collected
    #[error("Failed to summarize database '{database}'")]
    SummaryFailed {
        database: String,
        #[source]
        source: anyhow::Error,
    },

    /// Source and destination row counts differ after import
    #[error(
        "Validation failed: source {source_summary} and destination {destination_summary} differ ({})",
        mismatch_details(.source_summary, .destination_summary)
    )]
    ValidationMismatch {
        source_summary: RowCountSummary,
        destination_summary: RowCountSummary,
    },

    #[error("Invalid connection string '{input}': {reason}")]
    InvalidConnectionString { input: String, reason: String },

    /// Configuration error (bad TOML, missing DSNs, unknown method)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an InvalidConnectionString error
    pub fn invalid_dsn(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidConnectionString {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

fn registered_list(schemes: &[String]) -> String {
    if schemes.is_empty() {
        "none".to_string()
    } else {
        schemes.join(", ")
    }
}

fn mismatch_details(source: &RowCountSummary, destination: &RowCountSummary) -> String {
    source
        .differences(destination)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;
