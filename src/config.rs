// ABOUTME: Migration request types and TOML configuration loading
// ABOUTME: Merges config file values with CLI flags into a MigrationRequest

use crate::dsn::ConnectionDescriptor;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Strategy used to copy the data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationMethod {
    /// Dump the whole source database and restore it into the destination
    #[default]
    FullDump,
}

impl MigrationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationMethod::FullDump => "fulldump",
        }
    }
}

impl fmt::Display for MigrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fulldump" | "full-dump" => Ok(MigrationMethod::FullDump),
            other => Err(Error::Config(format!(
                "unknown migration method '{}' (supported: fulldump)",
                other
            ))),
        }
    }
}

/// Everything one migration run needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    pub method: MigrationMethod,
    pub validate: bool,
    pub source: ConnectionDescriptor,
    pub destination: ConnectionDescriptor,
}

impl MigrationRequest {
    /// Full-dump migration without validation
    pub fn new(source: ConnectionDescriptor, destination: ConnectionDescriptor) -> Self {
        Self {
            method: MigrationMethod::FullDump,
            validate: false,
            source,
            destination,
        }
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_method(mut self, method: MigrationMethod) -> Self {
        self.method = method;
        self
    }
}

/// Contents of a migration config file; every key is optional
///
/// ```toml
/// source = "postgres://user:pw@old-host:5432/app"
/// destination = "postgres://user:pw@new-host:5432/app"
/// method = "fulldump"
/// validate = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub method: Option<String>,
    pub validate: Option<bool>,
}

/// Load a migration config from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<MigrationConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("failed to read config file {}: {}", path.display(), e))
    })?;
    parse_config(&content)
        .map_err(|e| Error::Config(format!("{} (in {})", e, path.display())))
}

/// Parse migration config TOML
pub fn parse_config(content: &str) -> Result<MigrationConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("invalid config: {}", e)))
}

impl MigrationConfig {
    /// Overlay values given on the command line; `Some` values win
    pub fn merge(mut self, overrides: MigrationConfig) -> Self {
        if overrides.source.is_some() {
            self.source = overrides.source;
        }
        if overrides.destination.is_some() {
            self.destination = overrides.destination;
        }
        if overrides.method.is_some() {
            self.method = overrides.method;
        }
        if overrides.validate.is_some() {
            self.validate = overrides.validate;
        }
        self
    }

    /// Build the request, requiring both connection strings
    pub fn into_request(self) -> Result<MigrationRequest> {
        let source = self.source.ok_or_else(|| {
            Error::Config("source connection string is required (--source-dsn or SOURCE_DSN)".to_string())
        })?;
        let destination = self.destination.ok_or_else(|| {
            Error::Config(
                "destination connection string is required (--dest-dsn or DEST_DSN)".to_string(),
            )
        })?;

        let method = match self.method {
            Some(method) => method.parse()?,
            None => MigrationMethod::default(),
        };

        Ok(MigrationRequest::new(source.parse()?, destination.parse()?)
            .with_method(method)
            .with_validation(self.validate.unwrap_or(false)))
    }
}
