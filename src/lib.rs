// ABOUTME: Library module for db-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod driver;
pub mod dsn;
pub mod error;
pub mod migration;
pub mod migrator;
pub mod postgres;
pub mod process;
pub mod utils;

pub use config::{MigrationMethod, MigrationRequest};
pub use driver::{Driver, DriverRegistry, Endpoint, ExportArtifact, Target};
pub use dsn::ConnectionDescriptor;
pub use error::{Error, Result};
pub use migration::RowCountSummary;
pub use migrator::{MigrationReport, MigrationState, Migrator};
