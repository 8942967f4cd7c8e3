// ABOUTME: Registry mapping engine schemes to driver implementations
// ABOUTME: Built explicitly at startup and handed to the migrator

use super::{Driver, PostgresDriver};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of database drivers keyed by connection-string scheme.
///
/// The registry is constructed by the caller and passed to the
/// [`Migrator`](crate::migrator::Migrator) instead of living in a global, so
/// each test can build one with its own fake drivers.
///
/// # Example
///
/// ```
/// # use db_migrator::driver::DriverRegistry;
/// let registry = DriverRegistry::with_builtins();
/// assert!(registry.resolve("postgres").is_ok());
/// assert!(registry.resolve("oracle").is_err());
/// ```
#[derive(Default, Clone)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in drivers registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        let postgres: Arc<dyn Driver> = Arc::new(PostgresDriver::new());
        registry.register(postgres.clone(), "postgres");
        registry.register(postgres, "postgresql");

        registry
    }

    /// Register a driver for a scheme.
    ///
    /// The last registration for a scheme wins; the replaced driver is returned.
    pub fn register(
        &mut self,
        driver: Arc<dyn Driver>,
        scheme: impl Into<String>,
    ) -> Option<Arc<dyn Driver>> {
        let scheme = scheme.into();
        tracing::debug!("Registering driver '{}' for scheme '{}'", driver.name(), scheme);
        self.drivers.insert(scheme, driver)
    }

    /// Look up the driver for a scheme.
    pub fn resolve(&self, scheme: &str) -> Result<Arc<dyn Driver>> {
        self.drivers
            .get(scheme)
            .cloned()
            .ok_or_else(|| Error::UnsupportedEngine {
                scheme: scheme.to_string(),
                registered: self.schemes().into_iter().map(str::to_string).collect(),
            })
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
