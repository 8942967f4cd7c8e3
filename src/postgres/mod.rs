// ABOUTME: PostgreSQL utilities module
// ABOUTME: Exports connection management used by the postgres driver

pub mod connection;

pub use connection::{connect, connect_maintenance, MAINTENANCE_DATABASE};
