// ABOUTME: Migration utilities module
// ABOUTME: Handles table discovery, dump/restore and row-count summaries

pub mod dump;
pub mod restore;
pub mod schema;
pub mod summary;

pub use dump::dump_database;
pub use restore::restore_database;
pub use schema::{
    count_rows, create_database_if_not_exists, list_tables, lock_tables_statement,
    summarize_tables, TableInfo,
};
pub use summary::{RowCountSummary, TableDifference};

use crate::dsn::ConnectionDescriptor;
use crate::process::Invocation;

/// Base invocation of a libpq client tool with the descriptor's connection flags
///
/// The password travels in `PGPASSWORD` so it never shows up in process listings.
pub(crate) fn client_invocation(program: &str, descriptor: &ConnectionDescriptor) -> Invocation {
    let mut invocation = Invocation::new(program)
        .arg("--host")
        .arg(descriptor.host.as_str());

    if let Some(port) = descriptor.port {
        invocation = invocation.arg("--port").arg(port.to_string());
    }
    if !descriptor.username.is_empty() {
        invocation = invocation
            .arg("--username")
            .arg(descriptor.username.as_str());
    }
    if let Some(password) = &descriptor.password {
        invocation = invocation.env("PGPASSWORD", password.as_str());
    }

    invocation
        .arg("--no-password")
        .arg(format!("--dbname={}", descriptor.database))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_invocation_keeps_password_out_of_args() {
        let descriptor = ConnectionDescriptor::parse("postgres://app:s3cret@db:5433/orders").unwrap();
        let inv = client_invocation("pg_dump", &descriptor);

        assert_eq!(inv.program, "pg_dump");
        assert_eq!(
            inv.args,
            vec![
                "--host",
                "db",
                "--port",
                "5433",
                "--username",
                "app",
                "--no-password",
                "--dbname=orders"
            ]
        );
        assert!(inv.args.iter().all(|a| !a.contains("s3cret")));
        assert_eq!(
            inv.env,
            vec![("PGPASSWORD".to_string(), "s3cret".to_string())]
        );
    }

    #[test]
    fn test_client_invocation_without_optional_parts() {
        let descriptor = ConnectionDescriptor::parse("postgres://db/orders").unwrap();
        let inv = client_invocation("psql", &descriptor);

        assert_eq!(inv.args, vec!["--host", "db", "--no-password", "--dbname=orders"]);
        assert!(inv.env.is_empty());
    }
}
