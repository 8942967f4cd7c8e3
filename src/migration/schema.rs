// ABOUTME: Schema introspection for summaries, locking and database creation
// ABOUTME: Discovers tables, counts rows and creates missing databases

use super::RowCountSummary;
use crate::utils::{qualified_name, quote_ident};
use anyhow::{Context, Result};
use tokio_postgres::Client;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
}

impl TableInfo {
    /// `schema.table`, the key used in row-count summaries
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Quoted `"schema"."table"` for use in SQL
    pub fn quoted(&self) -> String {
        qualified_name(&self.schema, &self.name)
    }
}

/// List all user tables in the current database
pub async fn list_tables(client: &Client) -> Result<Vec<TableInfo>> {
    let rows = client
        .query(
            "SELECT schemaname, tablename
             FROM pg_catalog.pg_tables
             WHERE schemaname NOT IN ('pg_catalog', 'information_schema')
             ORDER BY schemaname, tablename",
            &[],
        )
        .await
        .context("Failed to list tables")?;

    let tables = rows
        .iter()
        .map(|row| TableInfo {
            schema: row.get(0),
            name: row.get(1),
        })
        .collect();

    Ok(tables)
}

/// Exact row count of one table
pub async fn count_rows(client: &Client, table: &TableInfo) -> Result<u64> {
    let row = client
        .query_one(&format!("SELECT COUNT(*) FROM {}", table.quoted()), &[])
        .await
        .with_context(|| format!("Failed to count rows in {}", table.display_name()))?;

    let count: i64 = row.get(0);
    Ok(count.max(0) as u64)
}

/// Row counts of every user table in the current database
pub async fn summarize_tables(client: &Client) -> Result<RowCountSummary> {
    let tables = list_tables(client).await?;
    let mut summary = RowCountSummary::new();

    for table in &tables {
        let rows = count_rows(client, table).await?;
        tracing::debug!("  {}: {} rows", table.display_name(), rows);
        summary.insert(table.display_name(), rows);
    }

    Ok(summary)
}

/// `LOCK TABLE ... IN SHARE MODE` covering all given tables, or `None` when there are none
///
/// SHARE mode blocks writers but not readers, so row counts and pg_dump still run.
pub fn lock_tables_statement(tables: &[TableInfo]) -> Option<String> {
    if tables.is_empty() {
        return None;
    }

    let names: Vec<String> = tables.iter().map(TableInfo::quoted).collect();
    Some(format!("LOCK TABLE {} IN SHARE MODE", names.join(", ")))
}

/// Create a database unless it already exists
///
/// `client` must be connected to another database on the same server
/// (typically the maintenance database). Returns true when it was created.
pub async fn create_database_if_not_exists(client: &Client, database: &str) -> Result<bool> {
    let exists = client
        .query_opt(
            "SELECT 1 FROM pg_catalog.pg_database WHERE datname = $1",
            &[&database],
        )
        .await
        .with_context(|| format!("Failed to check whether database '{}' exists", database))?
        .is_some();

    if exists {
        tracing::info!("  Database '{}' already exists", database);
        return Ok(false);
    }

    let query = format!("CREATE DATABASE {}", quote_ident(database));
    match client.execute(&query, &[]).await {
        Ok(_) => {
            tracing::info!("  Created database '{}'", database);
            Ok(true)
        }
        Err(e) => {
            // Lost a race with a concurrent CREATE DATABASE
            if e.to_string().contains("already exists") {
                tracing::info!("  Database '{}' already exists", database);
                Ok(false)
            } else {
                Err(e).context(format!("Failed to create database '{}'", database))
            }
        }
    }
}
