// ABOUTME: Utility functions for tool discovery and SQL identifiers
// ABOUTME: Provides PATH lookups, identifier quoting and log-safe names

use which::which;

/// Return the tools from `tools` that cannot be found in PATH
///
/// # Examples
///
/// ```
/// # use db_migrator::utils::missing_tools;
/// let missing = missing_tools(&["definitely-not-installed-tool"]);
/// assert_eq!(missing, vec!["definitely-not-installed-tool".to_string()]);
/// ```
pub fn missing_tools(tools: &[&str]) -> Vec<String> {
    tools
        .iter()
        .filter(|tool| which(tool).is_err())
        .map(|tool| tool.to_string())
        .collect()
}

/// Quote a PostgreSQL identifier, doubling embedded quotes
///
/// # Examples
///
/// ```
/// # use db_migrator::utils::quote_ident;
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Quoted `"schema"."table"`
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Sanitize an identifier (table name, schema name, etc.) for display
///
/// Removes control characters and limits length to prevent log injection.
/// This is for display only; SQL text goes through [`quote_ident`].
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}
