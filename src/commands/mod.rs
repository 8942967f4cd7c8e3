// ABOUTME: Command implementations behind the CLI subcommands
// ABOUTME: Exports migrate, check, and summarize commands

pub mod check;
pub mod migrate;
pub mod summarize;

pub use check::check;
pub use migrate::migrate;
pub use summarize::summarize;
