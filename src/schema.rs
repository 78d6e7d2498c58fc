//! Table definitions, to bootstrap development and test databases.

/// DDL of every table, for SQLite. Idempotent.
pub const SQLITE: &str = include_str!("schema/sqlite.sql");
