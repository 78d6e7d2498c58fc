use crate::{Connection, SqlWriter};

/// A backing store implementation.
pub trait Driver: Default + Send + Sync {
    type Connection: Connection<Driver = Self>;
    type SqlWriter: SqlWriter;

    /// Human readable name, used in logs.
    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;
}
