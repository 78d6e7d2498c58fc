use crate::{Driver, Executor, Result, SqlWriter, Statement};
use futures::TryFutureExt;
use std::future::Future;

/// A single session with the backing store.
pub trait Connection: Executor + 'static {
    /// Open a new connection to the given URL.
    fn connect(url: &str) -> impl Future<Output = Result<Self>> + Send;

    fn begin(&mut self) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_begin(&mut sql);
        self.execute(Statement::new(sql)).map_ok(|_| ())
    }

    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_commit(&mut sql);
        self.execute(Statement::new(sql)).map_ok(|_| ())
    }

    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_rollback(&mut sql);
        self.execute(Statement::new(sql)).map_ok(|_| ())
    }
}

/// Name of the driver behind a connection, for log lines.
pub fn driver_name<C: Connection>() -> &'static str {
    <C::Driver as Driver>::NAME
}
