use crate::{
    Connection, Error, PoolConnection, Record, RequestContext, Result, RowsAffected, Statement,
    UpdatePolicy, Value, batch_read, delete, execute, read, update, write,
};
use std::fmt::{self, Display};

/// Lifecycle of a [`TransactionManager`].
///
/// `Open` is the only state accepting operations, every other one is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Committed,
    RolledBack,
    /// The commit was refused, the outcome of the transaction is unknown.
    Failed,
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        *self != TxState::Open
    }
}

impl Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TxState::Open => "open",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled back",
            TxState::Failed => "failed",
        })
    }
}

/// A unit of work on a dedicated connection.
///
/// Every failure while open rolls the transaction back before the error is
/// returned, so a failed operation never leaves it dangling. Once terminated
/// (commit or rollback, exactly once) the manager rejects any further call
/// with [`Error::InvalidState`]. Dropping it while still open schedules a
/// rollback on the runtime.
pub struct TransactionManager<C: Connection> {
    connection: Option<PoolConnection<C>>,
    state: TxState,
    policy: UpdatePolicy,
    trace_id: String,
}

impl<C: Connection> TransactionManager<C> {
    /// Start a transaction on `connection`.
    pub async fn begin(
        mut connection: PoolConnection<C>,
        ctx: &RequestContext,
        policy: UpdatePolicy,
    ) -> Result<Self> {
        log::debug!("[{}] Begin transaction", ctx.trace_id);
        if let Err(e) = connection.begin().await {
            log::error!("[{}] {:#}", ctx.trace_id, e);
            connection.discard();
            return Err(e);
        }
        Ok(Self {
            connection: Some(connection),
            state: TxState::Open,
            policy,
            trace_id: ctx.trace_id.clone(),
        })
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    fn connection(&mut self) -> Result<&mut PoolConnection<C>> {
        match (self.state, self.connection.as_mut()) {
            (TxState::Open, Some(connection)) => Ok(connection),
            (state, _) => {
                let error = Error::InvalidState(state);
                log::error!("[{}] {}", self.trace_id, error);
                Err(error)
            }
        }
    }

    pub async fn write<R: Record>(
        &mut self,
        ctx: &RequestContext,
        table: &str,
        record: &R,
    ) -> Result<RowsAffected> {
        let connection = self.connection()?;
        let result = ctx.run(write(&mut **connection, ctx, table, record)).await;
        self.settle(ctx, result).await
    }

    /// Write the records in order, the first failure rolls back the whole batch.
    ///
    /// The error reports the position of the record that failed.
    pub async fn batch_write<'a, R, It>(
        &mut self,
        ctx: &RequestContext,
        table: &str,
        records: It,
    ) -> Result<RowsAffected>
    where
        R: Record + 'a,
        It: IntoIterator<Item = &'a R>,
    {
        let connection = self.connection()?;
        let result = ctx
            .run(async {
                let mut total = RowsAffected::default();
                for (index, record) in records.into_iter().enumerate() {
                    let affected = write(&mut **connection, ctx, table, record)
                        .await
                        .map_err(|e| Error::Batch {
                            index,
                            source: Box::new(e),
                        })?;
                    total.extend([affected]);
                }
                Ok(total)
            })
            .await;
        self.settle(ctx, result).await
    }

    pub async fn update<R: Record>(
        &mut self,
        ctx: &RequestContext,
        table: &str,
        record: &R,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<RowsAffected> {
        let policy = self.policy;
        let connection = self.connection()?;
        let result = ctx
            .run(update(
                &mut **connection,
                ctx,
                table,
                record,
                column,
                value.into(),
                policy,
            ))
            .await;
        self.settle(ctx, result).await
    }

    pub async fn delete(
        &mut self,
        ctx: &RequestContext,
        table: &str,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<RowsAffected> {
        let connection = self.connection()?;
        let result = ctx
            .run(delete(&mut **connection, ctx, table, column, value.into()))
            .await;
        self.settle(ctx, result).await
    }

    /// Read a single record, seeing the writes of this transaction.
    ///
    /// A read that finds nothing fails like any other operation: the transaction is rolled back.
    pub async fn read<R: Record>(
        &mut self,
        ctx: &RequestContext,
        statement: impl Into<Statement>,
    ) -> Result<R> {
        let connection = self.connection()?;
        let result = ctx
            .run(read(&mut **connection, ctx, statement.into()))
            .await;
        self.settle(ctx, result).await
    }

    pub async fn batch_read<R: Record>(
        &mut self,
        ctx: &RequestContext,
        statement: impl Into<Statement>,
    ) -> Result<Vec<R>> {
        let connection = self.connection()?;
        let result = ctx
            .run(batch_read(&mut **connection, ctx, statement.into()))
            .await;
        self.settle(ctx, result).await
    }

    pub async fn execute(
        &mut self,
        ctx: &RequestContext,
        statement: impl Into<Statement>,
    ) -> Result<RowsAffected> {
        let connection = self.connection()?;
        let result = ctx
            .run(execute(&mut **connection, ctx, statement.into()))
            .await;
        self.settle(ctx, result).await
    }

    /// Make the writes visible.
    ///
    /// When the store refuses, the transaction ends up [`TxState::Failed`] and
    /// must not be retried.
    pub async fn commit(&mut self, ctx: &RequestContext) -> Result<()> {
        self.connection()?;
        if ctx.is_expired() {
            return Err(self.abort(ctx, Error::DeadlineExceeded).await);
        }
        log::debug!("[{}] Commit transaction", ctx.trace_id);
        let connection = self.connection()?;
        match connection.commit().await {
            Ok(()) => {
                self.state = TxState::Committed;
                self.connection = None;
                Ok(())
            }
            Err(e) => {
                log::error!("[{}] Commit refused: {:#}", ctx.trace_id, e);
                let cause = Error::Commit(Box::new(e));
                let result = self.rollback_connection(ctx).await;
                self.state = TxState::Failed;
                Err(match result {
                    Ok(()) => cause,
                    Err(rollback) => Error::RollbackFailed {
                        cause: Box::new(cause),
                        rollback: Box::new(rollback),
                    },
                })
            }
        }
    }

    /// Discard the writes. Calling it on a terminated transaction is an error.
    pub async fn rollback(&mut self, ctx: &RequestContext) -> Result<()> {
        self.connection()?;
        self.rollback_connection(ctx).await
    }

    async fn settle<T>(&mut self, ctx: &RequestContext, result: Result<T>) -> Result<T> {
        match result {
            Ok(v) => Ok(v),
            Err(e) => Err(self.abort(ctx, e).await),
        }
    }

    async fn abort(&mut self, ctx: &RequestContext, cause: Error) -> Error {
        log::warn!(
            "[{}] Rolling back the transaction after: {:#}",
            ctx.trace_id,
            cause
        );
        match self.rollback_connection(ctx).await {
            Ok(()) => cause,
            Err(rollback) => Error::RollbackFailed {
                cause: Box::new(cause),
                rollback: Box::new(rollback),
            },
        }
    }

    /// Roll back and give the connection back, the connection is closed if the rollback fails.
    async fn rollback_connection(&mut self, ctx: &RequestContext) -> Result<()> {
        let Some(mut connection) = self.connection.take() else {
            return Ok(());
        };
        log::debug!("[{}] Rollback transaction", ctx.trace_id);
        match connection.rollback().await {
            Ok(()) => {
                self.state = TxState::RolledBack;
                Ok(())
            }
            Err(e) => {
                log::error!("[{}] Rollback failed: {:#}", ctx.trace_id, e);
                self.state = TxState::Failed;
                connection.discard();
                Err(e)
            }
        }
    }
}

impl<C: Connection> Drop for TransactionManager<C> {
    fn drop(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        log::warn!(
            "[{}] Transaction dropped while open, rolling it back",
            self.trace_id
        );
        let trace_id = std::mem::take(&mut self.trace_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = connection.rollback().await {
                        log::error!("[{}] Rollback failed: {:#}", trace_id, e);
                        connection.discard();
                    }
                });
            }
            Err(..) => {
                log::error!(
                    "[{}] No runtime to roll back on, closing the connection",
                    trace_id
                );
                connection.discard();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!TxState::Open.is_terminal());
        assert!(TxState::Committed.is_terminal());
        assert!(TxState::RolledBack.is_terminal());
        assert!(TxState::Failed.is_terminal());
        assert_eq!(
            Error::InvalidState(TxState::Committed).to_string(),
            "Invalid state: the transaction is committed and cannot be used anymore"
        );
    }
}
