use crate::{
    Connection, Driver, Error, Executor, Pool, PoolConfig, Record, RequestContext, Result,
    RowsAffected, SqlWriter, Statement, TransactionManager, Value,
    stream::{StreamExt, TryStreamExt},
};
use std::pin::pin;

/// What an UPDATE matching no row means.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Zero affected rows is a query error.
    #[default]
    RequireMatch,
    /// Zero affected rows is a success, the update silently did nothing.
    Lenient,
}

fn log_failure<T>(ctx: &RequestContext, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log::error!("[{}] {:#}", ctx.trace_id, e);
    }
    result
}

/// Insert the projection of `record` into `table`.
pub async fn write<E: Executor, R: Record>(
    executor: &mut E,
    ctx: &RequestContext,
    table: &str,
    record: &R,
) -> Result<RowsAffected> {
    let statement = log_failure(
        ctx,
        executor
            .driver()
            .sql_writer()
            .write_insert(table, record.project()),
    )?;
    execute(executor, ctx, statement).await
}

/// Update the projected columns of `record` on the rows where `column` equals `value`.
pub async fn update<E: Executor, R: Record>(
    executor: &mut E,
    ctx: &RequestContext,
    table: &str,
    record: &R,
    column: &str,
    value: Value,
    policy: UpdatePolicy,
) -> Result<RowsAffected> {
    let condition = value.to_string();
    let statement = log_failure(
        ctx,
        executor
            .driver()
            .sql_writer()
            .write_update(table, record.project(), column, value),
    )?;
    let affected = execute(executor, ctx, statement).await?;
    if affected.rows_affected == 0 && policy == UpdatePolicy::RequireMatch {
        return log_failure(
            ctx,
            Err(Error::query(format!(
                "The update of `{table}` where `{column}` = {condition} matched no row"
            ))),
        );
    }
    Ok(affected)
}

/// Delete the rows of `table` where `column` equals `value`.
pub async fn delete<E: Executor>(
    executor: &mut E,
    ctx: &RequestContext,
    table: &str,
    column: &str,
    value: Value,
) -> Result<RowsAffected> {
    let statement = executor
        .driver()
        .sql_writer()
        .write_delete(table, column, value);
    execute(executor, ctx, statement).await
}

/// First row of the result decoded as `R`, [`Error::NotFound`] when there is none.
pub async fn read<E: Executor, R: Record>(
    executor: &mut E,
    ctx: &RequestContext,
    statement: Statement,
) -> Result<R> {
    log::debug!("[{}] {}", ctx.trace_id, statement);
    let sql = statement.sql.clone();
    let mut rows = pin!(executor.fetch(statement));
    let result = match rows.try_next().await {
        Ok(Some(row)) => R::from_row(row),
        Ok(None) => Err(Error::not_found(format!(
            "No `{}` row returned by: {}",
            R::table_name(),
            crate::truncate_long!(sql)
        ))),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.is_not_found() => {
            log::debug!("[{}] {}", ctx.trace_id, e);
            Err(e)
        }
        result => log_failure(ctx, result),
    }
}

/// All the rows of the result decoded as `R`.
pub async fn batch_read<E: Executor, R: Record>(
    executor: &mut E,
    ctx: &RequestContext,
    statement: Statement,
) -> Result<Vec<R>> {
    log::debug!("[{}] {}", ctx.trace_id, statement);
    let result = executor
        .fetch(statement)
        .map(|row| row.and_then(R::from_row))
        .try_collect()
        .await;
    log_failure(ctx, result)
}

/// Run a statement, discarding any row it returns.
pub async fn execute<E: Executor>(
    executor: &mut E,
    ctx: &RequestContext,
    statement: Statement,
) -> Result<RowsAffected> {
    log::debug!("[{}] {}", ctx.trace_id, statement);
    let result = executor.execute(statement).await;
    log_failure(ctx, result)
}

/// The persistence engine: single statement operations over a connection pool.
///
/// Every operation runs on its own pooled connection, under the deadline of
/// the request context. Use [`Engine::begin`] to group writes atomically.
pub struct Engine<C: Connection> {
    pool: Pool<C>,
    policy: UpdatePolicy,
}

impl<C: Connection> Clone for Engine<C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            policy: self.policy,
        }
    }
}

impl<C: Connection> Engine<C> {
    pub fn new(pool: Pool<C>) -> Self {
        Self {
            pool,
            policy: UpdatePolicy::default(),
        }
    }

    /// Connect a pool to `url` and wrap it.
    pub async fn connect(url: impl Into<String>, config: PoolConfig) -> Result<Self> {
        let url = url.into();
        log::info!(
            "Connecting to {} ({} connections max)",
            <C::Driver as Driver>::NAME,
            config.max_connections
        );
        Ok(Self::new(Pool::connect(url, config).await?))
    }

    pub fn with_update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        self.policy
    }

    pub fn pool(&self) -> &Pool<C> {
        &self.pool
    }

    pub async fn write<R: Record>(
        &self,
        ctx: &RequestContext,
        table: &str,
        record: &R,
    ) -> Result<RowsAffected> {
        ctx.run(async {
            let mut connection = self.pool.acquire().await?;
            write(&mut *connection, ctx, table, record).await
        })
        .await
    }

    /// Write `record` into its own table.
    pub async fn insert<R: Record>(&self, ctx: &RequestContext, record: &R) -> Result<RowsAffected> {
        self.write(ctx, R::table_name(), record).await
    }

    pub async fn update<R: Record>(
        &self,
        ctx: &RequestContext,
        table: &str,
        record: &R,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<RowsAffected> {
        let value = value.into();
        ctx.run(async {
            let mut connection = self.pool.acquire().await?;
            update(&mut *connection, ctx, table, record, column, value, self.policy).await
        })
        .await
    }

    /// Update `record` in `table` matching on its primary key.
    pub async fn update_record<R: Record>(
        &self,
        ctx: &RequestContext,
        table: &str,
        record: &R,
    ) -> Result<RowsAffected> {
        let (column, value) = primary_key(table, record)?;
        self.update(ctx, table, record, column, value).await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        table: &str,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<RowsAffected> {
        let value = value.into();
        ctx.run(async {
            let mut connection = self.pool.acquire().await?;
            delete(&mut *connection, ctx, table, column, value).await
        })
        .await
    }

    /// Delete `record` from `table` matching on its primary key.
    pub async fn delete_record<R: Record>(
        &self,
        ctx: &RequestContext,
        table: &str,
        record: &R,
    ) -> Result<RowsAffected> {
        let (column, value) = primary_key(table, record)?;
        self.delete(ctx, table, column, value).await
    }

    /// Read a single record, [`Error::NotFound`] if the query returns no row.
    pub async fn read<R: Record>(
        &self,
        ctx: &RequestContext,
        statement: impl Into<Statement>,
    ) -> Result<R> {
        let statement = statement.into();
        ctx.run(async {
            let mut connection = self.pool.acquire().await?;
            read(&mut *connection, ctx, statement).await
        })
        .await
    }

    /// Read the first record of `table` where `column` equals `value`.
    pub async fn read_by<R: Record>(
        &self,
        ctx: &RequestContext,
        table: &str,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<R> {
        let value = value.into();
        ctx.run(async {
            let mut connection = self.pool.acquire().await?;
            let statement =
                connection
                    .driver()
                    .sql_writer()
                    .write_select(table, column, value, Some(1));
            read(&mut *connection, ctx, statement).await
        })
        .await
    }

    pub async fn batch_read<R: Record>(
        &self,
        ctx: &RequestContext,
        statement: impl Into<Statement>,
    ) -> Result<Vec<R>> {
        let statement = statement.into();
        ctx.run(async {
            let mut connection = self.pool.acquire().await?;
            batch_read(&mut *connection, ctx, statement).await
        })
        .await
    }

    /// Run a raw statement.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        statement: impl Into<Statement>,
    ) -> Result<RowsAffected> {
        let statement = statement.into();
        ctx.run(async {
            let mut connection = self.pool.acquire().await?;
            execute(&mut *connection, ctx, statement).await
        })
        .await
    }

    /// Open a transaction on a dedicated connection.
    pub async fn begin(&self, ctx: &RequestContext) -> Result<TransactionManager<C>> {
        let connection = ctx.run(self.pool.acquire()).await?;
        TransactionManager::begin(connection, ctx, self.policy).await
    }

    /// Write all the records in a single transaction: either all of them or none become visible.
    pub async fn batch_write<'a, R, It>(
        &self,
        ctx: &RequestContext,
        table: &str,
        records: It,
    ) -> Result<RowsAffected>
    where
        R: Record + 'a,
        It: IntoIterator<Item = &'a R>,
    {
        let mut transaction = self.begin(ctx).await?;
        let affected = transaction.batch_write(ctx, table, records).await?;
        transaction.commit(ctx).await?;
        Ok(affected)
    }
}

fn primary_key<R: Record>(table: &str, record: &R) -> Result<(&'static str, Value)> {
    record.primary_key().ok_or_else(|| {
        Error::mapping(format!(
            "The record written to `{table}` has no primary key to match on"
        ))
    })
}
