use crate::{
    CBox, SqliteDriver,
    bind::bind_params,
    error_message,
    extract::{extract_name, extract_value},
};
use agora_core::{
    Connection, Context, Driver, Error, Executor, QueryResult, Result, RowLabeled, RowNames,
    RowsAffected, Statement, stream::Stream, truncate_long,
};
use async_stream::stream;
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, CString, c_char, c_int},
    ptr,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::task::spawn_blocking;

/// Milliseconds a statement waits on a locked database before failing.
const BUSY_TIMEOUT_MS: c_int = 5000;

/// A connection to an SQLite database.
///
/// Every call runs on the blocking thread pool, one at a time per connection.
pub struct SqliteConnection {
    pub(crate) connection: Arc<Mutex<CBox<sqlite3>>>,
}

impl SqliteConnection {
    fn open(uri: &CString) -> anyhow::Result<CBox<sqlite3>> {
        unsafe {
            let mut connection = CBox::new(ptr::null_mut(), |p| {
                sqlite3_close(p);
            });
            let rc = sqlite3_open_v2(
                uri.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI,
                ptr::null(),
            );
            if rc != SQLITE_OK {
                anyhow::bail!("{}", error_message(*connection));
            }
            sqlite3_extended_result_codes(*connection, 1);
            sqlite3_busy_timeout(*connection, BUSY_TIMEOUT_MS);
            Ok(connection)
        }
    }
}

/// Run every statement of `statement.sql` and collect what they produce.
///
/// Parameters are only accepted when the text holds a single statement.
unsafe fn run_statement(
    db: *mut sqlite3,
    statement: &Statement,
) -> anyhow::Result<Vec<QueryResult>> {
    unsafe {
        let sql = CString::new(statement.sql.as_bytes())
            .context("Could not create a CString from the query String")?;
        let mut results = Vec::new();
        let mut tail: *const c_char = sql.as_ptr();
        let mut first = true;
        while !tail.is_null() && *tail != 0 {
            let mut prepared = CBox::new(ptr::null_mut(), |p| {
                sqlite3_finalize(p);
            });
            let current = tail;
            let rc = sqlite3_prepare_v2(db, current, -1, &mut *prepared, &mut tail);
            if rc != SQLITE_OK {
                anyhow::bail!("{}", error_message(db));
            }
            if prepared.is_null() {
                // Only whitespace or comments left
                break;
            }
            if first {
                first = false;
                if !statement.params.is_empty() {
                    let remaining = CStr::from_ptr(tail).to_string_lossy();
                    if !remaining.trim().is_empty() {
                        anyhow::bail!(
                            "Parameters can only be used with a single statement, found more after: {}",
                            truncate_long!(CStr::from_ptr(current).to_string_lossy())
                        );
                    }
                }
                bind_params(*prepared, &statement.params)?;
            } else {
                bind_params(*prepared, &[])?;
            }
            let count = sqlite3_column_count(*prepared);
            let labels: RowNames = (0..count)
                .map(|i| extract_name(*prepared, i))
                .collect::<anyhow::Result<_>>()?;
            let changes_before = sqlite3_total_changes(db);
            loop {
                match sqlite3_step(*prepared) {
                    SQLITE_ROW => {
                        let values = (0..count)
                            .map(|i| extract_value(*prepared, i))
                            .collect::<anyhow::Result<_>>()?;
                        results.push(RowLabeled::new(labels.clone(), values).into());
                    }
                    SQLITE_DONE => break,
                    _ => anyhow::bail!("{}", error_message(db)),
                }
            }
            if count == 0 {
                let changed = sqlite3_total_changes(db) != changes_before;
                results.push(
                    RowsAffected {
                        rows_affected: if changed {
                            sqlite3_changes(db) as u64
                        } else {
                            0
                        },
                        last_affected_id: changed.then(|| sqlite3_last_insert_rowid(db)),
                    }
                    .into(),
                );
            }
        }
        Ok(results)
    }
}

impl Executor for SqliteConnection {
    type Driver = SqliteDriver;

    fn driver(&self) -> &Self::Driver {
        &SqliteDriver {}
    }

    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        let connection = self.connection.clone();
        stream! {
            let result = spawn_blocking(move || {
                let connection = connection.lock().unwrap_or_else(PoisonError::into_inner);
                unsafe { run_statement(**connection, &statement) }
                    .with_context(|| format!("While executing: {}", truncate_long!(statement.sql)))
            })
            .await;
            match result {
                Ok(Ok(results)) => {
                    for result in results {
                        yield Ok(result);
                    }
                }
                Ok(Err(e)) => yield Err(Error::Query(e)),
                Err(e) => yield Err(e.into()),
            }
        }
    }
}

impl Connection for SqliteConnection {
    /// Open `sqlite://<path>[?query]`, the path and query are handed to SQLite as a `file:` URI.
    async fn connect(url: &str) -> Result<SqliteConnection> {
        let prefix = format!("{}://", <Self::Driver as Driver>::NAME);
        let Some(path) = url.strip_prefix(&prefix) else {
            let error = Error::query(format!(
                "Expected the sqlite connection url to start with `{prefix}`, found `{url}`"
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        let uri = if path.starts_with("file:") {
            path.to_string()
        } else {
            format!("file:{path}")
        };
        let context = format!("While opening the sqlite database `{url}`");
        let uri = CString::new(uri).context(context.clone())?;
        let connection = spawn_blocking(move || Self::open(&uri))
            .await?
            .context(context)
            .inspect_err(|e| log::error!("{:#}", e))?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }
}
