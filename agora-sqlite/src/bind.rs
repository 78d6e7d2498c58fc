use crate::error_message;
use agora_core::{Value, truncate_long};
use libsqlite3_sys::*;
use std::ffi::{CStr, c_char, c_int, c_void};
use time::{UtcOffset, format_description::well_known::Rfc3339};

unsafe fn bind_text(statement: *mut sqlite3_stmt, index: c_int, text: &str) -> anyhow::Result<c_int> {
    let len = c_int::try_from(text.len())?;
    Ok(unsafe {
        sqlite3_bind_text(
            statement,
            index,
            text.as_ptr() as *const c_char,
            len,
            SQLITE_TRANSIENT(),
        )
    })
}

/// Position in `params` of the value for the parameter slot `index`.
///
/// SQLite numbers `$n` placeholders by first appearance, so `$n` is resolved by
/// its name. `?n` and `?` already match their slot.
unsafe fn param_position(statement: *mut sqlite3_stmt, index: c_int) -> usize {
    let name = unsafe { sqlite3_bind_parameter_name(statement, index) };
    if !name.is_null()
        && let Some(n) = unsafe { CStr::from_ptr(name) }
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix('$'))
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
    {
        return n - 1;
    }
    (index - 1) as usize
}

/// Bind `params` to the placeholders of `statement`: `$n` and `?n` take the n-th value.
pub(crate) unsafe fn bind_params(
    statement: *mut sqlite3_stmt,
    params: &[Value],
) -> anyhow::Result<()> {
    unsafe {
        let expected = sqlite3_bind_parameter_count(statement) as usize;
        if expected != params.len() {
            anyhow::bail!(
                "The statement expects {} parameters but {} were provided",
                expected,
                params.len()
            );
        }
        sqlite3_clear_bindings(statement);
        for index in 1..=expected as c_int {
            let position = param_position(statement, index);
            let Some(value) = params.get(position) else {
                anyhow::bail!(
                    "Parameter ${} has no value, {} were provided",
                    position + 1,
                    params.len()
                );
            };
            let rc = match value {
                v if v.is_null() => sqlite3_bind_null(statement, index),
                Value::Boolean(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
                Value::Int32(Some(v)) => sqlite3_bind_int(statement, index, *v),
                Value::Int64(Some(v)) => sqlite3_bind_int64(statement, index, *v),
                Value::Float64(Some(v)) => sqlite3_bind_double(statement, index, *v),
                Value::Varchar(Some(v)) => bind_text(statement, index, v)?,
                Value::Blob(Some(v)) => sqlite3_bind_blob(
                    statement,
                    index,
                    v.as_ptr() as *const c_void,
                    c_int::try_from(v.len())?,
                    SQLITE_TRANSIENT(),
                ),
                Value::Timestamp(Some(v)) => {
                    // Stored in UTC so that text ordering matches time ordering
                    let text = v.to_offset(UtcOffset::UTC).format(&Rfc3339)?;
                    bind_text(statement, index, &text)?
                }
                Value::Uuid(Some(v)) => bind_text(statement, index, &v.to_string())?,
                v => anyhow::bail!("Cannot use {:?} as a query parameter", v),
            };
            if rc != SQLITE_OK {
                let sql = sqlite3_sql(statement);
                let sql = if sql.is_null() {
                    String::new()
                } else {
                    CStr::from_ptr(sql).to_string_lossy().into_owned()
                };
                anyhow::bail!(
                    "{} (while binding parameter {} of: {})",
                    error_message(sqlite3_db_handle(statement)),
                    index,
                    truncate_long!(sql)
                );
            }
        }
        Ok(())
    }
}
