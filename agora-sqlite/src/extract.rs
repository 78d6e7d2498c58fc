use agora_core::{Context, Value};
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    slice,
};

unsafe fn column_bytes<'s>(ptr: *const u8, statement: *mut sqlite3_stmt, index: c_int) -> &'s [u8] {
    unsafe {
        let len = sqlite3_column_bytes(statement, index) as usize;
        if ptr.is_null() || len == 0 {
            &[]
        } else {
            slice::from_raw_parts(ptr, len)
        }
    }
}

/// Value of column `index` in the current row.
///
/// The storage class decides the variant, the record decoding narrows it down.
pub(crate) unsafe fn extract_value(
    statement: *mut sqlite3_stmt,
    index: c_int,
) -> anyhow::Result<Value> {
    unsafe {
        let column_type = sqlite3_column_type(statement, index);
        Ok(match column_type {
            SQLITE_NULL => Value::Null,
            SQLITE_INTEGER => Value::Int64(Some(sqlite3_column_int64(statement, index))),
            SQLITE_FLOAT => Value::Float64(Some(sqlite3_column_double(statement, index))),
            SQLITE_BLOB => {
                let ptr = sqlite3_column_blob(statement, index) as *const u8;
                Value::Blob(Some(column_bytes(ptr, statement, index).into()))
            }
            SQLITE_TEXT => {
                let ptr = sqlite3_column_text(statement, index);
                let text = std::str::from_utf8(column_bytes(ptr, statement, index))
                    .with_context(|| format!("Column {index} does not contain valid UTF-8 text"))?;
                Value::Varchar(Some(text.into()))
            }
            _ => anyhow::bail!("Unexpected column type {}", column_type),
        })
    }
}

pub(crate) unsafe fn extract_name(statement: *mut sqlite3_stmt, index: c_int) -> anyhow::Result<String> {
    unsafe {
        let name = sqlite3_column_name(statement, index);
        if name.is_null() {
            anyhow::bail!("Could not read the name of column {}", index);
        }
        Ok(CStr::from_ptr(name)
            .to_str()
            .with_context(|| format!("The name of column {index} is not valid UTF-8"))?
            .into())
    }
}
