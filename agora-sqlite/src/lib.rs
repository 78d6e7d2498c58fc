mod bind;
mod cbox;
mod connection;
mod driver;
mod extract;
mod sql_writer;

pub(crate) use cbox::*;
pub use connection::*;
pub use driver::*;
pub use sql_writer::*;

use libsqlite3_sys::{sqlite3, sqlite3_errmsg};
use std::ffi::CStr;

/// Message of the last failed call on `db`.
pub(crate) fn error_message(db: *mut sqlite3) -> String {
    if db.is_null() {
        return "Unknown error (no database handle)".into();
    }
    unsafe {
        let message = sqlite3_errmsg(db);
        if message.is_null() {
            "Unknown error (could not extract the error message)".into()
        } else {
            CStr::from_ptr(message).to_string_lossy().into_owned()
        }
    }
}
