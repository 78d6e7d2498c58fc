mod as_value;
mod connection;
mod context;
mod driver;
mod engine;
mod error;
mod executor;
mod pool;
mod query;
mod record;
mod sql_writer;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use connection::*;
pub use context::*;
pub use driver::*;
pub use engine::*;
pub use error::*;
pub use executor::*;
pub use pool::*;
pub use query::*;
pub use record::*;
pub use sql_writer::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;
