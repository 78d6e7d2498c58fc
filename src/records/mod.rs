//! Entity records of the social network and the queries built on them.
//!
//! Each record maps one table. Queries use `$n` placeholders, `$n` takes the n-th bound value.

mod blocked;
mod comment;
mod flagged;
mod following;
mod like;
mod message;
mod notification;
mod post;
mod user;

pub use blocked::*;
pub use comment::*;
pub use flagged::*;
pub use following::*;
pub use like::*;
pub use message::*;
pub use notification::*;
pub use post::*;
pub use user::*;

use crate::{Connection, Engine, Record, RequestContext, Result, Statement};
use uuid::Uuid;

/// Result of a `SELECT COUNT(*) AS count` query.
#[derive(Debug, Record)]
#[record(name = "count")]
pub(crate) struct Count {
    pub(crate) count: i64,
}

pub(crate) async fn count<C: Connection>(
    engine: &Engine<C>,
    ctx: &RequestContext,
    statement: Statement,
) -> Result<i64> {
    Ok(engine.read::<Count>(ctx, statement).await?.count)
}

/// New textual identifier.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
