use crate::{
    Connection, Engine, Record, RequestContext, Result, Statement, records::new_id,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Record, Serialize, Deserialize)]
#[record(name = "comments")]
pub struct Comment {
    #[record(primary_key)]
    pub comment_id: String,
    pub user_id: String,
    pub post_id: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Comment {
    pub fn new(
        user_id: impl Into<String>,
        post_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            comment_id: new_id(),
            user_id: user_id.into(),
            post_id: post_id.into(),
            content: content.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Comments of a post, newest first.
    pub async fn list_for_post<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        post_id: &str,
    ) -> Result<Vec<Comment>> {
        engine
            .batch_read(
                ctx,
                Statement::new("SELECT * FROM comments WHERE post_id = $1 ORDER BY created_at DESC")
                    .bind(post_id),
            )
            .await
    }
}
