use crate::{
    Connection, Engine, Record, RequestContext, Result, Statement, records::new_id,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Record, Serialize, Deserialize)]
#[record(name = "likes")]
pub struct Like {
    #[record(primary_key)]
    pub like_id: String,
    pub user_id: String,
    pub post_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Like {
    pub fn new(user_id: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            like_id: new_id(),
            user_id: user_id.into(),
            post_id: post_id.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub async fn list_for_post<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        post_id: &str,
    ) -> Result<Vec<Like>> {
        engine
            .batch_read(
                ctx,
                Statement::new("SELECT * FROM likes WHERE post_id = $1 ORDER BY created_at DESC")
                    .bind(post_id),
            )
            .await
    }

    pub async fn list_by_user<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        user_id: &str,
    ) -> Result<Vec<Like>> {
        engine
            .batch_read(
                ctx,
                Statement::new("SELECT * FROM likes WHERE user_id = $1 ORDER BY created_at DESC")
                    .bind(user_id),
            )
            .await
    }
}
