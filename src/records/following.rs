use crate::{Connection, Engine, Record, RequestContext, Result, RowsAffected, Statement};
use serde::{Deserialize, Serialize};

/// `follower_id` follows `following_id`.
#[derive(Debug, Clone, PartialEq, Eq, Record, Serialize, Deserialize)]
#[record(name = "followings")]
pub struct Following {
    #[record(primary_key)]
    pub follower_id: String,
    #[record(primary_key)]
    pub following_id: String,
}

impl Following {
    pub fn new(follower_id: impl Into<String>, following_id: impl Into<String>) -> Self {
        Self {
            follower_id: follower_id.into(),
            following_id: following_id.into(),
        }
    }

    pub async fn find<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Following> {
        engine
            .read(
                ctx,
                Statement::new(
                    "SELECT * FROM followings WHERE follower_id = $1 AND following_id = $2",
                )
                .bind(follower_id)
                .bind(following_id),
            )
            .await
    }

    pub async fn unfollow<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        follower_id: &str,
        following_id: &str,
    ) -> Result<RowsAffected> {
        engine
            .execute(
                ctx,
                Statement::new("DELETE FROM followings WHERE follower_id = $1 AND following_id = $2")
                    .bind(follower_id)
                    .bind(following_id),
            )
            .await
    }

    /// Who follows `user_id`.
    pub async fn list_followers<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        user_id: &str,
    ) -> Result<Vec<Following>> {
        engine
            .batch_read(
                ctx,
                Statement::new(
                    "SELECT * FROM followings WHERE following_id = $1 ORDER BY follower_id",
                )
                .bind(user_id),
            )
            .await
    }

    /// Who `user_id` follows.
    pub async fn list_followings<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        user_id: &str,
    ) -> Result<Vec<Following>> {
        engine
            .batch_read(
                ctx,
                Statement::new(
                    "SELECT * FROM followings WHERE follower_id = $1 ORDER BY following_id",
                )
                .bind(user_id),
            )
            .await
    }
}
