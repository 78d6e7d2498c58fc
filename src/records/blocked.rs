use crate::{
    Connection, Engine, RequestContext, Result, RowsAffected, Statement, Record,
    records::count,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Record, Serialize, Deserialize)]
#[record(name = "blocked_users")]
pub struct BlockedUser {
    #[record(primary_key)]
    pub blocker_id: String,
    #[record(primary_key)]
    pub blocked_user_id: String,
}

impl BlockedUser {
    pub fn new(blocker_id: impl Into<String>, blocked_user_id: impl Into<String>) -> Self {
        Self {
            blocker_id: blocker_id.into(),
            blocked_user_id: blocked_user_id.into(),
        }
    }

    pub async fn is_blocked<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        blocker_id: &str,
        blocked_user_id: &str,
    ) -> Result<bool> {
        let statement = Statement::new(
            "SELECT COUNT(*) AS count FROM blocked_users WHERE blocker_id = $1 AND blocked_user_id = $2",
        )
        .bind(blocker_id)
        .bind(blocked_user_id);
        Ok(count(engine, ctx, statement).await? > 0)
    }

    pub async fn unblock<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        blocker_id: &str,
        blocked_user_id: &str,
    ) -> Result<RowsAffected> {
        engine
            .execute(
                ctx,
                Statement::new(
                    "DELETE FROM blocked_users WHERE blocker_id = $1 AND blocked_user_id = $2",
                )
                .bind(blocker_id)
                .bind(blocked_user_id),
            )
            .await
    }

    pub async fn list_blocked<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        blocker_id: &str,
    ) -> Result<Vec<BlockedUser>> {
        engine
            .batch_read(
                ctx,
                Statement::new(
                    "SELECT * FROM blocked_users WHERE blocker_id = $1 ORDER BY blocked_user_id",
                )
                .bind(blocker_id),
            )
            .await
    }
}
