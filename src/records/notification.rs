use crate::{
    Connection, Engine, Error, Record, RequestContext, Result, Statement, records::new_id,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Record, Serialize, Deserialize)]
#[record(name = "notifications")]
pub struct Notification {
    #[record(primary_key)]
    pub notification_id: String,
    pub user_id: String,
    #[record(name = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_read: bool,
}

impl Notification {
    pub fn new(
        user_id: impl Into<String>,
        kind: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            notification_id: new_id(),
            user_id: user_id.into(),
            kind: kind.into(),
            content: content.into(),
            created_at: OffsetDateTime::now_utc(),
            is_read: false,
        }
    }

    pub async fn list_for_user<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        user_id: &str,
    ) -> Result<Vec<Notification>> {
        engine
            .batch_read(
                ctx,
                Statement::new(
                    "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
                )
                .bind(user_id),
            )
            .await
    }

    pub async fn mark_as_read<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        notification_id: &str,
    ) -> Result<()> {
        let affected = engine
            .execute(
                ctx,
                Statement::new("UPDATE notifications SET is_read = $1 WHERE notification_id = $2")
                    .bind(true)
                    .bind(notification_id),
            )
            .await?;
        if affected.rows_affected == 0 {
            return Err(Error::not_found(format!(
                "No notification with id `{notification_id}`"
            )));
        }
        Ok(())
    }
}
