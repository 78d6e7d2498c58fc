use crate::{
    Connection, Engine, Record, RequestContext, Result, Statement, records::new_id,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Direct message. Persisted only, delivery is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Record, Serialize, Deserialize)]
#[record(name = "messages")]
pub struct Message {
    #[record(primary_key)]
    pub message_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub is_read: bool,
}

impl Message {
    pub fn text(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            message_id: new_id(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            content_type: "text".into(),
            content: Some(content.into()),
            media_url: None,
            timestamp: OffsetDateTime::now_utc(),
            is_read: false,
        }
    }

    /// Conversation between two users in both directions, newest first.
    pub async fn list_between<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        a: &str,
        b: &str,
    ) -> Result<Vec<Message>> {
        engine
            .batch_read(
                ctx,
                Statement::new(concat!(
                    "SELECT * FROM messages ",
                    "WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1) ",
                    "ORDER BY timestamp DESC",
                ))
                .bind(a)
                .bind(b),
            )
            .await
    }
}
