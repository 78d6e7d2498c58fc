use crate::{
    Connection, Engine, Record, RequestContext, Result, RowsAffected, Statement,
    records::new_id,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Record, Serialize, Deserialize)]
#[record(name = "posts")]
pub struct Post {
    #[record(primary_key)]
    pub post_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Tag attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Record, Serialize, Deserialize)]
#[record(name = "post_tags")]
pub struct PostTag {
    #[record(primary_key)]
    pub post_id: String,
    #[record(primary_key)]
    pub tag_id: String,
}

impl Post {
    pub fn new(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            post_id: new_id(),
            user_id: user_id.into(),
            content: Some(content.into()),
            photo_url: None,
            caption: None,
            latitude: 0.0,
            longitude: 0.0,
            location_name: String::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub async fn find<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        post_id: &str,
    ) -> Result<Post> {
        engine
            .read_by(ctx, Self::table_name(), "post_id", post_id)
            .await
    }

    /// Posts of a user, newest first.
    pub async fn list_by_user<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        user_id: &str,
    ) -> Result<Vec<Post>> {
        engine
            .batch_read(
                ctx,
                Statement::new("SELECT * FROM posts WHERE user_id = $1 ORDER BY created_at DESC")
                    .bind(user_id),
            )
            .await
    }

    pub async fn tags<C: Connection>(
        &self,
        engine: &Engine<C>,
        ctx: &RequestContext,
    ) -> Result<Vec<PostTag>> {
        engine
            .batch_read(
                ctx,
                Statement::new("SELECT * FROM post_tags WHERE post_id = $1 ORDER BY tag_id")
                    .bind(self.post_id.as_str()),
            )
            .await
    }

    /// Write the post together with its tags, atomically.
    pub async fn publish<C: Connection>(
        &self,
        engine: &Engine<C>,
        ctx: &RequestContext,
        tags: &[&str],
    ) -> Result<()> {
        let tags = tags
            .iter()
            .map(|tag| PostTag {
                post_id: self.post_id.clone(),
                tag_id: tag.to_string(),
            })
            .collect::<Vec<_>>();
        let mut transaction = engine.begin(ctx).await?;
        transaction.write(ctx, Self::table_name(), self).await?;
        transaction
            .batch_write(ctx, PostTag::table_name(), &tags)
            .await?;
        transaction.commit(ctx).await
    }

    pub async fn delete<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        post_id: &str,
    ) -> Result<RowsAffected> {
        engine
            .delete(ctx, Self::table_name(), "post_id", post_id)
            .await
    }
}
