use crate::{
    Connection, Engine, Record, RequestContext, Result, RowsAffected, Statement,
    records::{count, new_id},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A registered account.
///
/// Credentials (`user_password`, `salt`) are never serialized.
#[derive(Debug, Clone, PartialEq, Record, Serialize, Deserialize)]
#[record(name = "users")]
pub struct User {
    #[record(primary_key)]
    pub user_id: String,
    pub username: String,
    #[serde(skip)]
    pub user_password: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
    pub notifications_enabled: bool,
    pub flagged: i32,
    pub rank: i32,
    pub creator: bool,
    #[serde(skip)]
    pub salt: Vec<u8>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl User {
    /// Fresh account with default settings, credentials still to be set.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            user_id: new_id(),
            username: username.into(),
            user_password: String::new(),
            email: email.into(),
            email_verified: false,
            first_name: None,
            last_name: None,
            user_bio: None,
            birthday: None,
            created_at: now,
            updated_at: now,
            verified: false,
            profile_picture_url: None,
            notifications_enabled: true,
            flagged: 0,
            rank: 0,
            creator: false,
            salt: Vec::new(),
            latitude: 0.0,
            longitude: 0.0,
            session_token: None,
        }
    }

    pub async fn find<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        user_id: &str,
    ) -> Result<User> {
        engine
            .read_by(ctx, Self::table_name(), "user_id", user_id)
            .await
    }

    pub async fn find_by_username<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        username: &str,
    ) -> Result<User> {
        engine
            .read_by(ctx, Self::table_name(), "username", username)
            .await
    }

    pub async fn username_exists<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        username: &str,
    ) -> Result<bool> {
        let statement =
            Statement::new("SELECT COUNT(*) AS count FROM users WHERE username = $1").bind(username);
        Ok(count(engine, ctx, statement).await? > 0)
    }

    pub async fn email_exists<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<bool> {
        let statement =
            Statement::new("SELECT COUNT(*) AS count FROM users WHERE email = $1").bind(email);
        Ok(count(engine, ctx, statement).await? > 0)
    }

    /// Whether the username and the e-mail are already taken, in this order.
    pub async fn username_and_email_exist<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        username: &str,
        email: &str,
    ) -> Result<(bool, bool)> {
        Ok((
            Self::username_exists(engine, ctx, username).await?,
            Self::email_exists(engine, ctx, email).await?,
        ))
    }

    /// Newest accounts first.
    pub async fn list<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>> {
        engine
            .batch_read(
                ctx,
                Statement::new("SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                    .bind(limit)
                    .bind(offset),
            )
            .await
    }

    /// Accounts whose username or e-mail contains `term`, ignoring case.
    pub async fn search<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        term: &str,
    ) -> Result<Vec<User>> {
        let pattern = format!("%{}%", term.to_lowercase());
        engine
            .batch_read(
                ctx,
                Statement::new(
                    "SELECT * FROM users WHERE LOWER(username) LIKE $1 OR LOWER(email) LIKE $1 ORDER BY username",
                )
                .bind(pattern),
            )
            .await
    }

    /// Write the current state, refreshing `updated_at`.
    pub async fn save<C: Connection>(
        &mut self,
        engine: &Engine<C>,
        ctx: &RequestContext,
    ) -> Result<RowsAffected> {
        self.updated_at = OffsetDateTime::now_utc();
        engine.update_record(ctx, Self::table_name(), self).await
    }

    pub async fn delete<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        user_id: &str,
    ) -> Result<RowsAffected> {
        engine
            .delete(ctx, Self::table_name(), "user_id", user_id)
            .await
    }
}
