//! Registration, login and token based lookup of [`User`] accounts.

use crate::{
    Connection, Engine, Error, Record, RequestContext, User,
    session::{SessionCodec, SessionError},
};
use argon2::{
    Argon2, Params,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;

const USERNAME_LENGTH: (usize, usize) = (8, 15);
const PASSWORD_MIN_LENGTH: usize = 12;
const NAME_MAX_LENGTH: usize = 50;

/// What a client provides to open an account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Invalid account: {0}")]
    Invalid(String),
    #[error("The username is already taken")]
    UsernameTaken,
    #[error("The e-mail is already registered")]
    EmailTaken,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Could not hash the password: {0}")]
    Hashing(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Persistence(#[from] Error),
}

impl NewAccount {
    pub fn validate(&self) -> Result<(), AccountError> {
        let username = self.username.chars().count();
        if username < USERNAME_LENGTH.0 || username > USERNAME_LENGTH.1 {
            return Err(AccountError::Invalid(format!(
                "the username must be between {} and {} characters long",
                USERNAME_LENGTH.0, USERNAME_LENGTH.1
            )));
        }
        if self.password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(AccountError::Invalid(format!(
                "the password must be at least {PASSWORD_MIN_LENGTH} characters long"
            )));
        }
        if !is_email(&self.email) {
            return Err(AccountError::Invalid(format!(
                "`{}` is not an e-mail address",
                self.email
            )));
        }
        for (field, value) in [("first name", &self.first_name), ("last name", &self.last_name)] {
            if let Some(value) = value
                && value.chars().count() > NAME_MAX_LENGTH
            {
                return Err(AccountError::Invalid(format!(
                    "the {field} must be at most {NAME_MAX_LENGTH} characters long"
                )));
            }
        }
        Ok(())
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Argon2id PHC string of `password`, with the salt used.
pub fn hash_password(password: &str) -> Result<(String, SaltString), AccountError> {
    let params =
        Params::new(19456, 2, 1, None).map_err(|e| AccountError::Hashing(e.to_string()))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AccountError::Hashing(e.to_string()))?
        .to_string();
    Ok((hash, salt))
}

/// Check `password` against a PHC string, the parameters are read from the hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AccountError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AccountError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Username or e-mail uniqueness violated by an insert.
fn taken(error: &Error) -> Option<AccountError> {
    let Error::Query(e) = error.root_cause() else {
        return None;
    };
    let message = format!("{e:#}");
    if !message.contains("UNIQUE constraint failed") {
        None
    } else if message.contains("users.username") {
        Some(AccountError::UsernameTaken)
    } else if message.contains("users.email") {
        Some(AccountError::EmailTaken)
    } else {
        None
    }
}

async fn hash_blocking(password: String) -> Result<(String, SaltString), AccountError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AccountError::Hashing(e.to_string()))?
}

/// Open a new account and log it in.
///
/// The user row and its session token are written in the same transaction.
pub async fn register<C: Connection>(
    engine: &Engine<C>,
    codec: &SessionCodec,
    ctx: &RequestContext,
    account: NewAccount,
) -> Result<(User, String), AccountError> {
    account.validate()?;
    let (username_taken, email_taken) =
        User::username_and_email_exist(engine, ctx, &account.username, &account.email).await?;
    if username_taken {
        return Err(AccountError::UsernameTaken);
    }
    if email_taken {
        return Err(AccountError::EmailTaken);
    }
    let (hash, salt) = hash_blocking(account.password).await?;
    let mut user = User::new(account.username, account.email);
    user.user_password = hash;
    user.salt = salt.as_str().as_bytes().to_vec();
    user.first_name = account.first_name;
    user.last_name = account.last_name;

    let mut transaction = engine.begin(ctx).await?;
    if let Err(e) = transaction.write(ctx, User::table_name(), &user).await {
        // Lost the race against a concurrent registration
        return Err(taken(&e).unwrap_or_else(|| e.into()));
    }
    let token = codec.issue(&user.username)?;
    user.session_token = Some(token.clone());
    transaction
        .update(ctx, User::table_name(), &user, "user_id", user.user_id.as_str())
        .await?;
    transaction.commit(ctx).await?;
    log::info!("[{}] Registered user {}", ctx.trace_id, user.user_id);
    Ok((user, token))
}

/// Check the credentials and issue a fresh token.
pub async fn login<C: Connection>(
    engine: &Engine<C>,
    codec: &SessionCodec,
    ctx: &RequestContext,
    username: &str,
    password: &str,
) -> Result<(User, String), AccountError> {
    let mut user = match User::find_by_username(engine, ctx, username).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return Err(AccountError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };
    let hash = user.user_password.clone();
    let candidate = password.to_string();
    let valid = tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
        .await
        .map_err(|e| AccountError::Hashing(e.to_string()))??;
    if !valid {
        log::debug!("[{}] Wrong password for {}", ctx.trace_id, username);
        return Err(AccountError::InvalidCredentials);
    }
    let token = codec.issue(&user.username)?;
    user.session_token = Some(token.clone());
    user.save(engine, ctx).await?;
    Ok((user, token))
}

/// Account behind an `Authorization` header value.
pub async fn current_user<C: Connection>(
    engine: &Engine<C>,
    codec: &SessionCodec,
    ctx: &RequestContext,
    header: Option<&str>,
) -> Result<User, AccountError> {
    let username = codec.authenticate(header)?;
    match User::find_by_username(engine, ctx, &username).await {
        Ok(user) => Ok(user),
        Err(e) if e.is_not_found() => Err(AccountError::InvalidCredentials),
        Err(e) => Err(e.into()),
    }
}
