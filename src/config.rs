use crate::{
    PoolConfig, RequestContext,
    session::{self, SessionConfig, TokenFormat},
};
use std::{str::FromStr, time::Duration};

/// Settings of the data layer, built once at startup and handed to the constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Deployment name (`ENV`), e.g. `development` or `production`.
    pub environment: String,
    pub database_url: String,
    pub pool: PoolConfig,
    pub session: SessionConfig,
    /// Deadline given to each request.
    pub request_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required variable `{0}`")]
    Missing(&'static str),
    #[error("Invalid value `{value}` for `{key}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("Could not load the .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::Invalid {
                    key,
                    reason: e.to_string(),
                    value,
                })
        }
        _ => Ok(default),
    }
}

const MAX_CONNECTIONS: u64 = 1024;
const MAX_ACQUIRE_TIMEOUT_SECS: u64 = 60 * 60;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// `value` must lie in `1..=max`.
fn in_range(key: &'static str, value: u64, max: u64) -> Result<u64, ConfigError> {
    let reason = if value == 0 {
        "must be greater than zero".to_string()
    } else if value > max {
        format!("must be at most {max}")
    } else {
        return Ok(value);
    };
    Err(ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    })
}

impl Config {
    /// Read the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => log::info!("Loaded the environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration out of any key value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = PoolConfig::default();
        let environment = required(&lookup, "ENV")?;
        let database_url = required(&lookup, "DBCONN")?;
        let max_connections = in_range(
            "DB_MAX_CONNECTIONS",
            parsed(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections as u64)?,
            MAX_CONNECTIONS,
        )?;
        let acquire_timeout = in_range(
            "DB_ACQUIRE_TIMEOUT_SECS",
            parsed(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout.as_secs(),
            )?,
            MAX_ACQUIRE_TIMEOUT_SECS,
        )?;
        let lifetime_hours = in_range(
            "SESSION_TTL_HOURS",
            parsed(
                &lookup,
                "SESSION_TTL_HOURS",
                session::DEFAULT_LIFETIME.whole_hours() as u64,
            )?,
            session::MAX_LIFETIME.whole_hours() as u64,
        )?;
        let format: TokenFormat = parsed(&lookup, "SESSION_FORMAT", TokenFormat::default())?;
        let secret = match format {
            TokenFormat::Signed => required(&lookup, "SESSION_SECRET")?,
            TokenFormat::Legacy => lookup("SESSION_SECRET").unwrap_or_default(),
        };
        let request_timeout = in_range(
            "REQUEST_TIMEOUT_SECS",
            parsed(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            MAX_REQUEST_TIMEOUT_SECS,
        )?;
        let lifetime = time::Duration::hours(lifetime_hours as i64);
        Ok(Self {
            environment,
            database_url,
            pool: PoolConfig {
                max_connections: max_connections as usize,
                acquire_timeout: Duration::from_secs(acquire_timeout),
            },
            session: SessionConfig {
                lifetime,
                format,
                secret,
            },
            request_timeout: Duration::from_secs(request_timeout),
        })
    }

    /// Context of a new request, with the configured deadline.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::new().with_timeout(self.request_timeout)
    }
}
