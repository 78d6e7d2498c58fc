//! Stateless session tokens.
//!
//! A token carries the [`Envelope`] (identity and expiration) and nothing is
//! stored server side: validating a token only needs the token itself (and
//! the key, for signed tokens).

use base64::{Engine as _, engine::general_purpose::STANDARD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use time::{Duration, OffsetDateTime};

/// Lifetime of a freshly issued token.
pub const DEFAULT_LIFETIME: Duration = Duration::hours(48);

/// Longest lifetime a codec accepts.
pub const MAX_LIFETIME: Duration = Duration::days(3650);

/// Payload of a session token.
///
/// Field names and order match the wire format of the existing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(with = "time::serde::rfc3339")]
    pub expiration: OffsetDateTime,
    pub username: String,
}

/// How the envelope is turned into a string.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TokenFormat {
    /// Base64 of the JSON envelope. Anybody can mint one, only accept it from
    /// clients that cannot be migrated yet.
    Legacy,
    /// HS256 JWT over the JSON envelope.
    #[default]
    Signed,
}

impl FromStr for TokenFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(TokenFormat::Legacy),
            "signed" => Ok(TokenFormat::Signed),
            other => Err(format!("expected `signed` or `legacy`, found `{other}`")),
        }
    }
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenFormat::Legacy => "legacy",
            TokenFormat::Signed => "signed",
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub lifetime: Duration,
    pub format: TokenFormat,
    /// Key of signed tokens, unused by the legacy format.
    pub secret: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: DEFAULT_LIFETIME,
            format: TokenFormat::default(),
            secret: String::new(),
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("lifetime", &self.lifetime)
            .field("format", &self.format)
            .field("secret", &"..")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Could not encode the session token: {0}")]
    Encoding(String),
    #[error("Could not decode the session token: {0}")]
    Decoding(String),
    #[error("The session token expired")]
    Expired,
    #[error("No session token was provided")]
    Missing,
}

/// Issues and validates session tokens.
#[derive(Clone)]
pub struct SessionCodec {
    format: TokenFormat,
    lifetime: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCodec")
            .field("format", &self.format)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl SessionCodec {
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        if config.format == TokenFormat::Signed && config.secret.is_empty() {
            return Err(SessionError::Encoding(
                "signed tokens need a non empty secret".into(),
            ));
        }
        if config.lifetime <= Duration::ZERO || config.lifetime > MAX_LIFETIME {
            return Err(SessionError::Encoding(format!(
                "the token lifetime must be positive and at most {MAX_LIFETIME}, found {}",
                config.lifetime
            )));
        }
        if config.format == TokenFormat::Legacy {
            log::warn!("Session tokens use the legacy format: they are not signed and can be forged");
        }
        // The expiration lives in the envelope and is checked after decoding
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        Ok(Self {
            format: config.format,
            lifetime: config.lifetime,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        })
    }

    pub fn signed(secret: &str) -> Result<Self, SessionError> {
        Self::new(&SessionConfig {
            secret: secret.into(),
            ..Default::default()
        })
    }

    pub fn legacy() -> Result<Self, SessionError> {
        Self::new(&SessionConfig {
            format: TokenFormat::Legacy,
            ..Default::default()
        })
    }

    pub fn format(&self) -> TokenFormat {
        self.format
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// New token for `identity`, valid for the configured lifetime.
    pub fn issue(&self, identity: &str) -> Result<String, SessionError> {
        self.issue_at(identity, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, identity: &str, now: OffsetDateTime) -> Result<String, SessionError> {
        if identity.trim().is_empty() {
            return Err(SessionError::Encoding("the identity is empty".into()));
        }
        let expiration = now.checked_add(self.lifetime).ok_or_else(|| {
            SessionError::Encoding(format!("the expiration of a token issued at {now} overflows"))
        })?;
        self.encode(&Envelope {
            expiration,
            username: identity.into(),
        })
    }

    /// Encode an arbitrary envelope, no check is done on its content.
    pub fn encode(&self, envelope: &Envelope) -> Result<String, SessionError> {
        match self.format {
            TokenFormat::Legacy => {
                let json = serde_json::to_vec(envelope)
                    .map_err(|e| SessionError::Encoding(e.to_string()))?;
                Ok(STANDARD.encode(json))
            }
            TokenFormat::Signed => {
                jsonwebtoken::encode(&Header::new(Algorithm::HS256), envelope, &self.encoding_key)
                    .map_err(|e| SessionError::Encoding(e.to_string()))
            }
        }
    }

    /// Envelope of `token`, expired or not.
    pub fn decode(&self, token: &str) -> Result<Envelope, SessionError> {
        match self.format {
            TokenFormat::Legacy => {
                let json = STANDARD
                    .decode(token.trim())
                    .map_err(|e| SessionError::Decoding(e.to_string()))?;
                serde_json::from_slice(&json).map_err(|e| SessionError::Decoding(e.to_string()))
            }
            TokenFormat::Signed => {
                jsonwebtoken::decode::<Envelope>(token.trim(), &self.decoding_key, &self.validation)
                    .map(|v| v.claims)
                    .map_err(|e| SessionError::Decoding(e.to_string()))
            }
        }
    }

    /// Identity carried by `token` if it has not expired yet.
    pub fn validate(&self, token: &str) -> Result<String, SessionError> {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    pub fn validate_at(&self, token: &str, now: OffsetDateTime) -> Result<String, SessionError> {
        let envelope = self.decode(token)?;
        if envelope.username.trim().is_empty() {
            return Err(SessionError::Decoding("the token carries no identity".into()));
        }
        if envelope.expiration <= now {
            return Err(SessionError::Expired);
        }
        Ok(envelope.username)
    }

    /// Identity behind an `Authorization` header value, `Bearer ` prefix optional.
    pub fn authenticate(&self, header: Option<&str>) -> Result<String, SessionError> {
        let token = header.map(str::trim).unwrap_or_default();
        let token = match token.strip_prefix("Bearer") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
            _ => token,
        };
        if token.is_empty() {
            return Err(SessionError::Missing);
        }
        self.validate(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn legacy_wire_format() {
        let codec = SessionCodec::legacy().unwrap();
        let token = codec
            .encode(&Envelope {
                expiration: datetime!(2030-01-02 03:04:05 UTC),
                username: "alice".into(),
            })
            .unwrap();
        let json = STANDARD.decode(&token).unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"expiration":"2030-01-02T03:04:05Z","username":"alice"}"#
        );
    }

    #[test]
    fn format_parsing() {
        assert_eq!("Signed".parse::<TokenFormat>(), Ok(TokenFormat::Signed));
        assert_eq!(" legacy ".parse::<TokenFormat>(), Ok(TokenFormat::Legacy));
        assert!("plain".parse::<TokenFormat>().is_err());
    }

    #[test]
    fn signed_needs_a_secret() {
        assert!(matches!(
            SessionCodec::signed(""),
            Err(SessionError::Encoding(..))
        ));
    }
}
