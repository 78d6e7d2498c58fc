#[cfg(test)]
mod tests {
    use agora::session::{
        DEFAULT_LIFETIME, Envelope, MAX_LIFETIME, SessionCodec, SessionConfig, SessionError, TokenFormat,
    };
    use base64::{Engine, engine::general_purpose::STANDARD};
    use time::{Duration, OffsetDateTime, macros::datetime};

    fn codecs() -> [SessionCodec; 2] {
        [
            SessionCodec::signed("correct horse battery staple").unwrap(),
            SessionCodec::legacy().unwrap(),
        ]
    }

    #[test]
    fn issue_and_validate() {
        for codec in codecs() {
            let token = codec.issue("valentina").unwrap();
            assert_eq!(codec.validate(&token).unwrap(), "valentina");
            let envelope = codec.decode(&token).unwrap();
            let remaining = envelope.expiration - OffsetDateTime::now_utc();
            assert!(remaining > DEFAULT_LIFETIME - Duration::minutes(1));
            assert!(remaining <= DEFAULT_LIFETIME);
        }
    }

    #[test]
    fn expiration() {
        let now = datetime!(2025-06-01 12:00:00 UTC);
        for codec in codecs() {
            let token = codec.issue_at("valentina", now).unwrap();
            let expiration = now + DEFAULT_LIFETIME;
            assert_eq!(
                codec.validate_at(&token, expiration - Duration::seconds(1)).unwrap(),
                "valentina"
            );
            assert!(matches!(
                codec.validate_at(&token, expiration),
                Err(SessionError::Expired)
            ));
            let stale = codec
                .encode(&Envelope {
                    expiration: datetime!(2020-01-01 00:00:00 UTC),
                    username: "valentina".into(),
                })
                .unwrap();
            assert!(matches!(codec.validate(&stale), Err(SessionError::Expired)));
        }
    }

    #[test]
    fn custom_lifetime() {
        let codec = SessionCodec::new(&SessionConfig {
            lifetime: Duration::hours(72),
            format: TokenFormat::Signed,
            secret: "k".into(),
        })
        .unwrap();
        let now = datetime!(2025-06-01 12:00:00 UTC);
        let token = codec.issue_at("valentina", now).unwrap();
        assert_eq!(
            codec.decode(&token).unwrap().expiration,
            datetime!(2025-06-04 12:00:00 UTC)
        );
        assert!(
            SessionCodec::new(&SessionConfig {
                lifetime: Duration::ZERO,
                format: TokenFormat::Legacy,
                secret: String::new(),
            })
            .is_err()
        );
    }

    #[test]
    fn lifetime_bounds() {
        let config = |lifetime| SessionConfig {
            lifetime,
            format: TokenFormat::Signed,
            secret: "k".into(),
        };
        assert!(SessionCodec::new(&config(MAX_LIFETIME)).is_ok());
        assert!(matches!(
            SessionCodec::new(&config(MAX_LIFETIME + Duration::hours(1))),
            Err(SessionError::Encoding(..))
        ));
        assert!(matches!(
            SessionCodec::new(&config(Duration::hours(1_000_000_000))),
            Err(SessionError::Encoding(..))
        ));
        for codec in codecs() {
            assert!(matches!(
                codec.issue_at("valentina", datetime!(9999-12-31 00:00:00 UTC)),
                Err(SessionError::Encoding(..))
            ));
        }
    }

    #[test]
    fn malformed() {
        for codec in codecs() {
            for token in ["", "not a token", "%%%%", "a.b.c"] {
                assert!(
                    matches!(codec.validate(token), Err(SessionError::Decoding(..))),
                    "{token:?}"
                );
            }
            assert!(matches!(codec.issue(""), Err(SessionError::Encoding(..))));
            assert!(matches!(codec.issue("   "), Err(SessionError::Encoding(..))));
            let anonymous = codec
                .encode(&Envelope {
                    expiration: datetime!(2099-01-01 00:00:00 UTC),
                    username: String::new(),
                })
                .unwrap();
            assert!(matches!(
                codec.validate(&anonymous),
                Err(SessionError::Decoding(..))
            ));
        }
        // Valid base64 that does not hold an envelope
        let legacy = SessionCodec::legacy().unwrap();
        let token = STANDARD.encode(br#"{"username":"valentina"}"#);
        assert!(matches!(
            legacy.validate(&token),
            Err(SessionError::Decoding(..))
        ));
    }

    #[test]
    fn signed_tokens_cannot_be_forged() {
        let codec = SessionCodec::signed("correct horse battery staple").unwrap();
        let token = codec.issue("valentina").unwrap();

        let other = SessionCodec::signed("another key").unwrap();
        assert!(matches!(
            other.validate(&token),
            Err(SessionError::Decoding(..))
        ));

        // Swap the payload keeping the signature
        let forged = SessionCodec::signed("attacker key")
            .unwrap()
            .issue("administrator")
            .unwrap();
        let mut parts = token.split('.').collect::<Vec<_>>();
        parts[1] = forged.split('.').nth(1).unwrap();
        assert!(matches!(
            codec.validate(&parts.join(".")),
            Err(SessionError::Decoding(..))
        ));

        // Legacy tokens are not accepted by a signed codec, and the other way around
        let legacy = SessionCodec::legacy().unwrap();
        let unsigned = legacy.issue("valentina").unwrap();
        assert!(codec.validate(&unsigned).is_err());
        assert!(legacy.validate(&token).is_err());
    }

    #[test]
    fn authenticate() {
        let codec = SessionCodec::signed("correct horse battery staple").unwrap();
        let token = codec.issue("valentina").unwrap();
        assert_eq!(
            codec.authenticate(Some(&format!("Bearer {token}"))).unwrap(),
            "valentina"
        );
        assert_eq!(codec.authenticate(Some(&token)).unwrap(), "valentina");
        assert_eq!(
            codec.authenticate(Some(&format!("  {token}\n"))).unwrap(),
            "valentina"
        );
        assert!(matches!(codec.authenticate(None), Err(SessionError::Missing)));
        assert!(matches!(
            codec.authenticate(Some("Bearer ")),
            Err(SessionError::Missing)
        ));
        assert!(matches!(
            codec.authenticate(Some("Bearer nope")),
            Err(SessionError::Decoding(..))
        ));
    }

    #[test]
    fn config_debug_hides_the_secret() {
        let config = SessionConfig {
            secret: "hunter2".into(),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
        assert_eq!(config.format, TokenFormat::Signed);
        assert_eq!(TokenFormat::Legacy.to_string(), "legacy");
    }
}
