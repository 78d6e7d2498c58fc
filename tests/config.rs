#[cfg(test)]
mod tests {
    use agora::{
        config::{Config, ConfigError},
        session::TokenFormat,
    };
    use std::{collections::HashMap, time::Duration};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[
            ("ENV", "development"),
            ("DBCONN", "sqlite://agora.sqlite"),
            ("SESSION_SECRET", "s3cr3t"),
        ]))
        .unwrap();
        assert_eq!(config.environment, "development");
        assert_eq!(config.database_url, "sqlite://agora.sqlite");
        assert_eq!(config.pool.max_connections, 8);
        assert_eq!(config.pool.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.session.lifetime, time::Duration::hours(48));
        assert_eq!(config.session.format, TokenFormat::Signed);
        assert_eq!(config.session.secret, "s3cr3t");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        let ctx = config.request_context();
        assert!(ctx.remaining().unwrap() <= Duration::from_secs(30));
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("ENV", "production"),
            ("DBCONN", "sqlite://prod.sqlite"),
            ("DB_MAX_CONNECTIONS", "32"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "5"),
            ("SESSION_TTL_HOURS", "72"),
            ("SESSION_FORMAT", "Legacy"),
            ("REQUEST_TIMEOUT_SECS", " 12 "),
        ]))
        .unwrap();
        assert_eq!(config.pool.max_connections, 32);
        assert_eq!(config.pool.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.session.lifetime, time::Duration::hours(72));
        assert_eq!(config.session.format, TokenFormat::Legacy);
        assert!(config.session.secret.is_empty());
        assert_eq!(config.request_timeout, Duration::from_secs(12));
    }

    #[test]
    fn upper_bounds() {
        let config = Config::from_lookup(lookup(&[
            ("ENV", "production"),
            ("DBCONN", "sqlite://prod.sqlite"),
            ("SESSION_SECRET", "k"),
            ("DB_MAX_CONNECTIONS", "1024"),
            ("SESSION_TTL_HOURS", "87600"),
            ("REQUEST_TIMEOUT_SECS", "86400"),
        ]))
        .unwrap();
        assert_eq!(config.pool.max_connections, 1024);
        assert_eq!(config.session.lifetime, time::Duration::days(3650));
        let codec = agora::session::SessionCodec::new(&config.session).unwrap();
        assert!(codec.issue("valentina").is_ok());
        let ctx = config.request_context();
        assert!(ctx.remaining().unwrap() > Duration::from_secs(86000));
    }

    #[test]
    fn errors() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("DBCONN", "sqlite://a")])),
            Err(ConfigError::Missing("ENV"))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("ENV", "dev"), ("DBCONN", "  ")])),
            Err(ConfigError::Missing("DBCONN"))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("ENV", "dev"), ("DBCONN", "sqlite://a")])),
            Err(ConfigError::Missing("SESSION_SECRET"))
        ));
        let base = [("ENV", "dev"), ("DBCONN", "sqlite://a"), ("SESSION_SECRET", "k")];
        for (key, value) in [
            ("DB_MAX_CONNECTIONS", "0"),
            ("DB_MAX_CONNECTIONS", "many"),
            ("DB_MAX_CONNECTIONS", "100000"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "18446744073709551615"),
            ("SESSION_TTL_HOURS", "-1"),
            ("SESSION_TTL_HOURS", "1000000000"),
            ("SESSION_TTL_HOURS", "9223372036854775807"),
            ("SESSION_FORMAT", "plain"),
            ("REQUEST_TIMEOUT_SECS", "0"),
            ("REQUEST_TIMEOUT_SECS", "18446744073709551615"),
        ] {
            let mut pairs = base.to_vec();
            pairs.push((key, value));
            match Config::from_lookup(lookup(&pairs)) {
                Err(ConfigError::Invalid { key: invalid, .. }) => assert_eq!(invalid, key),
                other => panic!("Expected {key} = {value} to be invalid, found {other:?}"),
            }
        }
    }
}
