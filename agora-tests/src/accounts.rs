use crate::silent_logs;
use agora::{
    Connection, Engine, User,
    accounts::{AccountError, NewAccount, current_user, login, register},
    session::{SessionCodec, SessionError},
    RequestContext,
};

pub async fn accounts<C: Connection>(engine: &Engine<C>) {
    let ctx = RequestContext::new().with_trace_id("accounts");
    let codec = SessionCodec::signed("a secret only the tests know").expect("Could not create the codec");
    let account = NewAccount {
        username: "giuliana_r".into(),
        password: "twelve chars at least".into(),
        email: "giuliana@example.org".into(),
        first_name: Some("Giuliana".into()),
        last_name: None,
    };

    // Register
    let (user, token) = register(engine, &codec, &ctx, account.clone())
        .await
        .expect("Could not register");
    assert_eq!(codec.validate(&token).unwrap(), "giuliana_r");
    assert!(user.user_password.starts_with("$argon2id$"));
    assert!(!user.salt.is_empty());
    let stored = User::find(engine, &ctx, &user.user_id).await.unwrap();
    assert_eq!(stored.session_token.as_deref(), Some(token.as_str()));
    assert_eq!(stored.first_name.as_deref(), Some("Giuliana"));
    assert_eq!(stored.user_password, user.user_password);
    assert!(!stored.email_verified && stored.notifications_enabled);

    // Uniqueness
    let result = register(
        engine,
        &codec,
        &ctx,
        NewAccount {
            email: "other@example.org".into(),
            ..account.clone()
        },
    )
    .await;
    assert!(matches!(result, Err(AccountError::UsernameTaken)), "{result:?}");
    let result = register(
        engine,
        &codec,
        &ctx,
        NewAccount {
            username: "giuliana_2".into(),
            ..account.clone()
        },
    )
    .await;
    assert!(matches!(result, Err(AccountError::EmailTaken)), "{result:?}");
    let result = register(
        engine,
        &codec,
        &ctx,
        NewAccount {
            username: "gr".into(),
            ..account.clone()
        },
    )
    .await;
    assert!(matches!(result, Err(AccountError::Invalid(..))), "{result:?}");

    // Concurrent registrations of the same name, only one wins
    let contender = |email: &str| NewAccount {
        username: "contended".into(),
        email: email.into(),
        ..account.clone()
    };
    let (first, second) = silent_logs! {
        tokio::join!(
            register(engine, &codec, &ctx, contender("first@example.org")),
            register(engine, &codec, &ctx, contender("second@example.org")),
        )
    };
    match (&first, &second) {
        (Ok(..), Err(AccountError::UsernameTaken)) | (Err(AccountError::UsernameTaken), Ok(..)) => {}
        other => panic!("Expected exactly one registration to succeed, found {other:?}"),
    }
    let contender = |username: &str| NewAccount {
        username: username.into(),
        email: "contended@example.org".into(),
        ..account.clone()
    };
    let (first, second) = silent_logs! {
        tokio::join!(
            register(engine, &codec, &ctx, contender("contender_1")),
            register(engine, &codec, &ctx, contender("contender_2")),
        )
    };
    match (&first, &second) {
        (Ok(..), Err(AccountError::EmailTaken)) | (Err(AccountError::EmailTaken), Ok(..)) => {}
        other => panic!("Expected exactly one registration to succeed, found {other:?}"),
    }

    // Login
    let (logged, fresh) = login(engine, &codec, &ctx, "giuliana_r", "twelve chars at least")
        .await
        .expect("Could not log in");
    assert_eq!(logged.user_id, user.user_id);
    assert_eq!(codec.validate(&fresh).unwrap(), "giuliana_r");
    let stored = User::find(engine, &ctx, &user.user_id).await.unwrap();
    assert_eq!(stored.session_token.as_deref(), Some(fresh.as_str()));
    let result = login(engine, &codec, &ctx, "giuliana_r", "twelve chars at most").await;
    assert!(matches!(result, Err(AccountError::InvalidCredentials)), "{result:?}");
    let result = silent_logs! {
        login(engine, &codec, &ctx, "nobody_here", "whatever it is").await
    };
    assert!(matches!(result, Err(AccountError::InvalidCredentials)), "{result:?}");

    // Token to account
    let found = current_user(engine, &codec, &ctx, Some(&format!("Bearer {fresh}")))
        .await
        .expect("Could not resolve the token");
    assert_eq!(found.user_id, user.user_id);
    let result = current_user(engine, &codec, &ctx, None).await;
    assert!(
        matches!(result, Err(AccountError::Session(SessionError::Missing))),
        "{result:?}"
    );
    let other = SessionCodec::signed("another secret").unwrap();
    let result = current_user(engine, &other, &ctx, Some(&fresh)).await;
    assert!(
        matches!(result, Err(AccountError::Session(SessionError::Decoding(..)))),
        "{result:?}"
    );
    let orphan = codec.issue("never_registered").unwrap();
    let result = silent_logs! { current_user(engine, &codec, &ctx, Some(&orphan)).await };
    assert!(matches!(result, Err(AccountError::InvalidCredentials)), "{result:?}");
}
