use crate::silent_logs;
use agora::{Connection, Engine, Error, Pool, PoolConfig, RequestContext};
use std::time::Duration;

pub async fn pool_limits<C: Connection>(url: &str) {
    assert!(
        Pool::<C>::new(
            url,
            PoolConfig {
                max_connections: 0,
                ..Default::default()
            }
        )
        .is_err(),
        "A pool without connections must be refused"
    );

    let pool = Pool::<C>::connect(
        url,
        PoolConfig {
            max_connections: 2,
            acquire_timeout: Duration::from_millis(100),
        },
    )
    .await
    .expect("Could not connect the pool");
    assert_eq!(pool.available(), 2);

    let first = pool.acquire().await.expect("Could not acquire a connection");
    let second = pool.acquire().await.expect("Could not acquire a connection");
    assert_eq!(pool.available(), 0);
    let result = silent_logs! { pool.acquire().await };
    assert!(matches!(result, Err(Error::Query(..))));

    // Given back on drop
    drop(first);
    assert_eq!(pool.available(), 1);
    let third = pool.acquire().await.expect("Could not acquire a connection");
    drop((second, third));
    assert_eq!(pool.available(), 2);

    // The engine waits on the same bound
    let engine = Engine::new(pool.clone());
    let ctx = RequestContext::new().with_trace_id("pool-limits");
    let held = engine.begin(&ctx).await.expect("Could not begin a transaction");
    let other = pool.acquire().await.expect("Could not acquire a connection");
    let result = silent_logs! { engine.execute(&ctx, "SELECT 1").await };
    assert!(matches!(result, Err(Error::Query(..))), "{result:?}");
    drop(other);
    drop(held);

    pool.close();
    let result = silent_logs! { pool.acquire().await };
    assert!(matches!(result, Err(Error::Query(..))));
}
