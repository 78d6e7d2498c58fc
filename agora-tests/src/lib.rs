mod accounts;
mod engine;
mod pool;
mod records;
mod transaction;

use crate::{
    accounts::accounts,
    engine::{engine_operations, mapping_errors, update_policy},
    pool::pool_limits,
    records::{posts, relations, social, users},
    transaction::{
        transaction_commit, transaction_commit_refused, transaction_deadline, transaction_rollback,
    },
};
use agora::{Connection, Engine, PoolConfig, RequestContext};
use log::LevelFilter;
use std::{env, time::Duration};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Run the whole suite against the database at `url`, bootstrapped with `schema`.
///
/// The database is expected to be empty and to allow concurrent readers
/// while a transaction is open.
pub async fn execute_tests<C: Connection>(url: &str, schema: &str) {
    let engine = Engine::<C>::connect(
        url,
        PoolConfig {
            max_connections: 4,
            acquire_timeout: Duration::from_secs(10),
        },
    )
    .await
    .expect("Could not connect the engine");
    engine
        .execute(&RequestContext::new(), schema)
        .await
        .expect("Could not create the schema");

    engine_operations(&engine).await;
    update_policy(&engine).await;
    mapping_errors(&engine).await;
    transaction_commit(&engine).await;
    transaction_rollback(&engine).await;
    transaction_deadline(&engine).await;
    transaction_commit_refused::<C>(url).await;
    pool_limits::<C>(url).await;
    users(&engine).await;
    posts(&engine).await;
    social(&engine).await;
    relations(&engine).await;
    accounts(&engine).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        let result = { $($code)+ };
        log::set_max_level(level);
        result
    }};
}
