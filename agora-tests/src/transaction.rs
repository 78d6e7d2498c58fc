use crate::{
    engine::{LedgerEntry, entries_of, setup_ledger},
    silent_logs,
};
use agora::{
    Connection, Engine, Error, PoolConfig, Record, RequestContext, Statement, TxState,
};
use std::time::Duration;
use tokio::time::{Instant, sleep};

pub async fn transaction_commit<C: Connection>(engine: &Engine<C>) {
    setup_ledger(engine).await;
    let ctx = RequestContext::new().with_trace_id("transaction-commit");

    let mut transaction = engine
        .begin(&ctx)
        .await
        .expect("Could not begin a transaction");
    assert_eq!(transaction.state(), TxState::Open);
    transaction
        .batch_write(
            &ctx,
            "ledger_entries",
            &[
                LedgerEntry::new("commit-1", "commit", 10),
                LedgerEntry::new("commit-2", "commit", 20),
            ],
        )
        .await
        .expect("Could not write the entries");
    transaction
        .update(
            &ctx,
            "ledger_entries",
            &LedgerEntry::new("commit-2", "commit", 25),
            "entry_id",
            "commit-2",
        )
        .await
        .expect("Could not update the second entry");

    // The transaction sees its own writes, nobody else does
    let inside: Vec<LedgerEntry> = transaction
        .batch_read(
            &ctx,
            Statement::new("SELECT * FROM ledger_entries WHERE account = $1 ORDER BY entry_id")
                .bind("commit"),
        )
        .await
        .expect("Could not read inside the transaction");
    assert_eq!(inside.len(), 2);
    assert_eq!(inside[1].amount, 25);
    assert!(entries_of(engine, "commit").await.is_empty());

    transaction
        .commit(&ctx)
        .await
        .expect("Could not commit the transaction");
    assert_eq!(transaction.state(), TxState::Committed);
    let outside = entries_of(engine, "commit").await;
    assert_eq!(outside, inside);

    // Terminated transactions refuse everything
    silent_logs! {
        let result = transaction
            .write(&ctx, "ledger_entries", &LedgerEntry::new("commit-3", "commit", 30))
            .await;
        assert!(
            matches!(result, Err(Error::InvalidState(TxState::Committed))),
            "{result:?}"
        );
        assert!(matches!(
            transaction.commit(&ctx).await,
            Err(Error::InvalidState(..))
        ));
        assert!(matches!(
            transaction.rollback(&ctx).await,
            Err(Error::InvalidState(..))
        ));
    };
    assert_eq!(entries_of(engine, "commit").await.len(), 2);

    // All or nothing helper
    engine
        .batch_write(
            &ctx,
            "ledger_entries",
            &[
                LedgerEntry::new("commit-4", "commit", 40),
                LedgerEntry::new("commit-5", "commit", 50),
            ],
        )
        .await
        .expect("Could not batch write");
    assert_eq!(entries_of(engine, "commit").await.len(), 4);
}

/// Wait for the rollback scheduled by a dropped transaction to give the connection back.
async fn wait_idle<C: Connection>(engine: &Engine<C>) {
    let max = engine.pool().config().max_connections;
    let start = Instant::now();
    while engine.pool().available() < max {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "The connection of the dropped transaction was never released"
        );
        sleep(Duration::from_millis(10)).await;
    }
}

pub async fn transaction_rollback<C: Connection>(engine: &Engine<C>) {
    setup_ledger(engine).await;
    let ctx = RequestContext::new().with_trace_id("transaction-rollback");

    // A failing batch leaves nothing behind and reports the failing position
    let mut transaction = engine
        .begin(&ctx)
        .await
        .expect("Could not begin a transaction");
    let result = silent_logs! {
        transaction
            .batch_write(
                &ctx,
                "ledger_entries",
                &[
                    LedgerEntry::new("batch-1", "rollback", 1),
                    LedgerEntry::new("batch-2", "rollback", 2),
                    LedgerEntry::new("batch-1", "rollback", 3),
                ],
            )
            .await
    };
    match result {
        Err(Error::Batch { index, source }) => {
            assert_eq!(index, 2);
            assert!(matches!(*source, Error::Query(..)), "{source:?}");
        }
        other => panic!("Expected a batch error, found {other:?}"),
    }
    assert_eq!(transaction.state(), TxState::RolledBack);
    assert!(entries_of(engine, "rollback").await.is_empty());

    // Same through the engine helper
    let result = silent_logs! {
        engine
            .batch_write(
                &ctx,
                "ledger_entries",
                &[
                    LedgerEntry::new("batch-3", "rollback", 3),
                    LedgerEntry::new("batch-3", "rollback", 3),
                ],
            )
            .await
    };
    assert!(
        matches!(result, Err(Error::Batch { index: 1, .. })),
        "{result:?}"
    );
    assert!(entries_of(engine, "rollback").await.is_empty());

    // A read failure rolls back the writes done before it
    let mut transaction = engine
        .begin(&ctx)
        .await
        .expect("Could not begin a transaction");
    transaction
        .write(&ctx, "ledger_entries", &LedgerEntry::new("read-1", "rollback", 1))
        .await
        .expect("Could not write the entry");
    let result = silent_logs! {
        transaction
            .read::<LedgerEntry>(
                &ctx,
                Statement::new("SELECT * FROM ledger_entries WHERE entry_id = $1")
                    .bind("missing"),
            )
            .await
    };
    assert!(matches!(result, Err(Error::NotFound(..))), "{result:?}");
    assert_eq!(transaction.state(), TxState::RolledBack);
    assert!(entries_of(engine, "rollback").await.is_empty());

    // Explicit rollback, exactly once
    let mut transaction = engine
        .begin(&ctx)
        .await
        .expect("Could not begin a transaction");
    transaction
        .write(&ctx, "ledger_entries", &LedgerEntry::new("explicit-1", "rollback", 1))
        .await
        .expect("Could not write the entry");
    transaction
        .rollback(&ctx)
        .await
        .expect("Could not roll back");
    assert_eq!(transaction.state(), TxState::RolledBack);
    let result = silent_logs! { transaction.rollback(&ctx).await };
    assert!(
        matches!(result, Err(Error::InvalidState(TxState::RolledBack))),
        "{result:?}"
    );
    assert!(entries_of(engine, "rollback").await.is_empty());

    // Dropped while open
    let mut transaction = engine
        .begin(&ctx)
        .await
        .expect("Could not begin a transaction");
    transaction
        .write(&ctx, "ledger_entries", &LedgerEntry::new("dropped-1", "rollback", 1))
        .await
        .expect("Could not write the entry");
    silent_logs! {
        drop(transaction);
        wait_idle(engine).await;
    };
    assert!(entries_of(engine, "rollback").await.is_empty());

    // The connections are still usable
    engine
        .insert(&ctx, &LedgerEntry::new("after-1", "rollback", 1))
        .await
        .expect("Could not write after the rollbacks");
    assert_eq!(entries_of(engine, "rollback").await.len(), 1);
}

pub async fn transaction_deadline<C: Connection>(engine: &Engine<C>) {
    setup_ledger(engine).await;
    let ctx = RequestContext::new().with_trace_id("transaction-deadline");
    let expired = ctx.clone().with_deadline(Instant::now());

    let result = silent_logs! {
        engine
            .insert(&expired, &LedgerEntry::new("late-1", "deadline", 1))
            .await
    };
    assert!(matches!(result, Err(Error::DeadlineExceeded)), "{result:?}");
    let result = silent_logs! { engine.begin(&expired).await };
    assert!(matches!(result, Err(Error::DeadlineExceeded)));

    // Expired at commit time: rolled back instead
    let mut transaction = engine
        .begin(&ctx)
        .await
        .expect("Could not begin a transaction");
    transaction
        .write(&ctx, "ledger_entries", &LedgerEntry::new("late-2", "deadline", 2))
        .await
        .expect("Could not write the entry");
    let result = silent_logs! { transaction.commit(&expired).await };
    assert!(matches!(result, Err(Error::DeadlineExceeded)), "{result:?}");
    assert_eq!(transaction.state(), TxState::RolledBack);
    assert!(entries_of(engine, "deadline").await.is_empty());

    // Expired in the middle of the transaction
    let mut transaction = engine
        .begin(&ctx)
        .await
        .expect("Could not begin a transaction");
    transaction
        .write(&ctx, "ledger_entries", &LedgerEntry::new("late-3", "deadline", 3))
        .await
        .expect("Could not write the entry");
    let result = silent_logs! {
        transaction
            .write(
                &expired,
                "ledger_entries",
                &LedgerEntry::new("late-4", "deadline", 4),
            )
            .await
    };
    assert!(matches!(result, Err(Error::DeadlineExceeded)), "{result:?}");
    assert_eq!(transaction.state(), TxState::RolledBack);
    assert!(entries_of(engine, "deadline").await.is_empty());
}

#[derive(Debug, Clone, PartialEq, Record)]
#[record(name = "ledger_claims")]
struct LedgerClaim {
    #[record(primary_key)]
    claim_id: String,
    owner: String,
}

async fn claims_of<C: Connection>(engine: &Engine<C>) -> Vec<LedgerClaim> {
    engine
        .batch_read(
            &RequestContext::new(),
            "SELECT * FROM ledger_claims ORDER BY claim_id",
        )
        .await
        .expect("Could not read the claims")
}

/// Commit refused by the store: the foreign key is only checked at commit time.
///
/// Uses a single connection so the `foreign_keys` pragma applies to the transaction.
pub async fn transaction_commit_refused<C: Connection>(url: &str) {
    let engine = Engine::<C>::connect(
        url,
        PoolConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(10),
        },
    )
    .await
    .expect("Could not connect the engine");
    let ctx = RequestContext::new().with_trace_id("transaction-commit-refused");
    engine
        .execute(
            &ctx,
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS ledger_owners (owner TEXT PRIMARY KEY);
            CREATE TABLE IF NOT EXISTS ledger_claims (
                claim_id TEXT PRIMARY KEY,
                owner TEXT NOT NULL REFERENCES ledger_owners(owner) DEFERRABLE INITIALLY DEFERRED
            );",
        )
        .await
        .expect("Could not create the ledger_claims table");
    // The dangling reference is accepted until the commit
    let mut transaction = engine
        .begin(&ctx)
        .await
        .expect("Could not begin a transaction");
    transaction
        .write(
            &ctx,
            "ledger_claims",
            &LedgerClaim {
                claim_id: "claim-1".into(),
                owner: "nobody".into(),
            },
        )
        .await
        .expect("Could not write the claim");
    let result = silent_logs! { transaction.commit(&ctx).await };
    match result {
        Err(Error::Commit(source)) => assert!(matches!(*source, Error::Query(..)), "{source:?}"),
        other => panic!("Expected a commit error, found {other:?}"),
    }
    assert_eq!(transaction.state(), TxState::Failed);
    let result = silent_logs! { transaction.commit(&ctx).await };
    assert!(
        matches!(result, Err(Error::InvalidState(TxState::Failed))),
        "{result:?}"
    );
    let result = silent_logs! {
        transaction
            .write(
                &ctx,
                "ledger_claims",
                &LedgerClaim {
                    claim_id: "claim-2".into(),
                    owner: "nobody".into(),
                },
            )
            .await
    };
    assert!(
        matches!(result, Err(Error::InvalidState(TxState::Failed))),
        "{result:?}"
    );
    assert!(claims_of(&engine).await.is_empty());

    // The connection was given back clean and the same write commits once the owner exists
    let mut transaction = engine
        .begin(&ctx)
        .await
        .expect("Could not begin a transaction");
    transaction
        .write(
            &ctx,
            "ledger_claims",
            &LedgerClaim {
                claim_id: "claim-3".into(),
                owner: "alice".into(),
            },
        )
        .await
        .expect("Could not write the claim");
    transaction
        .execute(
            &ctx,
            Statement::new("INSERT INTO ledger_owners (owner) VALUES ($1)").bind("alice"),
        )
        .await
        .expect("Could not write the owner");
    transaction
        .commit(&ctx)
        .await
        .expect("Could not commit the transaction");
    assert_eq!(transaction.state(), TxState::Committed);
    let claims = claims_of(&engine).await;
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].owner, "alice");
}
