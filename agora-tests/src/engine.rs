use crate::silent_logs;
use agora::{
    Connection, Engine, Error, Record, RequestContext, Statement, UpdatePolicy,
};

#[derive(Debug, Clone, PartialEq, Record)]
#[record(name = "ledger_entries")]
pub(crate) struct LedgerEntry {
    #[record(primary_key)]
    pub(crate) entry_id: String,
    pub(crate) account: String,
    pub(crate) amount: i64,
    pub(crate) memo: Option<String>,
    #[record(skip)]
    pub(crate) balance: i64,
}

impl LedgerEntry {
    pub(crate) fn new(entry_id: &str, account: &str, amount: i64) -> Self {
        Self {
            entry_id: entry_id.into(),
            account: account.into(),
            amount,
            memo: None,
            balance: 0,
        }
    }
}

/// Entries of `account`, ordered by id.
pub(crate) async fn entries_of<C: Connection>(
    engine: &Engine<C>,
    account: &str,
) -> Vec<LedgerEntry> {
    engine
        .batch_read(
            &RequestContext::new(),
            Statement::new("SELECT * FROM ledger_entries WHERE account = $1 ORDER BY entry_id")
                .bind(account),
        )
        .await
        .expect("Could not read the ledger entries")
}

pub(crate) async fn setup_ledger<C: Connection>(engine: &Engine<C>) {
    engine
        .execute(
            &RequestContext::new(),
            "CREATE TABLE IF NOT EXISTS ledger_entries (
                entry_id TEXT PRIMARY KEY,
                account TEXT NOT NULL,
                amount BIGINT NOT NULL,
                memo TEXT DEFAULT 'none'
            );",
        )
        .await
        .expect("Could not create the ledger_entries table");
}

pub async fn engine_operations<C: Connection>(engine: &Engine<C>) {
    setup_ledger(engine).await;
    let ctx = RequestContext::new().with_trace_id("engine-operations");

    // Write
    let mut rent = LedgerEntry::new("op-1", "operations", -1200);
    rent.memo = Some("rent".into());
    rent.balance = 99;
    let affected = engine
        .insert(&ctx, &rent)
        .await
        .expect("Could not write the rent entry");
    assert_eq!(affected.rows_affected, 1);
    engine
        .write(&ctx, "ledger_entries", &LedgerEntry::new("op-2", "operations", 3400))
        .await
        .expect("Could not write the second entry");

    // Read, skipped fields come back with their default
    let read: LedgerEntry = engine
        .read_by(&ctx, "ledger_entries", "entry_id", "op-1")
        .await
        .expect("Could not read the rent entry");
    assert_eq!(read.amount, -1200);
    assert_eq!(read.memo.as_deref(), Some("rent"));
    assert_eq!(read.balance, 0);

    // Empty optionals are not written, the table default applies
    let read: LedgerEntry = engine
        .read_by(&ctx, "ledger_entries", "entry_id", "op-2")
        .await
        .expect("Could not read the second entry");
    assert_eq!(read.memo.as_deref(), Some("none"));

    // Update leaves the omitted columns untouched
    let mut update = LedgerEntry::new("op-1", "operations", -1300);
    update.memo = None;
    let affected = engine
        .update_record(&ctx, "ledger_entries", &update)
        .await
        .expect("Could not update the rent entry");
    assert_eq!(affected.rows_affected, 1);
    let read: LedgerEntry = engine
        .read_by(&ctx, "ledger_entries", "entry_id", "op-1")
        .await
        .expect("Could not read the rent entry");
    assert_eq!(read.amount, -1300);
    assert_eq!(read.memo.as_deref(), Some("rent"));

    // Batch read
    let entries = entries_of(engine, "operations").await;
    assert_eq!(
        entries.iter().map(|v| v.entry_id.as_str()).collect::<Vec<_>>(),
        ["op-1", "op-2"]
    );

    // Duplicate primary key
    let duplicate = LedgerEntry::new("op-2", "operations", 1);
    let result = silent_logs! { engine.insert(&ctx, &duplicate).await };
    assert!(matches!(result, Err(Error::Query(..))), "{result:?}");

    // Delete
    let affected = engine
        .delete_record(&ctx, "ledger_entries", &rent)
        .await
        .expect("Could not delete the rent entry");
    assert_eq!(affected.rows_affected, 1);
    let result = engine
        .read_by::<LedgerEntry>(&ctx, "ledger_entries", "entry_id", "op-1")
        .await;
    assert!(matches!(result, Err(Error::NotFound(..))), "{result:?}");
    assert_eq!(entries_of(engine, "operations").await.len(), 1);
}

pub async fn update_policy<C: Connection>(engine: &Engine<C>) {
    setup_ledger(engine).await;
    let ctx = RequestContext::new().with_trace_id("update-policy");
    let ghost = LedgerEntry::new("ghost", "policy", 10);

    assert_eq!(engine.update_policy(), UpdatePolicy::RequireMatch);
    let result = silent_logs! {
        engine
            .update_record(&ctx, "ledger_entries", &ghost)
            .await
    };
    let error = result.expect_err("Updating a missing row must fail");
    assert!(matches!(error, Error::Query(..)), "{error:?}");
    assert!(error.to_string().contains("matched no row"), "{error}");

    let lenient = engine.clone().with_update_policy(UpdatePolicy::Lenient);
    let affected = lenient
        .update_record(&ctx, "ledger_entries", &ghost)
        .await
        .expect("A lenient update of a missing row must succeed");
    assert_eq!(affected.rows_affected, 0);
    assert!(entries_of(engine, "policy").await.is_empty());
}

/// Two columns identify a row, there is no single primary key to match on.
#[derive(Debug, Record)]
#[record(name = "ledger_links")]
struct LedgerLink {
    #[record(primary_key)]
    from_entry: String,
    #[record(primary_key)]
    to_entry: String,
}

pub async fn mapping_errors<C: Connection>(engine: &Engine<C>) {
    setup_ledger(engine).await;
    let ctx = RequestContext::new().with_trace_id("mapping-errors");
    engine
        .insert(&ctx, &LedgerEntry::new("map-1", "mapping", 5))
        .await
        .expect("Could not write the entry");

    // A required column missing from the result
    let result = silent_logs! {
        engine
            .read::<LedgerEntry>(
                &ctx,
                Statement::new("SELECT entry_id, account FROM ledger_entries WHERE entry_id = $1")
                    .bind("map-1"),
            )
            .await
    };
    assert!(matches!(result, Err(Error::Mapping(..))), "{result:?}");

    // A column holding the wrong type
    let result = silent_logs! {
        engine
            .read::<LedgerEntry>(
                &ctx,
                "SELECT 'map-x' AS entry_id, 'mapping' AS account, 'many' AS amount",
            )
            .await
    };
    assert!(matches!(result, Err(Error::Mapping(..))), "{result:?}");

    let link = LedgerLink {
        from_entry: "map-1".into(),
        to_entry: "map-2".into(),
    };
    let result = engine.update_record(&ctx, "ledger_links", &link).await;
    assert!(matches!(result, Err(Error::Mapping(..))), "{result:?}");
    let result = engine.delete_record(&ctx, "ledger_links", &link).await;
    assert!(matches!(result, Err(Error::Mapping(..))), "{result:?}");
}
