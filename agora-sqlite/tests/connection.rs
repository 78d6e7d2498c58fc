#[cfg(test)]
mod tests {
    use agora_core::{
        Connection, Executor, QueryResult, Statement, Value,
        stream::TryStreamExt,
    };
    use agora_sqlite::SqliteConnection;
    use agora_tests::{init_logs, silent_logs};
    use std::path::Path;
    use time::macros::datetime;

    #[tokio::test]
    async fn create_database() {
        init_logs();
        let dir = tempfile::tempdir().expect("Could not create a temporary directory");
        let path = dir.path().join("creation.sqlite");
        let path = path.to_str().expect("The temporary path is not UTF-8");
        assert!(!Path::new(path).exists(), "Database file should not exist before test");
        SqliteConnection::connect(&format!("sqlite://{path}?mode=rwc"))
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(path).exists(),
            "Database file should be created after connection"
        );
        SqliteConnection::connect(&format!("sqlite://{path}?mode=ro"))
            .await
            .expect("Could not open the database");
        std::fs::remove_file(path).expect("Could not remove the database file");
        silent_logs! {
            assert!(
                SqliteConnection::connect(&format!("sqlite://{path}?mode=ro"))
                    .await
                    .is_err(),
                "Should not be able to open in read only unexisting database"
            );
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(SqliteConnection::connect("postgres://some_value").await.is_err());
            assert!(SqliteConnection::connect("some_value").await.is_err());
        };
    }

    #[tokio::test]
    async fn statements() {
        init_logs();
        let mut connection = SqliteConnection::connect("sqlite://:memory:")
            .await
            .expect("Could not open the database");

        // Scripts without parameters
        let affected = connection
            .execute(Statement::new(
                "CREATE TABLE samples (id INTEGER PRIMARY KEY, label TEXT, data BLOB, taken TEXT);
                INSERT INTO samples (label) VALUES ('a');
                INSERT INTO samples (label) VALUES ('b');",
            ))
            .await
            .expect("Could not run the script");
        assert_eq!(affected.rows_affected, 2);
        assert_eq!(affected.last_affected_id, Some(2));

        // Positional parameters, repeated ones keep their position
        let affected = connection
            .execute(
                Statement::new("INSERT INTO samples (label, data, taken) VALUES (?1, ?2, ?3)")
                    .bind("c")
                    .bind(vec![0u8, 159, 255])
                    .bind(datetime!(2024-01-01 12:00:00 +02:00)),
            )
            .await
            .expect("Could not insert with parameters");
        assert_eq!(affected.rows_affected, 1);
        let rows = connection
            .fetch(
                Statement::new("SELECT label, data, taken FROM samples WHERE label = $1 OR label = $1")
                    .bind("c"),
            )
            .try_collect::<Vec<_>>()
            .await
            .expect("Could not select");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].names(), ["label", "data", "taken"]);
        assert_eq!(
            rows[0].values(),
            [
                Value::Varchar(Some("c".into())),
                Value::Blob(Some(vec![0, 159, 255].into_boxed_slice())),
                Value::Varchar(Some("2024-01-01T10:00:00Z".into())),
            ]
        );

        // Numbered parameters take their number, whatever the order they appear in
        let rows = connection
            .fetch(
                Statement::new("SELECT $2 AS second, $1 AS first, $2 AS again")
                    .bind("one")
                    .bind(2i64),
            )
            .try_collect::<Vec<_>>()
            .await
            .expect("Could not select");
        assert_eq!(
            rows[0].values(),
            [
                Value::Int64(Some(2)),
                Value::Varchar(Some("one".into())),
                Value::Int64(Some(2)),
            ]
        );
        let affected = connection
            .execute(
                Statement::new("UPDATE samples SET label = $2 WHERE label = $1")
                    .bind("b")
                    .bind("bb"),
            )
            .await
            .expect("Could not update");
        assert_eq!(affected.rows_affected, 1);

        // NULL comes back as NULL
        let rows = connection
            .fetch(Statement::new("SELECT data, 1.5 AS ratio FROM samples WHERE id = 1"))
            .try_collect::<Vec<_>>()
            .await
            .expect("Could not select");
        assert_eq!(rows[0].values(), [Value::Null, Value::Float64(Some(1.5))]);

        // Updates matching nothing affect nothing
        let affected = connection
            .execute(Statement::new("UPDATE samples SET label = 'z' WHERE id = ?1").bind(99i64))
            .await
            .expect("Could not update");
        assert_eq!(affected.rows_affected, 0);

        // Rows and affected counts are both reported by run
        let results = connection
            .run(Statement::new(
                "DELETE FROM samples WHERE label = 'a'; SELECT COUNT(*) AS n FROM samples;",
            ))
            .try_collect::<Vec<_>>()
            .await
            .expect("Could not run");
        assert!(matches!(
            results.as_slice(),
            [QueryResult::Affected(a), QueryResult::Row(r)]
                if a.rows_affected == 1 && r.values() == [Value::Int64(Some(2))]
        ));

        silent_logs! {
            // Parameters with several statements
            let result = connection
                .execute(Statement::new("SELECT ?1; SELECT 2;").bind(1i64))
                .await;
            assert!(result.is_err());
            // Wrong parameter count
            let result = connection
                .execute(Statement::new("SELECT ?1, ?2").bind(1i64))
                .await;
            assert!(result.is_err());
            // A number past the values provided
            let result = connection
                .execute(Statement::new("SELECT $1, $3").bind(1i64).bind(2i64))
                .await;
            assert!(result.is_err());
            // Syntax error
            let result = connection.execute(Statement::new("SELEC 1")).await;
            assert!(result.is_err());
        }
    }
}
