#[cfg(test)]
mod tests {
    use agora_core::{Connection, Executor, Statement};
    use agora_sqlite::SqliteConnection;
    use agora_tests::{execute_tests, init_logs};

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sqlite() {
        init_logs();
        let dir = tempfile::tempdir().expect("Could not create a temporary directory");
        let path = dir.path().join("tests.sqlite");
        let url = format!(
            "sqlite://{}?mode=rwc",
            path.to_str().expect("The temporary path is not UTF-8")
        );

        // Readers must not wait for open transactions
        let mut connection = SqliteConnection::connect(&url)
            .await
            .expect("Could not open the database");
        connection
            .execute(Statement::new("PRAGMA journal_mode = WAL;"))
            .await
            .expect("Could not switch to WAL");
        drop(connection);

        execute_tests::<SqliteConnection>(&url, agora::schema::SQLITE).await;
    }
}
