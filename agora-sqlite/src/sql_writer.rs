use agora_core::SqlWriter;
use std::fmt::Write;

/// SQLite dialect: numbered `?n` placeholders and writers queued at `BEGIN`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_placeholder(&self, out: &mut String, index: usize) {
        let _ = write!(out, "?{}", index);
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN IMMEDIATE;");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{Projection, Value};

    #[test]
    fn numbered_placeholders() {
        let mut projection = Projection::new();
        projection
            .push("title", Value::Varchar(Some("Hello".into())))
            .push("body", Value::Varchar(None));
        let statement = SqliteSqlWriter::default()
            .write_update("posts", projection, "post_id", Value::Int64(Some(7)))
            .unwrap();
        assert_eq!(
            statement.sql,
            r#"UPDATE "posts" SET "title" = ?1, "body" = ?2 WHERE "post_id" = ?3;"#
        );
        let mut sql = String::new();
        SqliteSqlWriter::default().write_transaction_begin(&mut sql);
        assert_eq!(sql, "BEGIN IMMEDIATE;");
    }
}
