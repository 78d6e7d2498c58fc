use crate::{Projection, Result, Statement, Value, separated_by};
use std::fmt::Write;

/// Builds the SQL statements of the persistence engine.
///
/// Drivers override the dialect specific bits (placeholders, transaction
/// keywords), statement layout is shared. Every statement is parameterized:
/// values never end up in the SQL text.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + 1;
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', "\"\"");
        out.push('"');
    }

    /// Positional placeholder, `index` starts from 1.
    fn write_placeholder(&self, out: &mut String, index: usize) {
        let _ = write!(out, "${}", index);
    }

    fn write_insert(&self, table: &str, projection: Projection) -> Result<Statement> {
        projection.validate(table)?;
        let (columns, values) = projection.into_parts();
        let mut out = String::with_capacity(64 + columns.len() * 24);
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(&mut out, table);
        out.push_str(" (");
        separated_by(
            &mut out,
            columns.iter(),
            |out, v| self.write_identifier_quoted(out, v),
            ", ",
        );
        out.push_str(") VALUES (");
        separated_by(
            &mut out,
            1..=values.len(),
            |out, i| self.write_placeholder(out, i),
            ", ",
        );
        out.push_str(");");
        Ok(Statement { sql: out, params: values })
    }

    /// The condition value is always bound last, after every projected column,
    /// even when the condition column is projected as well.
    fn write_update(
        &self,
        table: &str,
        projection: Projection,
        condition_column: &str,
        condition_value: Value,
    ) -> Result<Statement> {
        projection.validate(table)?;
        let (columns, mut values) = projection.into_parts();
        let mut out = String::with_capacity(64 + columns.len() * 24);
        out.push_str("UPDATE ");
        self.write_identifier_quoted(&mut out, table);
        out.push_str(" SET ");
        separated_by(
            &mut out,
            columns.iter().enumerate(),
            |out, (i, v)| {
                self.write_identifier_quoted(out, v);
                out.push_str(" = ");
                self.write_placeholder(out, i + 1);
            },
            ", ",
        );
        out.push_str(" WHERE ");
        self.write_identifier_quoted(&mut out, condition_column);
        out.push_str(" = ");
        self.write_placeholder(&mut out, columns.len() + 1);
        out.push(';');
        values.push(condition_value);
        Ok(Statement { sql: out, params: values })
    }

    fn write_delete(&self, table: &str, condition_column: &str, condition_value: Value) -> Statement {
        let mut out = String::with_capacity(64);
        out.push_str("DELETE FROM ");
        self.write_identifier_quoted(&mut out, table);
        out.push_str(" WHERE ");
        self.write_identifier_quoted(&mut out, condition_column);
        out.push_str(" = ");
        self.write_placeholder(&mut out, 1);
        out.push(';');
        Statement {
            sql: out,
            params: vec![condition_value],
        }
    }

    /// `SELECT *` filtered on a single column equality.
    fn write_select(
        &self,
        table: &str,
        condition_column: &str,
        condition_value: Value,
        limit: Option<u32>,
    ) -> Statement {
        let mut out = String::with_capacity(64);
        out.push_str("SELECT * FROM ");
        self.write_identifier_quoted(&mut out, table);
        out.push_str(" WHERE ");
        self.write_identifier_quoted(&mut out, condition_column);
        out.push_str(" = ");
        self.write_placeholder(&mut out, 1);
        if let Some(limit) = limit {
            let _ = write!(out, " LIMIT {}", limit);
        }
        out.push(';');
        Statement {
            sql: out,
            params: vec![condition_value],
        }
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN;");
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT;");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK;");
    }
}

/// Standard SQL with `$n` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub const fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const WRITER: GenericSqlWriter = GenericSqlWriter::new();

    fn projection(columns: &[&'static str]) -> Projection {
        let mut result = Projection::new();
        for (i, column) in columns.iter().enumerate() {
            result.push(*column, Value::Int64(Some(i as i64)));
        }
        result
    }

    #[test]
    fn insert() {
        let statement = WRITER
            .write_insert("likes", projection(&["like_id", "user_id", "post_id"]))
            .unwrap();
        assert_eq!(
            statement.sql,
            r#"INSERT INTO "likes" ("like_id", "user_id", "post_id") VALUES ($1, $2, $3);"#
        );
        assert_eq!(statement.params.len(), 3);
    }

    #[test]
    fn update_binds_the_condition_last() {
        let statement = WRITER
            .write_update(
                "users",
                projection(&["user_id", "username", "email", "rank", "verified"]),
                "user_id",
                Value::Varchar(Some("u1".into())),
            )
            .unwrap();
        assert_eq!(
            statement.sql,
            concat!(
                r#"UPDATE "users" SET "user_id" = $1, "username" = $2, "email" = $3, "#,
                r#""rank" = $4, "verified" = $5 WHERE "user_id" = $6;"#
            )
        );
        assert_eq!(statement.sql.matches(" = $").count(), 6);
        assert_eq!(statement.sql.matches("WHERE").count(), 1);
        assert_eq!(statement.params.len(), 6);
        assert_eq!(
            statement.params.last(),
            Some(&Value::Varchar(Some("u1".into())))
        );
    }

    #[test]
    fn empty_projection_is_rejected() {
        assert!(matches!(
            WRITER.write_insert("users", Projection::new()),
            Err(Error::Mapping(..))
        ));
        assert!(matches!(
            WRITER.write_update("users", Projection::new(), "user_id", Value::Null),
            Err(Error::Mapping(..))
        ));
    }

    #[test]
    fn identifiers_are_escaped() {
        let statement = WRITER.write_delete(
            "weird\"table",
            "id",
            Value::Int32(Some(1)),
        );
        assert_eq!(statement.sql, r#"DELETE FROM "weird""table" WHERE "id" = $1;"#);
        let statement = WRITER.write_select("posts", "user_id", "u1".into(), Some(1));
        assert_eq!(
            statement.sql,
            r#"SELECT * FROM "posts" WHERE "user_id" = $1 LIMIT 1;"#
        );
    }
}
