#[cfg(test)]
mod tests {
    use agora::{
        BlockedUser, Error, GenericSqlWriter, Message, Projection, Record, SqlWriter, User, Value,
    };
    use indoc::indoc;
    use time::macros::datetime;

    const WRITER: GenericSqlWriter = GenericSqlWriter::new();

    #[test]
    fn insert_user() {
        let mut user = User::new("sql_user", "sql@example.com");
        user.user_id = "u-1".into();
        user.created_at = datetime!(2024-04-01 08:00:00 UTC);
        user.updated_at = user.created_at;
        let statement = WRITER.write_insert(User::table_name(), user.project()).unwrap();
        assert_eq!(
            statement.sql,
            indoc! {r#"
                INSERT INTO "users" ("user_id", "username", "user_password", "email", "email_verified", "created_at", "updated_at", "verified", "notifications_enabled", "flagged", "rank", "creator", "salt", "latitude", "longitude") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15);
            "#}
            .trim()
        );
        assert_eq!(statement.params.len(), 15);
        assert_eq!(statement.params[0], Value::Varchar(Some("u-1".into())));
        assert_eq!(
            statement.params[5],
            Value::Timestamp(Some(datetime!(2024-04-01 08:00:00 UTC)))
        );
    }

    #[test]
    fn update_message() {
        let mut message = Message::text("s", "r", "hello");
        message.message_id = "m-1".into();
        message.is_read = true;
        let statement = WRITER
            .write_update(
                Message::table_name(),
                message.project(),
                "message_id",
                "m-1".into(),
            )
            .unwrap();
        assert_eq!(
            statement.sql,
            indoc! {r#"
                UPDATE "messages" SET "message_id" = $1, "sender_id" = $2, "receiver_id" = $3, "content_type" = $4, "content" = $5, "timestamp" = $6, "is_read" = $7 WHERE "message_id" = $8;
            "#}
            .trim()
        );
        assert_eq!(statement.params.len(), 8);
        assert_eq!(statement.params[6], Value::Boolean(Some(true)));
        assert_eq!(statement.params[7], Value::Varchar(Some("m-1".into())));
    }

    #[test]
    fn select_and_delete() {
        let statement = WRITER.write_select("blocked_users", "blocker_id", "b".into(), Some(1));
        assert_eq!(
            statement.sql,
            r#"SELECT * FROM "blocked_users" WHERE "blocker_id" = $1 LIMIT 1;"#
        );
        let statement = WRITER.write_delete(BlockedUser::table_name(), "blocker_id", "b".into());
        assert_eq!(
            statement.sql,
            r#"DELETE FROM "blocked_users" WHERE "blocker_id" = $1;"#
        );
        assert_eq!(statement.params, [Value::Varchar(Some("b".into()))]);
    }

    #[test]
    fn quoted_identifiers() {
        let mut projection = Projection::new();
        projection.push("we\"ird", Value::Int32(Some(1)));
        let statement = WRITER.write_insert("odd \"table\"", projection).unwrap();
        assert_eq!(
            statement.sql,
            r#"INSERT INTO "odd ""table""" ("we""ird") VALUES ($1);"#
        );
    }

    #[test]
    fn invalid_projection() {
        let result = WRITER.write_update("users", Projection::new(), "user_id", Value::Null);
        assert!(matches!(result, Err(Error::Mapping(..))));
    }
}
