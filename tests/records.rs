#[cfg(test)]
mod tests {
    use agora::{
        AsValue, Following, Notification, Post, Record, RowLabeled, User, Value,
    };
    use std::sync::Arc;
    use time::macros::datetime;

    #[derive(Debug, Default, PartialEq, Record)]
    struct AuditEvent {
        #[record(primary_key, name = "id")]
        event_id: i64,
        r#type: String,
        detail: Option<String>,
        #[record(skip)]
        seen: bool,
    }

    #[derive(Debug, PartialEq, Record)]
    #[record(name = "tagged")]
    struct Tagged<T: AsValue + Clone> {
        label: String,
        payload: T,
    }

    #[test]
    fn derived_metadata() {
        assert_eq!(AuditEvent::table_name(), "audit_event");
        let columns = AuditEvent::columns();
        assert_eq!(
            columns.iter().map(|v| v.name).collect::<Vec<_>>(),
            ["id", "type", "detail"]
        );
        assert_eq!(columns[0].field, "event_id");
        assert!(columns[0].primary_key);
        assert!(!columns[1].primary_key);
        assert!(columns[2].optional);
        assert!(!columns[1].optional);

        assert_eq!(User::table_name(), "users");
        assert_eq!(User::columns().len(), 21);
        assert!(
            User::columns()
                .iter()
                .filter(|v| v.primary_key)
                .map(|v| v.name)
                .eq(["user_id"])
        );
        assert_eq!(Notification::columns()[2].name, "type");
        assert_eq!(Tagged::<i32>::table_name(), "tagged");
    }

    #[test]
    fn projection_skips_empty_optionals() {
        let mut event = AuditEvent {
            event_id: 7,
            r#type: "login".into(),
            detail: None,
            seen: true,
        };
        let projection = event.project();
        assert_eq!(projection.columns(), ["id", "type"]);
        assert_eq!(
            projection.values(),
            [Value::Int64(Some(7)), Value::Varchar(Some("login".into()))]
        );
        assert_eq!(projection, event.project());

        event.detail = Some("from a new device".into());
        assert_eq!(event.project().columns(), ["id", "type", "detail"]);
        assert_eq!(
            event.project().get("detail"),
            Some(&Value::Varchar(Some("from a new device".into())))
        );

        let tagged = Tagged {
            label: "answer".into(),
            payload: 42i32,
        };
        assert_eq!(tagged.project().values()[1], Value::Int32(Some(42)));
    }

    #[test]
    fn primary_keys() {
        let event = AuditEvent {
            event_id: 3,
            ..Default::default()
        };
        assert_eq!(event.primary_key(), Some(("id", Value::Int64(Some(3)))));
        let post = Post::new("u1", "hello");
        assert_eq!(
            post.primary_key(),
            Some(("post_id", Value::Varchar(Some(post.post_id.clone()))))
        );
        assert_eq!(Following::new("a", "b").primary_key(), None);
    }

    #[test]
    fn from_row() {
        let row = RowLabeled::new(
            Arc::from(vec!["detail".to_string(), "type".to_string(), "id".to_string()]),
            vec![
                Value::Null,
                Value::Varchar(Some("logout".into())),
                Value::Int64(Some(11)),
            ]
            .into_boxed_slice(),
        );
        assert_eq!(
            AuditEvent::from_row(row).unwrap(),
            AuditEvent {
                event_id: 11,
                r#type: "logout".into(),
                detail: None,
                seen: false,
            }
        );

        // Store encodings of booleans, timestamps and blobs
        let row = RowLabeled::new(
            Arc::from(
                ["notification_id", "user_id", "type", "content", "created_at", "is_read"]
                    .map(String::from)
                    .to_vec(),
            ),
            vec![
                Value::Varchar(Some("n1".into())),
                Value::Varchar(Some("u1".into())),
                Value::Varchar(Some("like".into())),
                Value::Varchar(Some("Someone liked your post".into())),
                Value::Varchar(Some("2024-02-29T23:59:59Z".into())),
                Value::Int64(Some(1)),
            ]
            .into_boxed_slice(),
        );
        let notification = Notification::from_row(row).unwrap();
        assert_eq!(notification.kind, "like");
        assert_eq!(notification.created_at, datetime!(2024-02-29 23:59:59 UTC));
        assert!(notification.is_read);

        let row = RowLabeled::new(
            Arc::from(vec!["id".to_string()]),
            vec![Value::Int64(Some(1))].into_boxed_slice(),
        );
        let error = AuditEvent::from_row(row).unwrap_err();
        assert!(error.to_string().contains("type"), "{error}");
    }

    #[test]
    fn json() {
        let mut user = User::new("json_user", "json@example.com");
        user.user_password = "$argon2id$secret".into();
        user.salt = b"salt".to_vec();
        user.user_bio = Some("Hi".into());
        user.created_at = datetime!(2024-01-01 00:00:00 UTC);
        user.updated_at = user.created_at;
        let json = serde_json::to_value(&user).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("user_password"));
        assert!(!object.contains_key("salt"));
        assert!(!object.contains_key("first_name"));
        assert_eq!(object["user_bio"], "Hi");
        assert_eq!(object["created_at"], "2024-01-01T00:00:00Z");
        assert_eq!(object["notifications_enabled"], true);

        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back.username, "json_user");
        assert!(back.user_password.is_empty());
        assert_eq!(back.first_name, None);

        let notification = Notification::new("u1", "comment", "New comment");
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "comment");
        assert!(json.get("kind").is_none());
    }
}
