use crate::{AsValue, Error, Result, RowLabeled, Value};
use std::iter::zip;

/// Static description of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name in the table.
    pub name: &'static str,
    /// Name of the Rust field holding it.
    pub field: &'static str,
    /// Whether the field is an `Option` (left out of writes when empty).
    pub optional: bool,
    /// Whether the column identifies the row.
    pub primary_key: bool,
}

/// A structured value representing one persisted entity instance.
///
/// Usually implemented with `#[derive(Record)]`. The mapping is fixed at
/// compile time: fields marked `skip` have no column and are never written.
pub trait Record {
    /// Table the record lives in.
    fn table_name() -> &'static str;

    /// Persisted fields, in declaration order.
    fn columns() -> &'static [ColumnDef];

    /// Column projection of the current field values.
    ///
    /// Empty optional fields are left out, the other persisted fields appear in
    /// declaration order.
    fn project(&self) -> Projection;

    /// Build the record back from a row. Columns missing from the row decode as NULL.
    fn from_row(row: RowLabeled) -> Result<Self>
    where
        Self: Sized;

    /// Identifying column and its current value, when the record has a single column primary key.
    fn primary_key(&self) -> Option<(&'static str, Value)> {
        None
    }
}

/// The ordered `(column, value)` pairs derived from a record.
///
/// Columns and values are two index-aligned lists that can only grow together.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Projection {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Append a column with its value.
    pub fn push(&mut self, column: &'static str, value: Value) -> &mut Self {
        self.columns.push(column);
        self.values.push(value);
        self
    }

    /// Append a field unless it is an empty optional.
    pub fn push_field<V: AsValue + Clone>(&mut self, column: &'static str, value: &V) -> &mut Self {
        if !value.is_absent() {
            self.push(column, value.clone().as_value());
        }
        self
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|v| *v == column)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&'static str, &Value)> {
        zip(self.columns.iter().copied(), self.values.iter())
    }

    /// Split into the column list and the value list, still aligned by index.
    pub fn into_parts(self) -> (Vec<&'static str>, Vec<Value>) {
        (self.columns, self.values)
    }

    /// Check the projection can be turned into a statement.
    ///
    /// Hand written `Record` implementations can get this wrong, the derived ones cannot.
    pub fn validate(&self, table: &str) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::mapping(format!(
                "The record for `{table}` has no column to write"
            )));
        }
        for (i, column) in self.columns.iter().enumerate() {
            if column.is_empty() {
                return Err(Error::mapping(format!(
                    "The record for `{table}` has an unnamed column at position {i}"
                )));
            }
            if self.columns[..i].contains(column) {
                return Err(Error::mapping(format!(
                    "The record for `{table}` projects column `{column}` more than once"
                )));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Projection {
    type Item = (&'static str, &'a Value);
    type IntoIter = std::iter::Zip<
        std::iter::Copied<std::slice::Iter<'a, &'static str>>,
        std::slice::Iter<'a, Value>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        zip(self.columns.iter().copied(), self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Profile {
        user_id: String,
        bio: Option<String>,
        rank: i32,
        website: Option<String>,
        cache: u64,
    }

    impl Record for Profile {
        fn table_name() -> &'static str {
            "profiles"
        }
        fn columns() -> &'static [ColumnDef] {
            static COLUMNS: [ColumnDef; 4] = [
                ColumnDef {
                    name: "user_id",
                    field: "user_id",
                    optional: false,
                    primary_key: true,
                },
                ColumnDef {
                    name: "bio",
                    field: "bio",
                    optional: true,
                    primary_key: false,
                },
                ColumnDef {
                    name: "rank",
                    field: "rank",
                    optional: false,
                    primary_key: false,
                },
                ColumnDef {
                    name: "website",
                    field: "website",
                    optional: true,
                    primary_key: false,
                },
            ];
            &COLUMNS
        }
        fn project(&self) -> Projection {
            let mut projection = Projection::with_capacity(4);
            projection
                .push_field("user_id", &self.user_id)
                .push_field("bio", &self.bio)
                .push_field("rank", &self.rank)
                .push_field("website", &self.website);
            projection
        }
        fn from_row(mut row: RowLabeled) -> Result<Self> {
            Ok(Self {
                user_id: row.take("user_id")?,
                bio: row.take("bio")?,
                rank: row.take("rank")?,
                website: row.take("website")?,
                cache: Default::default(),
            })
        }
    }

    fn profile() -> Profile {
        Profile {
            user_id: "u1".into(),
            bio: Some("hello".into()),
            rank: 3,
            website: None,
            cache: 99,
        }
    }

    #[test]
    fn empty_optionals_are_skipped() {
        let projection = profile().project();
        assert_eq!(projection.columns(), ["user_id", "bio", "rank"]);
        assert_eq!(
            projection.values(),
            [
                Value::Varchar(Some("u1".into())),
                Value::Varchar(Some("hello".into())),
                Value::Int32(Some(3)),
            ]
        );
    }

    #[test]
    fn projection_is_stable() {
        let record = profile();
        assert_eq!(record.project(), record.project());
    }

    #[test]
    fn from_row_decodes_and_defaults_skipped_fields() {
        let row = RowLabeled::new(
            Arc::from(vec!["rank".to_string(), "user_id".to_string(), "bio".to_string()]),
            vec![
                Value::Int64(Some(8)),
                Value::Varchar(Some("u2".into())),
                Value::Null,
            ]
            .into_boxed_slice(),
        );
        let profile = Profile::from_row(row).unwrap();
        assert_eq!(profile.user_id, "u2");
        assert_eq!(profile.rank, 8);
        assert_eq!(profile.bio, None);
        assert_eq!(profile.website, None);
        assert_eq!(profile.cache, 0);
    }

    #[test]
    fn missing_required_column_is_a_mapping_error() {
        let row = RowLabeled::new(
            Arc::from(vec!["user_id".to_string()]),
            vec![Value::Varchar(Some("u3".into()))].into_boxed_slice(),
        );
        let error = Profile::from_row(row).err().unwrap();
        assert!(matches!(error, Error::Mapping(..)));
        assert!(error.to_string().contains("rank"));
    }

    #[test]
    fn validate_rejects_bad_projections() {
        assert!(Projection::new().validate("profiles").is_err());
        let mut projection = Projection::new();
        projection
            .push("a", Value::Int32(Some(1)))
            .push("a", Value::Int32(Some(2)));
        assert!(matches!(
            projection.validate("profiles"),
            Err(Error::Mapping(..))
        ));
    }
}
