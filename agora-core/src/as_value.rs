use crate::{Error, Result, Value};
use std::any;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// Records are projected into columns through this trait and rows are decoded
/// back with it. Decoding accepts the canonical variant of the type and the
/// encodings a store may use for it (integers for booleans, text for
/// timestamps and UUIDs), always checking ranges.
///
/// ```rust
/// use agora_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i32 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// The NULL of this type.
    fn as_empty_value() -> Value;
    /// Convert into the owned [`Value`] representation.
    fn as_value(self) -> Value;
    /// Attempt to convert a dynamic [`Value`] into `Self`.
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// True when the value holds nothing and must be left out of a projection.
    ///
    /// Only empty optionals are absent, a NULL of a non optional type is not.
    fn is_absent(&self) -> bool {
        false
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn mismatch<T>(value: &Value) -> Error {
    Error::mapping(format!(
        "Cannot convert {} value {} into {}",
        value.type_name(),
        value,
        any::type_name::<T>(),
    ))
}

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(Some(v)) => Ok(v),
            Value::Int32(Some(v @ (0 | 1))) => Ok(v == 1),
            Value::Int64(Some(v @ (0 | 1))) => Ok(v == 1),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for i32 {
    fn as_empty_value() -> Value {
        Value::Int32(None)
    }
    fn as_value(self) -> Value {
        Value::Int32(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int32(Some(v)) => Ok(v),
            Value::Int64(Some(v)) => i32::try_from(v).map_err(|_| {
                Error::mapping(format!("Value {v}: i64 is out of range for i32"))
            }),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for i64 {
    fn as_empty_value() -> Value {
        Value::Int64(None)
    }
    fn as_value(self) -> Value {
        Value::Int64(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int64(Some(v)) => Ok(v),
            Value::Int32(Some(v)) => Ok(v as i64),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for f64 {
    fn as_empty_value() -> Value {
        Value::Float64(None)
    }
    fn as_value(self) -> Value {
        Value::Float64(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float64(Some(v)) => Ok(v),
            Value::Int32(Some(v)) => Ok(v as f64),
            Value::Int64(Some(v)) => {
                let result = v as f64;
                if result as i64 != v {
                    return Err(Error::mapping(format!(
                        "Value {v}: i64 cannot be represented exactly as f64"
                    )));
                }
                Ok(result)
            }
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Uuid(Some(v)) => Ok(v.to_string()),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v.into_vec()),
            Value::Varchar(Some(v)) => Ok(v.into_bytes()),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for OffsetDateTime {
    fn as_empty_value() -> Value {
        Value::Timestamp(None)
    }
    fn as_value(self) -> Value {
        Value::Timestamp(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(Some(v)) => Ok(v),
            Value::Varchar(Some(v)) => OffsetDateTime::parse(&v, &Rfc3339)
                .map_err(|e| Error::mapping(format!("Cannot parse `{v}` as a timestamp: {e}"))),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for Uuid {
    fn as_empty_value() -> Value {
        Value::Uuid(None)
    }
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(Some(v)) => Ok(v),
            Value::Varchar(Some(v)) => Uuid::parse_str(&v)
                .map_err(|e| Error::mapping(format!("Cannot parse `{v}` as a uuid: {e}"))),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn store_encodings_are_accepted() {
        assert!(bool::try_from_value(Value::Int64(Some(1))).unwrap());
        assert!(bool::try_from_value(Value::Int64(Some(2))).is_err());
        assert_eq!(i32::try_from_value(Value::Int64(Some(-4))).unwrap(), -4);
        assert!(i32::try_from_value(Value::Int64(Some(i64::MAX))).is_err());
        assert_eq!(f64::try_from_value(Value::Int64(Some(3))).unwrap(), 3.0);
        assert_eq!(
            OffsetDateTime::try_from_value(Value::Varchar(Some("2024-05-01T10:20:30Z".into())))
                .unwrap(),
            datetime!(2024-05-01 10:20:30 UTC)
        );
    }

    #[test]
    fn optionals() {
        assert!(None::<String>.is_absent());
        assert!(!Some(String::new()).is_absent());
        assert!(!0i32.is_absent());
        assert_eq!(Option::<i64>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<i64>::try_from_value(Value::Int64(Some(9))).unwrap(),
            Some(9)
        );
        assert!(matches!(None::<bool>.as_value(), Value::Boolean(None)));
    }

    #[test]
    fn mismatch_is_a_mapping_error() {
        let error = String::try_from_value(Value::Int64(Some(1))).unwrap_err();
        assert!(matches!(error, Error::Mapping(..)));
        assert!(i64::try_from_value(Value::Null).is_err());
    }
}
