use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

/// Values that can appear in a result row or be bound as query parameters.
///
/// This enum is the single dynamically-typed representation used on both
/// sides of the wire: parameter records convert their fields into it, and
/// the row materializer converts it back into concrete field types.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value's kind, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Int(_) => "int",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Bool(_) => "bool",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::Null => "null",
            SqlValue::Json(_) => "json",
            SqlValue::Blob(_) => "blob",
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let SqlValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Boolean view of the value. Integer 0/1 also qualifies, since SQL
    /// Server BIT columns surface as integers through some paths.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(0) => Some(false),
            SqlValue::Int(1) => Some(true),
            _ => None,
        }
    }

    /// Timestamp view of the value. Text in common ISO-ish formats parses
    /// too, since DATETIME columns can arrive as strings.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(value) => Some(*value),
            SqlValue::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let SqlValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Render the value as a `serde_json::Value`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

// Serialized as the natural JSON value rather than an enum tag, so result
// sets render directly as row objects.
impl Serialize for SqlValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SqlValue::Int(i) => serializer.serialize_i64(*i),
            SqlValue::Float(f) => serializer.serialize_f64(*f),
            SqlValue::Text(s) => serializer.serialize_str(s),
            SqlValue::Bool(b) => serializer.serialize_bool(*b),
            SqlValue::Timestamp(dt) => {
                serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S%.f"))
            }
            SqlValue::Null => serializer.serialize_none(),
            SqlValue::Json(value) => value.serialize(serializer),
            SqlValue::Blob(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}

macro_rules! impl_from_for_sql_value {
    ($($source:ty => $variant:ident($conv:expr)),+ $(,)?) => {
        $(
            impl From<$source> for SqlValue {
                fn from(value: $source) -> Self {
                    SqlValue::$variant($conv(value))
                }
            }
        )+
    };
}

impl_from_for_sql_value!(
    i16 => Int(i64::from),
    i32 => Int(i64::from),
    i64 => Int(std::convert::identity),
    f32 => Float(f64::from),
    f64 => Float(std::convert::identity),
    bool => Bool(std::convert::identity),
    String => Text(std::convert::identity),
    NaiveDateTime => Timestamp(std::convert::identity),
    JsonValue => Json(std::convert::identity),
    Vec<u8> => Blob(std::convert::identity),
);

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

/// Fallible conversion from a [`SqlValue`] into a concrete Rust type.
///
/// Implemented for the field types the row materializer can populate and
/// the scalar types `execute_scalar` can return. `None` means the value is
/// incompatible with the target type; the caller decides what that means
/// (the materializer falls back to the field default, the scalar path
/// surfaces an execution error).
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: &SqlValue) -> Option<Self>;
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_int().copied()
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_int().and_then(|i| i32::try_from(*i).ok())
    }
}

impl FromSqlValue for i16 {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_int().and_then(|i| i16::try_from(*i).ok())
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_float()
    }
}

impl FromSqlValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_float().map(|f| f as f32)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_text().map(ToString::to_string)
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_timestamp()
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_blob().map(<[u8]>::to_vec)
    }
}

impl FromSqlValue for JsonValue {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        if let SqlValue::Json(json) = value {
            Some(json.clone())
        } else {
            None
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_sql_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_view_accepts_bit_as_int() {
        assert_eq!(SqlValue::Int(1).as_bool(), Some(true));
        assert_eq!(SqlValue::Int(0).as_bool(), Some(false));
        assert_eq!(SqlValue::Int(2).as_bool(), None);
        assert_eq!(SqlValue::Bool(true).as_bool(), Some(true));
    }

    #[test]
    fn timestamp_view_parses_text() {
        let dt = SqlValue::Text("2024-05-01 13:30:00".to_string())
            .as_timestamp()
            .unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 13:30:00");
    }

    #[test]
    fn option_conversion_maps_null_to_none() {
        assert_eq!(
            <Option<i64>>::from_sql_value(&SqlValue::Null),
            Some(None)
        );
        assert_eq!(
            <Option<i64>>::from_sql_value(&SqlValue::Int(3)),
            Some(Some(3))
        );
        // Non-null but incompatible is a conversion failure, not None.
        assert_eq!(<Option<i64>>::from_sql_value(&SqlValue::Text("x".into())), None);
    }

    #[test]
    fn narrowing_int_conversion_fails_out_of_range() {
        assert_eq!(i32::from_sql_value(&SqlValue::Int(i64::MAX)), None);
        assert_eq!(i16::from_sql_value(&SqlValue::Int(40_000)), None);
        assert_eq!(i32::from_sql_value(&SqlValue::Int(7)), Some(7));
    }

    #[test]
    fn json_rendering_uses_natural_values() {
        assert_eq!(SqlValue::Int(7).to_json(), serde_json::json!(7));
        assert_eq!(SqlValue::Text("a".into()).to_json(), serde_json::json!("a"));
        assert_eq!(SqlValue::Null.to_json(), serde_json::Value::Null);
    }

    #[test]
    fn from_option_produces_null() {
        assert_eq!(SqlValue::from(Option::<i64>::None), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(5i64)), SqlValue::Int(5));
    }
}
