use std::{cmp::Ordering, collections::BTreeMap, fmt};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Serial,
    BigSerial,
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
    Numeric {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Text,
    Varchar {
        length: Option<u32>,
    },
    Date,
    Time,
    Timestamp {
        with_timezone: bool,
    },
    Json,
    Jsonb,
    Uuid,
    #[serde(rename = "hstore")]
    HStore,
    Custom(String),
}

impl DataType {
    #[must_use]
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Serial | Self::BigSerial)
    }

    /// Column type as rendered in DDL.
    #[must_use]
    pub fn sql(&self) -> String {
        match self {
            Self::Serial => "serial".to_string(),
            Self::BigSerial => "bigserial".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::SmallInt => "smallint".to_string(),
            Self::Integer => "integer".to_string(),
            Self::BigInt => "bigint".to_string(),
            Self::Real => "real".to_string(),
            Self::DoublePrecision => "double precision".to_string(),
            Self::Numeric {
                precision: Some(precision),
                scale: Some(scale),
            } => format!("numeric({precision}, {scale})"),
            Self::Numeric {
                precision: Some(precision),
                scale: None,
            } => format!("numeric({precision})"),
            Self::Numeric { .. } => "numeric".to_string(),
            Self::Text => "text".to_string(),
            Self::Varchar {
                length: Some(length),
            } => format!("varchar({length})"),
            Self::Varchar { length: None } => "varchar".to_string(),
            Self::Date => "date".to_string(),
            Self::Time => "time".to_string(),
            Self::Timestamp {
                with_timezone: true,
            } => "timestamp with time zone".to_string(),
            Self::Timestamp {
                with_timezone: false,
            } => "timestamp".to_string(),
            Self::Json => "json".to_string(),
            Self::Jsonb => "jsonb".to_string(),
            Self::Uuid => "uuid".to_string(),
            Self::HStore => "hstore".to_string(),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Type a foreign key referencing a column of this type takes.
    #[must_use]
    pub fn referenced_as(&self) -> Self {
        match self {
            Self::Serial => Self::Integer,
            Self::BigSerial => Self::BigInt,
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeTz(DateTime<FixedOffset>),
    HStore(BTreeMap<String, Option<String>>),
    Json(serde_json::Value),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Self::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            Self::DateTimeTz(value) => write!(f, "{}", value.to_rfc3339()),
            Self::HStore(entries) => {
                let rendered = entries
                    .iter()
                    .map(|(key, value)| match value {
                        Some(value) => format!("{key}=>{value}"),
                        None => format!("{key}=>NULL"),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                f.write_str(&rendered)
            }
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::Date(_) | Self::DateTime(_) | Self::DateTimeTz(_) => {
                serializer.collect_str(self)
            }
            Self::HStore(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Json(value) => value.serialize(serializer),
        }
    }
}

/// Dates and timestamps come back as `Text`; a SQL literal renders the same
/// either way.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a scalar SQL value or a map of hstore entries")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Value, E> {
        Ok(Value::Integer(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Value, E> {
        i64::try_from(value)
            .map(Value::Integer)
            .map_err(|_| E::custom(format!("integer {value} does not fit in i64")))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Value, E> {
        Ok(Value::Float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Value, E> {
        Ok(Value::Text(value))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, Option<String>>()? {
            entries.insert(key, value);
        }
        Ok(Value::HStore(entries))
    }
}

pub fn float_total_cmp(left: f64, right: f64) -> Ordering {
    left.total_cmp(&right)
}

pub fn value_total_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Float(left), Value::Float(right)) => float_total_cmp(*left, *right).is_eq(),
        _ => left == right,
    }
}
