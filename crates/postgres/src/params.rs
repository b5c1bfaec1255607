use std::{collections::HashMap, error::Error as StdError};

use bytes::BytesMut;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use pgextra_core::Value;
use postgres::{
    Row,
    types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked},
};

type BoxedError = Box<dyn StdError + Sync + Send>;

/// Binds a [`Value`] to whatever parameter type the server inferred.
#[derive(Debug)]
pub(crate) struct SqlParam<'a>(pub(crate) &'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxedError> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(value) => value.to_sql(ty, out),
            Value::Integer(value) => match *ty {
                Type::INT2 => i16::try_from(*value)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*value)?.to_sql(ty, out),
                Type::FLOAT4 | Type::FLOAT8 => SqlParam(&Value::Float(*value as f64)).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            Value::Float(value) => match *ty {
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            Value::Text(value) => value.as_str().to_sql(ty, out),
            Value::Date(value) => value.to_sql(ty, out),
            Value::DateTime(value) => value.to_sql(ty, out),
            Value::DateTimeTz(value) => value.to_sql(ty, out),
            Value::HStore(entries) => entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<HashMap<_, _>>()
                .to_sql(ty, out),
            Value::Json(value) => value.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Converts column `index` of `row` into a [`Value`] by its wire type.
pub(crate) fn decode_column(row: &Row, index: usize) -> Result<Value, postgres::Error> {
    let ty = row.columns()[index].type_();

    let value = match *ty {
        Type::BOOL => get::<bool>(row, index)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, index)?.map(|value| Value::Integer(value.into())),
        Type::INT4 => get::<i32>(row, index)?.map(|value| Value::Integer(value.into())),
        Type::INT8 => get::<i64>(row, index)?.map(Value::Integer),
        Type::OID => get::<u32>(row, index)?.map(|value| Value::Integer(value.into())),
        Type::FLOAT4 => get::<f32>(row, index)?.map(|value| Value::Float(value.into())),
        Type::FLOAT8 => get::<f64>(row, index)?.map(Value::Float),
        Type::DATE => get::<NaiveDate>(row, index)?.map(Value::Date),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, index)?.map(Value::DateTime),
        Type::TIMESTAMPTZ => get::<DateTime<FixedOffset>>(row, index)?.map(Value::DateTimeTz),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, index)?.map(Value::Json),
        _ if ty.name() == "hstore" && matches!(ty.kind(), Kind::Simple) => {
            get::<HashMap<String, Option<String>>>(row, index)?
                .map(|entries| Value::HStore(entries.into_iter().collect()))
        }
        _ if <String as FromSql<'_>>::accepts(ty) => get::<String>(row, index)?.map(Value::Text),
        _ => get::<RawText>(row, index)?.map(|raw| Value::Text(raw.0)),
    };

    Ok(value.unwrap_or(Value::Null))
}

/// Anything without a dedicated mapping, kept as its wire bytes.
struct RawText(String);

impl<'a> FromSql<'a> for RawText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxedError> {
        Ok(Self(String::from_utf8_lossy(raw).into_owned()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn get<'a, T>(row: &'a Row, index: usize) -> Result<Option<T>, postgres::Error>
where
    T: FromSql<'a>,
{
    row.try_get::<_, Option<T>>(index)
}
