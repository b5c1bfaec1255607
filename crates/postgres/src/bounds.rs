use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use pgextra_core::{IntrospectionError, PartitionBound, Result, Value};
use regex::Regex;

static RANGE_BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*FOR VALUES FROM \((.*)\) TO \((.*)\)\s*$")
        .expect("range bound pattern should compile")
});
static LIST_BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*FOR VALUES IN \((.*)\)\s*$").expect("list bound pattern should compile")
});
static HASH_BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*FOR VALUES WITH \(\s*modulus\s+(\d+)\s*,\s*remainder\s+(\d+)\s*\)\s*$")
        .expect("hash bound pattern should compile")
});
static DEFAULT_BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*DEFAULT\s*$").expect("default bound pattern should compile")
});

const DATETIME_TZ_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M%#z"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses `pg_get_expr(relpartbound)` output for a partition of `table`.
pub fn parse_partition_bound(table: &str, bound: &str) -> Result<PartitionBound> {
    if DEFAULT_BOUND.is_match(bound) {
        return Ok(PartitionBound::Default);
    }

    if let Some(captures) = HASH_BOUND.captures(bound) {
        let number = |index: usize| {
            captures[index]
                .parse::<u32>()
                .map_err(|error| operational(table, format!("invalid hash bound `{bound}`: {error}")))
        };
        return Ok(PartitionBound::Hash {
            modulus: number(1)?,
            remainder: number(2)?,
        });
    }

    if bound.trim_start().to_ascii_uppercase().starts_with("FOR VALUES FROM") {
        let captures = RANGE_BOUND
            .captures(bound)
            .ok_or_else(|| operational(table, format!("cannot parse range bound `{bound}`")))?;
        return Ok(PartitionBound::Range {
            from: parse_bound_values(&captures[1]),
            to: parse_bound_values(&captures[2]),
        });
    }

    if let Some(captures) = LIST_BOUND.captures(bound) {
        return Ok(PartitionBound::List(parse_bound_values(&captures[1])));
    }

    Err(IntrospectionError::NotSupported {
        table: table.to_string(),
        message: format!("unsupported partition bound `{bound}`"),
    }
    .into())
}

fn operational(table: &str, message: String) -> pgextra_core::Error {
    IntrospectionError::Operational {
        table: table.to_string(),
        message,
    }
    .into()
}

/// Splits a bound list on commas outside single quotes and coerces every
/// literal.
#[must_use]
pub fn parse_bound_values(raw: &str) -> Vec<Value> {
    split_outside_quotes(raw)
        .iter()
        .map(|literal| coerce_literal(literal))
        .collect()
}

fn split_outside_quotes(raw: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in raw.chars() {
        match ch {
            '\'' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                entries.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        entries.push(current.trim().to_string());
    }

    entries
}

fn unquote(literal: &str) -> &str {
    let literal = literal.trim();
    match literal.rfind("::") {
        Some(cast) if literal.starts_with('\'') && literal[..cast].ends_with('\'') => {
            &literal[..cast]
        }
        _ => literal,
    }
}

/// First match wins: timestamp with offset, timestamp, date, integer,
/// float, then the text itself.
#[must_use]
pub fn coerce_literal(literal: &str) -> Value {
    let literal = unquote(literal);
    let text = if literal.len() >= 2 && literal.starts_with('\'') && literal.ends_with('\'') {
        literal[1..literal.len() - 1].replace("''", "'")
    } else {
        literal.to_string()
    };

    if let Ok(value) = DateTime::parse_from_rfc3339(&text) {
        return Value::DateTimeTz(value);
    }
    if let Some(value) = DATETIME_TZ_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&text, format).ok())
    {
        return Value::DateTimeTz(value);
    }
    if let Some(value) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&text, format).ok())
    {
        return Value::DateTime(value);
    }
    if let Ok(value) = NaiveDate::parse_from_str(&text, DATE_FORMAT) {
        return Value::Date(value);
    }
    if let Ok(value) = text.parse::<i64>() {
        return Value::Integer(value);
    }
    if let Ok(value) = text.parse::<f64>()
        && value.is_finite()
    {
        return Value::Float(value);
    }

    Value::Text(text)
}

#[cfg(test)]
mod tests {
    use super::split_outside_quotes;

    #[test]
    fn commas_inside_quotes_do_not_split() {
        assert_eq!(
            split_outside_quotes("'a,b', 'it''s', 3"),
            vec!["'a,b'".to_string(), "'it''s'".to_string(), "3".to_string()]
        );
    }
}
