use std::fmt::Write as _;

use pgextra_core::Value;

#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[must_use]
pub fn quote_qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(name))
}

#[must_use]
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Inline SQL literal. DDL cannot take bind parameters, so partition
/// bounds and defaults are rendered through this.
#[must_use]
pub fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Integer(value) => value.to_string(),
        Value::Float(value) if value.is_finite() => value.to_string(),
        Value::Float(value) => quote_string(&value.to_string()),
        Value::HStore(_) => format!("{}::hstore", quote_string(&hstore_text(value))),
        Value::Json(json) => quote_string(&json.to_string()),
        other => quote_string(&other.to_string()),
    }
}

#[must_use]
pub fn quote_literals(values: &[Value]) -> String {
    values
        .iter()
        .map(quote_literal)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"key"=>"value"` text form of an hstore value; empty for non-hstore.
#[must_use]
pub fn hstore_text(value: &Value) -> String {
    let Value::HStore(entries) = value else {
        return String::new();
    };

    let mut text = String::new();
    for (index, (key, value)) in entries.iter().enumerate() {
        if index > 0 {
            text.push_str(", ");
        }
        write!(text, "\"{}\"=>", escape_hstore(key)).expect("writing to String should not fail");
        match value {
            Some(value) => write!(text, "\"{}\"", escape_hstore(value))
                .expect("writing to String should not fail"),
            None => text.push_str("NULL"),
        }
    }
    text
}

fn escape_hstore(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
