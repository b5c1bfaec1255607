use std::fmt::Write as _;

use chrono::{
    NaiveDateTime,
    format::{Item, StrftimeItems},
};

use super::TimePartitionSize;
use crate::{PartitioningError, Result, Value};

const BOUND_FORMAT: &str = "%Y-%m-%d %H:00";

/// A strftime pattern checked up front, so rendering names cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFormat(String);

impl NameFormat {
    pub fn parse(format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(PartitioningError::InvalidNameFormat { format }.into());
        }
        Ok(Self(format))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One time bucket of a range partitioned table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePartition {
    size: TimePartitionSize,
    start: NaiveDateTime,
    end: NaiveDateTime,
    name: String,
}

impl TimePartition {
    #[must_use]
    pub fn new(size: TimePartitionSize, start: NaiveDateTime, name_format: Option<&NameFormat>) -> Self {
        let format = name_format.map_or(size.unit().name_format(), NameFormat::as_str);
        let mut name = String::new();
        write!(name, "{}", start.format(format)).expect("validated name format should render");

        Self {
            size,
            start,
            end: size.advance(start),
            name: name.to_lowercase(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn size(&self) -> TimePartitionSize {
        self.size
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    #[must_use]
    pub fn from_values(&self) -> Vec<Value> {
        vec![Value::Text(self.start.format(BOUND_FORMAT).to_string())]
    }

    #[must_use]
    pub fn to_values(&self) -> Vec<Value> {
        vec![Value::Text(self.end.format(BOUND_FORMAT).to_string())]
    }
}
