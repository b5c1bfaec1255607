use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DataType, PartitioningOptions, Value, ViewOptions};
use crate::{ConfigError, Result};

pub const PK_ALIAS: &str = "pk";
const SYNTHESIZED_PK_NAME: &str = "id";

/// Identity of a model: app label plus lowercased model name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    pub app_label: String,
    pub model_name: String,
}

impl ModelKey {
    pub fn new(app_label: impl Into<String>, model_name: &str) -> Self {
        Self {
            app_label: app_label.into(),
            model_name: model_name.to_lowercase(),
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HStoreOptions {
    /// Each entry is a group of keys that must be unique together.
    pub uniqueness: Vec<Vec<String>>,
    pub required: Vec<String>,
}

impl HStoreOptions {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uniqueness.is_empty() && self.required.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub data_type: DataType,
    #[serde(default)]
    pub null: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub auto_now: bool,
    #[serde(default)]
    pub auto_now_add: bool,
    #[serde(default, skip_serializing_if = "HStoreOptions::is_empty")]
    pub hstore: HStoreOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignKeyRef>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            column: None,
            data_type,
            null: false,
            primary_key: false,
            unique: false,
            default: None,
            auto_now: false,
            auto_now_add: false,
            hstore: HStoreOptions::default(),
            references: None,
        }
    }

    #[must_use]
    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self
    }

    #[must_use]
    pub fn auto_now_add(mut self) -> Self {
        self.auto_now_add = true;
        self
    }

    #[must_use]
    pub fn hstore_unique<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hstore
            .uniqueness
            .push(keys.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn hstore_required(mut self, key: impl Into<String>) -> Self {
        self.hstore.required.push(key.into());
        self
    }

    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    #[must_use]
    pub fn is_hstore(&self) -> bool {
        self.data_type == DataType::HStore
    }

    /// Value the field would carry right before being saved.
    ///
    /// `add` distinguishes an insert from an update. Fields without a
    /// self-mutating behavior return `prior` unchanged.
    #[must_use]
    pub fn pre_save(&self, prior: Option<&Value>, add: bool, now: DateTime<Utc>) -> Option<Value> {
        if self.auto_now || (self.auto_now_add && add) {
            return Some(self.now_value(now));
        }
        prior.cloned()
    }

    fn now_value(&self, now: DateTime<Utc>) -> Value {
        match self.data_type {
            DataType::Date => Value::Date(now.date_naive()),
            DataType::Timestamp {
                with_timezone: false,
            } => Value::DateTime(now.naive_utc()),
            _ => Value::DateTimeTz(now.fixed_offset()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<String>,
    /// Raw SQL expressions indexed after `fields`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl IndexDef {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            expressions: Vec::new(),
            unique: false,
            condition: None,
        }
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expressions.push(expression.into());
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ConstraintDef {
    Check { name: String, check: String },
    Unique { name: String, fields: Vec<String> },
}

impl ConstraintDef {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Check { name, .. } | Self::Unique { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Plain,
    Partitioned(PartitioningOptions),
    View(ViewOptions),
    MaterializedView(ViewOptions),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDef {
    pub app_label: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_table: Option<String>,
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintDef>,
    /// Composite primary key. Left untouched by partitioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,
    #[serde(default)]
    pub kind: ModelKind,
}

impl ModelDef {
    pub fn builder(app_label: impl Into<String>, name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(app_label, name)
    }

    #[must_use]
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.app_label.clone(), &self.name)
    }

    #[must_use]
    pub fn db_table(&self) -> String {
        self.db_table.clone().unwrap_or_else(|| {
            format!("{}_{}", self.app_label, self.name.to_lowercase())
        })
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    #[must_use]
    pub fn pk_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.primary_key)
    }

    /// Looks a field up by `pk`, by name, then by column.
    #[must_use]
    pub fn resolve_field(&self, name_or_column: &str) -> Option<&FieldDef> {
        if name_or_column == PK_ALIAS {
            return self.pk_field();
        }
        self.field(name_or_column).or_else(|| {
            self.fields
                .iter()
                .find(|field| field.column() == name_or_column)
        })
    }

    #[must_use]
    pub fn partitioning(&self) -> Option<&PartitioningOptions> {
        match &self.kind {
            ModelKind::Partitioned(options) => Some(options),
            _ => None,
        }
    }

    #[must_use]
    pub fn view(&self) -> Option<&ViewOptions> {
        match &self.kind {
            ModelKind::View(options) | ModelKind::MaterializedView(options) => Some(options),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_partitioned(&self) -> bool {
        matches!(self.kind, ModelKind::Partitioned(_))
    }

    /// Validates the definition and synthesizes an `id` primary key when
    /// neither a primary-key field nor a composite key is declared.
    pub fn finalize(mut self) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigError::improperly_configured(
                    &self.name,
                    format!("field `{}` is declared more than once", field.name),
                )
                .into());
            }
        }

        let pk_fields = self.fields.iter().filter(|field| field.primary_key).count();
        if pk_fields > 1 {
            return Err(ConfigError::improperly_configured(
                &self.name,
                "more than one field is marked as primary key; declare a composite primary key instead",
            )
            .into());
        }

        if let Some(columns) = &self.primary_key {
            if let Some(missing) = columns.iter().find(|name| self.field(name).is_none()) {
                return Err(ConfigError::improperly_configured(
                    &self.name,
                    format!("composite primary key references unknown field `{missing}`"),
                )
                .into());
            }
        } else if pk_fields == 0 {
            if self.field(SYNTHESIZED_PK_NAME).is_some() {
                return Err(ConfigError::improperly_configured(
                    &self.name,
                    "field `id` exists but is not marked as primary key",
                )
                .into());
            }
            self.fields.insert(
                0,
                FieldDef::new(SYNTHESIZED_PK_NAME, DataType::BigSerial).primary_key(),
            );
        }

        Ok(self)
    }
}

/// Captures a model's options exactly once, at registration time.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    def: ModelDef,
}

impl ModelBuilder {
    pub fn new(app_label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            def: ModelDef {
                app_label: app_label.into(),
                name: name.into(),
                db_table: None,
                fields: Vec::new(),
                indexes: Vec::new(),
                constraints: Vec::new(),
                primary_key: None,
                kind: ModelKind::Plain,
            },
        }
    }

    #[must_use]
    pub fn db_table(mut self, db_table: impl Into<String>) -> Self {
        self.def.db_table = Some(db_table.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.def.fields.push(field);
        self
    }

    #[must_use]
    pub fn index(mut self, index: IndexDef) -> Self {
        self.def.indexes.push(index);
        self
    }

    #[must_use]
    pub fn constraint(mut self, constraint: ConstraintDef) -> Self {
        self.def.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn composite_primary_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.primary_key = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn partitioned(mut self, options: PartitioningOptions) -> Self {
        self.def.kind = ModelKind::Partitioned(options);
        self
    }

    #[must_use]
    pub fn view(mut self, query: impl Into<String>) -> Self {
        self.def.kind = ModelKind::View(ViewOptions {
            query: query.into(),
        });
        self
    }

    #[must_use]
    pub fn materialized_view(mut self, query: impl Into<String>) -> Self {
        self.def.kind = ModelKind::MaterializedView(ViewOptions {
            query: query.into(),
        });
        self
    }

    pub fn build(self) -> Result<ModelDef> {
        self.def.finalize()
    }
}
