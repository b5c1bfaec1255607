use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{ConflictError, Expr, FieldDef, IndexDef, ModelDef, Result, Value};

/// One row to upsert, keyed by field name, column name or `pk`.
pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConflictTargetEntry {
    Field(String),
    HStoreKey(String, String),
}

impl fmt::Display for ConflictTargetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::HStoreKey(field, key) => write!(f, "('{field}', '{key}')"),
        }
    }
}

/// Columns (or hstore keys) the ON CONFLICT clause arbitrates on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictTarget(pub Vec<ConflictTargetEntry>);

impl ConflictTarget {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            fields
                .into_iter()
                .map(|field| ConflictTargetEntry::Field(field.into()))
                .collect(),
        )
    }

    pub fn hstore_keys<I, F, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = (F, K)>,
        F: Into<String>,
        K: Into<String>,
    {
        Self(
            keys.into_iter()
                .map(|(field, key)| ConflictTargetEntry::HStoreKey(field.into(), key.into()))
                .collect(),
        )
    }

    #[must_use]
    pub fn entries(&self) -> &[ConflictTargetEntry] {
        &self.0
    }

    /// Matches the target against the model: an index declared on exactly
    /// these fields wins, otherwise every entry is resolved on its own.
    pub fn resolve<'a>(&self, model: &'a ModelDef) -> Result<ResolvedConflictTarget<'a>> {
        if self.0.is_empty() {
            return Err(ConflictError::InvalidConflictTarget {
                target: self.to_string(),
            }
            .into());
        }

        if let Some(index) = self.matching_index(model) {
            return Ok(ResolvedConflictTarget::Index(index));
        }

        self.0
            .iter()
            .map(|entry| resolve_entry(model, entry))
            .collect::<Result<Vec<_>>>()
            .map(ResolvedConflictTarget::Columns)
    }

    fn matching_index<'a>(&self, model: &'a ModelDef) -> Option<&'a IndexDef> {
        let names = self
            .0
            .iter()
            .map(|entry| match entry {
                ConflictTargetEntry::Field(name) => Some(name.as_str()),
                ConflictTargetEntry::HStoreKey(..) => None,
            })
            .collect::<Option<Vec<_>>>()?;

        model.indexes.iter().find(|index| {
            index.expressions.is_empty()
                && index.fields.iter().map(String::as_str).eq(names.iter().copied())
        })
    }
}

impl fmt::Display for ConflictTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, entry) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{entry}")?;
        }
        f.write_str("]")
    }
}

fn resolve_entry<'a>(model: &'a ModelDef, entry: &ConflictTargetEntry) -> Result<ResolvedTargetColumn<'a>> {
    match entry {
        ConflictTargetEntry::Field(name) => model
            .resolve_field(name)
            .map(ResolvedTargetColumn::Column)
            .ok_or_else(|| {
                ConflictError::InvalidConflictTarget {
                    target: name.clone(),
                }
                .into()
            }),
        ConflictTargetEntry::HStoreKey(name, key) => {
            let field = model.resolve_field(name).ok_or_else(|| {
                crate::Error::from(ConflictError::InvalidConflictTarget {
                    target: name.clone(),
                })
            })?;

            let malformed = |message: &str| ConflictError::MalformedHStoreKey {
                field: name.clone(),
                key: key.clone(),
                message: message.to_string(),
            };
            if !field.is_hstore() {
                return Err(malformed("the field is not an hstore field").into());
            }
            if key.is_empty() {
                return Err(malformed("the key cannot be empty").into());
            }

            Ok(ResolvedTargetColumn::HStoreKey {
                field,
                key: key.clone(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedConflictTarget<'a> {
    Index(&'a IndexDef),
    Columns(Vec<ResolvedTargetColumn<'a>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTargetColumn<'a> {
    Column(&'a FieldDef),
    HStoreKey { field: &'a FieldDef, key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictAction {
    Nothing,
    #[default]
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Returning {
    #[default]
    PrimaryKey,
    All,
}

/// An `INSERT ... ON CONFLICT` over one model.
#[derive(Debug, Clone)]
pub struct UpsertQuery {
    model: Arc<ModelDef>,
    rows: Vec<Row>,
    conflict_target: ConflictTarget,
    action: ConflictAction,
    index_predicate: Option<Expr>,
    update_condition: Option<Expr>,
    update_values: Option<BTreeMap<String, Expr>>,
    returning: Returning,
}

impl UpsertQuery {
    #[must_use]
    pub fn new(model: Arc<ModelDef>, conflict_target: ConflictTarget, action: ConflictAction) -> Self {
        Self {
            model,
            rows: Vec::new(),
            conflict_target,
            action,
            index_predicate: None,
            update_condition: None,
            update_values: None,
            returning: Returning::default(),
        }
    }

    #[must_use]
    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    #[must_use]
    pub fn rows(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Predicate selecting the partial unique index to arbitrate on.
    #[must_use]
    pub fn index_predicate(mut self, predicate: Expr) -> Self {
        self.index_predicate = Some(predicate);
        self
    }

    /// Only update conflicting rows for which this holds.
    #[must_use]
    pub fn update_condition(mut self, condition: Expr) -> Self {
        self.update_condition = Some(condition);
        self
    }

    /// Replaces the inferred `SET` list.
    #[must_use]
    pub fn update_values(mut self, values: BTreeMap<String, Expr>) -> Self {
        self.update_values = Some(values);
        self
    }

    #[must_use]
    pub fn returning(mut self, returning: Returning) -> Self {
        self.returning = returning;
        self
    }

    #[must_use]
    pub fn model(&self) -> &ModelDef {
        &self.model
    }

    #[must_use]
    pub fn row_values(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn conflict_target(&self) -> &ConflictTarget {
        &self.conflict_target
    }

    #[must_use]
    pub const fn action(&self) -> ConflictAction {
        self.action
    }

    #[must_use]
    pub fn index_predicate_expr(&self) -> Option<&Expr> {
        self.index_predicate.as_ref()
    }

    #[must_use]
    pub fn update_condition_expr(&self) -> Option<&Expr> {
        self.update_condition.as_ref()
    }

    #[must_use]
    pub fn update_values_override(&self) -> Option<&BTreeMap<String, Expr>> {
        self.update_values.as_ref()
    }

    #[must_use]
    pub const fn returning_mode(&self) -> Returning {
        self.returning
    }
}
