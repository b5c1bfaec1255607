use pgextra_core::{FieldDef, ModelDef, Statement, StatementContext};

use crate::quote::{quote_identifier, quote_string};

/// Extra DDL emitted alongside the base model and field operations.
///
/// Every hook defaults to emitting nothing.
pub(crate) trait SchemaSideEffect: Sync {
    fn create_model(&self, model: &ModelDef) -> Vec<Statement> {
        let table = model.db_table();
        model
            .fields
            .iter()
            .flat_map(|field| self.add_field(&table, field))
            .collect()
    }

    fn delete_model(&self, model: &ModelDef) -> Vec<Statement> {
        let table = model.db_table();
        model
            .fields
            .iter()
            .flat_map(|field| self.remove_field(&table, field))
            .collect()
    }

    fn add_field(&self, _table: &str, _field: &FieldDef) -> Vec<Statement> {
        Vec::new()
    }

    fn remove_field(&self, _table: &str, _field: &FieldDef) -> Vec<Statement> {
        Vec::new()
    }

    fn alter_field(&self, _table: &str, _old_field: &FieldDef, _new_field: &FieldDef) -> Vec<Statement> {
        Vec::new()
    }

    fn alter_db_table(&self, _model: &ModelDef, _old_table: &str, _new_table: &str) -> Vec<Statement> {
        Vec::new()
    }
}

pub(crate) static SIDE_EFFECTS: &[&dyn SchemaSideEffect] = &[&HStoreUnique, &HStoreRequired];

/// `CREATE UNIQUE INDEX` over one or more keys of an hstore column.
pub(crate) struct HStoreUnique;

impl HStoreUnique {
    fn index_name(table: &str, field: &FieldDef, keys: &[String]) -> String {
        format!("{table}_{}_unique_{}", field.column(), keys.join("_"))
    }

    fn create(table: &str, field: &FieldDef, keys: &[String]) -> Statement {
        let columns = keys
            .iter()
            .map(|key| format!("({}->{})", quote_identifier(field.column()), quote_string(key)))
            .collect::<Vec<_>>()
            .join(",");
        side_effect(
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({columns})",
                quote_identifier(&Self::index_name(table, field, keys)),
                quote_identifier(table),
            ),
            table,
            field,
        )
    }

    fn drop(table: &str, field: &FieldDef, keys: &[String]) -> Statement {
        side_effect(
            format!(
                "DROP INDEX IF EXISTS {}",
                quote_identifier(&Self::index_name(table, field, keys))
            ),
            table,
            field,
        )
    }

    fn rename(
        old_table: &str,
        new_table: &str,
        old_field: &FieldDef,
        new_field: &FieldDef,
        keys: &[String],
    ) -> Statement {
        side_effect(
            format!(
                "ALTER INDEX {} RENAME TO {}",
                quote_identifier(&Self::index_name(old_table, old_field, keys)),
                quote_identifier(&Self::index_name(new_table, new_field, keys)),
            ),
            new_table,
            new_field,
        )
    }
}

impl SchemaSideEffect for HStoreUnique {
    fn add_field(&self, table: &str, field: &FieldDef) -> Vec<Statement> {
        field
            .hstore
            .uniqueness
            .iter()
            .map(|keys| Self::create(table, field, keys))
            .collect()
    }

    fn remove_field(&self, table: &str, field: &FieldDef) -> Vec<Statement> {
        field
            .hstore
            .uniqueness
            .iter()
            .map(|keys| Self::drop(table, field, keys))
            .collect()
    }

    fn alter_field(&self, table: &str, old_field: &FieldDef, new_field: &FieldDef) -> Vec<Statement> {
        if !old_field.is_hstore() && !new_field.is_hstore() {
            return Vec::new();
        }

        let old_uniqueness = &old_field.hstore.uniqueness;
        let new_uniqueness = &new_field.hstore.uniqueness;
        let mut statements = Vec::new();

        // Renames come first, so later drops use the new column name.
        if old_field.column() != new_field.column() {
            statements.extend(
                old_uniqueness
                    .iter()
                    .map(|keys| Self::rename(table, table, old_field, new_field, keys)),
            );
        }
        statements.extend(
            old_uniqueness
                .iter()
                .filter(|keys| !new_uniqueness.contains(keys))
                .map(|keys| Self::drop(table, new_field, keys)),
        );
        statements.extend(
            new_uniqueness
                .iter()
                .filter(|keys| !old_uniqueness.contains(keys))
                .map(|keys| Self::create(table, new_field, keys)),
        );
        statements
    }

    fn alter_db_table(&self, model: &ModelDef, old_table: &str, new_table: &str) -> Vec<Statement> {
        model
            .fields
            .iter()
            .filter(|field| field.is_hstore())
            .flat_map(|field| {
                field
                    .hstore
                    .uniqueness
                    .iter()
                    .map(move |keys| Self::rename(old_table, new_table, field, field, keys))
            })
            .collect()
    }
}

/// `CHECK ("col"->'key') IS NOT NULL` per required hstore key.
pub(crate) struct HStoreRequired;

impl HStoreRequired {
    fn constraint_name(table: &str, field: &FieldDef, key: &str) -> String {
        format!("{table}_{}_required_{key}", field.column())
    }

    fn create(table: &str, field: &FieldDef, key: &str) -> Statement {
        side_effect(
            format!(
                "ALTER TABLE {} ADD CONSTRAINT {} CHECK (({}->{}) IS NOT NULL)",
                quote_identifier(table),
                quote_identifier(&Self::constraint_name(table, field, key)),
                quote_identifier(field.column()),
                quote_string(key),
            ),
            table,
            field,
        )
    }

    fn drop(table: &str, field: &FieldDef, key: &str) -> Statement {
        side_effect(
            format!(
                "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
                quote_identifier(table),
                quote_identifier(&Self::constraint_name(table, field, key)),
            ),
            table,
            field,
        )
    }

    fn rename(
        old_table: &str,
        new_table: &str,
        old_field: &FieldDef,
        new_field: &FieldDef,
        key: &str,
    ) -> Statement {
        side_effect(
            format!(
                "ALTER TABLE {} RENAME CONSTRAINT {} TO {}",
                quote_identifier(new_table),
                quote_identifier(&Self::constraint_name(old_table, old_field, key)),
                quote_identifier(&Self::constraint_name(new_table, new_field, key)),
            ),
            new_table,
            new_field,
        )
    }
}

impl SchemaSideEffect for HStoreRequired {
    fn add_field(&self, table: &str, field: &FieldDef) -> Vec<Statement> {
        field
            .hstore
            .required
            .iter()
            .map(|key| Self::create(table, field, key))
            .collect()
    }

    fn remove_field(&self, table: &str, field: &FieldDef) -> Vec<Statement> {
        field
            .hstore
            .required
            .iter()
            .map(|key| Self::drop(table, field, key))
            .collect()
    }

    fn alter_field(&self, table: &str, old_field: &FieldDef, new_field: &FieldDef) -> Vec<Statement> {
        if !old_field.is_hstore() && !new_field.is_hstore() {
            return Vec::new();
        }

        let old_required = &old_field.hstore.required;
        let new_required = &new_field.hstore.required;
        let mut statements = Vec::new();

        if old_field.column() != new_field.column() {
            statements.extend(
                old_required
                    .iter()
                    .map(|key| Self::rename(table, table, old_field, new_field, key)),
            );
        }
        statements.extend(
            old_required
                .iter()
                .filter(|key| !new_required.contains(key))
                .map(|key| Self::drop(table, new_field, key)),
        );
        statements.extend(
            new_required
                .iter()
                .filter(|key| !old_required.contains(key))
                .map(|key| Self::create(table, new_field, key)),
        );
        statements
    }

    fn alter_db_table(&self, model: &ModelDef, old_table: &str, new_table: &str) -> Vec<Statement> {
        model
            .fields
            .iter()
            .filter(|field| field.is_hstore())
            .flat_map(|field| {
                field
                    .hstore
                    .required
                    .iter()
                    .map(move |key| Self::rename(old_table, new_table, field, field, key))
            })
            .collect()
    }
}

fn side_effect(sql: String, table: &str, field: &FieldDef) -> Statement {
    Statement::transactional(sql).with_context(StatementContext::HStoreSideEffect {
        table: table.to_string(),
        column: field.column().to_string(),
    })
}
