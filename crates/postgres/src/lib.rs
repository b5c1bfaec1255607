mod adapter;
mod bounds;
mod classifier;
mod compiler;
mod introspection;
mod introspection_queries;
mod locking;
mod params;
mod quote;
mod schema;
mod schema_editor;
mod timeout;
mod upsert;

pub use adapter::{PostgresAdapter, parse_server_version};
pub use bounds::{coerce_literal, parse_bound_values, parse_partition_bound};
pub use classifier::{DEFAULT_PARTITION_NAME, PostgresOperationClassifier};
pub use compiler::{CompiledStatement, MAX_QUERY_PARAMS, UpsertCompiler};
pub use introspection::{PostgresIntrospection, TableLock};
pub use locking::{TableLockMode, lock_model, lock_table, lock_table_statement};
pub use quote::{quote_identifier, quote_literal, quote_qualified, quote_string};
pub use schema::{
    PUBLIC_SCHEMA, PostgresSchema, SCHEMA_NAME_MAX_LENGTH, TemporarySchemaOptions,
    with_temporary_schema,
};
pub use schema_editor::PostgresSchemaEditor;
pub use timeout::{
    BackendCanceller, CancellationAction, MigrationTimeout, SideConnectionCanceller, TimeoutStage,
};
pub use upsert::Upserter;
