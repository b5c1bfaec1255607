mod adapter;
mod clock;
mod config;
mod error;
mod executor;
mod introspection;
mod ir;
pub mod migrations;
pub mod partitioning;
mod renderer;
mod schema_editor;
mod statement;
pub mod upsert;

pub use adapter::{DatabaseAdapter, QueryRow, Transaction};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    AUTO_EXTENSION_SET_UP_ENV, BACKEND_BASE_ENV, ConnectionConfig, MIGRATION_TIMEOUT_ENV,
    Settings, Version,
};
pub use error::{
    BoxedSource, ConfigError, ConflictError, Error, ExecutionError, IntrospectionError,
    MigrationError, PartitioningError, Result,
};
pub use executor::Executor;
pub use introspection::{
    IntrospectedPartition, IntrospectedPartitionedTable, PartitionBound, PartitionIntrospection,
};
pub use ir::{
    BinaryOperator, ComparisonOp, ConstraintDef, DataType, Expr, FieldDef, ForeignKeyRef,
    HStoreOptions, IndexDef, IsTest, ModelBuilder, ModelDef, ModelKey, ModelKind, ModelRegistry,
    PK_ALIAS, PartitionConstraint, PartitioningMethod, PartitioningOptions, Value, ViewOptions,
    float_total_cmp, value_total_eq,
};
pub use partitioning::{
    AUTO_PARTITIONED_COMMENT, CurrentTimePartitioningStrategy, DefaultPartition, HashPartition,
    ListPartition, ModelPartitioningPlan, PartitionSpec, PartitioningConfig, PartitioningManager,
    PartitioningPlan, PartitioningStrategy, RangePartition, SubPartition, TimePartition,
    TimePartitionSize, TimePartitionUnit,
};
pub use renderer::Renderer;
pub use schema_editor::{SchemaEditor, partition_table_name};
pub use statement::{ClonePhase, Statement, StatementContext};

#[cfg(test)]
mod tests {
    use super::{PartitioningMethod, Statement, Value, partition_table_name};

    #[test]
    fn smoke_partition_naming_and_statement() {
        assert_eq!(partition_table_name("events", "2024_jan"), "events_2024_jan");

        let statement = Statement::transactional("SELECT 1");
        assert_eq!(statement.sql(), "SELECT 1");
        assert_eq!(PartitioningMethod::default(), PartitioningMethod::Range);
        assert!(Value::Null.is_null());
    }
}
