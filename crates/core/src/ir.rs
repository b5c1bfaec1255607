mod expr;
mod model;
mod options;
mod registry;
mod types;

pub use expr::{BinaryOperator, ComparisonOp, Expr, IsTest};
pub use model::{
    ConstraintDef, FieldDef, ForeignKeyRef, HStoreOptions, IndexDef, ModelBuilder, ModelDef,
    ModelKey, ModelKind, PK_ALIAS,
};
pub use options::{PartitionConstraint, PartitioningMethod, PartitioningOptions, ViewOptions};
pub use registry::ModelRegistry;
pub use types::{DataType, Value, float_total_cmp, value_total_eq};
