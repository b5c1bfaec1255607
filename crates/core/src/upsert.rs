mod fields;
mod query;

pub use fields::{PreparedUpsert, UpsertFields, check_row_consistency, infer_upsert_fields};
pub use query::{
    ConflictAction, ConflictTarget, ConflictTargetEntry, ResolvedConflictTarget,
    ResolvedTargetColumn, Returning, Row, UpsertQuery,
};
