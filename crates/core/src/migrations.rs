mod autodetector;
mod operations;
mod state;

pub use autodetector::{
    MigrationAutodetector, OperationClassifier, PassthroughClassifier, ProposedOperation,
};
pub use operations::{
    AddDefaultPartition, AddField, AddHashPartition, AddListPartition, AddRangePartition,
    AlterField, ApplyState, CreateMaterializedViewModel, CreateModel, CreatePartitionedModel,
    CreateViewModel, Deconstructed, DeleteDefaultPartition, DeleteHashPartition,
    DeleteListPartition, DeleteMaterializedViewModel, DeleteModel, DeletePartition,
    DeletePartitionedModel, DeleteRangePartition, DeleteViewModel, Operation, RemoveField,
};
pub use state::{
    ModelOptions, ModelState, ModelStateKind, PartitionState, PartitionedModelState, ProjectState,
};
