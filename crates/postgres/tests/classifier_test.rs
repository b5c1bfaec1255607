use std::collections::BTreeMap;

use pgextra_core::{
    DataType, FieldDef, ModelDef, PartitioningOptions,
    migrations::{MigrationAutodetector, ModelState, Operation, ProjectState},
};
use pgextra_postgres::{DEFAULT_PARTITION_NAME, PostgresOperationClassifier};

fn state_of(models: impl IntoIterator<Item = ModelDef>) -> ProjectState {
    let mut state = ProjectState::new();
    for model in models {
        state.add_model(ModelState::from_model(&model));
    }
    state
}

fn changes(
    from_state: &ProjectState,
    to_state: &ProjectState,
) -> BTreeMap<String, Vec<Box<dyn Operation>>> {
    MigrationAutodetector::new(from_state, to_state)
        .changes(&PostgresOperationClassifier)
        .expect("classification should succeed")
}

fn names(operations: &[Box<dyn Operation>]) -> Vec<String> {
    operations
        .iter()
        .map(|operation| {
            operation
                .deconstruct()
                .expect("operation should deconstruct")
                .name
        })
        .collect()
}

fn event(method: PartitioningOptions) -> ModelDef {
    ModelDef::builder("tracking", "Event")
        .field(FieldDef::new("key", DataType::Integer))
        .partitioned(method)
        .build()
        .expect("event model should build")
}

fn report(materialized: bool) -> ModelDef {
    let builder = ModelDef::builder("tracking", "Report")
        .field(FieldDef::new("id", DataType::BigInt).primary_key());
    let builder = if materialized {
        builder.materialized_view("SELECT 1 AS id")
    } else {
        builder.view("SELECT 1 AS id")
    };
    builder.build().expect("report model should build")
}

#[test]
fn new_range_model_gets_a_default_partition() {
    let operations = changes(&ProjectState::new(), &state_of([event(PartitioningOptions::range(["key"]))]));

    let tracking = &operations["tracking"];
    assert_eq!(names(tracking), vec!["CreatePartitionedModel", "AddDefaultPartition"]);

    let default = tracking[1].deconstruct().expect("operation should deconstruct");
    assert_eq!(default.kwargs["name"], DEFAULT_PARTITION_NAME);
    assert_eq!(default.kwargs["model_name"], "Event");

    let create = tracking[0].deconstruct().expect("operation should deconstruct");
    assert_eq!(create.kwargs["partitioning_options"]["method"], "range");
    assert_eq!(create.kwargs["partitioning_options"]["key"][0], "key");
}

#[test]
fn new_hash_model_has_no_default_partition() {
    let operations = changes(&ProjectState::new(), &state_of([event(PartitioningOptions::hash(["key"]))]));

    assert_eq!(names(&operations["tracking"]), vec!["CreatePartitionedModel"]);
}

#[test]
fn view_models_get_view_operations() {
    let operations = changes(&ProjectState::new(), &state_of([report(false)]));
    assert_eq!(names(&operations["tracking"]), vec!["CreateViewModel"]);

    let operations = changes(&ProjectState::new(), &state_of([report(true)]));
    assert_eq!(names(&operations["tracking"]), vec!["CreateMaterializedViewModel"]);

    let operations = changes(&state_of([report(true)]), &ProjectState::new());
    assert_eq!(names(&operations["tracking"]), vec!["DeleteMaterializedViewModel"]);

    let operations = changes(&state_of([report(false)]), &ProjectState::new());
    assert_eq!(names(&operations["tracking"]), vec!["DeleteViewModel"]);
}

#[test]
fn deleted_partitioned_model_uses_partitioned_delete() {
    let operations = changes(&state_of([event(PartitioningOptions::list(["key"]))]), &ProjectState::new());

    assert_eq!(names(&operations["tracking"]), vec!["DeletePartitionedModel"]);
}

#[test]
fn field_changes_on_views_only_apply_state() {
    let mut changed = report(false);
    changed
        .fields
        .push(FieldDef::new("total", DataType::Integer));

    let operations = changes(&state_of([report(false)]), &state_of([changed]));

    let tracking = &operations["tracking"];
    assert_eq!(names(tracking), vec!["ApplyState"]);
    let wrapped = tracking[0].deconstruct().expect("operation should deconstruct");
    assert_eq!(wrapped.kwargs["state_operation"]["name"], "AddField");
}

#[test]
fn plain_models_pass_through() {
    let plain = ModelDef::builder("shop", "Order")
        .field(FieldDef::new("code", DataType::Text))
        .build()
        .expect("order model should build");
    let mut changed = plain.clone();
    changed.fields.push(FieldDef::new("note", DataType::Text).nullable());

    let operations = changes(&ProjectState::new(), &state_of([plain.clone()]));
    assert_eq!(names(&operations["shop"]), vec!["CreateModel"]);

    let operations = changes(&state_of([plain]), &state_of([changed]));
    assert_eq!(names(&operations["shop"]), vec!["AddField"]);
}
