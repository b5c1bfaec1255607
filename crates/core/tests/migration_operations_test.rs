use pgextra_core::{
    DataType, FieldDef, PartitioningOptions, Value, ViewOptions,
    migrations::{
        AddDefaultPartition, AddField, AddHashPartition, AddListPartition, AddRangePartition,
        AlterField, ApplyState, CreateMaterializedViewModel, CreateModel, CreatePartitionedModel,
        Deconstructed, DeleteDefaultPartition, DeleteListPartition, DeletePartition,
        DeletePartitionedModel, DeleteViewModel, ModelOptions, Operation, ProjectState,
        RemoveField,
    },
};

#[path = "support/recording_editor.rs"]
mod recording_editor;

use recording_editor::RecordingSchemaEditor;

const APP: &str = "app";

/// Runs `operations` forwards, then backwards, returning the editor calls
/// of each direction and the final forward state.
fn migrate(
    initial: ProjectState,
    operations: &[Box<dyn Operation>],
) -> (Vec<String>, Vec<String>, ProjectState) {
    let mut states = vec![initial];
    let mut editor = RecordingSchemaEditor::default();

    for operation in operations {
        let from_state = states.last().cloned().unwrap_or_default();
        let mut to_state = from_state.clone();
        operation
            .state_forwards(APP, &mut to_state)
            .expect("state should migrate forwards");
        operation
            .database_forwards(APP, &mut editor, &from_state, &to_state)
            .expect("database should migrate forwards");
        states.push(to_state);
    }
    let forward = std::mem::take(&mut editor.calls);

    for (index, operation) in operations.iter().enumerate().rev() {
        operation
            .database_backwards(APP, &mut editor, &states[index + 1], &states[index])
            .expect("database should migrate backwards");
    }

    let final_state = states.pop().unwrap_or_default();
    (forward, editor.calls, final_state)
}

fn event_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::new("id", DataType::BigSerial).primary_key(),
        FieldDef::new("timestamp", DataType::Date),
    ]
}

fn create_event(options: PartitioningOptions) -> Box<dyn Operation> {
    Box::new(CreatePartitionedModel::new(
        "Event",
        event_fields(),
        ModelOptions::default(),
        options,
    ))
}

#[test]
fn partitioned_model_lifecycle() {
    let operations: Vec<Box<dyn Operation>> = vec![
        create_event(PartitioningOptions::range(["timestamp"])),
        Box::new(AddRangePartition::new(
            "Event",
            "pt1",
            vec![Value::text("2019-01-01")],
            vec![Value::text("2019-02-01")],
        )),
        Box::new(AddDefaultPartition::new("Event", "default")),
    ];

    let (forward, backward, state) = migrate(ProjectState::new(), &operations);

    assert_eq!(
        forward,
        [
            "create_partitioned_model app_event",
            "add_range_partition app_event pt1 [2019-01-01..2019-02-01]",
            "add_default_partition app_event default",
        ]
    );
    assert_eq!(
        backward,
        [
            "delete_partition app_event default",
            "delete_partition app_event pt1",
            "delete_partitioned_model app_event",
        ]
    );

    let partitions = &state
        .get_model(APP, "Event")
        .and_then(|model| model.partitioned())
        .expect("event is partitioned")
        .partitions;
    assert_eq!(partitions.keys().collect::<Vec<_>>(), ["default", "pt1"]);
}

#[test]
fn deleted_partitions_are_restored_from_state() {
    let operations: Vec<Box<dyn Operation>> = vec![
        create_event(PartitioningOptions::list(["timestamp"])),
        Box::new(AddListPartition::new("Event", "eu", vec![Value::text("de")])),
        Box::new(DeletePartition::new("Event", "eu")),
    ];

    let (forward, backward, state) = migrate(ProjectState::new(), &operations);

    assert_eq!(forward[2], "delete_partition app_event eu");
    assert_eq!(
        backward,
        [
            "add_list_partition app_event eu [de]",
            "delete_partition app_event eu",
            "delete_partitioned_model app_event",
        ]
    );
    assert!(
        state
            .get_model(APP, "Event")
            .and_then(|model| model.partitioned())
            .is_some_and(|partitioned| partitioned.partitions.is_empty())
    );
}

#[test]
fn typed_delete_checks_the_recorded_kind() {
    let mut state = ProjectState::new();
    create_event(PartitioningOptions::list(["timestamp"]))
        .state_forwards(APP, &mut state)
        .expect("model state");
    AddListPartition::new("Event", "eu", vec![Value::text("de")])
        .state_forwards(APP, &mut state)
        .expect("partition state");

    let mut after = state.clone();
    let delete = DeleteDefaultPartition::new("Event", "eu");
    delete.state_forwards(APP, &mut after).expect("partition removed");

    let error = delete
        .database_backwards(APP, &mut RecordingSchemaEditor::default(), &after, &state)
        .expect_err("eu is a list partition");
    assert_eq!(
        error.to_string(),
        "invalid partition `eu` on model `Event`: expected a default partition, found a list partition"
    );

    let mut editor = RecordingSchemaEditor::default();
    DeleteListPartition::new("Event", "eu")
        .database_backwards(APP, &mut editor, &after, &state)
        .expect("kinds match");
    assert_eq!(editor.calls, ["add_list_partition app_event eu [de]"]);
}

#[test]
fn partitions_need_a_partitioned_model() {
    let mut state = ProjectState::new();
    CreateModel::new("Plain", event_fields(), ModelOptions::default())
        .state_forwards(APP, &mut state)
        .expect("model state");

    let error = AddHashPartition::new("Plain", "p0", 2, 0)
        .state_forwards(APP, &mut state)
        .expect_err("plain models have no partitions");
    assert_eq!(error.to_string(), "model state `app.Plain` is not partitioned");

    let error = DeletePartitionedModel::new("Plain")
        .state_forwards(APP, &mut state)
        .expect_err("plain models are not partitioned models");
    assert!(error.to_string().contains("is not partitioned"));
}

#[test]
fn field_operations_reverse_each_other() {
    let operations: Vec<Box<dyn Operation>> = vec![
        Box::new(CreateModel::new("Order", event_fields(), ModelOptions::default())),
        Box::new(AddField::new("Order", FieldDef::new("note", DataType::Text).nullable())),
        Box::new(AlterField::new(
            "Order",
            "note",
            FieldDef::new("note", DataType::Text).with_column("remark"),
        )),
        Box::new(RemoveField::new("Order", "timestamp")),
    ];

    let (forward, backward, state) = migrate(ProjectState::new(), &operations);

    assert_eq!(
        forward,
        [
            "create_model app_order",
            "add_field app_order.note",
            "alter_field app_order.note -> remark",
            "remove_field app_order.timestamp",
        ]
    );
    assert_eq!(
        backward,
        [
            "add_field app_order.timestamp",
            "alter_field app_order.remark -> note",
            "remove_field app_order.note",
            "delete_model app_order",
        ]
    );

    let order = state.get_model(APP, "order").expect("order exists");
    assert_eq!(
        order.fields.iter().map(|field| field.name.as_str()).collect::<Vec<_>>(),
        ["id", "note"]
    );
}

#[test]
fn apply_state_changes_state_without_sql() {
    let view = CreateMaterializedViewModel::from_create_model(
        CreateModel::new("Report", event_fields(), ModelOptions::default()),
        ViewOptions {
            query: "SELECT 1 AS id, now()::date AS timestamp".to_string(),
        },
    );
    let operations: Vec<Box<dyn Operation>> = vec![
        Box::new(view),
        Box::new(ApplyState::new(AddField::new(
            "Report",
            FieldDef::new("total", DataType::Integer),
        ))),
    ];

    let (forward, backward, state) = migrate(ProjectState::new(), &operations);

    assert_eq!(forward, ["create_materialized_view_model app_report"]);
    assert_eq!(backward, ["delete_materialized_view_model app_report"]);
    assert!(
        state
            .get_model(APP, "Report")
            .is_some_and(|model| model.field("total").is_some())
    );
}

#[test]
fn view_deletion_checks_the_model_kind() {
    let mut state = ProjectState::new();
    create_event(PartitioningOptions::range(["timestamp"]))
        .state_forwards(APP, &mut state)
        .expect("model state");

    let error = DeleteViewModel::new("Event")
        .state_forwards(APP, &mut state)
        .expect_err("event is not a view");
    assert_eq!(error.to_string(), "model state `app.Event` is not a view");
}

#[test]
fn operations_reconstruct_from_their_deconstruction() {
    let operations: Vec<Box<dyn Operation>> = vec![
        create_event(PartitioningOptions::range(["timestamp"]).with_partition_constraint("recent", "timestamp > '2000-01-01'")),
        Box::new(AddRangePartition::new(
            "Event",
            "pt1",
            vec![Value::text("2019-01-01")],
            vec![Value::text("2019-02-01")],
        )),
        Box::new(ApplyState::new(RemoveField::new("Event", "timestamp"))),
    ];

    for operation in &operations {
        let deconstructed = operation.deconstruct().expect("operation should deconstruct");
        let rebuilt = deconstructed.reconstruct().expect("operation should reconstruct");
        assert_eq!(
            rebuilt.deconstruct().expect("operation should deconstruct"),
            deconstructed
        );
        assert_eq!(rebuilt.describe(), operation.describe());
    }

    let unknown = Deconstructed {
        name: "RenameEverything".to_string(),
        kwargs: serde_json::json!({}),
    };
    assert_eq!(
        unknown.reconstruct().expect_err("operation is unknown").to_string(),
        "unknown migration operation `RenameEverything`"
    );

    let malformed = Deconstructed {
        name: "AddDefaultPartition".to_string(),
        kwargs: serde_json::json!({"model_name": "Event"}),
    };
    assert!(malformed.reconstruct().is_err());
}

#[test]
fn descriptions_name_the_partition_and_model() {
    assert_eq!(
        AddDefaultPartition::new("Event", "default").describe(),
        "Creates default partition 'default' on Event"
    );
    assert_eq!(
        DeletePartition::new("Event", "pt1").describe(),
        "Deletes partition pt1 on Event"
    );
    assert_eq!(
        ApplyState::new(AddField::new("Report", FieldDef::new("total", DataType::Integer))).describe(),
        "Apply state: Adds field total to Report"
    );
}
