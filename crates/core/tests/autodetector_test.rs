use pgextra_core::{
    DataType, FieldDef, ModelDef,
    migrations::{
        MigrationAutodetector, PassthroughClassifier, ProjectState, ProposedOperation,
    },
};

fn model(app_label: &str, name: &str, fields: Vec<FieldDef>) -> ModelDef {
    let mut builder = ModelDef::builder(app_label, name);
    for field in fields {
        builder = builder.field(field);
    }
    builder.build().expect("model should build")
}

#[test]
fn proposals_are_grouped_and_ordered() {
    let kept_before = model("shop", "Order", vec![
        FieldDef::new("code", DataType::Text),
        FieldDef::new("legacy", DataType::Text),
    ]);
    let kept_after = model("shop", "Order", vec![
        FieldDef::new("code", DataType::Varchar { length: Some(32) }),
        FieldDef::new("note", DataType::Text).nullable(),
    ]);
    let removed = model("shop", "Coupon", vec![FieldDef::new("code", DataType::Text)]);
    let created = model("billing", "Invoice", vec![FieldDef::new("total", DataType::Integer)]);

    let from_state = ProjectState::from_models([&kept_before, &removed]);
    let to_state = ProjectState::from_models([&kept_after, &created]);
    let proposals = MigrationAutodetector::new(&from_state, &to_state).proposals();

    assert_eq!(proposals.keys().collect::<Vec<_>>(), ["billing", "shop"]);
    assert!(matches!(
        proposals["billing"].as_slice(),
        [ProposedOperation::CreateModel(create)] if create.name == "Invoice"
    ));

    let shop: Vec<_> = proposals["shop"]
        .iter()
        .map(|proposal| match proposal {
            ProposedOperation::CreateModel(operation) => format!("create {}", operation.name),
            ProposedOperation::DeleteModel(operation) => format!("delete {}", operation.name),
            ProposedOperation::AddField(operation) => format!("add {}", operation.field.name),
            ProposedOperation::RemoveField(operation) => format!("remove {}", operation.name),
            ProposedOperation::AlterField(operation) => format!("alter {}", operation.name),
        })
        .collect();
    assert_eq!(shop, ["alter code", "add note", "remove legacy", "delete Coupon"]);
}

#[test]
fn passthrough_keeps_generic_operations() {
    let created = model("billing", "Invoice", vec![FieldDef::new("total", DataType::Integer)]);
    let from_state = ProjectState::new();
    let to_state = ProjectState::from_models([&created]);

    let changes = MigrationAutodetector::new(&from_state, &to_state)
        .changes(&PassthroughClassifier)
        .expect("classification should succeed");

    let billing = &changes["billing"];
    assert_eq!(billing.len(), 1);
    let deconstructed = billing[0].deconstruct().expect("operation should deconstruct");
    assert_eq!(deconstructed.name, "CreateModel");
    assert_eq!(deconstructed.kwargs["name"], "Invoice");
}

#[test]
fn identical_states_produce_no_changes() {
    let order = model("shop", "Order", vec![FieldDef::new("code", DataType::Text)]);
    let state = ProjectState::from_models([&order]);

    let changes = MigrationAutodetector::new(&state, &state.clone())
        .changes(&PassthroughClassifier)
        .expect("classification should succeed");

    assert!(changes.is_empty());
}
