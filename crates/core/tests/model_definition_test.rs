use chrono::{TimeZone, Utc};
use pgextra_core::{
    ConfigError, DataType, Error, FieldDef, ModelDef, ModelKind, ModelRegistry,
    PartitioningMethod, PartitioningOptions, Value, partition_table_name,
};

#[test]
fn builder_synthesizes_an_id_primary_key() {
    let model = ModelDef::builder("app", "Event")
        .field(FieldDef::new("name", DataType::Text))
        .build()
        .expect("model should build");

    assert_eq!(model.fields[0].name, "id");
    assert_eq!(model.fields[0].data_type, DataType::BigSerial);
    assert!(model.fields[0].primary_key);
    assert_eq!(model.db_table(), "app_event");
    assert_eq!(model.pk_field().map(|field| field.name.as_str()), Some("id"));
}

#[test]
fn explicit_and_composite_keys_are_kept() {
    let explicit = ModelDef::builder("app", "Code")
        .field(FieldDef::new("code", DataType::Text).primary_key())
        .build()
        .expect("model should build");
    assert_eq!(explicit.fields.len(), 1);

    let composite = ModelDef::builder("app", "Reading")
        .field(FieldDef::new("sensor", DataType::Integer))
        .field(FieldDef::new("taken_at", DataType::Date))
        .composite_primary_key(["sensor", "taken_at"])
        .build()
        .expect("model should build");
    assert_eq!(composite.fields.len(), 2);
    assert!(composite.pk_field().is_none());
}

#[test]
fn invalid_definitions_are_improperly_configured() {
    let duplicate = ModelDef::builder("app", "Twice")
        .field(FieldDef::new("name", DataType::Text))
        .field(FieldDef::new("name", DataType::Text))
        .build()
        .expect_err("field declared twice");
    assert_eq!(
        duplicate.to_string(),
        "improperly configured model `Twice`: field `name` is declared more than once"
    );

    let unmarked_id = ModelDef::builder("app", "Loose")
        .field(FieldDef::new("id", DataType::Integer))
        .build()
        .expect_err("id must be the primary key");
    assert!(matches!(
        unmarked_id,
        Error::Config(ConfigError::ImproperlyConfigured { .. })
    ));

    let bad_composite = ModelDef::builder("app", "Reading")
        .field(FieldDef::new("sensor", DataType::Integer))
        .composite_primary_key(["sensor", "missing"])
        .build()
        .expect_err("unknown composite key field");
    assert!(bad_composite.to_string().contains("unknown field `missing`"));
}

#[test]
fn fields_resolve_by_alias_name_and_column() {
    let model = ModelDef::builder("app", "Product")
        .field(FieldDef::new("sku", DataType::Text).with_column("sku_code"))
        .build()
        .expect("model should build");

    assert_eq!(model.resolve_field("pk").map(|field| field.name.as_str()), Some("id"));
    assert_eq!(model.resolve_field("sku").map(FieldDef::column), Some("sku_code"));
    assert_eq!(model.resolve_field("sku_code").map(|field| field.name.as_str()), Some("sku"));
    assert!(model.resolve_field("price").is_none());
}

#[test]
fn auto_timestamps_pre_save() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("valid instant");
    let created = FieldDef::new(
        "created_at",
        DataType::Timestamp {
            with_timezone: true,
        },
    )
    .auto_now_add();
    let updated_on = FieldDef::new("updated_on", DataType::Date).auto_now();
    let name = FieldDef::new("name", DataType::Text);

    assert_eq!(
        created.pre_save(None, true, now),
        Some(Value::DateTimeTz(now.fixed_offset()))
    );
    assert_eq!(created.pre_save(None, false, now), None);
    assert_eq!(
        updated_on.pre_save(None, false, now),
        Some(Value::Date(now.date_naive()))
    );
    assert_eq!(
        name.pre_save(Some(&Value::text("x")), true, now),
        Some(Value::text("x"))
    );
}

#[test]
fn models_deserialize_from_yaml_shape() {
    let model: ModelDef = serde_json::from_value(serde_json::json!({
        "app_label": "app",
        "name": "Event",
        "fields": [
            {"name": "id", "data_type": "big_serial", "primary_key": true},
            {"name": "at", "data_type": {"timestamp": {"with_timezone": true}}},
            {"name": "data", "data_type": "hstore", "hstore": {"uniqueness": [["sku"]]}}
        ],
        "kind": {"partitioned": {"method": "list", "key": ["at"]}}
    }))
    .expect("model should deserialize");

    assert_eq!(
        model.kind,
        ModelKind::Partitioned(PartitioningOptions::new(PartitioningMethod::List, ["at"]))
    );
    assert_eq!(model.fields[2].data_type, DataType::HStore);
    assert_eq!(model.fields[2].hstore.uniqueness, vec![vec!["sku".to_string()]]);
}

#[test]
fn registry_rejects_duplicates_and_lists_partitioned_models() {
    let mut registry = ModelRegistry::new();
    let plain = ModelDef::builder("app", "Plain")
        .field(FieldDef::new("name", DataType::Text))
        .build()
        .expect("model should build");
    let event = ModelDef::builder("app", "Event")
        .field(FieldDef::new("day", DataType::Date))
        .partitioned(PartitioningOptions::range(["day"]))
        .build()
        .expect("model should build");

    registry.register(plain.clone()).expect("first registration");
    registry.register(event).expect("first registration");
    assert!(matches!(
        registry.register(plain),
        Err(Error::Config(ConfigError::DuplicateModel { .. }))
    ));

    assert_eq!(registry.len(), 2);
    assert_eq!(
        registry
            .partitioned()
            .map(|model| model.name.as_str())
            .collect::<Vec<_>>(),
        ["Event"]
    );
    assert_eq!(
        registry
            .get("app", "EVENT")
            .expect("lookup is case insensitive")
            .name,
        "Event"
    );
    assert!(registry.get("other", "Event").is_err());
}

#[test]
fn partition_table_names_are_lowercased() {
    assert_eq!(partition_table_name("App_Event", "2024_JAN"), "app_event_2024_jan");
}
