use std::sync::Arc;

use chrono::{TimeZone, Utc};
use pgextra_core::{
    AUTO_PARTITIONED_COMMENT, CurrentTimePartitioningStrategy, DataType, Error, FieldDef,
    FixedClock, ModelDef, PartitionSpec, PartitioningConfig, PartitioningError,
    PartitioningManager, PartitioningMethod, PartitioningOptions, TimePartitionSize, Value,
    partitioning::{
        DeleteOnConditionPartitioningStrategy, ExplicitPartitioningStrategy,
        partition_by_current_time,
    },
};

#[path = "support/fake_introspection.rs"]
mod fake_introspection;
#[path = "support/recording_editor.rs"]
mod recording_editor;

use fake_introspection::FakeIntrospection;
use recording_editor::RecordingSchemaEditor;

fn event_model() -> Arc<ModelDef> {
    Arc::new(
        ModelDef::builder("app", "Event")
            .field(FieldDef::new("name", DataType::Text))
            .field(FieldDef::new(
                "timestamp",
                DataType::Timestamp {
                    with_timezone: true,
                },
            ))
            .partitioned(PartitioningOptions::range(["timestamp"]))
            .build()
            .expect("event model should build"),
    )
}

fn clock_at(year: i32, month: u32, day: u32) -> FixedClock {
    FixedClock::new(
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .expect("valid instant"),
    )
}

fn monthly_manager(clock: &FixedClock, count: usize) -> PartitioningManager {
    let strategy = CurrentTimePartitioningStrategy::new(
        TimePartitionSize::months(1).expect("valid size"),
        count,
    )
    .with_clock(Arc::new(clock.clone()));
    let config = PartitioningConfig::new(event_model(), strategy).expect("config should be valid");
    PartitioningManager::new(vec![config]).expect("manager should be valid")
}

fn empty_catalog() -> FakeIntrospection {
    FakeIntrospection::default().with_table("app_event", PartitioningMethod::Range, &["timestamp"])
}

fn created_names(manager: &PartitioningManager, catalog: &FakeIntrospection) -> Vec<String> {
    let plan = manager.plan(catalog, false, true).expect("plan should succeed");
    let names = plan
        .creations()
        .map(|partition| partition.name().to_string())
        .collect();
    catalog.apply(&plan);
    names
}

#[test]
fn monthly_partitions_roll_forward_with_the_clock() {
    let clock = clock_at(1337, 1, 30);
    let catalog = empty_catalog();

    let first = created_names(&monthly_manager(&clock, 12), &catalog);
    assert_eq!(
        first,
        [
            "1337_jan", "1337_feb", "1337_mar", "1337_apr", "1337_may", "1337_jun", "1337_jul",
            "1337_aug", "1337_sep", "1337_oct", "1337_nov", "1337_dec",
        ]
    );

    assert_eq!(created_names(&monthly_manager(&clock, 13), &catalog), ["1338_jan"]);

    clock.set(
        Utc.with_ymd_and_hms(1337, 11, 1, 0, 0, 0)
            .single()
            .expect("valid instant"),
    );
    assert_eq!(created_names(&monthly_manager(&clock, 4), &catalog), ["1338_feb"]);
}

#[test]
fn planning_twice_without_changes_yields_an_empty_plan() {
    let clock = clock_at(2019, 1, 1);
    let manager = monthly_manager(&clock, 3);
    let catalog = empty_catalog();

    let first = manager.plan(&catalog, false, false).expect("plan should succeed");
    assert_eq!(first.creations().count(), 3);
    catalog.apply(&first);

    let second = manager.plan(&catalog, false, false).expect("plan should succeed");
    assert!(second.is_empty());
    assert!(second.model_plans.is_empty());
}

#[test]
fn only_auto_created_partitions_are_deleted() {
    let clock = clock_at(1337, 6, 15);
    let strategy = CurrentTimePartitioningStrategy::new(
        TimePartitionSize::months(1).expect("valid size"),
        1,
    )
    .with_max_age(TimePartitionSize::months(3).expect("valid size"))
    .with_clock(Arc::new(clock));
    let manager = PartitioningManager::new(vec![
        PartitioningConfig::new(event_model(), strategy).expect("config should be valid"),
    ])
    .expect("manager should be valid");

    let catalog = empty_catalog()
        .with_partition("app_event", "1337_mar", Some(AUTO_PARTITIONED_COMMENT))
        .with_partition("app_event", "1337_feb", None)
        .with_partition("app_event", "1337_jan", Some(AUTO_PARTITIONED_COMMENT));

    let plan = manager.plan(&catalog, true, false).expect("plan should succeed");

    let deleted: Vec<_> = plan.deletions().map(PartitionSpec::name).collect();
    assert_eq!(deleted, ["1337_mar", "1337_jan"]);
    assert_eq!(plan.creations().count(), 0);
}

#[test]
fn applying_a_plan_tags_creations_inside_one_atomic_block() {
    let clock = clock_at(2019, 1, 15);
    let manager = monthly_manager(&clock, 2);
    let catalog = empty_catalog().with_partition("app_event", "2019_jan", None);

    let plan = manager.plan(&catalog, false, false).expect("plan should succeed");
    let mut editor = RecordingSchemaEditor::default();
    plan.apply(&mut editor).expect("apply should succeed");

    assert_eq!(editor.atomic_blocks, 1);
    assert_eq!(
        editor.calls,
        [
            "atomic {".to_string(),
            format!(
                "add_range_partition app_event 2019_feb [2019-02-01 00:00..2019-03-01 00:00] comment={AUTO_PARTITIONED_COMMENT}"
            ),
            "}".to_string(),
        ]
    );
}

#[test]
fn missing_table_is_reported_with_a_migrate_hint() {
    let manager = monthly_manager(&clock_at(2019, 1, 1), 1);

    let error = manager
        .plan(&FakeIntrospection::default(), false, false)
        .expect_err("table does not exist");

    assert_eq!(
        error.to_string(),
        "Model Event, with table app_event does not exists in the database. Did you run `migrate`?"
    );
}

#[test]
fn hash_partitioned_tables_cannot_be_planned() {
    let manager = monthly_manager(&clock_at(2019, 1, 1), 1);
    let catalog = FakeIntrospection::default().with_table("app_event", PartitioningMethod::Hash, &["timestamp"]);

    assert!(matches!(
        manager.plan(&catalog, false, false),
        Err(Error::Partitioning(PartitioningError::UnsupportedMethod { .. }))
    ));
}

#[test]
fn one_config_per_model() {
    let size = TimePartitionSize::days(1).expect("valid size");
    let first = partition_by_current_time(event_model(), 1, size, None, None).expect("config should be valid");
    let second = partition_by_current_time(event_model(), 2, size, None, None).expect("config should be valid");

    let error = PartitioningManager::new(vec![first, second]).expect_err("duplicate configs");
    assert_eq!(
        error.to_string(),
        "Only one partitioning config per model is allowed (model `Event`)"
    );
}

#[test]
fn configs_require_partitioned_models() {
    let plain = Arc::new(
        ModelDef::builder("app", "Plain")
            .field(FieldDef::new("name", DataType::Text))
            .build()
            .expect("plain model should build"),
    );
    let size = TimePartitionSize::days(1).expect("valid size");

    let error = partition_by_current_time(plain, 1, size, None, None).expect_err("model is not partitioned");
    assert_eq!(
        error.to_string(),
        "improperly configured model `Plain`: only partitioned models can be given a partitioning config"
    );

    assert!(partition_by_current_time(event_model(), 1, size, None, Some("%Y_%Q")).is_err());
}

#[test]
fn manager_finds_configs_by_model() {
    let manager = monthly_manager(&clock_at(2019, 1, 1), 1);

    assert!(manager.find_config_for_model(&event_model()).is_some());

    let other = ModelDef::builder("app", "Other")
        .field(FieldDef::new("day", DataType::Date))
        .partitioned(PartitioningOptions::range(["day"]))
        .build()
        .expect("other model should build");
    assert!(manager.find_config_for_model(&other).is_none());
}

#[test]
fn delete_on_condition_filters_the_delegate() {
    let delegate = ExplicitPartitioningStrategy::new(
        Vec::new(),
        vec![
            PartitionSpec::list("eu", vec!["de".into()]),
            PartitionSpec::list("us", vec!["us".into()]),
        ],
    );
    let strategy = DeleteOnConditionPartitioningStrategy::new(delegate, |partition: &PartitionSpec| {
        partition.name() == "us"
    });

    let manager = PartitioningManager::new(vec![
        PartitioningConfig::new(event_model(), strategy).expect("config should be valid"),
    ])
    .expect("manager should be valid");
    let catalog = empty_catalog()
        .with_partition("app_event", "eu", Some(AUTO_PARTITIONED_COMMENT))
        .with_partition("app_event", "us", Some(AUTO_PARTITIONED_COMMENT));

    let plan = manager.plan(&catalog, false, false).expect("plan should succeed");
    let deleted: Vec<_> = plan.deletions().map(PartitionSpec::name).collect();
    assert_eq!(deleted, ["us"]);
    assert_eq!(plan.creations().count(), 0);
}

fn regional_event_model() -> Arc<ModelDef> {
    Arc::new(
        ModelDef::builder("app", "Event")
            .field(FieldDef::new("country", DataType::Text))
            .field(FieldDef::new(
                "timestamp",
                DataType::Timestamp {
                    with_timezone: true,
                },
            ))
            .partitioned(
                PartitioningOptions::range(["timestamp"])
                    .with_subpartitioning(PartitioningMethod::List, ["country"]),
            )
            .build()
            .expect("regional event model should build"),
    )
}

fn regional_manager(clock: &FixedClock, count: usize) -> PartitioningManager {
    let strategy = CurrentTimePartitioningStrategy::new(
        TimePartitionSize::months(1).expect("valid size"),
        count,
    )
    .with_clock(Arc::new(clock.clone()));
    let substrategy = ExplicitPartitioningStrategy::new(
        vec![
            PartitionSpec::list("de", vec![Value::text("de")]),
            PartitionSpec::default_partition("default"),
        ],
        Vec::new(),
    );
    let config = PartitioningConfig::new(regional_event_model(), strategy)
        .expect("config should be valid")
        .with_substrategy(substrategy);
    PartitioningManager::new(vec![config]).expect("manager should be valid")
}

#[test]
fn sub_partitions_follow_each_new_partition() {
    let clock = clock_at(2019, 1, 15);
    let manager = regional_manager(&clock, 2);
    let catalog = empty_catalog();

    let plan = manager.plan(&catalog, false, true).expect("plan should succeed");
    let created: Vec<_> = plan.creations().map(PartitionSpec::name).collect();
    assert_eq!(
        created,
        [
            "2019_jan",
            "2019_jan_de",
            "2019_jan_default",
            "2019_feb",
            "2019_feb_de",
            "2019_feb_default",
        ]
    );

    let sub = plan.creations().nth(1).expect("sub-partition should be planned");
    assert_eq!(
        sub.deconstruct(),
        vec![
            ("name", "2019_jan_de".to_string()),
            ("parent", "2019_jan".to_string()),
            ("values", "de".to_string()),
        ]
    );

    let mut editor = RecordingSchemaEditor::default();
    plan.apply(&mut editor).expect("apply should succeed");
    assert_eq!(editor.atomic_blocks, 1);
    assert!(editor.calls[1].starts_with("add_range_partition app_event 2019_jan "));
    assert_eq!(
        editor.calls[2],
        format!("add_sub_partition app_event 2019_jan de [de] comment={AUTO_PARTITIONED_COMMENT}")
    );
    assert_eq!(
        editor.calls[3],
        format!("add_sub_partition app_event 2019_jan default [] comment={AUTO_PARTITIONED_COMMENT}")
    );

    catalog.apply(&plan);
    assert_eq!(catalog.partition_names("app_event_2019_feb"), ["de", "default"]);
    assert!(manager.plan(&catalog, false, true).expect("plan should succeed").is_empty());
}

#[test]
fn missing_sub_partitions_of_existing_partitions_are_planned() {
    let clock = clock_at(2019, 1, 15);
    let manager = regional_manager(&clock, 1);
    let catalog = empty_catalog()
        .with_partition("app_event", "2019_jan", Some(AUTO_PARTITIONED_COMMENT))
        .with_table("app_event_2019_jan", PartitioningMethod::List, &["country"])
        .with_partition("app_event_2019_jan", "de", Some(AUTO_PARTITIONED_COMMENT));

    let plan = manager.plan(&catalog, false, true).expect("plan should succeed");
    let created: Vec<_> = plan.creations().map(PartitionSpec::name).collect();
    assert_eq!(created, ["2019_jan_default"]);
}

#[test]
fn substrategy_must_match_the_model() {
    let size = TimePartitionSize::months(1).expect("valid size");

    let without = partition_by_current_time(regional_event_model(), 1, size, None, None)
        .expect("config should be valid");
    assert!(matches!(
        PartitioningManager::new(vec![without]),
        Err(Error::Partitioning(PartitioningError::MissingSubstrategy { .. }))
    ));

    let unexpected = partition_by_current_time(event_model(), 1, size, None, None)
        .expect("config should be valid")
        .with_substrategy(ExplicitPartitioningStrategy::new(Vec::new(), Vec::new()));
    assert!(matches!(
        PartitioningManager::new(vec![unexpected]),
        Err(Error::Partitioning(PartitioningError::UnexpectedSubstrategy { .. }))
    ));
}
