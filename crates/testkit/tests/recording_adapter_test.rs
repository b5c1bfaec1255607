use pgextra_core::{DatabaseAdapter, Error, ExecutionError, Value, Version};
use pgextra_testkit::{RecordedCall, RecordingAdapter, row};

#[test]
fn answers_queries_from_the_first_matching_pattern() {
    let adapter = RecordingAdapter::new()
        .respond("pg_namespace", vec![row([("exists", Value::Bool(true))])])
        .respond("pg_", vec![row([("exists", Value::Bool(false))])]);

    let rows = adapter
        .query("SELECT 1 FROM pg_namespace WHERE nspname = $1", &[Value::text("archive")])
        .expect("query should succeed");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("exists"), Some(&Value::Bool(true)));
    assert_eq!(rows[0].get("missing"), None);
    assert_eq!(
        adapter.calls(),
        vec![RecordedCall {
            sql: "SELECT 1 FROM pg_namespace WHERE nspname = $1".to_string(),
            params: vec![Value::text("archive")],
        }]
    );

    assert!(
        adapter
            .query("SELECT now()", &[])
            .expect("query should succeed")
            .is_empty()
    );
}

#[test]
fn failing_statements_are_still_recorded() {
    let adapter = RecordingAdapter::new().fail_on("DROP SCHEMA", "permission denied");

    let error = adapter
        .execute("DROP SCHEMA \"archive\"")
        .expect_err("statement should fail");

    match error {
        Error::Execute(ExecutionError::StatementFailed { sql, .. }) => {
            assert_eq!(sql, "DROP SCHEMA \"archive\"");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(adapter.executed_sql(), vec!["DROP SCHEMA \"archive\""]);
}

#[test]
fn transactions_record_begin_commit_and_rollback() {
    let mut adapter = RecordingAdapter::new();

    {
        let mut transaction = adapter.begin().expect("begin should succeed");
        transaction
            .execute("CREATE SCHEMA \"archive\"")
            .expect("statement should succeed");
        transaction.commit().expect("commit should succeed");
    }
    {
        let mut transaction = adapter.begin().expect("begin should succeed");
        transaction
            .execute("DROP SCHEMA \"archive\"")
            .expect("statement should succeed");
    }

    assert_eq!(
        adapter.executed_sql(),
        vec![
            "BEGIN",
            "CREATE SCHEMA \"archive\"",
            "COMMIT",
            "BEGIN",
            "DROP SCHEMA \"archive\"",
            "ROLLBACK",
        ]
    );

    adapter.clear();
    assert!(adapter.calls().is_empty());
}

#[test]
fn session_details_are_configurable() {
    let version = Version {
        major: 12,
        minor: 4,
        patch: 0,
    };
    let adapter = RecordingAdapter::new()
        .with_backend_pid(77)
        .with_server_version(version.clone());

    assert_eq!(adapter.backend_pid().expect("pid should be known"), 77);
    assert_eq!(adapter.server_version().expect("version should be known"), version);
    assert_eq!(RecordingAdapter::new().backend_pid().expect("pid should be known"), 4242);
}
