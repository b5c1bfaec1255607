mod recording_adapter;
mod yaml_runner;

pub use recording_adapter::{RecordedCall, RecordingAdapter, row};
pub use yaml_runner::{
    TestCase, TestResult, load_test_cases_from_path, load_test_cases_from_str,
    run_migration_test, validate_postgres_sql,
};
