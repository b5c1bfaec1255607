#[path = "support/cli.rs"]
mod cli;

use cli::{EVENT_MODELS, pgextra_command, run_pgextra, write_file};
use tempfile::tempdir;

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn partition_config(partitioning: &str) -> String {
    format!("connection: {{database: app}}\n{EVENT_MODELS}partitioning:\n{partitioning}")
}

#[test]
fn missing_config_file_is_an_io_error_with_path_context() {
    let dir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let missing = dir.path().join("missing.yml");
    let missing = missing.to_string_lossy().into_owned();

    let output = run_pgextra(&["partition", "--config", missing.as_str()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("[io]"), "got: {stderr}");
    assert!(stderr.contains("while reading file"), "got: {stderr}");
    assert!(stderr.contains("missing.yml"), "got: {stderr}");
}

#[test]
fn malformed_config_is_a_config_error() {
    let dir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let config = write_file(&dir, "pgextra.yml", "models: [\n");

    let output = run_pgextra(&["partition", "--config", config.as_str()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("[config]"), "got: {stderr}");
    assert!(stderr.contains("while parsing config file"), "got: {stderr}");
}

#[test]
fn duplicate_partitioning_config_keeps_partitioning_category() {
    let dir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let config = write_file(
        &dir,
        "pgextra.yml",
        &partition_config(
            "  - model: tracking.Event\n    strategy: {current_time: {unit: months, count: 3}}\n  - model: tracking.Event\n    strategy: {current_time: {unit: weeks, count: 1}}\n",
        ),
    );

    let output = run_pgextra(&["partition", "--config", config.as_str()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("[partitioning]"), "got: {stderr}");
    assert!(stderr.contains("while running command"), "got: {stderr}");
    assert!(
        stderr.contains("Only one partitioning config per model is allowed"),
        "got: {stderr}"
    );
}

#[test]
fn zero_sized_strategy_is_rejected_before_connecting() {
    let dir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let config = write_file(
        &dir,
        "pgextra.yml",
        &partition_config(
            "  - model: tracking.Event\n    strategy: {current_time: {unit: days, size: 0, count: 3}}\n",
        ),
    );

    let output = run_pgextra(&["partition", "--config", config.as_str()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("[partitioning]"), "got: {stderr}");
    assert!(stderr.contains("Partition cannot be 0 in size."), "got: {stderr}");
}

#[test]
fn unknown_model_reference_is_a_config_error() {
    let dir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let config = write_file(
        &dir,
        "pgextra.yml",
        &partition_config(
            "  - model: tracking.Visit\n    strategy: {current_time: {unit: months, count: 3}}\n",
        ),
    );

    let output = run_pgextra(&["partition", "--config", config.as_str()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("[config]"), "got: {stderr}");
    assert!(stderr.contains("tracking.Visit"), "got: {stderr}");
}

#[test]
fn half_configured_max_age_is_a_config_error() {
    let dir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let config = write_file(
        &dir,
        "pgextra.yml",
        &partition_config(
            "  - model: tracking.Event\n    strategy: {current_time: {unit: months, count: 3, max_age: 6}}\n",
        ),
    );

    let output = run_pgextra(&["partition", "--config", config.as_str()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("[config]"), "got: {stderr}");
    assert!(
        stderr.contains("`max_age_unit` and `max_age` must be given together"),
        "got: {stderr}"
    );
}

#[test]
fn substrategy_on_a_model_without_submethod_is_rejected_before_connecting() {
    let dir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let config = write_file(
        &dir,
        "pgextra.yml",
        &partition_config(
            "  - model: tracking.Event\n    strategy: {current_time: {unit: months, count: 3}}\n    substrategy: {current_time: {unit: days, count: 7}}\n",
        ),
    );

    let output = run_pgextra(&["partition", "--config", config.as_str()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("[partitioning]"), "got: {stderr}");
    assert!(
        stderr.contains("is not sub-partitioned but its partitioning config has a substrategy"),
        "got: {stderr}"
    );
}

#[test]
fn invalid_backend_base_setting_is_a_config_error() {
    let dir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let config = write_file(&dir, "pgextra.yml", &partition_config("  []\n"));

    let output = pgextra_command(&["partition", "--config", config.as_str()])
        .env("PGEXTRA_DATABASE_BACKEND_BASE", "mysql")
        .output()
        .unwrap_or_else(|error| panic!("failed to run pgextra: {error}"));

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("[config]"), "got: {stderr}");
    assert!(
        stderr.contains("`mysql` is not a valid database backend base"),
        "got: {stderr}"
    );
}

#[test]
fn makemigrations_reports_duplicate_models() {
    let dir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let duplicated = format!("{EVENT_MODELS}{}", EVENT_MODELS.replace("\nmodels:\n", ""));
    let to = write_file(&dir, "to.yml", &duplicated);
    let from = write_file(&dir, "from.yml", "models: []\n");

    let output = run_pgextra(&["makemigrations", "--from", from.as_str(), "--to", to.as_str()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("[config]"), "got: {stderr}");
    assert!(stderr.contains("is already registered"), "got: {stderr}");
}
