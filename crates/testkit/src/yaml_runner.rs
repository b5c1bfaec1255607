use std::{collections::BTreeMap, fs, path::Path};

use pgextra_core::{
    ModelDef, Renderer, SchemaEditor, Statement,
    migrations::{Deconstructed, ModelState, Operation, ProjectState},
};
use serde::Deserialize;

const DEFAULT_APP_LABEL: &str = "app";

/// One migration case: operations applied on top of `models`, with the SQL
/// expected in each direction.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestCase {
    pub app_label: Option<String>,
    /// Models present before the first operation.
    pub models: Vec<ModelDef>,
    pub operations: Vec<Deconstructed>,
    pub up: Option<String>,
    pub down: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Failed(String),
}

pub fn load_test_cases_from_str(yaml: &str) -> Result<BTreeMap<String, TestCase>, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

pub fn load_test_cases_from_path(path: &Path) -> Result<BTreeMap<String, TestCase>, String> {
    let yaml = fs::read_to_string(path).map_err(|error| format!("{}: {error}", path.display()))?;
    load_test_cases_from_str(&yaml).map_err(|error| format!("{}: {error}", path.display()))
}

/// Runs the operations forwards, then backwards, through `editor` and
/// compares the collected SQL with the expectations.
pub fn run_migration_test(editor: &mut dyn SchemaEditor, test: &TestCase) -> TestResult {
    let outcome = evaluate_expected_error(test, run_migration_flow(editor, test));
    // Drop anything a failed run left collected.
    editor.take_collected();

    match outcome {
        Ok(()) => TestResult::Passed,
        Err(reason) => TestResult::Failed(reason),
    }
}

/// Parses every statement with the PostgreSQL grammar.
pub fn validate_postgres_sql(statements: &[Statement]) -> Result<(), String> {
    for statement in statements {
        pg_query::parse(statement.sql())
            .map_err(|error| format!("invalid SQL `{}`: {error}", statement.sql()))?;
    }
    Ok(())
}

fn run_migration_flow(editor: &mut dyn SchemaEditor, test: &TestCase) -> Result<(), String> {
    validate_direction_expectations(test)?;

    let app_label = test.app_label.as_deref().unwrap_or(DEFAULT_APP_LABEL);
    let operations = test
        .operations
        .iter()
        .map(Deconstructed::reconstruct)
        .collect::<pgextra_core::Result<Vec<_>>>()
        .map_err(|error| error.to_string())?;

    let mut initial = ProjectState::new();
    for model in &test.models {
        let model = model.clone().finalize().map_err(|error| error.to_string())?;
        initial.add_model(ModelState::from_model(&model));
    }

    let states = apply_forwards(editor, app_label, &operations, initial)?;
    let forward = editor.take_collected();
    validate_postgres_sql(&forward)?;
    assert_expected_sql("up", test.up.as_deref(), &forward)?;

    for (index, operation) in operations.iter().enumerate().rev() {
        operation
            .database_backwards(app_label, editor, &states[index + 1], &states[index])
            .map_err(|error| error.to_string())?;
    }
    let reverse = editor.take_collected();
    validate_postgres_sql(&reverse)?;
    assert_expected_sql("down", test.down.as_deref(), &reverse)?;

    Ok(())
}

/// States before and after every operation, `operations.len() + 1` long.
fn apply_forwards(
    editor: &mut dyn SchemaEditor,
    app_label: &str,
    operations: &[Box<dyn Operation>],
    initial: ProjectState,
) -> Result<Vec<ProjectState>, String> {
    let mut states = vec![initial];

    for operation in operations {
        let from_state = states.last().cloned().unwrap_or_default();
        let mut to_state = from_state.clone();
        operation
            .state_forwards(app_label, &mut to_state)
            .map_err(|error| error.to_string())?;
        operation
            .database_forwards(app_label, editor, &from_state, &to_state)
            .map_err(|error| error.to_string())?;
        states.push(to_state);
    }

    Ok(states)
}

fn evaluate_expected_error(test: &TestCase, outcome: Result<(), String>) -> Result<(), String> {
    let Some(expected_error) = test.error.as_deref() else {
        return outcome;
    };

    match outcome {
        Ok(()) => Err(format!("expected error: {expected_error}, but got no error")),
        Err(actual_error) if actual_error == expected_error => Ok(()),
        Err(actual_error) => Err(format!(
            "expected error: {expected_error}, but got: {actual_error}"
        )),
    }
}

fn validate_direction_expectations(test: &TestCase) -> Result<(), String> {
    match (&test.up, &test.down) {
        (Some(_), Some(_)) | (None, None) => Ok(()),
        _ => Err("`up` and `down` must either both be set or both be omitted".to_string()),
    }
}

fn assert_expected_sql(direction: &str, expected: Option<&str>, statements: &[Statement]) -> Result<(), String> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let actual = Renderer::new().render_statements(statements);
    if expected.trim() == actual.trim() {
        return Ok(());
    }

    Err(format!(
        "{direction} SQL mismatch; expected:\n{}\nactual:\n{}",
        expected.trim(),
        actual.trim()
    ))
}
