#![allow(dead_code)]

use std::{fs, path::PathBuf, process::Command};

use tempfile::TempDir;

pub const EVENT_MODELS: &str = r"
models:
  - app_label: tracking
    name: Event
    fields:
      - name: timestamp
        data_type: {timestamp: {with_timezone: true}}
    kind:
      partitioned: {method: range, key: [timestamp]}
";

pub fn run_pgextra(args: &[&str]) -> std::process::Output {
    pgextra_command(args)
        .output()
        .unwrap_or_else(|error| panic!("failed to run pgextra: {error}"))
}

pub fn pgextra_command(args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_pgextra"));
    command
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("PGEXTRA_DATABASE_BACKEND_BASE")
        .env_remove("PGEXTRA_AUTO_EXTENSION_SET_UP")
        .env_remove("PGEXTRA_MIGRATION_TIMEOUT_SECS");
    command
}

pub fn write_file(dir: &TempDir, name: &str, contents: &str) -> String {
    let path: PathBuf = dir.path().join(name);
    fs::write(&path, contents)
        .unwrap_or_else(|error| panic!("failed to write {}: {error}", path.display()));
    path.to_string_lossy().into_owned()
}
