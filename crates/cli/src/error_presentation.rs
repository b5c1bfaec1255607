use std::{io, path::PathBuf};

use anyhow::Context;
use miette::Report;

const COMMAND_CONTEXT: &str = "while running command";
const FILE_READ_CONTEXT: &str = "while reading file";
const CONFIG_PARSE_CONTEXT: &str = "while parsing config file";
const PROMPT_CONTEXT: &str = "while reading confirmation";
const OUTPUT_CONTEXT: &str = "while writing output";

pub(crate) type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug)]
pub(crate) enum CliError {
    ReadFile {
        path: PathBuf,
        source: io::Error,
    },
    ParseConfig {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    Prompt(io::Error),
    Output(serde_json::Error),
    Core(pgextra_core::Error),
}

impl From<pgextra_core::Error> for CliError {
    fn from(value: pgextra_core::Error) -> Self {
        Self::Core(value)
    }
}

impl From<pgextra_core::ConfigError> for CliError {
    fn from(value: pgextra_core::ConfigError) -> Self {
        Self::Core(value.into())
    }
}

pub(crate) fn render_runtime_error(error: CliError) -> String {
    match error {
        CliError::ReadFile { path, source } => {
            let context = format!("{FILE_READ_CONTEXT} `{}`", path.display());
            let report = report_with_context(source, context);
            format!("[io] {report}")
        }
        CliError::ParseConfig { path, source } => {
            let context = format!("{CONFIG_PARSE_CONTEXT} `{}`", path.display());
            let report = report_with_context(source, context);
            format!("[config] {report}")
        }
        CliError::Prompt(source) => {
            let report = report_with_context(source, PROMPT_CONTEXT);
            format!("[io] {report}")
        }
        CliError::Output(source) => {
            let report = report_with_context(source, OUTPUT_CONTEXT);
            format!("[io] {report}")
        }
        CliError::Core(source) => {
            let category = core_category(&source);
            let report = report_with_context(source, COMMAND_CONTEXT);
            format!("[{category}] {report}")
        }
    }
}

fn report_with_context<E, C>(source: E, context: C) -> Report
where
    E: std::error::Error + Send + Sync + 'static,
    C: Into<String>,
{
    let context = context.into();
    let anyhow_error = std::result::Result::<(), E>::Err(source)
        .context(context)
        .expect_err("context wrapping must produce an error");
    miette::miette!("{anyhow_error:#}")
}

fn core_category(error: &pgextra_core::Error) -> &'static str {
    match error {
        pgextra_core::Error::Config(_) => "config",
        pgextra_core::Error::Partitioning(_) => "partitioning",
        pgextra_core::Error::Introspection(_) => "introspection",
        pgextra_core::Error::Conflict(_) => "conflict",
        pgextra_core::Error::Migration(_) => "migration",
        pgextra_core::Error::Execute(_) => "execute",
    }
}
