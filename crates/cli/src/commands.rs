use std::{
    collections::BTreeMap,
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use clap::{Args, ValueEnum};
use pgextra_core::{
    Clock, ConnectionConfig, PartitioningManager, PartitioningPlan, Settings,
    SystemClock,
    migrations::{Deconstructed, MigrationAutodetector, ProjectState},
    partitioning::{AutoPartitionRequest, AutoPartitionUnit},
};
use pgextra_postgres::{
    MigrationTimeout, PostgresAdapter, PostgresIntrospection, PostgresOperationClassifier,
    PostgresSchemaEditor,
};
use tracing::info;

use crate::{
    config_file::{CliConfig, lookup_model},
    error_presentation::{CliError, CliResult},
};

const NOTHING_TO_DO: &str = "Nothing to be done.";
const CONFIRMATION_PROMPT: &str = "Do you want to proceed? (y/N) ";
const ABORTED: &str = "Operation aborted.";
const APPLIED: &str = "Operations applied.";

/// Overrides for the `connection` section of the config file.
#[derive(Debug, Default, Args)]
pub(crate) struct ConnectionArgs {
    /// Database server host
    #[arg(long)]
    host: Option<String>,
    /// Database server port
    #[arg(long)]
    port: Option<u16>,
    /// Database user
    #[arg(long)]
    user: Option<String>,
    /// Database password
    #[arg(long)]
    password: Option<String>,
    /// Unix socket directory
    #[arg(long)]
    socket: Option<String>,
    /// Database name
    #[arg(long)]
    database: Option<String>,
}

impl ConnectionArgs {
    fn apply(&self, mut config: ConnectionConfig) -> ConnectionConfig {
        if let Some(host) = &self.host {
            config.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(user) = &self.user {
            config.user = Some(user.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(socket) = &self.socket {
            config.socket = Some(socket.clone());
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        config
    }
}

#[derive(Debug, Args)]
pub(crate) struct PartitionArgs {
    /// Only print the plan; nothing is created or deleted
    #[arg(long, short = 'd')]
    dry: bool,
    /// Apply without asking for confirmation, deletions included
    #[arg(long, short = 'y')]
    yes: bool,
    /// Do not create partitions
    #[arg(long)]
    skip_create: bool,
    /// Do not delete partitions
    #[arg(long)]
    skip_delete: bool,
    /// YAML file with connection, models and partitioning configs
    #[arg(long)]
    config: PathBuf,
    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum IntervalUnit {
    Month,
    Week,
}

impl From<IntervalUnit> for AutoPartitionUnit {
    fn from(value: IntervalUnit) -> Self {
        match value {
            IntervalUnit::Month => Self::Month,
            IntervalUnit::Week => Self::Week,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct AutopartitionArgs {
    /// Label of the app the partitioned model is in
    #[arg(long, short = 'a')]
    app_label: String,
    /// Name of the partitioned model to create partitions for
    model_name: String,
    /// Amount of partitions to create ahead of the current date
    #[arg(long, short = 'c', default_value_t = 1)]
    count: usize,
    /// Unit in which the interval is expressed
    #[arg(long, short = 'u', value_enum, default_value_t = IntervalUnit::Month)]
    interval_unit: IntervalUnit,
    /// Amount of units in-between partitions
    #[arg(long, short = 'i', default_value_t = 1)]
    interval: u32,
    /// Skip partitions that would hold data before this date (YYYY-MM-DD)
    #[arg(long)]
    start_from: Option<chrono::NaiveDate>,
    /// YAML file with connection and models
    #[arg(long)]
    config: PathBuf,
    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Debug, Args)]
pub(crate) struct MakemigrationsArgs {
    /// YAML file with the models as they were
    #[arg(long)]
    from: PathBuf,
    /// YAML file with the models as they should be
    #[arg(long)]
    to: PathBuf,
    /// Only print operations for this app
    #[arg(long, short = 'a')]
    app_label: Option<String>,
}

pub(crate) fn partition(args: &PartitionArgs) -> CliResult<()> {
    let config = CliConfig::load(&args.config)?;
    let registry = config.registry()?;
    let manager = config.partitioning_manager(&registry)?;
    let settings = Settings::from_env()?;

    let mut adapter = PostgresAdapter::connect(&args.connection.apply(config.connection), &settings)?;
    let plan = plan_with(&manager, &adapter, args.skip_create, args.skip_delete)?;

    if plan.is_empty() {
        println!("{NOTHING_TO_DO}");
        return Ok(());
    }

    print!("{}", plan.render());
    if args.dry {
        return Ok(());
    }

    if !args.yes && !confirm(&mut io::stdin().lock())? {
        println!("{ABORTED}");
        return Ok(());
    }

    apply(&plan, &mut adapter, &settings)?;
    println!("{APPLIED}");
    Ok(())
}

pub(crate) fn autopartition(args: &AutopartitionArgs) -> CliResult<()> {
    let config = CliConfig::load(&args.config)?;
    let registry = config.registry()?;
    let model = lookup_model(&registry, &format!("{}.{}", args.app_label, args.model_name))?;
    let settings = Settings::from_env()?;

    let mut adapter = PostgresAdapter::connect(&args.connection.apply(config.connection), &settings)?;
    let request = AutoPartitionRequest {
        count: args.count,
        unit: args.interval_unit.into(),
        interval: args.interval,
        start_from: args.start_from,
    };
    let partitioning_config = {
        let introspection = PostgresIntrospection::new(&adapter);
        request.config(model, &introspection, SystemClock.now().naive_utc())?
    };
    let manager = PartitioningManager::new(vec![partitioning_config])?;
    let plan = plan_with(&manager, &adapter, false, true)?;

    if plan.is_empty() {
        println!("{NOTHING_TO_DO}");
        return Ok(());
    }

    print!("{}", plan.render());
    apply(&plan, &mut adapter, &settings)?;
    println!("{APPLIED}");
    Ok(())
}

pub(crate) fn makemigrations(args: &MakemigrationsArgs) -> CliResult<()> {
    let from_registry = CliConfig::load(&args.from)?.registry()?;
    let to_registry = CliConfig::load(&args.to)?.registry()?;
    let from_state = ProjectState::from_models(from_registry.iter().map(Arc::as_ref));
    let to_state = ProjectState::from_models(to_registry.iter().map(Arc::as_ref));

    let changes = MigrationAutodetector::new(&from_state, &to_state).changes(&PostgresOperationClassifier)?;

    let mut rendered: BTreeMap<String, Vec<Deconstructed>> = BTreeMap::new();
    for (app_label, operations) in changes {
        if args
            .app_label
            .as_deref()
            .is_some_and(|wanted| wanted != app_label)
        {
            continue;
        }
        let mut deconstructed = Vec::with_capacity(operations.len());
        for operation in &operations {
            deconstructed.push(operation.deconstruct()?);
        }
        info!(app_label = %app_label, operations = deconstructed.len(), "detected changes");
        rendered.insert(app_label, deconstructed);
    }

    let json = serde_json::to_string_pretty(&rendered).map_err(CliError::Output)?;
    println!("{json}");
    Ok(())
}

fn plan_with<'m>(
    manager: &'m PartitioningManager,
    adapter: &PostgresAdapter,
    skip_create: bool,
    skip_delete: bool,
) -> CliResult<PartitioningPlan<'m>> {
    let introspection = PostgresIntrospection::new(adapter);
    Ok(manager.plan(&introspection, skip_create, skip_delete)?)
}

fn apply(plan: &PartitioningPlan<'_>, adapter: &mut PostgresAdapter, settings: &Settings) -> CliResult<()> {
    let connection = adapter.config().clone();
    MigrationTimeout::from_settings(settings).run(adapter, &connection, |adapter| {
        let mut editor = PostgresSchemaEditor::new(adapter);
        plan.apply(&mut editor)
    })?;
    Ok(())
}

/// Reads one answer line. Only answers starting with `y` count as yes.
fn confirm(input: &mut impl BufRead) -> CliResult<bool> {
    print!("{CONFIRMATION_PROMPT}");
    io::stdout().flush().map_err(CliError::Prompt)?;

    let mut answer = String::new();
    input.read_line(&mut answer).map_err(CliError::Prompt)?;
    Ok(answer.trim().to_lowercase().starts_with('y'))
}
