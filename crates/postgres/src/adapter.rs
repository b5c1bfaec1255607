use std::{
    error::Error as StdError,
    io,
    sync::{Mutex, MutexGuard},
};

use pgextra_core::{
    ConnectionConfig, DatabaseAdapter, ExecutionError, QueryRow, Result, Settings, Transaction,
    Value, Version,
};
use postgres::{Client, NoTls, types::ToSql};
use tracing::{debug, info};

use crate::params::{SqlParam, decode_column};

const BEGIN_SQL: &str = "BEGIN";
const CONNECT_SQL: &str = "CONNECT postgres";
const BACKEND_PID_SQL: &str = "SELECT pg_backend_pid()";
const SHOW_SERVER_VERSION_SQL: &str = "SHOW server_version";
const HSTORE_EXTENSION_SQL: &str = "CREATE EXTENSION IF NOT EXISTS hstore";
const DEFAULT_POSTGRES_HOST: &str = "127.0.0.1";
const MINIMUM_POSTGRES_MAJOR_VERSION: u16 = 11;
const SERVER_VERSION_OVERRIDE_KEY: &str = "postgres.server_version";
const POISONED_CLIENT_MESSAGE: &str = "postgres connection state was poisoned";

/// Synchronous adapter over a single `postgres::Client`.
pub struct PostgresAdapter {
    client: Mutex<Client>,
    server_version: Version,
    config: ConnectionConfig,
}

impl PostgresAdapter {
    /// Connects, checks the server version and, unless disabled in
    /// `settings`, makes sure the hstore extension exists.
    pub fn connect(config: &ConnectionConfig, settings: &Settings) -> Result<Self> {
        let mut client = connect_client(config)?;

        let server_version_raw = match config.extra.get(SERVER_VERSION_OVERRIDE_KEY) {
            Some(raw_version) => raw_version.clone(),
            None => query_scalar(&mut client, SHOW_SERVER_VERSION_SQL)?,
        };
        let server_version = parse_server_version(&server_version_raw)
            .ok_or_else(|| invalid_server_version_error(&server_version_raw))?;
        ensure_minimum_version(&server_version, &server_version_raw)?;

        if settings.auto_extension_set_up {
            info!("ensuring the hstore extension exists");
            client
                .batch_execute(HSTORE_EXTENSION_SQL)
                .map_err(|source| execution_error(HSTORE_EXTENSION_SQL, source))?;
        }

        Ok(Self {
            client: Mutex::new(client),
            server_version,
            config: config.clone(),
        })
    }

    /// Settings the adapter was opened with; side connections reuse them.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn lock_client(&self, sql: &str) -> Result<MutexGuard<'_, Client>> {
        self.client
            .lock()
            .map_err(|_| execution_error(sql, io::Error::other(POISONED_CLIENT_MESSAGE)))
    }
}

impl DatabaseAdapter for PostgresAdapter {
    fn execute(&self, sql: &str) -> Result<()> {
        let mut client = self.lock_client(sql)?;
        client
            .batch_execute(sql)
            .map_err(|source| execution_error(sql, source))
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<QueryRow>> {
        let params = params.iter().map(SqlParam).collect::<Vec<_>>();
        let params = params
            .iter()
            .map(|param| param as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();

        let mut client = self.lock_client(sql)?;
        let rows = client
            .query(sql, &params)
            .map_err(|source| execution_error(sql, source))?;
        debug!(rows = rows.len(), "query returned");

        rows.iter()
            .map(|row| {
                let columns = row
                    .columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect();
                let values = (0..row.len())
                    .map(|index| decode_column(row, index))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|source| execution_error(sql, source))?;
                Ok(QueryRow::new(columns, values))
            })
            .collect()
    }

    fn begin(&mut self) -> Result<Transaction<'_>> {
        self.execute(BEGIN_SQL)?;
        Ok(Transaction::new(self))
    }

    fn backend_pid(&self) -> Result<i32> {
        let mut client = self.lock_client(BACKEND_PID_SQL)?;
        let row = client
            .query_one(BACKEND_PID_SQL, &[])
            .map_err(|source| execution_error(BACKEND_PID_SQL, source))?;
        row.try_get::<_, i32>(0)
            .map_err(|source| execution_error(BACKEND_PID_SQL, source))
    }

    fn server_version(&self) -> Result<Version> {
        Ok(self.server_version.clone())
    }
}

pub(crate) fn connect_client(config: &ConnectionConfig) -> Result<Client> {
    let mut postgres_config = postgres::Config::new();

    if let Some(socket_path) = &config.socket {
        postgres_config.host_path(socket_path);
    } else if let Some(host) = &config.host {
        postgres_config.host(host);
    } else {
        postgres_config.host(DEFAULT_POSTGRES_HOST);
    }

    if let Some(port) = config.port {
        postgres_config.port(port);
    }
    if let Some(user) = &config.user {
        postgres_config.user(user);
    }
    if let Some(password) = &config.password {
        postgres_config.password(password);
    }
    postgres_config.dbname(&config.database);

    postgres_config
        .connect(NoTls)
        .map_err(|source| execution_error(CONNECT_SQL, source))
}

pub fn parse_server_version(raw: &str) -> Option<Version> {
    let mut parts = raw.split_whitespace().next()?.split('.');
    let major = parse_version_component(parts.next()?)?;
    let minor = parts.next().and_then(parse_version_component).unwrap_or(0);
    let patch = parts.next().and_then(parse_version_component).unwrap_or(0);

    Some(Version {
        major,
        minor,
        patch,
    })
}

fn query_scalar(client: &mut Client, sql: &str) -> Result<String> {
    let row = client
        .query_one(sql, &[])
        .map_err(|source| execution_error(sql, source))?;
    row.try_get::<_, String>(0)
        .map_err(|source| execution_error(sql, source))
}

fn parse_version_component(raw: &str) -> Option<u16> {
    let digits = raw
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect::<String>();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u16>().ok()
}

fn ensure_minimum_version(version: &Version, raw_version: &str) -> Result<()> {
    if version.major >= MINIMUM_POSTGRES_MAJOR_VERSION {
        return Ok(());
    }

    Err(execution_error(
        SHOW_SERVER_VERSION_SQL,
        io::Error::other(format!(
            "postgres server version `{raw_version}` is not supported; requires {MINIMUM_POSTGRES_MAJOR_VERSION}+"
        )),
    ))
}

fn invalid_server_version_error(raw_version: &str) -> pgextra_core::Error {
    execution_error(
        SHOW_SERVER_VERSION_SQL,
        io::Error::other(format!(
            "failed to parse postgres server version string: `{raw_version}`"
        )),
    )
}

pub(crate) fn execution_error<E>(sql: &str, source: E) -> pgextra_core::Error
where
    E: StdError + Send + Sync + 'static,
{
    ExecutionError::statement_failed(0, sql, 0, None, source).into()
}

#[cfg(test)]
mod tests {
    use super::parse_server_version;

    #[test]
    fn parses_packaged_server_versions() {
        let version = parse_server_version("16.2 (Debian 16.2-1.pgdg120+2)").expect("version");
        assert_eq!((version.major, version.minor, version.patch), (16, 2, 0));
        assert!(parse_server_version("beta").is_none());
    }
}
