//! MySQL / MariaDB process list source
//!
//! Samples `SHOW FULL PROCESSLIST` through a one-connection pool. Each
//! snapshot checks the connection out and returns it afterwards; a
//! connection that broke mid-query is discarded by the pool and the next
//! snapshot dials a fresh one, so a server restart only costs the rounds
//! it was down for.
//!
//! MySQL returns 8 columns, MariaDB adds a trailing `Progress` column; any
//! other layout means rows cannot be read safely and is reported as fatal.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{OptsBuilder, Pool, PoolConstraints, PoolOpts, Row};
use tracing::{debug, info, warn};

use super::{select_statements, ProcessSource, SourceError, SourceResult};
use crate::config::ConnectionConfig;

/// Snapshot query. Its own session shows up in the result and is skipped.
pub const PROCESSLIST_QUERY: &str = "SHOW FULL PROCESSLIST";

/// Column counts of the MySQL and MariaDB layouts.
const ACCEPTED_WIDTHS: [usize; 2] = [8, 9];

/// Position of the `Info` column in both layouts.
const INFO_COLUMN: usize = 7;

/// Snapshots are sequential, one session is all the sampler ever needs.
const POOL_SIZE: usize = 1;

/// Process list source backed by a MySQL connection pool.
pub struct MySqlProcessList {
    pool: Option<Pool>,
}

impl MySqlProcessList {
    /// Connect and verify the server answers.
    pub async fn connect(config: &ConnectionConfig) -> SourceResult<Self> {
        let target = config.target();
        let connect_err = |source| SourceError::Connect {
            target: target.clone(),
            source,
        };

        let pool = Pool::new(build_opts(config));
        let mut conn = pool.get_conn().await.map_err(connect_err)?;
        conn.ping().await.map_err(connect_err)?;

        let (major, minor, patch) = conn.server_version();
        info!(
            "Connected to {} (server {}.{}.{})",
            target, major, minor, patch
        );
        drop(conn);

        Ok(Self { pool: Some(pool) })
    }
}

fn pool_opts() -> PoolOpts {
    let opts = PoolOpts::default();
    match PoolConstraints::new(POOL_SIZE, POOL_SIZE) {
        Some(constraints) => opts.with_constraints(constraints),
        None => opts,
    }
}

fn build_opts(config: &ConnectionConfig) -> OptsBuilder {
    let opts = OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(config.port)
        .user(Some(config.user.clone()))
        .pass(config.password.clone())
        .pool_opts(pool_opts());

    match &config.socket {
        Some(socket) => opts
            .socket(Some(socket.to_string_lossy().into_owned()))
            .prefer_socket(true),
        None => opts,
    }
}

/// Read the `Info` column of one row. Rows that fail to decode are skipped.
fn decode_info(row: &Row) -> Option<Option<String>> {
    match row.get_opt::<Option<String>, usize>(INFO_COLUMN) {
        Some(Ok(info)) => Some(info),
        Some(Err(e)) => {
            warn!("Skipping process list row: {}", e);
            None
        }
        None => None,
    }
}

#[async_trait]
impl ProcessSource for MySqlProcessList {
    async fn snapshot(&mut self) -> SourceResult<Vec<String>> {
        let pool = self.pool.as_ref().ok_or(SourceError::Closed)?;
        let mut conn = pool.get_conn().await?;

        let mut result = conn.query_iter(PROCESSLIST_QUERY).await?;

        let columns: Vec<String> = result
            .columns_ref()
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();
        if !ACCEPTED_WIDTHS.contains(&columns.len()) {
            return Err(SourceError::UnexpectedColumns(columns));
        }

        let rows: Vec<Row> = result.collect().await?;
        let total = rows.len();
        let statements = select_statements(rows.iter().filter_map(decode_info));
        debug!("Process list: {} sessions, {} statements", total, statements.len());

        Ok(statements)
    }

    async fn close(&mut self) -> SourceResult<()> {
        if let Some(pool) = self.pool.take() {
            pool.disconnect().await?;
            debug!("Disconnected");
        }
        Ok(())
    }
}
