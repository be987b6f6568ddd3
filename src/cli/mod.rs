//! Command line definition and wiring

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{
    parse_interval, ConnectionConfig, ConnectionOverrides, OptionFile, SamplingConfig,
    SamplingSettings, UserConfig,
};
use crate::pipeline::Profiler;
use crate::source::MySqlProcessList;

/// Exit status for a second Ctrl-C (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Parse and validate the sampling interval (fractional seconds, >= 0)
fn parse_interval_arg(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number of seconds", s))?;
    parse_interval(secs).map_err(|_| "interval must be a finite, non-negative number".to_string())?;
    Ok(secs)
}

/// myprofiler - top for MySQL queries
///
/// Samples SHOW FULL PROCESSLIST, strips literals from every statement and
/// prints the most frequent statement shapes.
#[derive(Parser, Debug)]
#[command(name = "myprofiler")]
#[command(
    version,
    about = "Sample the MySQL process list and rank normalized queries",
    after_help = "\
Examples:
  myprofiler                                 Report every second from localhost
  myprofiler --host db1 --user monitor       Profile a remote server
  myprofiler --interval 0.1 --delay 30       Sample 10x per second, report every 3s
  myprofiler --last 60                       Only summarize the last 60 samples
  myprofiler --dump raw.log                  Also keep every raw query

Connection settings are read from the [client] group of ~/.my.cnf when present.
Sampling defaults can be set in <config dir>/myprofiler/config.toml."
)]
pub struct Cli {
    /// Host of database
    #[arg(long, env = "MYSQL_HOST")]
    pub host: Option<String>,

    /// Port
    #[arg(long, short = 'P', env = "MYSQL_TCP_PORT")]
    pub port: Option<u16>,

    /// User
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Password
    #[arg(long, short = 'p', env = "MYSQL_PWD", hide_env_values = true)]
    pub password: Option<String>,

    /// Unix socket path
    #[arg(long, short = 'S', env = "MYSQL_UNIX_PORT")]
    pub socket: Option<PathBuf>,

    /// Option file to read instead of ~/.my.cnf
    #[arg(long, value_name = "FILE")]
    pub defaults_file: Option<PathBuf>,

    /// Write raw queries to this file
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,

    /// Show N most common queries [default: 10]
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Summarize only the last N samples; 0 summarizes all samples [default: 0]
    #[arg(long, value_name = "N")]
    pub last: Option<usize>,

    /// Sampling interval in seconds [default: 1.0]
    #[arg(long, value_name = "SECONDS", value_parser = parse_interval_arg)]
    pub interval: Option<f64>,

    /// Show a summary every N samples [default: 1]
    #[arg(long, value_name = "N")]
    pub delay: Option<u32>,

    /// Stop after N samples (default: run until interrupted)
    #[arg(long, short = 'n', value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,
}

impl Cli {
    fn connection_overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            socket: self.socket.clone(),
        }
    }

    fn sampling_settings(&self) -> SamplingSettings {
        SamplingSettings {
            interval: self.interval,
            delay: self.delay,
            top: self.top,
            last: self.last,
        }
    }
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let option_file = match &cli.defaults_file {
        Some(path) => OptionFile::load(path)?,
        None => OptionFile::load_default()?,
    };
    let connection =
        ConnectionConfig::resolve(&option_file, &cli.connection_overrides(), current_os_user())?;

    let user_config = UserConfig::load();
    let sampling =
        SamplingConfig::resolve(&cli.sampling_settings(), &user_config.sampling, cli.count)?;

    let dump = cli.dump.as_deref().map(open_dump).transpose()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(profile(connection, sampling, dump))
}

async fn profile(
    connection: ConnectionConfig,
    sampling: SamplingConfig,
    dump: Option<BufWriter<File>>,
) -> Result<()> {
    let source = MySqlProcessList::connect(&connection).await?;

    let mut profiler = Profiler::new(source, sampling);
    if let Some(dump) = dump {
        profiler = profiler.with_dump(dump);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("Interrupted, shutting down");
        on_interrupt.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted again, exiting");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    profiler.run(&cancel).await?;
    Ok(())
}

fn open_dump(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("failed to create dump file {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Login name of the current OS user, the MySQL client default.
fn current_os_user() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
}
