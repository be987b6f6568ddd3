//! Database connection settings
//!
//! Priority, highest first:
//! 1. Command line flags and their environment variables (`MYSQL_PWD`, ...)
//! 2. Option file groups `[client]`, then `[myprofiler]`
//! 3. Built-in defaults (localhost:3306, current OS user)

use std::fmt;
use std::path::PathBuf;

use super::{ConfigError, ConfigResult, OptionFile};

/// Option file groups read for connection settings; later groups win.
const OPTION_GROUPS: &[&str] = &["client", "myprofiler"];

/// Settings given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub socket: Option<PathBuf>,
}

/// Where and how to connect
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub socket: Option<PathBuf>,
}

impl ConnectionConfig {
    pub const DEFAULT_HOST: &'static str = "localhost";
    pub const DEFAULT_PORT: u16 = 3306;

    /// Resolve settings from every source.
    ///
    /// `os_user` is the login name used when no user is configured anywhere.
    pub fn resolve(
        file: &OptionFile,
        flags: &ConnectionOverrides,
        os_user: Option<String>,
    ) -> ConfigResult<Self> {
        let from_file = |key: &str| {
            file.lookup(OPTION_GROUPS, key)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let port = match flags.port {
            Some(port) => port,
            None => match from_file("port") {
                Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "port".to_string(),
                    value: raw,
                })?,
                None => Self::DEFAULT_PORT,
            },
        };

        let user = flags
            .user
            .clone()
            .or_else(|| from_file("user"))
            .or(os_user)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingUser)?;

        Ok(Self {
            host: flags
                .host
                .clone()
                .or_else(|| from_file("host"))
                .unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            port,
            user,
            password: flags
                .password
                .clone()
                .filter(|p| !p.is_empty())
                .or_else(|| from_file("password")),
            socket: flags
                .socket
                .clone()
                .or_else(|| from_file("socket").map(PathBuf::from)),
        })
    }

    /// Human readable target for logs and errors. Never includes the password.
    pub fn target(&self) -> String {
        match &self.socket {
            Some(socket) => format!("{}@{}", self.user, socket.display()),
            None => format!("{}@{}:{}", self.user, self.host, self.port),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("socket", &self.socket)
            .finish()
    }
}
