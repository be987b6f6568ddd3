//! MySQL option files (`~/.my.cnf`)
//!
//! Only the subset needed to reach a server is understood:
//! - `[group]` headers
//! - `key=value` pairs and bare `key` flags
//! - `#` and `;` comment lines, trailing ` # comment` on unquoted values
//! - single or double quotes around values
//!
//! Keys are case-insensitive and `-`/`_` are interchangeable, as in the
//! MySQL client tools. `!include` directives are not followed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ConfigError, ConfigResult};

/// Parsed option file, grouped by section name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionFile {
    groups: HashMap<String, HashMap<String, String>>,
}

impl OptionFile {
    /// Location of the per-user option file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".my.cnf"))
    }

    /// Load the per-user option file if it exists.
    pub fn load_default() -> ConfigResult<Self> {
        match Self::default_path().filter(|p| p.exists()) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded option file {}", path.display());
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut groups: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current: Option<String> = None;

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('!') {
                debug!("Ignoring option file directive: {}", line);
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim().to_lowercase();
                groups.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            // Options before the first group header belong to no group.
            let Some(group) = &current else {
                continue;
            };

            let (key, value) = match line.split_once('=') {
                Some((key, value)) => (key, parse_value(value)),
                None => (line, String::new()),
            };
            groups
                .entry(group.clone())
                .or_default()
                .insert(normalize_key(key), value);
        }

        Self { groups }
    }

    /// Look up an option in one group.
    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.groups
            .get(&group.to_lowercase())
            .and_then(|options| options.get(&normalize_key(key)))
            .map(String::as_str)
    }

    /// Look up an option across groups; later groups win.
    pub fn lookup(&self, groups: &[&str], key: &str) -> Option<&str> {
        groups.iter().rev().find_map(|group| self.get(group, key))
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('-', "_")
}

fn parse_value(raw: &str) -> String {
    let value = raw.trim();
    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            if let Some(end) = rest.find(quote) {
                return rest[..end].to_string();
            }
        }
    }
    strip_comment(value).trim_end().to_string()
}

fn strip_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &value[..i];
        }
    }
    value
}
