use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use reqwest::Url;

pub const STORE_URL_VAR: &str = "SUPABASE_URL";
pub const STORE_KEY_VAR: &str = "SUPABASE_KEY";
pub const TABLE_VAR: &str = "TODO_TABLE";
pub const BIND_ADDR_VAR: &str = "BIND_ADDR";
pub const STATIC_DIR_VAR: &str = "STATIC_DIR";

const DEFAULT_TABLE: &str = "todos";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_STATIC_DIR: &str = "frontend/dist";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Startup configuration. Built once in `main` and passed down explicitly.
#[derive(Clone)]
pub struct Config {
    pub store_url: Url,
    pub store_key: String,
    pub table: String,
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parses configuration from `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let raw_url = get(STORE_URL_VAR).ok_or(ConfigError::Missing(STORE_URL_VAR))?;
        let store_url = Url::parse(raw_url.trim()).map_err(|err| ConfigError::Invalid {
            name: STORE_URL_VAR,
            reason: err.to_string(),
        })?;
        if !matches!(store_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                name: STORE_URL_VAR,
                reason: format!("unsupported scheme `{}`", store_url.scheme()),
            });
        }

        let store_key = get(STORE_KEY_VAR)
            .ok_or(ConfigError::Missing(STORE_KEY_VAR))?
            .trim()
            .to_string();

        let table = get(TABLE_VAR).unwrap_or_else(|| DEFAULT_TABLE.to_string());
        if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Invalid {
                name: TABLE_VAR,
                reason: format!("`{table}` is not a plain table name"),
            });
        }

        let bind_addr = get(BIND_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::Invalid {
                name: BIND_ADDR_VAR,
                reason: err.to_string(),
            })?;

        let static_dir = get(STATIC_DIR_VAR)
            .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
            .into();

        Ok(Self {
            store_url,
            store_key,
            table,
            bind_addr,
            static_dir,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("store_url", &self.store_url.as_str())
            .field("store_key", &"<redacted>")
            .field("table", &self.table)
            .field("bind_addr", &self.bind_addr)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}
