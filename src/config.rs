//! Application configuration.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`drape.toml` unless told otherwise; optional)
//! 3. environment variables prefixed `DRAPE_`, with `__` between nested
//!    keys: `DRAPE_DEBUG=true`, `DRAPE_DB__HOST=db.internal`
//!
//! ```toml
//! debug = false
//!
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//!
//! [db]
//! host = "127.0.0.1"
//! user = "app"
//! password = "secret"
//! dbname = "blog"
//! table_prefix = "blog_"
//!
//! [session]
//! cookie_name = "DRAPESESSID"
//! ttl_secs = 3600
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::util::deep_merge;

const DEFAULT_FILE: &str = "drape";
const ENV_PREFIX: &str = "DRAPE";

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Show error details (url, cause, request dump) in 500 responses.
    pub debug: bool,
    pub server: ServerConfig,
    pub log: LogConfig,
    pub db: DbConfig,
    pub session: SessionConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_owned(), port: 3000 }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|source| Error::Addr { addr, source })
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: "info".to_owned() }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DbConfig {
    /// Only `"mysql"` is supported.
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub charset: String,
    pub table_prefix: String,
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            driver: "mysql".to_owned(),
            host: "127.0.0.1".to_owned(),
            port: 3306,
            user: "root".to_owned(),
            password: String::new(),
            dbname: "drape".to_owned(),
            charset: "utf8mb4".to_owned(),
            table_prefix: String::new(),
            max_connections: 10,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_secs: u64,
    pub secure: bool,
    pub http_only: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "DRAPESESSID".to_owned(),
            ttl_secs: 3600,
            secure: false,
            http_only: true,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    /// Loads `drape.toml` (if present) and `DRAPE_*` variables over the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_FILE)
    }

    /// Like [`Config::load`] with another file. The extension may be omitted.
    pub fn load_from(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// A copy with `overrides` merged in key by key.
    ///
    /// ```rust
    /// # use drape::config::Config;
    /// let config = Config::default()
    ///     .merged(serde_json::json!({ "debug": true, "db": { "dbname": "test" } }))
    ///     .unwrap();
    /// assert!(config.debug);
    /// assert_eq!(config.db.dbname, "test");
    /// assert_eq!(config.db.port, 3306);
    /// ```
    pub fn merged(&self, overrides: Value) -> Result<Self> {
        let mut value = serde_json::to_value(self)?;
        deep_merge(&mut value, overrides);
        Ok(serde_json::from_value(value)?)
    }
}
