//! Structured logging setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::error::{Error, Result};

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins over `config.filter` when set. SQL statements are logged
/// at `debug` under the `drape::sql` target, so `drape::sql=debug` shows
/// every query.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| Error::other(format!("invalid log filter `{}`: {e}", config.filter)))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::other(format!("logging already initialised: {e}")))
}
