use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// `log` records are bridged into `tracing` by the subscriber itself.
///
/// # Errors
/// Returns an error if the level directive is invalid or a subscriber is
/// already installed.
pub fn init(cfg: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cfg.level)?,
    };
    let json = cfg.format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_current_span(true)))
        .with((!json).then(|| fmt::layer().with_target(true)))
        .try_init()?;

    Ok(())
}
