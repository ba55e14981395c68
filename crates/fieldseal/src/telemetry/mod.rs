//! Structured logging setup for hosts embedding `fieldseal`.
//!
//! The library only emits `tracing` events (key source kinds, migration
//! progress); it never installs a subscriber on its own. Hosts call [`init`]
//! once at start-up with the loaded [`Config`].
//!
//! # Telemetry invariants
//!
//! - **No plaintext, ciphertext, password or key material** in any log field.
//! - Log level comes from `LOG_LEVEL` (default: `info`); `RUST_LOG` overrides it.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install a JSON subscriber filtered at `config.log_level`.
///
/// Event fields are flattened into the top-level JSON object, so migration
/// counters (`records`, `converted`, `skipped`) are directly queryable.
///
/// # Errors
///
/// Returns an error if `LOG_LEVEL` is not a valid filter directive or a global
/// subscriber has already been set.
pub fn init(config: &Config) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("invalid LOG_LEVEL `{}`", config.log_level))?,
    };

    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("fieldseal logging is already initialised: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails() {
        let config = Config {
            log_level: "debug".into(),
            ..Config::default()
        };
        // Only the first call in a process can install a subscriber.
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
