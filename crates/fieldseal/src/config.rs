//! Configuration loading and validation.
//!
//! Values are read from environment variables once, at start-up, and threaded
//! explicitly into declarations and migrations. Nothing in the crate reads the
//! key variables implicitly.

use std::fmt;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;

use crate::attributes::AttributeRegistry;
use crate::codec::Padding;
use crate::keys::{KeyDefaults, KeySource, Password};
use crate::migration::{Migrator, DEFAULT_PAGE_SIZE};

/// Validated configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Default public key: PEM text or a file path.
    #[serde(default)]
    pub public_key: Option<String>,

    /// Default private key: PEM text or a file path.
    #[serde(default)]
    pub private_key: Option<String>,

    /// Password of an encrypted default private key.
    #[serde(default)]
    pub private_key_password: Option<String>,

    /// RSA padding scheme (`oaep-sha256` or `pkcs1v15`).
    #[serde(default)]
    pub padding: Padding,

    /// Records fetched per migration page.
    #[serde(default = "default_migration_page_size")]
    pub migration_page_size: usize,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_migration_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_key: None,
            private_key: None,
            private_key_password: None,
            padding: Padding::default(),
            migration_page_size: default_migration_page_size(),
            log_level: default_log_level(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Config")
            .field("public_key", &set(&self.public_key))
            .field("private_key", &set(&self.private_key))
            .field("private_key_password", &set(&self.private_key_password))
            .field("padding", &self.padding)
            .field("migration_page_size", &self.migration_page_size)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Config::builder().add_source(config::Environment::default()))
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let cfg = builder
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_not_blank(self.public_key.as_deref(), "PUBLIC_KEY")?;
        ensure_not_blank(self.private_key.as_deref(), "PRIVATE_KEY")?;
        ensure_not_blank(self.private_key_password.as_deref(), "PRIVATE_KEY_PASSWORD")?;

        if self.migration_page_size == 0 {
            anyhow::bail!("MIGRATION_PAGE_SIZE must be > 0");
        }
        Ok(())
    }

    /// Key fallbacks for declarations that name no key of their own.
    pub fn key_defaults(&self) -> KeyDefaults {
        KeyDefaults {
            public_key: self.public_key.clone().map(KeySource::text),
            private_key: self.private_key.clone().map(KeySource::text),
            private_key_password: self.private_key_password.clone().map(Password::from),
        }
    }

    /// Configured padding scheme.
    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Migrator with the configured page size and padding.
    pub fn migrator(&self) -> Migrator {
        Migrator::new()
            .with_page_size(self.migration_page_size)
            .with_padding(self.padding)
    }

    /// Empty attribute registry using the configured key defaults and padding.
    pub fn registry(&self) -> AttributeRegistry {
        AttributeRegistry::new(self.key_defaults(), self.padding)
    }
}

fn ensure_not_blank(value: Option<&str>, name: &str) -> Result<()> {
    if value.is_some_and(|v| v.trim().is_empty()) {
        anyhow::bail!("{name} must not be empty when set");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyOptions;
    use crate::testing::fixtures;

    fn base() -> Config {
        Config::default()
    }

    fn builder() -> ConfigBuilder<DefaultState> {
        config::Config::builder()
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_migration_page_size(), 500);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn load_applies_defaults() {
        let cfg = Config::load(builder()).unwrap();
        assert!(cfg.public_key.is_none());
        assert_eq!(cfg.padding(), Padding::OaepSha256);
        assert_eq!(cfg.migration_page_size, 500);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn load_reads_overrides() {
        let cfg = Config::load(
            builder()
                .set_override("padding", "pkcs1v15")
                .unwrap()
                .set_override("migration_page_size", 50)
                .unwrap()
                .set_override("private_key", "/etc/keys/private.pem")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(cfg.padding(), Padding::Pkcs1v15);
        assert_eq!(cfg.migrator().page_size(), 50);
        assert!(matches!(
            cfg.key_defaults().private_key,
            Some(KeySource::Path(_))
        ));
    }

    #[test]
    fn load_rejects_unknown_padding() {
        let result = Config::load(builder().set_override("padding", "rot13").unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let cfg = Config {
            migration_page_size: 0,
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_key() {
        let cfg = Config {
            public_key: Some("  ".into()),
            ..base()
        };
        assert!(cfg.validate().is_err());
        assert!(base().validate().is_ok());
    }

    #[test]
    fn debug_redacts_keys() {
        let cfg = Config {
            private_key: Some(fixtures::PRIVATE_PEM.into()),
            private_key_password: Some("hunter2".into()),
            ..base()
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("BEGIN"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn registry_uses_key_defaults() {
        let cfg = Config {
            public_key: Some(fixtures::PUBLIC_PEM.into()),
            private_key: Some(fixtures::PRIVATE_ENCRYPTED_PEM.into()),
            private_key_password: Some(fixtures::PASSWORD.into()),
            ..base()
        };
        let registry = cfg.registry();
        registry.declare(["secret"], &KeyOptions::new()).unwrap();
        let stored = registry.seal("secret", Some("abc123"), None).unwrap().unwrap();
        assert_eq!(
            registry.unseal("secret", Some(&stored), None).unwrap().as_deref(),
            Some("abc123")
        );
    }
}
