//! Field-level RSA envelope encryption.
//!
//! Individual field values are encrypted with an RSA public key and stored as
//! self-describing text envelopes:
//!
//! ```text
//! Fieldseal 1.0.0: <base64 ciphertext>
//! ```
//!
//! # Layout
//!
//! - [`keys`]: where keys come from (inline PEM/DER, files, callables,
//!   per-record capabilities, environment variables) and how they resolve.
//! - [`codec`]: encrypt/decrypt of one value against a [`KeyHandle`].
//! - [`attributes`]: which fields of a record type are encrypted, with the
//!   write/read hooks a persistence layer calls.
//! - [`migration`]: bulk up/down conversion of existing records.
//! - [`config`] and [`telemetry`]: start-up configuration and logging.
//!
//! # Typical start-up
//!
//! ```text
//! let config = Config::from_env()?;
//! telemetry::init(&config)?;
//! let users = config.registry();
//! users.declare(["ssn"], &KeyOptions::new())?;
//! ```

pub mod attributes;
pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod migration;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use attributes::{AttributeRegistry, EncryptedAttribute};
pub use codec::{Codec, Padding};
pub use common::{is_envelope, ENVELOPE_VERSION};
pub use crate::config::Config;
pub use error::SealError;
pub use keys::{KeyDefaults, KeyError, KeyHandle, KeyOptions, KeyProvider, KeySource};
pub use migration::{Direction, MemoryStore, MigrationError, MigrationReport, Migrator, RecordStore};
