//! Key resolution: turning a declared [`KeySource`] into RSA key material.
//!
//! # Resolution order
//!
//! 1. No source → no key. Callers decide whether that is fatal.
//! 2. [`KeySource::Lazy`] → call it, resolve the result.
//! 3. [`KeySource::Record`] → ask the record in scope ([`KeyProvider`]), resolve the result.
//! 4. [`KeySource::Material`] → returned as-is.
//! 5. [`KeySource::Env`] → read the variable, resolve its value as text.
//! 6. [`KeySource::Pem`], [`KeySource::Der`], [`KeySource::Path`] → parse, with
//!    the password when one is configured.
//!
//! Indirection is capped at [`MAX_INDIRECTION`] levels so a self-referencing
//! source cannot loop forever.
//!
//! # Invariants
//!
//! - Key material and passwords never appear in `Debug` output, errors, or logs.
//! - A source that is present but unusable is an error, never "no key".

pub mod handle;
pub mod material;
pub mod options;
pub mod resolver;
pub mod source;

pub use handle::KeyHandle;
pub use material::{KeyMaterial, Password};
pub use options::{resolve_private, resolve_public, KeyDefaults, KeyOptions};
pub use resolver::{resolve, ResolveContext, MAX_INDIRECTION};
pub use source::{KeyProvider, KeySource};

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while resolving a key source.
#[derive(Debug, Error)]
pub enum KeyError {
    /// A key file could not be read.
    #[error("failed to read key file {}: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An [`KeySource::Env`] variable is unset or not valid Unicode.
    #[error("environment variable {0} is not set")]
    MissingEnvVar(String),

    /// The material does not parse as an RSA key.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The material is encrypted and no password was configured.
    #[error("key material is encrypted and no password was supplied")]
    PasswordRequired,

    /// The configured password does not decrypt the material.
    #[error("wrong password or corrupt encrypted key")]
    WrongPassword,

    /// Legacy OpenSSL `Proc-Type: 4,ENCRYPTED` PEM.
    #[error("legacy PEM encryption is not supported; convert the key to encrypted PKCS#8")]
    UnsupportedEncryption,

    /// A [`KeySource::Record`] was reached with no record in scope.
    #[error("key source `{0}` needs a record in scope")]
    RecordRequired(String),

    /// Indirection exceeded [`MAX_INDIRECTION`] levels.
    #[error("key source indirection exceeded {MAX_INDIRECTION} levels")]
    TooDeep,
}
