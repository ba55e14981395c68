//! Error taxonomy of encrypt/decrypt operations.

use common::EnvelopeError;
use semver::Version;
use thiserror::Error;

use crate::keys::KeyError;

/// Errors from sealing or unsealing a value.
///
/// Variants never carry the plaintext, the ciphertext, or key material.
#[derive(Debug, Error)]
pub enum SealError {
    /// A key source is configured but could not be resolved.
    #[error("key resolution failed: {0}")]
    KeyResolution(#[from] KeyError),

    /// Encryption needs a public key and none is bound.
    #[error("no public key available; cannot encrypt")]
    MissingPublicKey,

    /// Decryption needs a private key and none is bound.
    #[error("no private key available; cannot decrypt")]
    MissingPrivateKey,

    /// The value is already an envelope.
    #[error("value is already encrypted")]
    AlreadyEncrypted,

    /// The value is not an envelope.
    #[error("value is not encrypted")]
    NotEncrypted,

    /// The envelope is well formed but the private key does not recover it
    /// (wrong key, corrupted payload, padding check failure).
    #[error("envelope could not be decrypted with the bound private key")]
    Decryption,

    /// The envelope was written by an incompatible format version.
    #[error("envelope version {found} is not readable by format version {current}")]
    IncompatibleVersion {
        /// Version embedded in the envelope.
        found: Version,
        /// Version of the codec.
        current: Version,
    },

    /// The plaintext does not fit in one RSA block.
    #[error("plaintext is {len} bytes; this key and padding accept at most {max}")]
    PlaintextTooLong {
        /// Plaintext length in bytes.
        len: usize,
        /// Maximum for the bound key and padding.
        max: usize,
    },

    /// The RSA primitive failed while encrypting.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption succeeded but the text API needs UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    NotUtf8,
}

impl From<EnvelopeError> for SealError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::NotAnEnvelope => SealError::NotEncrypted,
            EnvelopeError::IncompatibleVersion { found, current } => {
                SealError::IncompatibleVersion { found, current }
            }
            EnvelopeError::InvalidVersion(_) | EnvelopeError::InvalidPayload => {
                SealError::Decryption
            }
        }
    }
}
