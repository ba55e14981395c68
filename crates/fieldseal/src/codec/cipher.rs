//! RSA encryption and decryption of individual field values into envelopes.
//!
//! **Padding choice:** OAEP with SHA-256 is the default. PKCS#1 v1.5 is kept
//! only to read and write data shared with older PKCS#1 v1.5 writers; its
//! padding check can, rarely, accept a ciphertext made under another key.
//!
//! Values are encrypted in a single RSA block, so they must fit in
//! [`Codec::max_plaintext_len`] bytes.

use std::str::FromStr;

use common::{is_envelope, Envelope, ENVELOPE_VERSION};
use rand::rngs::OsRng;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use semver::Version;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::error::SealError;
use crate::keys::KeyHandle;

/// RSA padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Padding {
    /// RSAES-OAEP with SHA-256 and MGF1-SHA-256.
    #[default]
    OaepSha256,
    /// RSAES-PKCS1-v1_5.
    Pkcs1v15,
}

/// SHA-256 digest length in bytes.
const SHA256_LEN: usize = 32;

impl Padding {
    /// Bytes of each RSA block consumed by the padding.
    pub fn overhead(self) -> usize {
        match self {
            Padding::OaepSha256 => 2 * SHA256_LEN + 2,
            Padding::Pkcs1v15 => 11,
        }
    }

    /// Configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            Padding::OaepSha256 => "oaep-sha256",
            Padding::Pkcs1v15 => "pkcs1v15",
        }
    }

    fn encrypt(self, key: &RsaPublicKey, plaintext: &[u8]) -> rsa::Result<Vec<u8>> {
        let mut rng = OsRng;
        match self {
            Padding::OaepSha256 => key.encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext),
            Padding::Pkcs1v15 => key.encrypt(&mut rng, Pkcs1v15Encrypt, plaintext),
        }
    }

    fn decrypt(self, key: &RsaPrivateKey, ciphertext: &[u8]) -> rsa::Result<Vec<u8>> {
        let mut rng = OsRng;
        match self {
            Padding::OaepSha256 => key.decrypt_blinded(&mut rng, Oaep::new::<Sha256>(), ciphertext),
            Padding::Pkcs1v15 => key.decrypt_blinded(&mut rng, Pkcs1v15Encrypt, ciphertext),
        }
    }
}

/// Unknown padding name in configuration.
#[derive(Debug, Error)]
#[error("unknown padding `{0}`; expected `oaep-sha256` or `pkcs1v15`")]
pub struct ParsePaddingError(String);

impl FromStr for Padding {
    type Err = ParsePaddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oaep-sha256" | "oaep" => Ok(Padding::OaepSha256),
            "pkcs1v15" | "pkcs1" => Ok(Padding::Pkcs1v15),
            _ => Err(ParsePaddingError(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Padding {
    type Error = ParsePaddingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for Padding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope codec bound to one [`KeyHandle`].
#[derive(Debug, Clone)]
pub struct Codec {
    keys: KeyHandle,
    padding: Padding,
    version: Version,
}

impl Codec {
    /// Codec writing [`ENVELOPE_VERSION`] envelopes with OAEP-SHA-256.
    pub fn new(keys: KeyHandle) -> Self {
        Self {
            keys,
            padding: Padding::default(),
            version: ENVELOPE_VERSION,
        }
    }

    /// Use `padding` for both directions.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Write `version` into new envelopes and accept envelopes compatible with it.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Bound keys.
    pub fn keys(&self) -> &KeyHandle {
        &self.keys
    }

    /// Padding scheme.
    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Envelope format version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Returns `true` if `value` is in envelope form.
    pub fn is_encrypted(value: &str) -> bool {
        is_envelope(value)
    }

    /// Largest plaintext that fits in one block, or `None` without a public key.
    pub fn max_plaintext_len(&self) -> Option<usize> {
        self.keys
            .modulus_len()
            .map(|k| k.saturating_sub(self.padding.overhead()))
    }

    /// Encrypt raw bytes into an envelope.
    ///
    /// # Errors
    ///
    /// [`SealError::AlreadyEncrypted`] if `plaintext` is already an envelope,
    /// [`SealError::MissingPublicKey`] without a public key, and
    /// [`SealError::PlaintextTooLong`] if it does not fit in one block.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<String, SealError> {
        if std::str::from_utf8(plaintext).is_ok_and(is_envelope) {
            return Err(SealError::AlreadyEncrypted);
        }
        let public = self.keys.public_key().ok_or(SealError::MissingPublicKey)?;

        let max = self.max_plaintext_len().unwrap_or(0);
        if plaintext.len() > max {
            return Err(SealError::PlaintextTooLong {
                len: plaintext.len(),
                max,
            });
        }

        let ciphertext = self
            .padding
            .encrypt(public, plaintext)
            .map_err(|e| SealError::Encryption(e.to_string()))?;
        Ok(Envelope::seal(&self.version, &ciphertext))
    }

    /// Decrypt an envelope back to raw bytes.
    ///
    /// # Errors
    ///
    /// [`SealError::MissingPrivateKey`] without a private key,
    /// [`SealError::NotEncrypted`] if `value` is not an envelope,
    /// [`SealError::IncompatibleVersion`] for an unreadable format version, and
    /// [`SealError::Decryption`] if the private key does not recover it.
    pub fn decrypt_bytes(&self, value: &str) -> Result<Vec<u8>, SealError> {
        let private = self.keys.private_key().ok_or(SealError::MissingPrivateKey)?;
        let envelope = Envelope::open(value, &self.version)?;
        let ciphertext = envelope.ciphertext()?;
        self.padding
            .decrypt(private, &ciphertext)
            .map_err(|_| SealError::Decryption)
    }

    /// Encrypt a text field value. `None` stays `None`.
    ///
    /// # Errors
    ///
    /// See [`Codec::encrypt_bytes`].
    pub fn encrypt(&self, value: Option<&str>) -> Result<Option<String>, SealError> {
        value.map(|v| self.encrypt_bytes(v.as_bytes())).transpose()
    }

    /// Decrypt a text field value. `None` stays `None`.
    ///
    /// # Errors
    ///
    /// See [`Codec::decrypt_bytes`], plus [`SealError::NotUtf8`].
    pub fn decrypt(&self, value: Option<&str>) -> Result<Option<String>, SealError> {
        value
            .map(|v| {
                let bytes = self.decrypt_bytes(v)?;
                String::from_utf8(bytes).map_err(|_| SealError::NotUtf8)
            })
            .transpose()
    }
}
