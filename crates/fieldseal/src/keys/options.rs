//! Key options of one encrypted field declaration, and the environment defaults
//! they fall back to.

use rsa::{RsaPrivateKey, RsaPublicKey};

use super::material::Password;
use super::resolver::{resolve, ResolveContext};
use super::source::KeySource;
use super::KeyError;

/// Options accepted per encrypted field declaration.
///
/// `key_pair` is a single source holding both halves; it fills in for whichever
/// of `public_key` / `private_key` is missing.
#[derive(Clone, Debug, Default)]
pub struct KeyOptions {
    /// Explicit public key source.
    pub public_key: Option<KeySource>,
    /// Explicit private key source.
    pub private_key: Option<KeySource>,
    /// Source containing both halves.
    pub key_pair: Option<KeySource>,
    /// Password for encrypted private key material.
    pub private_key_password: Option<Password>,
}

impl KeyOptions {
    /// Empty options: everything falls back to [`KeyDefaults`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the public key source.
    pub fn with_public_key(mut self, source: impl Into<KeySource>) -> Self {
        self.public_key = Some(source.into());
        self
    }

    /// Set the private key source.
    pub fn with_private_key(mut self, source: impl Into<KeySource>) -> Self {
        self.private_key = Some(source.into());
        self
    }

    /// Set the key pair source.
    pub fn with_key_pair(mut self, source: impl Into<KeySource>) -> Self {
        self.key_pair = Some(source.into());
        self
    }

    /// Set the private key password.
    pub fn with_private_key_password(mut self, password: impl Into<Password>) -> Self {
        self.private_key_password = Some(password.into());
        self
    }

    /// `public_key`, else `key_pair`, else the default public key.
    pub fn public_source<'a>(&'a self, defaults: &'a KeyDefaults) -> Option<&'a KeySource> {
        self.public_key
            .as_ref()
            .or(self.key_pair.as_ref())
            .or(defaults.public_key.as_ref())
    }

    /// `private_key`, else `key_pair`, else the default private key.
    pub fn private_source<'a>(&'a self, defaults: &'a KeyDefaults) -> Option<&'a KeySource> {
        self.private_key
            .as_ref()
            .or(self.key_pair.as_ref())
            .or(defaults.private_key.as_ref())
    }

    /// `private_key_password`, else the default password.
    pub fn password<'a>(&'a self, defaults: &'a KeyDefaults) -> Option<&'a Password> {
        self.private_key_password
            .as_ref()
            .or(defaults.private_key_password.as_ref())
    }
}

/// Process-wide key defaults, loaded once at start-up (see
/// [`Config::key_defaults`](crate::config::Config::key_defaults)) and passed
/// explicitly wherever keys are resolved.
#[derive(Clone, Debug, Default)]
pub struct KeyDefaults {
    /// Default public key source.
    pub public_key: Option<KeySource>,
    /// Default private key source.
    pub private_key: Option<KeySource>,
    /// Default private key password.
    pub private_key_password: Option<Password>,
}

/// Resolve the public key of a declaration.
///
/// The password is passed along so that an encrypted `key_pair` can still
/// yield its public half.
///
/// # Errors
///
/// Any [`KeyError`] from the chosen source.
pub fn resolve_public(
    options: &KeyOptions,
    defaults: &KeyDefaults,
    ctx: ResolveContext<'_>,
) -> Result<Option<RsaPublicKey>, KeyError> {
    let material = resolve(options.public_source(defaults), options.password(defaults), ctx)?;
    Ok(material.map(|m| m.public_key()))
}

/// Resolve the private key of a declaration.
///
/// # Errors
///
/// Any [`KeyError`] from the chosen source, and [`KeyError::InvalidKey`] if it
/// only holds a public key.
pub fn resolve_private(
    options: &KeyOptions,
    defaults: &KeyDefaults,
    ctx: ResolveContext<'_>,
) -> Result<Option<RsaPrivateKey>, KeyError> {
    let Some(material) = resolve(options.private_source(defaults), options.password(defaults), ctx)? else {
        return Ok(None);
    };
    material
        .into_private_key()
        .map(Some)
        .ok_or_else(|| KeyError::InvalidKey("private key source holds only a public key".into()))
}
