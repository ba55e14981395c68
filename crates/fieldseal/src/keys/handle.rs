//! [`KeyHandle`]: the resolved key halves a codec is bound to.

use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use super::material::KeyMaterial;
use super::options::{resolve_private, resolve_public, KeyDefaults, KeyOptions};
use super::resolver::ResolveContext;
use super::KeyError;

/// Resolved public and/or private key.
///
/// Encryption needs the public half, decryption the private half. A handle
/// built from a private key always has both.
#[derive(Clone, Default)]
pub struct KeyHandle {
    public: Option<RsaPublicKey>,
    private: Option<RsaPrivateKey>,
}

impl KeyHandle {
    /// A handle with no key at all. Both directions fail.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Encrypt-only handle.
    pub fn public_only(key: RsaPublicKey) -> Self {
        Self {
            public: Some(key),
            private: None,
        }
    }

    /// Handle holding both halves of `key`.
    pub fn from_private(key: RsaPrivateKey) -> Self {
        Self {
            public: Some(key.to_public_key()),
            private: Some(key),
        }
    }

    /// Resolve both halves of a declaration and bind the private key if there
    /// is one, the public key otherwise.
    ///
    /// A resolved private key always brings its own public half, so a handle
    /// never encrypts under a key it cannot decrypt with.
    ///
    /// # Errors
    ///
    /// Any [`KeyError`] from either resolution.
    pub fn resolve(
        options: &KeyOptions,
        defaults: &KeyDefaults,
        ctx: ResolveContext<'_>,
    ) -> Result<Self, KeyError> {
        let public = resolve_public(options, defaults, ctx)?;
        let private = resolve_private(options, defaults, ctx)?;
        Ok(match (private, public) {
            (Some(private), _) => Self::from_private(private),
            (None, Some(public)) => Self::public_only(public),
            (None, None) => Self::empty(),
        })
    }

    /// Public half, if any.
    pub fn public_key(&self) -> Option<&RsaPublicKey> {
        self.public.as_ref()
    }

    /// Private half, if any.
    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private.as_ref()
    }

    /// Returns `true` if this handle can encrypt.
    pub fn has_public(&self) -> bool {
        self.public.is_some()
    }

    /// Returns `true` if this handle can decrypt.
    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    /// Modulus size in bytes of the public half.
    pub fn modulus_len(&self) -> Option<usize> {
        self.public.as_ref().map(PublicKeyParts::size)
    }
}

impl From<KeyMaterial> for KeyHandle {
    fn from(material: KeyMaterial) -> Self {
        match material {
            KeyMaterial::Public(key) => Self::public_only(key),
            KeyMaterial::Private(key) => Self::from_private(*key),
        }
    }
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("KeyHandle")
            .field("public", &self.has_public())
            .field("private", &self.has_private())
            .field("bits", &self.modulus_len().map(|n| n * 8))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeySource;
    use crate::testing::fixtures;

    #[test]
    fn public_only_cannot_decrypt() {
        let handle = fixtures::public_handle();
        assert!(handle.has_public());
        assert!(!handle.has_private());
    }

    #[test]
    fn private_carries_public_half() {
        let handle = fixtures::key_pair();
        assert!(handle.has_public());
        assert!(handle.has_private());
        assert_eq!(handle.modulus_len(), Some(256));
    }

    #[test]
    fn private_key_wins_over_unrelated_public_key() {
        let options = KeyOptions::new()
            .with_public_key(fixtures::PUBLIC_PEM)
            .with_key_pair(fixtures::OTHER_PRIVATE_PEM);
        let handle = KeyHandle::resolve(&options, &KeyDefaults::default(), ResolveContext::none())
            .unwrap();
        let other = fixtures::other_key_pair();
        assert!(handle.has_private());
        assert_eq!(handle.public_key(), other.public_key());
        assert_ne!(handle.public_key(), fixtures::public_handle().public_key());
    }

    #[test]
    fn broken_public_key_still_fails_with_a_private_key() {
        let options = KeyOptions::new()
            .with_public_key("/no/such/public.pem")
            .with_private_key(fixtures::PRIVATE_PEM);
        let err = KeyHandle::resolve(&options, &KeyDefaults::default(), ResolveContext::none())
            .unwrap_err();
        assert!(matches!(err, KeyError::Io { .. }));
    }

    #[test]
    fn resolve_with_public_key_option_only() {
        let options = KeyOptions::new().with_public_key(KeySource::text(fixtures::PUBLIC_PEM));
        let handle = KeyHandle::resolve(&options, &KeyDefaults::default(), ResolveContext::none())
            .unwrap();
        assert!(handle.has_public());
        assert!(!handle.has_private());
    }

    #[test]
    fn debug_is_redacted() {
        let rendered = format!("{:?}", fixtures::key_pair());
        assert_eq!(
            rendered,
            "KeyHandle { public: true, private: true, bits: Some(2048) }"
        );
    }
}
