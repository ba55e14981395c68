//! Parsed RSA key material and the password wrapper.

use std::sync::LazyLock;

use pkcs8::EncryptedPrivateKeyInfo;
use regex::Regex;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use super::KeyError;

static PEM_BEGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^-+BEGIN (?P<label>.*KEY)-+\r?$").expect("PEM boundary pattern is a valid regex")
});

/// Returns `true` if `text` contains a `-----BEGIN … KEY-----` boundary line.
pub(crate) fn looks_like_pem(text: &str) -> bool {
    PEM_BEGIN_RE.is_match(text)
}

/// Password for encrypted private key material.
///
/// Zeroed on drop.
#[derive(Clone)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Wrap a password string.
    pub fn new(password: impl Into<String>) -> Self {
        Self(Zeroizing::new(password.into()))
    }

    /// Borrow the password. Keep the borrow short.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// A concrete RSA key: public only, or private (which carries its public half).
#[derive(Clone)]
pub enum KeyMaterial {
    /// Public key only. Can encrypt, cannot decrypt.
    Public(RsaPublicKey),
    /// Private key.
    Private(Box<RsaPrivateKey>),
}

impl KeyMaterial {
    /// Parse PEM text.
    ///
    /// Supported labels: `PUBLIC KEY`, `RSA PUBLIC KEY`, `PRIVATE KEY`,
    /// `RSA PRIVATE KEY` and `ENCRYPTED PRIVATE KEY`. `password` is only used
    /// for the last one and ignored otherwise.
    ///
    /// # Errors
    ///
    /// [`KeyError::InvalidKey`] for unparseable text or an unknown label,
    /// [`KeyError::PasswordRequired`] / [`KeyError::WrongPassword`] for encrypted
    /// PKCS#8, and [`KeyError::UnsupportedEncryption`] for legacy encrypted PEM.
    pub fn from_pem(text: &str, password: Option<&Password>) -> Result<Self, KeyError> {
        let caps = PEM_BEGIN_RE
            .captures(text)
            .ok_or_else(|| KeyError::InvalidKey("no PEM key boundary found".into()))?;
        let (Some(begin), Some(label)) = (caps.get(0), caps.name("label")) else {
            return Err(KeyError::InvalidKey("no PEM key boundary found".into()));
        };
        let label = label.as_str();

        let end_marker = format!("-----END {label}-----");
        let start = begin.start();
        let end = text[start..]
            .find(&end_marker)
            .map(|i| start + i + end_marker.len())
            .ok_or_else(|| KeyError::InvalidKey(format!("missing END {label} boundary")))?;
        let block = &text[start..end];

        match label {
            "PUBLIC KEY" => RsaPublicKey::from_public_key_pem(block)
                .map(Self::Public)
                .map_err(|e| KeyError::InvalidKey(e.to_string())),
            "RSA PUBLIC KEY" => RsaPublicKey::from_pkcs1_pem(block)
                .map(Self::Public)
                .map_err(|e| KeyError::InvalidKey(e.to_string())),
            "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_pem(block)
                .map(Self::private)
                .map_err(|e| KeyError::InvalidKey(e.to_string())),
            "RSA PRIVATE KEY" => {
                if block.contains("Proc-Type:") && block.contains("ENCRYPTED") {
                    return Err(KeyError::UnsupportedEncryption);
                }
                RsaPrivateKey::from_pkcs1_pem(block)
                    .map(Self::private)
                    .map_err(|e| KeyError::InvalidKey(e.to_string()))
            }
            "ENCRYPTED PRIVATE KEY" => {
                let password = password.ok_or(KeyError::PasswordRequired)?;
                RsaPrivateKey::from_pkcs8_encrypted_pem(block, password.expose())
                    .map(Self::private)
                    .map_err(|_| KeyError::WrongPassword)
            }
            other => Err(KeyError::InvalidKey(format!(
                "unsupported PEM label `{other}`"
            ))),
        }
    }

    /// Parse DER bytes: encrypted PKCS#8, PKCS#8, PKCS#1 private, SPKI, PKCS#1 public.
    ///
    /// # Errors
    ///
    /// [`KeyError::InvalidKey`] if no encoding matches, and the password errors
    /// of [`KeyMaterial::from_pem`] for encrypted PKCS#8.
    pub fn from_der(bytes: &[u8], password: Option<&Password>) -> Result<Self, KeyError> {
        if EncryptedPrivateKeyInfo::try_from(bytes).is_ok() {
            let password = password.ok_or(KeyError::PasswordRequired)?;
            return RsaPrivateKey::from_pkcs8_encrypted_der(bytes, password.expose())
                .map(Self::private)
                .map_err(|_| KeyError::WrongPassword);
        }

        RsaPrivateKey::from_pkcs8_der(bytes)
            .map(Self::private)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(bytes).map(Self::private))
            .or_else(|_| RsaPublicKey::from_public_key_der(bytes).map(Self::Public))
            .or_else(|_| RsaPublicKey::from_pkcs1_der(bytes).map(Self::Public))
            .map_err(|_| KeyError::InvalidKey("bytes are not a DER-encoded RSA key".into()))
    }

    fn private(key: RsaPrivateKey) -> Self {
        Self::Private(Box::new(key))
    }

    /// Returns `true` if this material can decrypt.
    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private(_))
    }

    /// The public half.
    pub fn public_key(&self) -> RsaPublicKey {
        match self {
            Self::Public(key) => key.clone(),
            Self::Private(key) => key.to_public_key(),
        }
    }

    /// The private key, if this material has one.
    pub fn into_private_key(self) -> Option<RsaPrivateKey> {
        match self {
            Self::Public(_) => None,
            Self::Private(key) => Some(*key),
        }
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        match self {
            Self::Public(key) => key.size() * 8,
            Self::Private(key) => key.size() * 8,
        }
    }
}

impl From<RsaPublicKey> for KeyMaterial {
    fn from(key: RsaPublicKey) -> Self {
        Self::Public(key)
    }
}

impl From<RsaPrivateKey> for KeyMaterial {
    fn from(key: RsaPrivateKey) -> Self {
        Self::private(key)
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_private() { "Private" } else { "Public" };
        write!(f, "KeyMaterial::{kind}({} bits)", self.bits())
    }
}
