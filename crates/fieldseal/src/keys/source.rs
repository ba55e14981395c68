//! Declared, possibly indirect descriptions of where a key comes from.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use rsa::{RsaPrivateKey, RsaPublicKey};

use super::material::{looks_like_pem, KeyMaterial};

/// Callable evaluated at resolution time, never at declaration time.
pub type LazySource = Arc<dyn Fn() -> Option<KeySource> + Send + Sync>;

/// How to obtain a key.
#[derive(Clone)]
pub enum KeySource {
    /// An already-parsed key.
    Material(KeyMaterial),
    /// Inline PEM text.
    Pem(String),
    /// DER-encoded key bytes.
    Der(Vec<u8>),
    /// A PEM or DER file.
    Path(PathBuf),
    /// A zero-argument callable producing another source (or none).
    Lazy(LazySource),
    /// A named key capability of the record in scope, see [`KeyProvider`].
    Record(String),
    /// An environment variable holding PEM text or a file path.
    Env(String),
}

impl KeySource {
    /// Classify a string: inline PEM if it carries a `BEGIN … KEY` boundary,
    /// otherwise a file path.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if looks_like_pem(&value) {
            Self::Pem(value)
        } else {
            Self::Path(PathBuf::from(value))
        }
    }

    /// Wrap a callable.
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> Option<KeySource> + Send + Sync + 'static,
    {
        Self::Lazy(Arc::new(f))
    }

    /// Read a stream to the end. Text carrying a PEM key boundary becomes
    /// [`KeySource::Pem`]; everything else, including UTF-8 text without a
    /// boundary, becomes [`KeySource::Der`]. Unlike [`KeySource::text`], stream
    /// contents are never taken as a file path.
    ///
    /// # Errors
    ///
    /// Returns the reader's I/O error.
    pub fn from_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) if looks_like_pem(&text) => Self::Pem(text),
            Ok(text) => Self::Der(text.into_bytes()),
            Err(e) => Self::Der(e.into_bytes()),
        })
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Material(_) => "material",
            Self::Pem(_) => "pem",
            Self::Der(_) => "der",
            Self::Path(_) => "path",
            Self::Lazy(_) => "lazy",
            Self::Record(_) => "record",
            Self::Env(_) => "env",
        }
    }
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Material(m) => f.debug_tuple("Material").field(m).finish(),
            Self::Pem(_) => f.write_str("Pem([REDACTED])"),
            Self::Der(bytes) => write!(f, "Der({} bytes)", bytes.len()),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
            Self::Record(name) => f.debug_tuple("Record").field(name).finish(),
            Self::Env(name) => f.debug_tuple("Env").field(name).finish(),
        }
    }
}

impl From<KeyMaterial> for KeySource {
    fn from(material: KeyMaterial) -> Self {
        Self::Material(material)
    }
}

impl From<RsaPublicKey> for KeySource {
    fn from(key: RsaPublicKey) -> Self {
        Self::Material(key.into())
    }
}

impl From<RsaPrivateKey> for KeySource {
    fn from(key: RsaPrivateKey) -> Self {
        Self::Material(key.into())
    }
}

impl From<PathBuf> for KeySource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&str> for KeySource {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for KeySource {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

/// Per-record key capability.
///
/// Implemented by the host for record types whose key depends on the record
/// (per-tenant or per-owner keys). `name` is the string given to
/// [`KeySource::Record`].
pub trait KeyProvider {
    /// Return the key source registered under `name`, or `None` for no key.
    fn key_source(&self, name: &str) -> Option<KeySource>;
}
