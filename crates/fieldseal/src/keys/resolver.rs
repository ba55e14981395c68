//! Recursive resolution of a [`KeySource`] into [`KeyMaterial`].

use std::path::Path;

use tracing::debug;

use super::material::{looks_like_pem, KeyMaterial, Password};
use super::source::{KeyProvider, KeySource};
use super::KeyError;

/// Maximum number of indirections (lazy, record, env) followed in one resolution.
pub const MAX_INDIRECTION: usize = 16;

/// What is in scope while resolving.
#[derive(Clone, Copy, Default)]
pub struct ResolveContext<'a> {
    record: Option<&'a dyn KeyProvider>,
}

impl<'a> ResolveContext<'a> {
    /// No record in scope: [`KeySource::Record`] sources fail with
    /// [`KeyError::RecordRequired`].
    pub fn none() -> Self {
        Self { record: None }
    }

    /// Resolve [`KeySource::Record`] sources against `record`.
    pub fn for_record(record: &'a dyn KeyProvider) -> Self {
        Self {
            record: Some(record),
        }
    }
}

impl std::fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveContext")
            .field("record", &self.record.is_some())
            .finish()
    }
}

/// Resolve `source` to key material.
///
/// `None` resolves to `Ok(None)`; so does a lazy or record source that
/// produces no source.
///
/// # Errors
///
/// Any [`KeyError`]: the source is present but cannot be turned into a key.
pub fn resolve(
    source: Option<&KeySource>,
    password: Option<&Password>,
    ctx: ResolveContext<'_>,
) -> Result<Option<KeyMaterial>, KeyError> {
    resolve_at(source, password, ctx, 0)
}

fn resolve_at(
    source: Option<&KeySource>,
    password: Option<&Password>,
    ctx: ResolveContext<'_>,
    depth: usize,
) -> Result<Option<KeyMaterial>, KeyError> {
    let Some(source) = source else {
        return Ok(None);
    };
    if depth > MAX_INDIRECTION {
        return Err(KeyError::TooDeep);
    }
    debug!(kind = source.kind(), depth, "resolving key source");

    match source {
        KeySource::Lazy(f) => resolve_at(f().as_ref(), password, ctx, depth + 1),
        KeySource::Record(name) => {
            let record = ctx
                .record
                .ok_or_else(|| KeyError::RecordRequired(name.clone()))?;
            resolve_at(record.key_source(name).as_ref(), password, ctx, depth + 1)
        }
        KeySource::Env(name) => {
            let value =
                std::env::var(name).map_err(|_| KeyError::MissingEnvVar(name.clone()))?;
            resolve_at(Some(&KeySource::text(value)), password, ctx, depth + 1)
        }
        KeySource::Material(material) => Ok(Some(material.clone())),
        KeySource::Pem(text) => KeyMaterial::from_pem(text, password).map(Some),
        KeySource::Der(bytes) => KeyMaterial::from_der(bytes, password).map(Some),
        KeySource::Path(path) => read_key_file(path, password).map(Some),
    }
}

fn read_key_file(path: &Path, password: Option<&Password>) -> Result<KeyMaterial, KeyError> {
    let bytes = std::fs::read(path).map_err(|source| KeyError::Io {
        path: path.to_owned(),
        source,
    })?;
    match std::str::from_utf8(&bytes) {
        Ok(text) if looks_like_pem(text) => KeyMaterial::from_pem(text, password),
        _ => KeyMaterial::from_der(&bytes, password),
    }
}
