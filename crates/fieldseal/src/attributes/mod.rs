//! Encrypted attribute declarations and the per-record-type registry.
//!
//! # Responsibilities
//!
//! - Bind field names to a codec once, when the record type declares them.
//! - Hand the persistence layer two hooks: [`AttributeRegistry::seal`] on write
//!   and [`AttributeRegistry::unseal`] on read.
//!
//! # Module invariants
//!
//! - **No storage dependencies.** Reading and writing records is the host's job.
//! - A declaration is never mutated. Declaring a name again replaces its binding.

pub mod registry;

pub use registry::AttributeRegistry;

use std::borrow::Cow;

use tracing::debug;

use crate::codec::{Codec, Padding};
use crate::error::SealError;
use crate::keys::{KeyDefaults, KeyError, KeyHandle, KeyOptions, KeyProvider, ResolveContext};

/// How a declared field obtains its codec.
#[derive(Debug, Clone)]
enum Binding {
    /// Keys resolved at declaration time.
    Static(Codec),
    /// Keys depend on the record; resolved on every call.
    PerRecord {
        options: KeyOptions,
        defaults: KeyDefaults,
        padding: Padding,
    },
}

impl Binding {
    fn resolve(
        options: &KeyOptions,
        defaults: &KeyDefaults,
        padding: Padding,
    ) -> Result<Self, KeyError> {
        match KeyHandle::resolve(options, defaults, ResolveContext::none()) {
            Ok(keys) => Ok(Binding::Static(Codec::new(keys).with_padding(padding))),
            Err(KeyError::RecordRequired(name)) => {
                debug!(source = %name, "key depends on the record; deferring resolution");
                Ok(Binding::PerRecord {
                    options: options.clone(),
                    defaults: defaults.clone(),
                    padding,
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// One field declared as encrypted.
#[derive(Debug, Clone)]
pub struct EncryptedAttribute {
    name: String,
    binding: Binding,
}

impl EncryptedAttribute {
    /// Declare `name` with the given key options.
    ///
    /// Keys are resolved now unless they depend on a record, in which case
    /// they are resolved on every [`seal`](Self::seal) / [`unseal`](Self::unseal).
    ///
    /// # Errors
    ///
    /// Any [`KeyError`] other than [`KeyError::RecordRequired`].
    pub fn declare(
        name: impl Into<String>,
        options: &KeyOptions,
        defaults: &KeyDefaults,
        padding: Padding,
    ) -> Result<Self, KeyError> {
        Ok(Self {
            name: name.into(),
            binding: Binding::resolve(options, defaults, padding)?,
        })
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the keys are resolved per record.
    pub fn is_per_record(&self) -> bool {
        matches!(self.binding, Binding::PerRecord { .. })
    }

    /// The codec for `record`.
    ///
    /// # Errors
    ///
    /// [`SealError::KeyResolution`] if per-record keys cannot be resolved.
    pub fn codec(&self, record: Option<&dyn KeyProvider>) -> Result<Cow<'_, Codec>, SealError> {
        match &self.binding {
            Binding::Static(codec) => Ok(Cow::Borrowed(codec)),
            Binding::PerRecord {
                options,
                defaults,
                padding,
            } => {
                let ctx = record.map(ResolveContext::for_record).unwrap_or_default();
                let keys = KeyHandle::resolve(options, defaults, ctx)?;
                Ok(Cow::Owned(Codec::new(keys).with_padding(*padding)))
            }
        }
    }

    /// Encrypt a value on its way to storage.
    ///
    /// # Errors
    ///
    /// See [`Codec::encrypt`] and [`EncryptedAttribute::codec`].
    pub fn seal(
        &self,
        value: Option<&str>,
        record: Option<&dyn KeyProvider>,
    ) -> Result<Option<String>, SealError> {
        if value.is_none() {
            return Ok(None);
        }
        self.codec(record)?.encrypt(value)
    }

    /// Decrypt a value read from storage.
    ///
    /// # Errors
    ///
    /// See [`Codec::decrypt`] and [`EncryptedAttribute::codec`].
    pub fn unseal(
        &self,
        value: Option<&str>,
        record: Option<&dyn KeyProvider>,
    ) -> Result<Option<String>, SealError> {
        if value.is_none() {
            return Ok(None);
        }
        self.codec(record)?.decrypt(value)
    }
}
