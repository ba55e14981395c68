//! Shared registry of encrypted attributes, keyed by field name.
//!
//! Reads are lock-free (`arc-swap`); a declaration swaps in a new map.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use tracing::info;

use super::{Binding, EncryptedAttribute};
use crate::codec::Padding;
use crate::error::SealError;
use crate::keys::{KeyDefaults, KeyError, KeyOptions, KeyProvider};

/// Encrypted attributes of one record type.
///
/// Carries the key defaults and padding it was built with, so every
/// declaration on it resolves keys the same way.
#[derive(Clone, Debug)]
pub struct AttributeRegistry {
    inner: Arc<ArcSwap<HashMap<String, Arc<EncryptedAttribute>>>>,
    defaults: Arc<KeyDefaults>,
    padding: Padding,
}

impl AttributeRegistry {
    /// Create an empty registry.
    pub fn new(defaults: KeyDefaults, padding: Padding) -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
            defaults: Arc::new(defaults),
            padding,
        }
    }

    /// Number of declared attributes.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Returns `true` if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Declare `fields` as encrypted with `options`.
    ///
    /// Keys are resolved once for the whole call. Names already declared are
    /// rebound, not merged; other names are kept.
    ///
    /// # Errors
    ///
    /// Any [`KeyError`] from resolution; the registry is left unchanged.
    pub fn declare<I, S>(&self, fields: I, options: &KeyOptions) -> Result<(), KeyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let binding = Binding::resolve(options, &self.defaults, self.padding)?;
        let declared: Vec<Arc<EncryptedAttribute>> = fields
            .into_iter()
            .map(|name| {
                Arc::new(EncryptedAttribute {
                    name: name.into(),
                    binding: binding.clone(),
                })
            })
            .collect();

        self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            for attr in &declared {
                next.insert(attr.name.clone(), Arc::clone(attr));
            }
            next
        });
        info!(count = declared.len(), total = self.len(), "encrypted attributes declared");
        Ok(())
    }

    /// Look up a declaration.
    pub fn get(&self, name: &str) -> Option<Arc<EncryptedAttribute>> {
        self.inner.load().get(name).cloned()
    }

    /// Returns `true` if `name` is declared.
    pub fn is_encrypted(&self, name: &str) -> bool {
        self.inner.load().contains_key(name)
    }

    /// Declared field names, sorted.
    pub fn encrypted_attributes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Write hook: encrypt `value` if `field` is declared, pass it through otherwise.
    ///
    /// # Errors
    ///
    /// See [`EncryptedAttribute::seal`].
    pub fn seal(
        &self,
        field: &str,
        value: Option<&str>,
        record: Option<&dyn KeyProvider>,
    ) -> Result<Option<String>, SealError> {
        match self.get(field) {
            Some(attr) => attr.seal(value, record),
            None => Ok(value.map(str::to_owned)),
        }
    }

    /// Read hook: decrypt `value` if `field` is declared, pass it through otherwise.
    ///
    /// # Errors
    ///
    /// See [`EncryptedAttribute::unseal`].
    pub fn unseal(
        &self,
        field: &str,
        value: Option<&str>,
        record: Option<&dyn KeyProvider>,
    ) -> Result<Option<String>, SealError> {
        match self.get(field) {
            Some(attr) => attr.unseal(value, record),
            None => Ok(value.map(str::to_owned)),
        }
    }
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::new(KeyDefaults::default(), Padding::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeySource;
    use crate::testing::fixtures;

    #[test]
    fn initially_empty() {
        let registry = AttributeRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("secret").is_none());
    }

    #[test]
    fn declare_and_list() {
        let registry = AttributeRegistry::default();
        let options = KeyOptions::new().with_key_pair(fixtures::PRIVATE_PEM);
        registry.declare(["ssn", "card_number"], &options).unwrap();
        assert_eq!(registry.encrypted_attributes(), vec!["card_number", "ssn"]);
        assert!(registry.is_encrypted("ssn"));
        assert!(!registry.is_encrypted("name"));
    }

    #[test]
    fn redeclaring_replaces_binding() {
        let registry = AttributeRegistry::default();
        registry
            .declare(["secret"], &KeyOptions::new().with_key_pair(fixtures::PRIVATE_PEM))
            .unwrap();
        registry
            .declare(["secret"], &KeyOptions::new().with_public_key(fixtures::PUBLIC_PEM))
            .unwrap();
        assert_eq!(registry.len(), 1);

        let sealed = registry.seal("secret", Some("abc123"), None).unwrap().unwrap();
        assert!(matches!(
            registry.unseal("secret", Some(&sealed), None),
            Err(SealError::MissingPrivateKey)
        ));
    }

    #[test]
    fn other_declarations_are_kept() {
        let registry = AttributeRegistry::default();
        let options = KeyOptions::new().with_key_pair(fixtures::PRIVATE_PEM);
        registry.declare(["a"], &options).unwrap();
        registry.declare(["b"], &options).unwrap();
        assert_eq!(registry.encrypted_attributes(), vec!["a", "b"]);
    }

    #[test]
    fn failed_declaration_leaves_registry_unchanged() {
        let registry = AttributeRegistry::default();
        let bad = KeyOptions::new().with_public_key("/no/such/key.pem");
        assert!(registry.declare(["secret"], &bad).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn undeclared_fields_pass_through() {
        let registry = AttributeRegistry::default();
        registry
            .declare(["secret"], &KeyOptions::new().with_key_pair(fixtures::PRIVATE_PEM))
            .unwrap();
        assert_eq!(
            registry.seal("name", Some("Alice"), None).unwrap().as_deref(),
            Some("Alice")
        );
        assert_eq!(
            registry.unseal("name", Some("Alice"), None).unwrap().as_deref(),
            Some("Alice")
        );
    }

    #[test]
    fn write_then_read_hooks() {
        let registry = AttributeRegistry::default();
        registry
            .declare(["secret"], &KeyOptions::new().with_key_pair(fixtures::PRIVATE_PEM))
            .unwrap();
        let stored = registry.seal("secret", Some("abc123"), None).unwrap().unwrap();
        assert_ne!(stored, "abc123");
        assert_eq!(
            registry.unseal("secret", Some(&stored), None).unwrap().as_deref(),
            Some("abc123")
        );
        assert_eq!(registry.seal("secret", None, None).unwrap(), None);
    }

    #[test]
    fn defaults_are_threaded_through() {
        let defaults = KeyDefaults {
            public_key: Some(KeySource::text(fixtures::PUBLIC_PEM)),
            private_key: Some(KeySource::text(fixtures::PRIVATE_ENCRYPTED_PEM)),
            private_key_password: Some(fixtures::PASSWORD.into()),
        };
        let registry = AttributeRegistry::new(defaults, Padding::default());
        registry.declare(["secret"], &KeyOptions::new()).unwrap();
        let stored = registry.seal("secret", Some("abc123"), None).unwrap().unwrap();
        assert_eq!(
            registry.unseal("secret", Some(&stored), None).unwrap().as_deref(),
            Some("abc123")
        );
    }
}
