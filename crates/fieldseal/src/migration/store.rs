//! The storage collaborator of the migration processor.

use std::collections::BTreeMap;
use std::fmt;

/// One record as stored, before any codec is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord<Id> {
    /// Primary key.
    pub id: Id,
    /// Requested field values. `None` is a null column.
    pub values: BTreeMap<String, Option<String>>,
}

impl<Id> RawRecord<Id> {
    /// Build a record from `(field, value)` pairs.
    pub fn new<I, K>(id: Id, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        Self {
            id,
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Raw value of `field`; `None` if it is null or was not fetched.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(|v| v.as_deref())
    }
}

/// Paged access to the records of one type.
///
/// Implementations must return pages in a stable ascending id order so that
/// `after` can resume where the previous page ended.
pub trait RecordStore {
    /// Primary key type.
    type Id: Clone + fmt::Debug;
    /// Storage error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Names of the fields that exist on the stored record type.
    fn column_names(&self) -> Vec<String>;

    /// Up to `limit` records with ids strictly greater than `after` (or from the
    /// start when `after` is `None`), projected to `fields`.
    ///
    /// A page may hold fewer than `limit` records; only an empty page means
    /// there is nothing left.
    fn fetch_page(
        &self,
        fields: &[String],
        after: Option<Self::Id>,
        limit: usize,
    ) -> Result<Vec<RawRecord<Self::Id>>, Self::Error>;

    /// Overwrite the given fields of one record directly, bypassing any
    /// validation or lifecycle hooks of the host. Fields not listed are left
    /// untouched.
    fn update_fields(
        &mut self,
        id: &Self::Id,
        values: &[(String, Option<String>)],
    ) -> Result<(), Self::Error>;
}
