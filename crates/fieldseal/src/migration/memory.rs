//! In-memory [`RecordStore`].

use std::collections::BTreeMap;
use std::ops::Bound;

use thiserror::Error;

use super::store::{RawRecord, RecordStore};

/// Errors produced by [`MemoryStore`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// No record with this id.
    #[error("no record with id {0}")]
    UnknownRecord(u64),

    /// The field is not one of the store's columns.
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
}

/// Records keyed by an auto-incremented `u64`, with a fixed column set.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    columns: Vec<String>,
    rows: BTreeMap<u64, BTreeMap<String, Option<String>>>,
    next_id: u64,
    writes: usize,
}

impl MemoryStore {
    /// Empty store with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: BTreeMap::new(),
            next_id: 1,
            writes: 0,
        }
    }

    /// Insert a record and return its id. Columns not given are null.
    ///
    /// # Errors
    ///
    /// [`MemoryStoreError::UnknownColumn`] for a field outside the column set.
    pub fn insert<I, K, V>(&mut self, values: I) -> Result<u64, MemoryStoreError>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut row: BTreeMap<String, Option<String>> =
            self.columns.iter().map(|c| (c.clone(), None)).collect();
        for (field, value) in values {
            let field = field.into();
            match row.get_mut(&field) {
                Some(slot) => *slot = value.map(Into::into),
                None => return Err(MemoryStoreError::UnknownColumn(field)),
            }
        }
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.rows.insert(id, row);
        Ok(id)
    }

    /// Raw value of one field.
    pub fn get(&self, id: u64, field: &str) -> Option<&str> {
        self.rows.get(&id)?.get(field)?.as_deref()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of [`RecordStore::update_fields`] calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl RecordStore for MemoryStore {
    type Id = u64;
    type Error = MemoryStoreError;

    fn column_names(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn fetch_page(
        &self,
        fields: &[String],
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<RawRecord<u64>>, MemoryStoreError> {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(self
            .rows
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(id, row)| RawRecord {
                id: *id,
                values: fields
                    .iter()
                    .filter_map(|f| row.get(f).map(|v| (f.clone(), v.clone())))
                    .collect(),
            })
            .collect())
    }

    fn update_fields(
        &mut self,
        id: &u64,
        values: &[(String, Option<String>)],
    ) -> Result<(), MemoryStoreError> {
        let row = self
            .rows
            .get_mut(id)
            .ok_or(MemoryStoreError::UnknownRecord(*id))?;
        if let Some((field, _)) = values.iter().find(|(f, _)| !row.contains_key(f)) {
            return Err(MemoryStoreError::UnknownColumn(field.clone()));
        }
        for (field, value) in values {
            row.insert(field.clone(), value.clone());
        }
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new(["secret", "name"]);
        for i in 0..5 {
            store
                .insert([("secret", Some(format!("s{i}"))), ("name", Some(format!("n{i}")))])
                .unwrap();
        }
        store
    }

    #[test]
    fn ids_are_sequential() {
        let store = store();
        assert_eq!(store.len(), 5);
        assert_eq!(store.get(1, "secret"), Some("s0"));
        assert_eq!(store.get(5, "name"), Some("n4"));
        assert_eq!(store.get(6, "name"), None);
    }

    #[test]
    fn pages_resume_after_id() {
        let store = store();
        let fields = vec!["secret".to_owned()];
        let first = store.fetch_page(&fields, None, 2).unwrap();
        assert_eq!(first.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        let second = store.fetch_page(&fields, Some(2), 2).unwrap();
        assert_eq!(second.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 4]);
        let last = store.fetch_page(&fields, Some(4), 2).unwrap();
        assert_eq!(last.len(), 1);
        assert!(store.fetch_page(&fields, Some(5), 2).unwrap().is_empty());
    }

    #[test]
    fn pages_are_projected() {
        let store = store();
        let page = store.fetch_page(&["secret".to_owned()], None, 1).unwrap();
        assert_eq!(page[0].get("secret"), Some("s0"));
        assert!(!page[0].values.contains_key("name"));
    }

    #[test]
    fn update_touches_only_listed_fields() {
        let mut store = store();
        store
            .update_fields(&3, &[("secret".to_owned(), Some("x".to_owned()))])
            .unwrap();
        assert_eq!(store.get(3, "secret"), Some("x"));
        assert_eq!(store.get(3, "name"), Some("n2"));
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn update_errors() {
        let mut store = store();
        assert_eq!(
            store.update_fields(&99, &[]),
            Err(MemoryStoreError::UnknownRecord(99))
        );
        assert_eq!(
            store.update_fields(&1, &[("nope".to_owned(), None)]),
            Err(MemoryStoreError::UnknownColumn("nope".into()))
        );
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn insert_rejects_unknown_column() {
        let mut store = MemoryStore::new(["secret"]);
        assert_eq!(
            store.insert([("nope", Some("x"))]),
            Err(MemoryStoreError::UnknownColumn("nope".into()))
        );
        assert!(store.is_empty());
    }
}
