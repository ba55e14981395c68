//! Paged up/down conversion of stored field values.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::store::RecordStore;
use crate::codec::{Codec, Padding};
use crate::error::SealError;
use crate::keys::{resolve_private, resolve_public, KeyDefaults, KeyHandle, KeyOptions, ResolveContext};

/// Records fetched per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Which way to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Plaintext to envelope.
    Up,
    /// Envelope to plaintext.
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
        })
    }
}

/// Outcome of one migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Records visited.
    pub records: usize,
    /// Values converted and written back.
    pub converted: usize,
    /// Values already in the target form.
    pub skipped: usize,
    /// Pages fetched.
    pub pages: usize,
    /// The run stopped early because cancellation was requested.
    pub cancelled: bool,
}

/// Errors that abort a migration run.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Keys are missing or unusable; nothing was fetched.
    #[error("migration keys unavailable: {0}")]
    Key(#[source] SealError),

    /// A value could not be converted. Earlier records stay converted.
    #[error("failed to convert field `{field}` of record {record}: {source}")]
    Seal {
        /// Debug rendering of the record id.
        record: String,
        /// Field name.
        field: String,
        /// Codec error.
        #[source]
        source: SealError,
    },

    /// The record store failed.
    #[error("record store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl MigrationError {
    fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MigrationError::Store(Box::new(err))
    }
}

enum Conversion {
    Converted(String),
    Skipped,
}

/// Runs migrations page by page.
#[derive(Debug, Clone)]
pub struct Migrator {
    page_size: usize,
    padding: Padding,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for Migrator {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            padding: Padding::default(),
            cancel: None,
        }
    }
}

impl Migrator {
    /// Migrator with [`DEFAULT_PAGE_SIZE`] and the default padding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `page_size` records per page (at least one).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Padding used by [`encrypt_existing`](Self::encrypt_existing) and
    /// [`decrypt_existing`](Self::decrypt_existing).
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Stop before the next page once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Records per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Encrypt the plaintext values of `fields` on every record.
    ///
    /// Only the public key is resolved, once, without a record in scope; a
    /// writer with no access to the private key can run it.
    ///
    /// # Errors
    ///
    /// [`MigrationError::Key`] before any page is fetched if no public key
    /// resolves, otherwise see [`Migrator::apply`].
    pub fn encrypt_existing<S, F>(
        &self,
        store: &mut S,
        fields: &[F],
        options: &KeyOptions,
        defaults: &KeyDefaults,
    ) -> Result<MigrationReport, MigrationError>
    where
        S: RecordStore,
        F: AsRef<str>,
    {
        let codec = self.codec(Direction::Up, options, defaults)?;
        self.apply(Direction::Up, store, fields, &codec)
    }

    /// Decrypt the envelope values of `fields` on every record.
    ///
    /// Only the private key is resolved.
    ///
    /// # Errors
    ///
    /// [`MigrationError::Key`] before any page is fetched if no private key
    /// resolves, otherwise see [`Migrator::apply`].
    pub fn decrypt_existing<S, F>(
        &self,
        store: &mut S,
        fields: &[F],
        options: &KeyOptions,
        defaults: &KeyDefaults,
    ) -> Result<MigrationReport, MigrationError>
    where
        S: RecordStore,
        F: AsRef<str>,
    {
        let codec = self.codec(Direction::Down, options, defaults)?;
        self.apply(Direction::Down, store, fields, &codec)
    }

    fn codec(
        &self,
        direction: Direction,
        options: &KeyOptions,
        defaults: &KeyDefaults,
    ) -> Result<Codec, MigrationError> {
        let ctx = ResolveContext::none();
        let keys = match direction {
            Direction::Up => resolve_public(options, defaults, ctx)
                .map(|key| key.map(KeyHandle::public_only)),
            Direction::Down => resolve_private(options, defaults, ctx)
                .map(|key| key.map(KeyHandle::from_private)),
        }
        .map_err(|e| MigrationError::Key(e.into()))?
        .unwrap_or_default();
        Ok(Codec::new(keys).with_padding(self.padding))
    }

    /// Convert `fields` of every record in `store` with `codec`.
    ///
    /// Fields the store does not have are dropped. `None` values are left
    /// alone; values already in the target form are counted as skipped. Only
    /// changed fields are written.
    ///
    /// # Errors
    ///
    /// - [`MigrationError::Key`] if `codec` lacks the key `direction` needs.
    /// - [`MigrationError::Seal`] on the first value that fails to convert.
    /// - [`MigrationError::Store`] if fetching or writing fails.
    pub fn apply<S, F>(
        &self,
        direction: Direction,
        store: &mut S,
        fields: &[F],
        codec: &Codec,
    ) -> Result<MigrationReport, MigrationError>
    where
        S: RecordStore,
        F: AsRef<str>,
    {
        match direction {
            Direction::Up if !codec.keys().has_public() => {
                return Err(MigrationError::Key(SealError::MissingPublicKey));
            }
            Direction::Down if !codec.keys().has_private() => {
                return Err(MigrationError::Key(SealError::MissingPrivateKey));
            }
            _ => {}
        }

        let columns = store.column_names();
        let mut selected: Vec<String> = Vec::new();
        for field in fields.iter().map(|f| f.as_ref()) {
            if !columns.iter().any(|c| c == field) {
                debug!(field, "field not present on record type; dropped");
                continue;
            }
            if !selected.iter().any(|s| s == field) {
                selected.push(field.to_owned());
            }
        }

        let mut report = MigrationReport::default();
        if selected.is_empty() {
            info!(%direction, "no migratable fields; nothing to do");
            return Ok(report);
        }

        info!(%direction, fields = ?selected, page_size = self.page_size, "migration started");

        let mut after: Option<S::Id> = None;
        loop {
            if self.is_cancelled() {
                warn!(%direction, records = report.records, "migration cancelled");
                report.cancelled = true;
                break;
            }

            let page = store
                .fetch_page(&selected, after.clone(), self.page_size)
                .map_err(MigrationError::store)?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.id.clone());
            let page_len = page.len();
            report.pages += 1;

            let converted_before = report.converted;
            for record in page {
                report.records += 1;
                let mut updates: Vec<(String, Option<String>)> = Vec::new();
                for field in &selected {
                    let Some(value) = record.get(field) else {
                        continue;
                    };
                    match convert(direction, codec, value).map_err(|source| {
                        MigrationError::Seal {
                            record: format!("{:?}", record.id),
                            field: field.clone(),
                            source,
                        }
                    })? {
                        Conversion::Converted(new) => updates.push((field.clone(), Some(new))),
                        Conversion::Skipped => {
                            debug!(record = ?record.id, field = %field, "already converted; skipped");
                            report.skipped += 1;
                        }
                    }
                }
                if !updates.is_empty() {
                    store
                        .update_fields(&record.id, &updates)
                        .map_err(MigrationError::store)?;
                    report.converted += updates.len();
                }
            }

            info!(
                %direction,
                page = report.pages,
                records = page_len,
                converted = report.converted - converted_before,
                "migration page done"
            );

        }

        if report.skipped > 0 {
            warn!(%direction, skipped = report.skipped, "values were already converted");
        }
        info!(
            %direction,
            records = report.records,
            converted = report.converted,
            skipped = report.skipped,
            pages = report.pages,
            cancelled = report.cancelled,
            "migration finished"
        );
        Ok(report)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn convert(direction: Direction, codec: &Codec, value: &str) -> Result<Conversion, SealError> {
    let result = match direction {
        Direction::Up => codec.encrypt_bytes(value.as_bytes()),
        Direction::Down => codec
            .decrypt_bytes(value)
            .and_then(|bytes| String::from_utf8(bytes).map_err(|_| SealError::NotUtf8)),
    };
    match result {
        Ok(converted) => Ok(Conversion::Converted(converted)),
        Err(SealError::AlreadyEncrypted) | Err(SealError::NotEncrypted) => Ok(Conversion::Skipped),
        Err(e) => Err(e),
    }
}
