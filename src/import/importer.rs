//! Batch import and reconciliation of parsed dump rows.
//!
//! The importer consumes a lazy sequence of objects, sorts each one into a
//! pending insert or a pending update against the domain's existence index,
//! and writes fixed-size batches to the catalog.

use std::time::{Duration, Instant};

use crate::catalog::{CatalogObject, CatalogResult, ExistenceIndex, ObjectCatalog};
use crate::dump::DumpResult;
use crate::import::error::ImportResult;

/// Objects per catalog write batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Minimum time between two intermediate progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Tuning knobs for one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub progress_interval: Duration,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Decides whether an already-known object should be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCriterion {
    /// Rewrite every known object.
    Always,
    /// Rewrite objects modified strictly after the stamp. `None` means the
    /// catalog holds no stamp yet, so every object qualifies.
    ModifiedAfter(Option<String>),
}

impl UpdateCriterion {
    pub fn is_worth_updating<T: CatalogObject>(&self, object: &T) -> bool {
        match self {
            Self::Always => true,
            Self::ModifiedAfter(None) => true,
            Self::ModifiedAfter(Some(watermark)) => object.modified_at() > watermark.as_str(),
        }
    }
}

/// Totals of one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub added: u64,
    pub updated: u64,
}

/// Generic batch importer for one catalog domain.
pub struct Importer<'c, T, C> {
    catalog: &'c mut C,
    existing: Option<ExistenceIndex>,
    criterion: UpdateCriterion,
    settings: ImportSettings,
    inserts: Vec<T>,
    updates: Vec<T>,
}

impl<'c, T, C> Importer<'c, T, C>
where
    T: CatalogObject,
    C: ObjectCatalog<T>,
{
    pub fn new(
        catalog: &'c mut C,
        existing: Option<ExistenceIndex>,
        criterion: UpdateCriterion,
        settings: ImportSettings,
    ) -> Self {
        let capacity = settings.batch_size.max(1);
        Self {
            catalog,
            existing,
            criterion,
            settings,
            inserts: Vec::with_capacity(capacity),
            updates: Vec::with_capacity(capacity),
        }
    }

    /// Build an importer from the catalog's current state: the existence
    /// index is loaded only when the domain already holds records, and the
    /// update criterion compares against the stored watermark.
    pub fn for_catalog(catalog: &'c mut C, settings: ImportSettings) -> CatalogResult<Self> {
        let count = catalog.count()?;
        let existing = if count > 0 {
            Some(catalog.existence_index()?)
        } else {
            None
        };
        let watermark = catalog.last_modified()?;
        tracing::debug!(
            domain = %T::DOMAIN,
            existing = count,
            watermark = watermark.as_deref().unwrap_or(""),
            "prepared importer"
        );
        Ok(Self::new(
            catalog,
            existing,
            UpdateCriterion::ModifiedAfter(watermark),
            settings,
        ))
    }

    /// Whether known ids can occur, i.e. the existence index is non-empty.
    pub fn is_update_mode(&self) -> bool {
        self.existing.as_ref().is_some_and(|index| !index.is_empty())
    }

    /// Import every object of the sequence.
    ///
    /// `progress(added, updated)` is called once with zeros before the first
    /// object, after a flushed batch when the progress interval has passed,
    /// and once more with the final totals. A row or catalog error aborts the
    /// run; batches flushed before it stay committed.
    pub fn import<I, P>(&mut self, objects: I, mut progress: P) -> ImportResult<ImportOutcome>
    where
        I: IntoIterator<Item = DumpResult<T>>,
        P: FnMut(u64, u64),
    {
        let batch_size = self.settings.batch_size.max(1);
        let update_mode = self.is_update_mode();
        let mut outcome = ImportOutcome::default();
        let mut last_report = Instant::now();
        self.inserts.clear();
        self.updates.clear();
        progress(0, 0);

        for object in objects {
            let mut object = object?;
            let libgen_id = object.libgen_id();
            let known = update_mode
                && self
                    .existing
                    .as_ref()
                    .is_some_and(|index| index.contains(libgen_id));

            if !known {
                self.inserts.push(object);
            } else if self.criterion.is_worth_updating(&object) {
                match self.catalog.find_id_by_libgen_id(libgen_id)? {
                    Some(id) => {
                        object.set_id(id);
                        self.updates.push(object);
                    }
                    None => {
                        tracing::warn!(
                            domain = %T::DOMAIN,
                            libgen_id,
                            "id is marked as present but has no record; inserting it again"
                        );
                        self.inserts.push(object);
                    }
                }
            }

            if self.inserts.len() + self.updates.len() >= batch_size {
                self.flush(&mut outcome)?;
                if last_report.elapsed() > self.settings.progress_interval {
                    progress(outcome.added, outcome.updated);
                    last_report = Instant::now();
                }
            }
        }

        self.flush(&mut outcome)?;
        progress(outcome.added, outcome.updated);
        Ok(outcome)
    }

    fn flush(&mut self, outcome: &mut ImportOutcome) -> CatalogResult<()> {
        if !self.inserts.is_empty() {
            self.catalog.insert_batch(&mut self.inserts)?;
            outcome.added += self.inserts.len() as u64;
            self.inserts.clear();
        }
        if !self.updates.is_empty() {
            self.catalog.update_batch(&self.updates)?;
            outcome.updated += self.updates.len() as u64;
            self.updates.clear();
        }
        tracing::trace!(
            domain = %T::DOMAIN,
            added = outcome.added,
            updated = outcome.updated,
            "flushed batch"
        );
        Ok(())
    }
}
