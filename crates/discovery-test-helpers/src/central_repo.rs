//! In-memory central repository.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use discovery_core::CorrelationKind;
use discovery_search::{CentralRepoError, CentralRepoResult, CentralRepository};

/// Case counts and known-bad values keyed by (kind, normalized value).
///
/// Normalization trims and lower-cases. Values registered with
/// [`MemoryCentralRepository::with_unnormalizable`] fail normalization.
#[derive(Debug, Default)]
pub struct MemoryCentralRepository {
    counts: HashMap<(CorrelationKind, String), u64>,
    known_bad: HashSet<(CorrelationKind, String)>,
    unnormalizable: HashSet<String>,
    unavailable: Option<String>,
    count_lookups: AtomicUsize,
    bad_lookups: AtomicUsize,
    largest_batch: AtomicUsize,
}

impl MemoryCentralRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `value` appears in `cases` distinct cases.
    #[must_use]
    pub fn with_count(mut self, kind: CorrelationKind, value: &str, cases: u64) -> Self {
        self.counts.insert((kind, normalize(value)), cases);
        self
    }

    #[must_use]
    pub fn with_known_bad(mut self, kind: CorrelationKind, value: &str) -> Self {
        self.known_bad.insert((kind, normalize(value)));
        self
    }

    #[must_use]
    pub fn with_unnormalizable(mut self, value: &str) -> Self {
        self.unnormalizable.insert(value.to_string());
        self
    }

    /// Fail every lookup as if the repository were offline.
    #[must_use]
    pub fn unavailable(mut self, message: impl Into<String>) -> Self {
        self.unavailable = Some(message.into());
        self
    }

    #[must_use]
    pub fn count_lookups(&self) -> usize {
        self.count_lookups.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn bad_lookups(&self) -> usize {
        self.bad_lookups.load(Ordering::SeqCst)
    }

    /// Largest number of values passed to a single lookup.
    #[must_use]
    pub fn largest_batch(&self) -> usize {
        self.largest_batch.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> CentralRepoResult<()> {
        match &self.unavailable {
            Some(message) => Err(CentralRepoError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

impl CentralRepository for MemoryCentralRepository {
    fn normalize(&self, _kind: CorrelationKind, value: &str) -> CentralRepoResult<String> {
        self.check_available()?;
        if self.unnormalizable.contains(value) {
            return Err(CentralRepoError::normalization(value, "rejected by test repository"));
        }
        Ok(normalize(value))
    }

    fn case_counts(
        &self,
        kind: CorrelationKind,
        values: &[String],
    ) -> CentralRepoResult<HashMap<String, u64>> {
        self.check_available()?;
        self.count_lookups.fetch_add(1, Ordering::SeqCst);
        self.largest_batch.fetch_max(values.len(), Ordering::SeqCst);
        Ok(values
            .iter()
            .filter_map(|value| {
                self.counts
                    .get(&(kind, normalize(value)))
                    .map(|count| (value.clone(), *count))
            })
            .collect())
    }

    fn known_bad_values(
        &self,
        kind: CorrelationKind,
        values: &[String],
    ) -> CentralRepoResult<HashSet<String>> {
        self.check_available()?;
        self.bad_lookups.fetch_add(1, Ordering::SeqCst);
        self.largest_batch.fetch_max(values.len(), Ordering::SeqCst);
        Ok(values
            .iter()
            .filter(|value| self.known_bad.contains(&(kind, normalize(value))))
            .cloned()
            .collect())
    }
}
