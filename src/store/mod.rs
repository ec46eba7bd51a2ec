//! In-memory entity stores. The benchmark store exists to give the pipeline
//! snapshot-read semantics under concurrent bulk replaces; the listing
//! ledger enforces VIN deduplication and the one-result-per-listing rule.
//! A real persistence layer would implement the same traits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::{Appraisal, Listing, MatchResult};
use crate::scoring::normalizer::normalize_vin;
use crate::similarity::{normalize_token, normalize_trim};

/// Read/write interface over the appraisal benchmark collection.
pub trait BenchmarkStore: Send + Sync {
    /// Immutable snapshot of the collection as of this call. A concurrent
    /// `replace_all` never mixes old and new entries within one snapshot.
    fn snapshot(&self) -> Arc<Vec<Appraisal>>;
    fn list_all(&self) -> Vec<Appraisal>;
    /// Full overwrite of the collection.
    fn replace_all(&self, appraisals: Vec<Appraisal>);
    /// Insert or update by natural key (year, make, model, trim).
    fn upsert(&self, appraisal: Appraisal);
}

#[derive(Debug, Default)]
pub struct InMemoryBenchmarkStore {
    inner: RwLock<Arc<Vec<Appraisal>>>,
}

impl InMemoryBenchmarkStore {
    pub fn new(appraisals: Vec<Appraisal>) -> Self {
        Self {
            inner: RwLock::new(Arc::new(appraisals)),
        }
    }
}

impl BenchmarkStore for InMemoryBenchmarkStore {
    fn snapshot(&self) -> Arc<Vec<Appraisal>> {
        Arc::clone(&self.inner.read().expect("benchmark lock poisoned"))
    }

    fn list_all(&self) -> Vec<Appraisal> {
        self.snapshot().as_ref().clone()
    }

    fn replace_all(&self, appraisals: Vec<Appraisal>) {
        *self.inner.write().expect("benchmark lock poisoned") = Arc::new(appraisals);
    }

    fn upsert(&self, appraisal: Appraisal) {
        let mut guard = self.inner.write().expect("benchmark lock poisoned");
        let mut next = guard.as_ref().clone();
        let key = natural_key(&appraisal);
        match next.iter_mut().find(|existing| natural_key(existing) == key) {
            Some(existing) => *existing = appraisal,
            None => next.push(appraisal),
        }
        *guard = Arc::new(next);
    }
}

fn natural_key(appraisal: &Appraisal) -> (i32, String, String, String) {
    (
        appraisal.year,
        normalize_token(&appraisal.make),
        normalize_token(&appraisal.model),
        appraisal
            .trim
            .as_deref()
            .map(normalize_trim)
            .unwrap_or_default(),
    )
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no listing with id {0}")]
    UnknownListing(u64),
}

/// Opaque handle to a ledger slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListingId(u64);

impl ListingId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct LedgerEntry {
    listing: Listing,
    result: Option<MatchResult>,
}

/// Listing intake with VIN-based deduplication. Re-ingesting a VIN updates
/// the stored listing in place; listings without a VIN always occupy a new
/// slot. Each slot carries at most one MatchResult, overwritten on
/// re-score.
#[derive(Debug, Default)]
pub struct ListingLedger {
    entries: HashMap<u64, LedgerEntry>,
    by_vin: HashMap<String, u64>,
    next_id: u64,
}

impl ListingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a listing; the returned id is stable across
    /// re-ingests of the same VIN. A stale MatchResult is dropped when the
    /// listing changes so it can never describe data that no longer exists.
    pub fn ingest(&mut self, listing: Listing) -> ListingId {
        if let Some(vin) = normalize_vin(listing.vin.as_deref()) {
            if let Some(&id) = self.by_vin.get(&vin) {
                let entry = self.entries.get_mut(&id).expect("vin index consistent");
                if entry.listing != listing {
                    entry.result = None;
                }
                entry.listing = listing;
                return ListingId(id);
            }
            let id = self.allocate(listing);
            self.by_vin.insert(vin, id.0);
            return id;
        }
        self.allocate(listing)
    }

    fn allocate(&mut self, listing: Listing) -> ListingId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            LedgerEntry {
                listing,
                result: None,
            },
        );
        ListingId(id)
    }

    pub fn record_result(&mut self, id: ListingId, result: MatchResult) -> Result<(), StoreError> {
        let entry = self
            .entries
            .get_mut(&id.0)
            .ok_or(StoreError::UnknownListing(id.0))?;
        entry.result = Some(result);
        Ok(())
    }

    pub fn listing(&self, id: ListingId) -> Option<&Listing> {
        self.entries.get(&id.0).map(|entry| &entry.listing)
    }

    pub fn result(&self, id: ListingId) -> Option<&MatchResult> {
        self.entries.get(&id.0).and_then(|entry| entry.result.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn results(&self) -> impl Iterator<Item = (&Listing, &MatchResult)> {
        self.entries
            .values()
            .filter_map(|entry| entry.result.as_ref().map(|result| (&entry.listing, result)))
    }
}
