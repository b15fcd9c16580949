use crate::{
    extract::{self, ExtractFormat},
    period::PeriodDataset,
    PerfError,
};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Content digest of an upload plus everything that changes how it parses.
pub type DatasetKey = [u8; 32];

/// Parsed datasets keyed by what was uploaded, not by when.
/// Re-running a query on the same files never reparses them.
pub struct DatasetCache {
    entries: LruCache<DatasetKey, Arc<PeriodDataset>>,
    hits: u64,
    misses: u64,
}

impl DatasetCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn key(name: &str, format: ExtractFormat, sheet: &str, header_offset: usize, bytes: &[u8]) -> DatasetKey {
        let mut hasher = Sha256::new();
        // lengths keep ("ab", "c") and ("a", "bc") apart
        for part in [name.as_bytes(), format.as_str().as_bytes(), sheet.as_bytes()] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        hasher.update((header_offset as u64).to_le_bytes());
        hasher.update(bytes);
        hasher.finalize().into()
    }

    pub fn get_or_load(
        &mut self,
        name: &str,
        format: ExtractFormat,
        sheet: &str,
        header_offset: usize,
        bytes: &[u8],
    ) -> Result<Arc<PeriodDataset>, PerfError> {
        let key = Self::key(name, format, sheet, header_offset, bytes);
        if let Some(dataset) = self.entries.get(&key) {
            self.hits += 1;
            debug!(period = name, "dataset cache hit");
            return Ok(Arc::clone(dataset));
        }

        self.misses += 1;
        let raw = extract::read_bytes(bytes, format, sheet)?;
        let dataset = Arc::new(PeriodDataset::load(name, raw, header_offset)?);
        self.entries.put(key, Arc::clone(&dataset));
        debug!(period = name, rows = dataset.len(), "dataset cache miss, parsed extract");
        Ok(dataset)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
