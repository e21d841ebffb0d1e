use crate::auth::Authorizer;
use crate::errors::{
    NotFound,
    Result,
    SpecseekError,
};
use crate::storage::{
    IndexCache,
    SpectrumStore,
};
use rayon::prelude::*;
use specquery::compare::Comparator;
use specquery::features::{
    Fingerprint,
    extract_features,
    fuzzy_fingerprints,
    heavyside_fingerprint,
};
use specquery::models::{
    NormalizedSpectrum,
    SimilarityIndex,
    SpectrumCategory,
    SpectrumId,
};
use specquery::normalize::normalize;
use specquery::parsing::SpectrumFormat;
use std::collections::HashMap;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    TryLockError,
};
use std::time::Duration;
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cap on the candidate shortlist handed to exact scoring; each
    /// candidate costs one store read plus an O(vector length) score.
    pub max_candidates: usize,
    /// Attempts to take a category's write lock before giving up with
    /// a retryable concurrency error.
    pub lock_retries: u32,
    pub retry_backoff: Duration,
    /// Insert/query through the fuzzy fingerprint set instead of the
    /// single strict key.
    pub fuzzy_fingerprint: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_candidates: 20,
            lock_retries: 5,
            retry_backoff: Duration::from_millis(10),
            fuzzy_fingerprint: false,
        }
    }
}

/// What a search is asked to identify: a raw uploaded file, or a
/// spectrum already in the store.
pub enum SearchInput<'a> {
    Raw {
        bytes: &'a [u8],
        format: Option<SpectrumFormat>,
        category: SpectrumCategory,
    },
    Stored(SpectrumId),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SearchHit {
    pub id: SpectrumId,
    pub name: String,
    pub score: f64,
}

/// The retrieval orchestrator.
///
/// Owns nothing algorithmic, it sequences the core against the
/// store/cache collaborators: normalize, extract, shortlist through the
/// per-category [`SimilarityIndex`], then exact-score the candidates.
///
/// Mutations follow a single-writer-per-category discipline: the whole
/// index is read, changed in memory and written back, so concurrent
/// writers to one category would lose updates without the per-category
/// lock. Reads never take the lock and may see a slightly stale cached
/// index; that only affects the shortlist, the final scores always come
/// from authoritative store reads.
pub struct SearchEngine<S, C, A> {
    store: S,
    cache: C,
    auth: A,
    config: EngineConfig,
    write_locks: Mutex<HashMap<SpectrumCategory, Arc<Mutex<()>>>>,
}

fn acquire_write<'a>(
    lock: &'a Mutex<()>,
    category: SpectrumCategory,
    config: &EngineConfig,
) -> Result<MutexGuard<'a, ()>> {
    for attempt in 0..config.lock_retries {
        match lock.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => {
                // A writer panicked mid-mutation; the store copy is
                // still consistent, so taking the lock over is safe.
                warn!("Write lock for {} was poisoned, recovering", category);
                return Ok(poisoned.into_inner());
            }
            Err(TryLockError::WouldBlock) => {
                debug!(
                    "Write lock for {} busy (attempt {}/{})",
                    category,
                    attempt + 1,
                    config.lock_retries
                );
                std::thread::sleep(config.retry_backoff);
            }
        }
    }
    Err(SpecseekError::Concurrency {
        category,
        retries: config.lock_retries,
    })
}

impl<S, C, A> SearchEngine<S, C, A>
where
    S: SpectrumStore,
    C: IndexCache,
    A: Authorizer,
{
    pub fn new(store: S, cache: C, auth: A, config: EngineConfig) -> Self {
        Self {
            store,
            cache,
            auth,
            config,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn category_lock(&self, category: SpectrumCategory) -> Arc<Mutex<()>> {
        self.write_locks
            .lock()
            .unwrap()
            .entry(category)
            .or_default()
            .clone()
    }

    fn fingerprints_of(&self, intensities: &[u16]) -> Vec<Fingerprint> {
        if self.config.fuzzy_fingerprint {
            fuzzy_fingerprints(intensities).to_vec()
        } else {
            vec![heavyside_fingerprint(intensities)]
        }
    }

    fn authorize(&self, identity: &str, category: SpectrumCategory) -> Result<()> {
        if self.auth.can_write(identity, category) {
            Ok(())
        } else {
            Err(SpecseekError::Authorization {
                identity: identity.to_string(),
                category,
            })
        }
    }

    /// Cache-or-store read of a category's index. Only `search` goes
    /// through here; mutations re-read the authoritative store copy
    /// under the write lock.
    fn cached_index(&self, category: SpectrumCategory) -> Result<Arc<SimilarityIndex>> {
        if let Some(index) = self.cache.get(category) {
            return Ok(index);
        }
        match self.store.get_index(category)? {
            Some(index) => {
                let index = Arc::new(index);
                self.cache.set(category, index.clone());
                Ok(index)
            }
            None => Err(NotFound::Index { category }.into()),
        }
    }

    /// Write-through: the store write and the cache refresh belong
    /// together, callers hold the category write lock across both.
    fn persist_index(&self, category: SpectrumCategory, index: SimilarityIndex) -> Result<()> {
        self.store.put_index(category, &index)?;
        self.cache.set(category, Arc::new(index));
        Ok(())
    }

    /// Identifies a spectrum against the reference library.
    ///
    /// Returns candidates ordered ascending by score (most similar
    /// first). A candidate that cannot be loaded or scored is excluded
    /// with a warning instead of failing the whole search.
    pub fn search(&self, input: SearchInput<'_>, comparator: Comparator) -> Result<Vec<SearchHit>> {
        let (category, intensities, dominant_peak) = match input {
            SearchInput::Raw {
                bytes,
                format,
                category,
            } => {
                let normalized = normalize(bytes, format, category)?;
                let features = extract_features(&normalized);
                (category, normalized.intensities, features.dominant_peak)
            }
            SearchInput::Stored(id) => {
                let record = self.store.get_spectrum(id)?;
                (record.category, record.intensities, record.dominant_peak)
            }
        };

        let fingerprints = self.fingerprints_of(&intensities);
        let index = self.cached_index(category)?;
        let candidates = index.query(&fingerprints, dominant_peak, self.config.max_candidates);
        debug!(
            "Query against {} shortlisted {} candidates",
            category,
            candidates.len()
        );

        let mut hits: Vec<SearchHit> = candidates
            .par_iter()
            .filter_map(|(id, _votes)| match self.store.get_spectrum(*id) {
                Ok(record) => match comparator.score(&intensities, &record.intensities) {
                    Ok(score) => Some(SearchHit {
                        id: *id,
                        name: record.name,
                        score,
                    }),
                    Err(e) => {
                        warn!("Excluding candidate {} from results: {:?}", id, e);
                        None
                    }
                },
                Err(e) => {
                    warn!(
                        "Candidate {} is indexed but unreadable ({:?}); \
                         the {} index likely needs a rebuild",
                        id, e, category
                    );
                    None
                }
            })
            .collect();
        hits.sort_by(|a, b| a.score.total_cmp(&b.score).then(a.id.cmp(&b.id)));
        Ok(hits)
    }

    /// Adds a reference spectrum: normalize, persist, index.
    ///
    /// `name`/`substance_class` override whatever metadata the file
    /// itself carried.
    pub fn add(
        &self,
        bytes: &[u8],
        format: Option<SpectrumFormat>,
        category: SpectrumCategory,
        name: Option<&str>,
        substance_class: Option<&str>,
        identity: &str,
    ) -> Result<SpectrumId> {
        self.authorize(identity, category)?;

        let mut normalized = normalize(bytes, format, category)?;
        if let Some(name) = name {
            normalized.name = name.to_string();
        }
        if let Some(class) = substance_class {
            normalized.substance_class = class.to_string();
        }
        let features = extract_features(&normalized);
        let fingerprints = self.fingerprints_of(&normalized.intensities);

        // The record and its index entry must land together: a stored
        // spectrum missing from the index is unfindable, so the store
        // write happens under the same lock and is rolled back if the
        // index write fails.
        let lock = self.category_lock(category);
        let _guard = acquire_write(&lock, category, &self.config)?;
        let id = self.store.put_spectrum(&normalized)?;
        let indexed = self.store.get_index(category).and_then(|existing| {
            let mut index = existing.unwrap_or_default();
            index.insert(id, &fingerprints, &features.peaks);
            self.persist_index(category, index)
        });
        if let Err(e) = indexed {
            warn!(
                "Index write for {} failed, rolling back spectrum {}",
                category, id
            );
            if let Err(rollback) = self.store.delete_spectrum(id) {
                warn!("Rollback of spectrum {} failed: {:?}", id, rollback);
            }
            return Err(e);
        }

        info!(
            "Added spectrum {} ({:?}) to the {} library",
            id, normalized.name, category
        );
        Ok(id)
    }

    /// Removes a spectrum from the index and then from the store.
    pub fn delete(&self, id: SpectrumId, identity: &str) -> Result<()> {
        let record = self.store.get_spectrum(id)?;
        let category = record.category;
        self.authorize(identity, category)?;
        let fingerprints = self.fingerprints_of(&record.intensities);

        let lock = self.category_lock(category);
        let _guard = acquire_write(&lock, category, &self.config)?;
        if let Some(mut index) = self.store.get_index(category)? {
            index.remove(id, &fingerprints);
            self.persist_index(category, index)?;
        }
        self.store.delete_spectrum(id)?;

        info!("Deleted spectrum {} from the {} library", id, category);
        Ok(())
    }

    /// Full index recompute from the durable store, for recovery after
    /// detected corruption. The fresh index is built without holding
    /// the write lock; only the swap is serialized.
    pub fn rebuild(&self, category: SpectrumCategory, identity: &str) -> Result<()> {
        self.authorize(identity, category)?;

        let spectra = self.store.list_spectra(category)?;
        info!(
            "Rebuilding the {} index from {} stored spectra",
            category,
            spectra.len()
        );
        let mut fresh = SimilarityIndex::new();
        for (id, record) in &spectra {
            let fingerprints = self.fingerprints_of(&record.intensities);
            fresh.insert(*id, &fingerprints, &record.peaks);
        }
        debug_assert!(fresh.verify(), "rebuild produced an inconsistent index");

        let lock = self.category_lock(category);
        let _guard = acquire_write(&lock, category, &self.config)?;
        self.persist_index(category, fresh)?;
        Ok(())
    }

    /// Loads a stored record, mostly for presentation layers.
    pub fn get(&self, id: SpectrumId) -> Result<NormalizedSpectrum> {
        self.store.get_spectrum(id)
    }
}
