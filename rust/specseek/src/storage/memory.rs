use crate::errors::{
    NotFound,
    Result,
};
use crate::storage::{
    IndexCache,
    SpectrumStore,
};
use specquery::models::{
    NormalizedSpectrum,
    SimilarityIndex,
    SpectrumCategory,
    SpectrumId,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::sync::Arc;

/// In-memory durable-store stand-in. Used by tests and by the CLI's
/// dry-run mode; semantics match the SQLite store exactly.
#[derive(Debug, Default)]
pub struct MemoryStore {
    spectra: Mutex<HashMap<SpectrumId, NormalizedSpectrum>>,
    indices: Mutex<HashMap<SpectrumCategory, SimilarityIndex>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Self::default()
        }
    }
}

impl SpectrumStore for MemoryStore {
    fn get_spectrum(&self, id: SpectrumId) -> Result<NormalizedSpectrum> {
        self.spectra
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| NotFound::Spectrum { id }.into())
    }

    fn put_spectrum(&self, record: &NormalizedSpectrum) -> Result<SpectrumId> {
        let id = SpectrumId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.spectra.lock().unwrap().insert(id, record.clone());
        Ok(id)
    }

    fn delete_spectrum(&self, id: SpectrumId) -> Result<()> {
        match self.spectra.lock().unwrap().remove(&id) {
            Some(_) => Ok(()),
            None => Err(NotFound::Spectrum { id }.into()),
        }
    }

    fn list_spectra(
        &self,
        category: SpectrumCategory,
    ) -> Result<Vec<(SpectrumId, NormalizedSpectrum)>> {
        let mut out: Vec<(SpectrumId, NormalizedSpectrum)> = self
            .spectra
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| s.category == category)
            .map(|(id, s)| (*id, s.clone()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        Ok(out)
    }

    fn get_index(&self, category: SpectrumCategory) -> Result<Option<SimilarityIndex>> {
        Ok(self.indices.lock().unwrap().get(&category).cloned())
    }

    fn put_index(&self, category: SpectrumCategory, index: &SimilarityIndex) -> Result<()> {
        self.indices.lock().unwrap().insert(category, index.clone());
        Ok(())
    }
}

/// Process-local cache keyed by category.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<SpectrumCategory, Arc<SimilarityIndex>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexCache for MemoryCache {
    fn get(&self, category: SpectrumCategory) -> Option<Arc<SimilarityIndex>> {
        self.entries.lock().unwrap().get(&category).cloned()
    }

    fn set(&self, category: SpectrumCategory, index: Arc<SimilarityIndex>) {
        self.entries.lock().unwrap().insert(category, index);
    }

    fn invalidate(&self, category: SpectrumCategory) {
        self.entries.lock().unwrap().remove(&category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specquery::models::VECTOR_LEN;

    fn sample(category: SpectrumCategory) -> NormalizedSpectrum {
        NormalizedSpectrum {
            category,
            intensities: vec![1u16; VECTOR_LEN],
            dominant_peak: 1000.0,
            peaks: vec![1000.0],
            name: "sample".to_string(),
            substance_class: String::new(),
        }
    }

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();
        let id = store.put_spectrum(&sample(SpectrumCategory::Infrared)).unwrap();
        assert_eq!(store.get_spectrum(id).unwrap().name, "sample");
        store.delete_spectrum(id).unwrap();
        assert!(store.get_spectrum(id).is_err());
    }

    #[test]
    fn test_list_filters_by_category() {
        let store = MemoryStore::new();
        store.put_spectrum(&sample(SpectrumCategory::Infrared)).unwrap();
        store.put_spectrum(&sample(SpectrumCategory::Raman)).unwrap();
        store.put_spectrum(&sample(SpectrumCategory::Infrared)).unwrap();
        assert_eq!(store.list_spectra(SpectrumCategory::Infrared).unwrap().len(), 2);
        assert_eq!(store.list_spectra(SpectrumCategory::Raman).unwrap().len(), 1);
    }

    #[test]
    fn test_cache_set_get_invalidate() {
        let cache = MemoryCache::new();
        assert!(cache.get(SpectrumCategory::Raman).is_none());
        cache.set(
            SpectrumCategory::Raman,
            Arc::new(SimilarityIndex::new()),
        );
        assert!(cache.get(SpectrumCategory::Raman).is_some());
        cache.invalidate(SpectrumCategory::Raman);
        assert!(cache.get(SpectrumCategory::Raman).is_none());
    }
}
