pub mod memory;
pub mod sqlite;

use crate::errors::Result;
use specquery::models::{
    NormalizedSpectrum,
    SimilarityIndex,
    SpectrumCategory,
    SpectrumId,
};
use std::sync::Arc;

pub use memory::{
    MemoryCache,
    MemoryStore,
};
pub use sqlite::SqliteStore;

/// The durable store collaborator.
///
/// The backing technology only matters for latency; correctness of the
/// engine depends solely on this contract. Ids are assigned by
/// `put_spectrum` and never reused. The index for a category is read
/// and written as a whole.
pub trait SpectrumStore: Send + Sync {
    fn get_spectrum(&self, id: SpectrumId) -> Result<NormalizedSpectrum>;
    fn put_spectrum(&self, record: &NormalizedSpectrum) -> Result<SpectrumId>;
    fn delete_spectrum(&self, id: SpectrumId) -> Result<()>;
    fn list_spectra(
        &self,
        category: SpectrumCategory,
    ) -> Result<Vec<(SpectrumId, NormalizedSpectrum)>>;
    fn get_index(&self, category: SpectrumCategory) -> Result<Option<SimilarityIndex>>;
    fn put_index(&self, category: SpectrumCategory, index: &SimilarityIndex) -> Result<()>;
}

/// The cache collaborator, used only to avoid re-reading a category's
/// index from the durable store. Never authoritative: a miss is always
/// answered by the store, and every index mutation writes through.
pub trait IndexCache: Send + Sync {
    fn get(&self, category: SpectrumCategory) -> Option<Arc<SimilarityIndex>>;
    fn set(&self, category: SpectrumCategory, index: Arc<SimilarityIndex>);
    fn invalidate(&self, category: SpectrumCategory);
}
