pub mod index;
pub mod spectrum;

pub use index::{
    PeakEntry,
    SimilarityIndex,
};
pub use spectrum::{
    INTENSITY_MAX,
    NormalizedSpectrum,
    SpectrumCategory,
    SpectrumId,
    VECTOR_LEN,
};
