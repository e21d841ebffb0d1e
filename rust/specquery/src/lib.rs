//! Core of the spectral similarity search: normalization of raw
//! spectrum files into fixed-length quantized vectors, heavyside
//! fingerprint + peak feature extraction, the per-category voting
//! index, and the exact pairwise comparators used to rank candidates.
//!
//! Everything in this crate is pure and I/O free; storage, caching and
//! orchestration live in `specseek`.

// Declare modules
pub mod compare;
pub mod errors;
pub mod features;
pub mod models;
pub mod normalize;
pub mod parsing;

// Re-export main structures
pub use crate::compare::Comparator;
pub use crate::features::{
    Fingerprint,
    SpectrumFeatures,
    extract_features,
    fuzzy_fingerprints,
    heavyside_fingerprint,
};
pub use crate::models::{
    NormalizedSpectrum,
    SimilarityIndex,
    SpectrumCategory,
    SpectrumId,
};
pub use crate::normalize::normalize;
pub use crate::parsing::SpectrumFormat;

// Re-export errors
pub use crate::errors::{
    DataProcessingError,
    ParseError,
    SpecqueryError,
};
