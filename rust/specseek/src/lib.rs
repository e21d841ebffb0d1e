//! Orchestration layer for spectral identification.
//!
//! [`specquery`] holds the pure algorithms (parsing, normalization,
//! fingerprints, scoring); this crate wires them to durable storage,
//! an index cache and an authorization policy behind the
//! [`engine::SearchEngine`] facade.

pub mod auth;
pub mod engine;
pub mod errors;
pub mod storage;

pub use auth::{
    AllowAll,
    Authorizer,
    DenyAll,
};
pub use engine::{
    EngineConfig,
    SearchEngine,
    SearchHit,
    SearchInput,
};
pub use errors::{
    NotFound,
    Result,
    SpecseekError,
};
pub use storage::{
    IndexCache,
    MemoryCache,
    MemoryStore,
    SpectrumStore,
    SqliteStore,
};
