use specquery::errors::{
    DataProcessingError,
    ParseError,
    SpecqueryError,
};
use specquery::models::{
    SpectrumCategory,
    SpectrumId,
};

#[derive(Debug)]
pub enum SpecseekError {
    /// Malformed or unsupported spectrum file. Non-retryable.
    Parse(ParseError),
    /// Comparator or index invariant violation.
    DataProcessing(DataProcessingError),
    /// Unknown spectrum id or a category with no index yet.
    NotFound(NotFound),
    /// Could not serialize writes to a category within the retry
    /// budget. Retryable by the caller with backoff.
    Concurrency {
        category: SpectrumCategory,
        retries: u32,
    },
    /// The authorization collaborator vetoed a mutation. Passed through
    /// unchanged, never computed here.
    Authorization {
        identity: String,
        category: SpectrumCategory,
    },
    /// Durable store or cache failure.
    Storage {
        msg: String,
    },
    Io {
        source: std::io::Error,
        path: Option<std::path::PathBuf>,
    },
}

#[derive(Debug)]
pub enum NotFound {
    Spectrum { id: SpectrumId },
    Index { category: SpectrumCategory },
}

impl std::fmt::Display for SpecseekError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, SpecseekError>;

impl From<ParseError> for SpecseekError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<DataProcessingError> for SpecseekError {
    fn from(e: DataProcessingError) -> Self {
        Self::DataProcessing(e)
    }
}

impl From<SpecqueryError> for SpecseekError {
    fn from(e: SpecqueryError) -> Self {
        match e {
            SpecqueryError::Parse(p) => Self::Parse(p),
            SpecqueryError::DataProcessing(d) => Self::DataProcessing(d),
            SpecqueryError::Other(msg) => Self::Storage { msg },
        }
    }
}

impl From<NotFound> for SpecseekError {
    fn from(e: NotFound) -> Self {
        Self::NotFound(e)
    }
}

impl From<rusqlite::Error> for SpecseekError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage { msg: e.to_string() }
    }
}

impl From<rmp_serde::encode::Error> for SpecseekError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Self::Storage { msg: e.to_string() }
    }
}

impl From<rmp_serde::decode::Error> for SpecseekError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Self::Storage { msg: e.to_string() }
    }
}

impl From<std::io::Error> for SpecseekError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            source: e,
            path: None,
        }
    }
}
