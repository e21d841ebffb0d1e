use std::fmt::Display;

#[derive(Debug)]
pub enum SpecqueryError {
    Parse(ParseError),
    DataProcessing(DataProcessingError),
    Other(String),
}

impl Display for SpecqueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl SpecqueryError {
    pub fn custom(msg: impl Display) -> Self {
        Self::Other(msg.to_string())
    }
}

/// Errors raised while turning raw spectrum bytes into a normalized record.
///
/// All of these are caller-visible and non-retryable, the input file has
/// to change for the outcome to change.
#[derive(Debug, PartialEq)]
pub enum ParseError {
    MissingTag {
        tag: &'static str,
    },
    MissingDataBlock,
    UnsupportedEncoding {
        found: String,
    },
    MalformedNumber {
        line: usize,
        found: String,
    },
    TruncatedBinary {
        expected_bytes: usize,
        real_bytes: usize,
    },
    /// The binary header declared fewer than two points.
    DegenerateTrace {
        npoints: usize,
    },
    UnknownFormat,
    UnknownCategory {
        found: String,
    },
    UnknownComparator {
        found: String,
    },
    EmptySignal,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, PartialEq)]
pub enum DataProcessingError {
    ExpectedNonEmptyData {
        context: Option<String>,
    },
    ExpectedVectorLength {
        real: usize,
        expected: usize,
    },
    /// The index no longer agrees with what the durable store holds.
    /// Recovery is a `rebuild`, not a retry.
    IndexOutOfSync {
        context: String,
    },
}

impl Display for DataProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<ParseError> for SpecqueryError {
    fn from(e: ParseError) -> Self {
        SpecqueryError::Parse(e)
    }
}

impl From<DataProcessingError> for SpecqueryError {
    fn from(e: DataProcessingError) -> Self {
        SpecqueryError::DataProcessing(e)
    }
}
