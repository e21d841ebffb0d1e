use crate::errors::ParseError;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt::Display;
use std::str::FromStr;

/// Number of bins in every normalized intensity vector.
///
/// Kept as a power of two so the heavyside window walk always splits
/// cleanly.
pub const VECTOR_LEN: usize = 512;

/// Upper bound of the quantized intensity range.
pub const INTENSITY_MAX: u16 = u16::MAX;

/// Instrument type of a spectrum.
///
/// The category decides the domain window used during integration and
/// partitions the similarity index, spectra of different categories are
/// never compared to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectrumCategory {
    #[serde(rename = "infrared")]
    Infrared,
    #[serde(rename = "raman")]
    Raman,
}

impl SpectrumCategory {
    /// Integration window in domain units (wavenumbers for both
    /// supported instrument types).
    pub fn domain_window(&self) -> (f64, f64) {
        match self {
            SpectrumCategory::Infrared => (700.0, 3900.0),
            SpectrumCategory::Raman => (300.0, 2000.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpectrumCategory::Infrared => "infrared",
            SpectrumCategory::Raman => "raman",
        }
    }
}

impl FromStr for SpectrumCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "infrared" => Ok(SpectrumCategory::Infrared),
            "raman" => Ok(SpectrumCategory::Raman),
            _ => Err(ParseError::UnknownCategory {
                found: s.to_string(),
            }),
        }
    }
}

impl Display for SpectrumCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a spectrum in the durable store.
///
/// Assigned by the store on creation and immutable afterwards; changing
/// the intensities of a stored spectrum means delete + reinsert.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SpectrumId(pub u64);

impl nohash_hasher::IsEnabled for SpectrumId {}

impl Display for SpectrumId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One parsed, normalized measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSpectrum {
    pub category: SpectrumCategory,
    /// Exactly [`VECTOR_LEN`] quantized values, each the numerically
    /// integrated signal energy of one equal-width bin over the category
    /// window, scaled so the maximum bin is [`INTENSITY_MAX`].
    pub intensities: Vec<u16>,
    /// Domain position of the single highest-intensity bin.
    pub dominant_peak: f64,
    /// Domain positions of peaks within 95% of the global maximum,
    /// near-duplicates (within one domain unit) suppressed.
    pub peaks: Vec<f64>,
    pub name: String,
    pub substance_class: String,
}

impl NormalizedSpectrum {
    /// Domain position of the center of bin `i`.
    pub fn bin_center(category: SpectrumCategory, i: usize) -> f64 {
        let (lo, hi) = category.domain_window();
        let interval = (hi - lo) / VECTOR_LEN as f64;
        lo + (i as f64 + 0.5) * interval
    }
}
