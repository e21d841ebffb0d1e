use crate::models::spectrum::{
    NormalizedSpectrum,
    SpectrumCategory,
};
use arrayvec::ArrayVec;

/// Width of the heavyside fingerprint in bits.
pub const FINGERPRINT_BITS: u32 = 8;

/// Peaks must reach this fraction of the global maximum to be kept.
const PEAK_THRESHOLD: f64 = 0.95;

/// Minimum domain separation between two kept peaks.
const PEAK_SEPARATION: f64 = 1.0;

/// Relative left/right imbalance below which the fuzzy variant explores
/// both branches of a heavyside split.
const FUZZY_TOLERANCE: f64 = 0.03;

/// Fuzzy mode can at most double per round, which bounds the candidate
/// set at 2^FINGERPRINT_BITS; in practice a handful of branches fire.
pub const MAX_FUZZY_KEYS: usize = 1 << FINGERPRINT_BITS;

/// The multi-scale bucketing key derived from an intensity vector.
///
/// Deliberately collapses many distinct vectors onto the same value; it
/// shortlists spectra, it does not identify them.
pub type Fingerprint = u8;

/// Everything the similarity index wants to know about one spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFeatures {
    pub fingerprint: Fingerprint,
    pub peaks: Vec<f64>,
    pub dominant_peak: f64,
}

/// Extracts the fingerprint, peak list and dominant peak from a
/// normalized vector. Deterministic, pure function of the input.
pub fn extract_features(spectrum: &NormalizedSpectrum) -> SpectrumFeatures {
    let (peaks, dominant_peak) = find_peaks(&spectrum.intensities, spectrum.category);
    SpectrumFeatures {
        fingerprint: heavyside_fingerprint(&spectrum.intensities),
        peaks,
        dominant_peak,
    }
}

fn window_sums(intensities: &[u16], start: usize, width: usize) -> (u64, u64) {
    let half = width / 2;
    let left: u64 = intensities[start..start + half]
        .iter()
        .map(|v| *v as u64)
        .sum();
    let right: u64 = intensities[start + half..start + width]
        .iter()
        .map(|v| *v as u64)
        .sum();
    (left, right)
}

/// Advances the walk: slide forward by one window width, or reset to
/// the start at half the width once the right edge hits the end.
fn next_window(len: usize, start: usize, width: usize) -> (usize, usize) {
    if start + width >= len {
        (0, width / 2)
    } else {
        (start + width, width)
    }
}

/// The heavyside index: 8 rounds of "is the energy on the right?", one
/// bit per round, MSB first, over windows that shrink from the whole
/// vector down through finer resolutions.
///
/// The length must be a power of two (normalized vectors are always
/// [`crate::models::VECTOR_LEN`]) so the window walk splits cleanly;
/// other lengths would run a window past the end of the slice.
pub fn heavyside_fingerprint(intensities: &[u16]) -> Fingerprint {
    let len = intensities.len();
    debug_assert!(
        len.is_power_of_two(),
        "fingerprint input length {} is not a power of two",
        len
    );
    let mut start = 0usize;
    let mut width = len;
    let mut out: Fingerprint = 0;
    for _ in 0..FINGERPRINT_BITS {
        let (left, right) = window_sums(intensities, start, width);
        out <<= 1;
        if right >= left {
            out |= 1;
        }
        (start, width) = next_window(len, start, width);
    }
    out
}

/// Fuzzy variant: wherever the left/right sums of a round are within
/// [`FUZZY_TOLERANCE`] of each other, both bit values are explored, so a
/// spectrum sitting on a split boundary hashes into every bucket it
/// could plausibly land in. Returns a sorted, deduplicated set that
/// always contains the strict fingerprint. Same power-of-two length
/// requirement as [`heavyside_fingerprint`].
pub fn fuzzy_fingerprints(intensities: &[u16]) -> ArrayVec<Fingerprint, MAX_FUZZY_KEYS> {
    fn walk(
        intensities: &[u16],
        start: usize,
        width: usize,
        round: u32,
        acc_bits: Fingerprint,
        out: &mut ArrayVec<Fingerprint, MAX_FUZZY_KEYS>,
    ) {
        if round == FINGERPRINT_BITS {
            if !out.contains(&acc_bits) {
                out.push(acc_bits);
            }
            return;
        }
        let (left, right) = window_sums(intensities, start, width);
        let total = left + right;
        let near_tie =
            total > 0 && (left as i128 - right as i128).unsigned_abs() as f64 <= FUZZY_TOLERANCE * total as f64;
        let (next_start, next_width) = next_window(intensities.len(), start, width);
        let strict_bit = u8::from(right >= left);
        walk(
            intensities,
            next_start,
            next_width,
            round + 1,
            (acc_bits << 1) | strict_bit,
            out,
        );
        if near_tie {
            walk(
                intensities,
                next_start,
                next_width,
                round + 1,
                (acc_bits << 1) | (1 - strict_bit),
                out,
            );
        }
    }

    debug_assert!(
        intensities.len().is_power_of_two(),
        "fingerprint input length {} is not a power of two",
        intensities.len()
    );
    let mut out = ArrayVec::new();
    walk(intensities, 0, intensities.len(), 0, 0, &mut out);
    out.sort_unstable();
    out
}

/// Peak extraction over the quantized vector.
///
/// Samples are walked in descending intensity order; each one within
/// [`PEAK_THRESHOLD`] of the maximum is kept unless it sits within
/// [`PEAK_SEPARATION`] domain units of an already-kept peak
/// (first-found wins). The walk stops at the first sample below the
/// threshold. Also returns the dominant peak, the domain position of
/// the single highest bin.
pub fn find_peaks(intensities: &[u16], category: SpectrumCategory) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..intensities.len()).collect();
    // Stable by construction: ties keep ascending bin order.
    order.sort_by(|a, b| intensities[*b].cmp(&intensities[*a]));

    let max = match order.first() {
        Some(i) => intensities[*i] as f64,
        None => return (Vec::new(), f64::NAN),
    };
    let dominant_peak = NormalizedSpectrum::bin_center(category, order[0]);
    let threshold = max * PEAK_THRESHOLD;

    let mut peaks: Vec<f64> = Vec::new();
    for i in order {
        if (intensities[i] as f64) < threshold {
            break;
        }
        let position = NormalizedSpectrum::bin_center(category, i);
        if peaks
            .iter()
            .all(|kept| (kept - position).abs() > PEAK_SEPARATION)
        {
            peaks.push(position);
        }
    }
    (peaks, dominant_peak)
}
