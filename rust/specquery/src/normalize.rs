use crate::errors::{
    ParseError,
    SpecqueryError,
};
use crate::features::find_peaks;
use crate::models::spectrum::{
    INTENSITY_MAX,
    NormalizedSpectrum,
    SpectrumCategory,
    VECTOR_LEN,
};
use crate::parsing::{
    SpectrumFormat,
    parse_trace,
};

/// Numerically integrates a `(domain, signal)` trace into
/// [`VECTOR_LEN`] equal-width bins over the category window.
///
/// Trapezoidal rule: every sample pair contributes to the bin(s) it
/// spans, with linear interpolation at bin boundaries and at the lower
/// edge of the window (the signal value there is interpolated from the
/// two samples straddling it). Samples outside the window are skipped.
pub fn integrate_trace(points: &[(f64, f64)], category: SpectrumCategory) -> Vec<f64> {
    let (lo, hi) = category.domain_window();
    let interval = (hi - lo) / VECTOR_LEN as f64;
    let mut bins = vec![0.0; VECTOR_LEN];

    let start = points.partition_point(|p| p.0 < lo);
    if start >= points.len() {
        tracing::warn!(
            "Trace ends at {:?} before the {} integration window {:?}",
            points.last().map(|p| p.0),
            category,
            (lo, hi)
        );
        return bins;
    }
    let (mut old_x, mut old_y) = if start == 0 {
        points[0]
    } else {
        let (x0, y0) = points[start - 1];
        let (x1, y1) = points[start];
        (lo, y0 + (y1 - y0) * (lo - x0) / (x1 - x0))
    };

    for &(x, y) in &points[start..] {
        if x <= old_x {
            // Duplicate or regressing sample, nothing to integrate.
            old_x = x.max(old_x);
            old_y = y;
            continue;
        }
        let old_index = ((old_x - lo) / interval) as usize;
        let new_index = ((x - lo) / interval) as usize;
        if new_index != old_index {
            // The segment crosses a bin boundary, split it there.
            let boundary_x = lo + new_index as f64 * interval;
            let boundary_y = old_y + (y - old_y) * (boundary_x - old_x) / (x - old_x);
            if old_index < VECTOR_LEN {
                bins[old_index] += (boundary_y + old_y) * (boundary_x - old_x) / 2.0;
            }
            if new_index < VECTOR_LEN {
                bins[new_index] += (boundary_y + y) * (x - boundary_x) / 2.0;
            }
        } else if new_index < VECTOR_LEN {
            bins[new_index] += (y + old_y) * (x - old_x) / 2.0;
        }
        if x > hi {
            break;
        }
        old_x = x;
        old_y = y;
    }

    bins
}

/// Quantizes integrated bin energies to the fixed `0..=INTENSITY_MAX`
/// range by scaling against the vector maximum. This is what makes
/// vectors from different instruments directly comparable.
pub fn quantize(bins: &[f64]) -> Result<Vec<u16>, ParseError> {
    let max = bins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 0.0) {
        return Err(ParseError::EmptySignal);
    }
    Ok(bins
        .iter()
        .map(|v| {
            let scaled = (v / max) * INTENSITY_MAX as f64;
            scaled.round().clamp(0.0, INTENSITY_MAX as f64) as u16
        })
        .collect())
}

/// Full normalization pipeline: raw bytes to a [`NormalizedSpectrum`].
///
/// Pure function of the input, no side effects.
pub fn normalize(
    raw: &[u8],
    format: Option<SpectrumFormat>,
    category: SpectrumCategory,
) -> Result<NormalizedSpectrum, SpecqueryError> {
    let trace = parse_trace(raw, format)?;
    let bins = integrate_trace(&trace.points, category);
    let intensities = quantize(&bins)?;
    let (peaks, dominant_peak) = find_peaks(&intensities, category);

    Ok(NormalizedSpectrum {
        category,
        intensities,
        dominant_peak,
        peaks,
        name: trace.name.unwrap_or_default(),
        substance_class: trace.substance_class.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_trace(category: SpectrumCategory, f: impl Fn(f64) -> f64) -> Vec<(f64, f64)> {
        let (lo, hi) = category.domain_window();
        // Oversample well past both window edges.
        let step = (hi - lo) / 4096.0;
        let mut points = Vec::new();
        let mut x = lo - 50.0;
        while x < hi + 50.0 {
            points.push((x, f(x)));
            x += step;
        }
        points
    }

    #[test]
    fn test_flat_signal_integrates_evenly() {
        let category = SpectrumCategory::Infrared;
        let points = dense_trace(category, |_| 2.0);
        let bins = integrate_trace(&points, category);
        let (lo, hi) = category.domain_window();
        let expected = 2.0 * (hi - lo) / VECTOR_LEN as f64;
        for (i, bin) in bins.iter().enumerate() {
            assert!(
                (bin - expected).abs() < expected * 0.02,
                "bin {} = {}, expected ~{}",
                i,
                bin,
                expected
            );
        }
    }

    #[test]
    fn test_ramp_matches_analytic_integral() {
        let category = SpectrumCategory::Raman;
        let points = dense_trace(category, |x| x);
        let bins = integrate_trace(&points, category);
        let (lo, hi) = category.domain_window();
        let interval = (hi - lo) / VECTOR_LEN as f64;
        // Integral of x over [a, b] is (b^2 - a^2) / 2; check a
        // contiguous range of bins against it.
        for range in [(0, 64), (100, 350), (400, VECTOR_LEN)] {
            let a = lo + range.0 as f64 * interval;
            let b = lo + range.1 as f64 * interval;
            let analytic = (b * b - a * a) / 2.0;
            let numeric: f64 = bins[range.0..range.1].iter().sum();
            assert!(
                (numeric - analytic).abs() < analytic.abs() * 0.01,
                "range {:?}: numeric {} vs analytic {}",
                range,
                numeric,
                analytic
            );
        }
    }

    #[test]
    fn test_quantize_scales_to_max() {
        let bins = vec![0.0, 1.0, 2.0, 4.0];
        let q = quantize(&bins).unwrap();
        assert_eq!(q, vec![0, 16384, 32768, 65535]);
    }

    #[test]
    fn test_quantize_rejects_zero_signal() {
        assert_eq!(
            quantize(&[0.0, 0.0]).unwrap_err(),
            ParseError::EmptySignal
        );
        assert_eq!(
            quantize(&[-1.0, -2.0]).unwrap_err(),
            ParseError::EmptySignal
        );
    }

    #[test]
    fn test_normalize_from_jcamp_text() {
        let category = SpectrumCategory::Infrared;
        let points = dense_trace(category, |x| {
            // One clean gaussian-ish hump centered at 1500.
            let d: f64 = (x - 1500.0) / 40.0;
            (-d * d).exp()
        });
        let mut body = String::new();
        body.push_str("##TITLE=Synthetic hump\n");
        body.push_str("##XFACTOR=1.0\n##YFACTOR=1.0\n");
        body.push_str(&format!("##FIRSTX={}\n", points[0].0));
        body.push_str(&format!(
            "##DELTAX={}\n",
            points[1].0 - points[0].0
        ));
        body.push_str("##XYDATA=(X++(Y..Y))\n");
        for chunk in points.chunks(8) {
            body.push_str(&format!("{}", chunk[0].0));
            for (_, y) in chunk {
                body.push_str(&format!(" {}", y));
            }
            body.push('\n');
        }
        body.push_str("##END=\n");

        let spectrum = normalize(body.as_bytes(), None, category).unwrap();
        assert_eq!(spectrum.intensities.len(), VECTOR_LEN);
        assert_eq!(spectrum.name, "Synthetic hump");
        assert!((spectrum.dominant_peak - 1500.0).abs() < 10.0);
        assert_eq!(
            *spectrum.intensities.iter().max().unwrap(),
            INTENSITY_MAX
        );
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = {
            let mut out = Vec::new();
            out.extend(512u32.to_le_bytes());
            out.extend(700.0f32.to_le_bytes());
            out.extend(3900.0f32.to_le_bytes());
            for i in 0..512u32 {
                out.extend(((i % 37) as f32).to_le_bytes());
            }
            out
        };
        let a = normalize(&raw, None, SpectrumCategory::Infrared).unwrap();
        let b = normalize(&raw, None, SpectrumCategory::Infrared).unwrap();
        assert_eq!(a, b);
    }
}
