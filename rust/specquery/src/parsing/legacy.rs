use crate::errors::ParseError;
use crate::parsing::RawTrace;

/// Header bytes: point count (u32), first and last domain value (f32).
const HEADER_LEN: usize = 4 + 4 + 4;

/// Parses the legacy binary instrument dump.
///
/// Layout is little-endian: a `u32` point count, the first and last
/// domain values as `f32`, then `count` single-precision signal values
/// sampled at a uniform step. A descending domain (last < first) is
/// reversed so the trace always comes out ascending.
pub fn parse_legacy(raw: &[u8]) -> Result<RawTrace, ParseError> {
    if raw.len() < HEADER_LEN {
        return Err(ParseError::TruncatedBinary {
            expected_bytes: HEADER_LEN,
            real_bytes: raw.len(),
        });
    }
    let npoints = u32::from_le_bytes(raw[0..4].try_into().unwrap()) as usize;
    let first_x = f32::from_le_bytes(raw[4..8].try_into().unwrap()) as f64;
    let last_x = f32::from_le_bytes(raw[8..12].try_into().unwrap()) as f64;

    if npoints < 2 {
        return Err(ParseError::DegenerateTrace { npoints });
    }
    let expected_bytes = HEADER_LEN + npoints * 4;
    if raw.len() < expected_bytes {
        return Err(ParseError::TruncatedBinary {
            expected_bytes,
            real_bytes: raw.len(),
        });
    }
    if !first_x.is_finite() || !last_x.is_finite() || first_x == last_x {
        return Err(ParseError::UnknownFormat);
    }

    let delta = (last_x - first_x) / (npoints - 1) as f64;
    let mut points: Vec<(f64, f64)> = raw[HEADER_LEN..expected_bytes]
        .chunks_exact(4)
        .enumerate()
        .map(|(i, chunk)| {
            let y = f32::from_le_bytes(chunk.try_into().unwrap()) as f64;
            (first_x + delta * i as f64, y)
        })
        .collect();
    if delta < 0.0 {
        points.reverse();
    }

    Ok(RawTrace::new(points))
}
