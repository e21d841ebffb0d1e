use crate::errors::{
    DataProcessingError,
    ParseError,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::str::FromStr;

/// Closed set of pairwise scoring strategies.
///
/// Algorithm names arriving from the outside ("bove", "leastsquares")
/// are validated here at the boundary; the core never dispatches on a
/// free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "bove")]
    Bove,
    #[serde(rename = "leastsquares")]
    LeastSquares,
}

impl Comparator {
    pub fn score(&self, a: &[u16], b: &[u16]) -> Result<f64, DataProcessingError> {
        match self {
            Comparator::Bove => bove_score(a, b),
            Comparator::LeastSquares => least_squares_score(a, b),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Bove => "bove",
            Comparator::LeastSquares => "leastsquares",
        }
    }
}

impl FromStr for Comparator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bove" => Ok(Comparator::Bove),
            "leastsquares" => Ok(Comparator::LeastSquares),
            _ => Err(ParseError::UnknownComparator {
                found: s.to_string(),
            }),
        }
    }
}

fn check_nonempty(a: &[u16], b: &[u16]) -> Result<(), DataProcessingError> {
    if a.is_empty() || b.is_empty() {
        return Err(DataProcessingError::ExpectedNonEmptyData {
            context: Some("comparator operand".to_string()),
        });
    }
    Ok(())
}

/// Bove's algorithm: the maximum absolute difference between
/// corresponding elements (L-infinity). Robust to a single localized
/// discrepancy, blind to many small ones. Lower is more similar.
///
/// Only the overlapping prefix `min(len(a), len(b))` is compared.
pub fn bove_score(a: &[u16], b: &[u16]) -> Result<f64, DataProcessingError> {
    check_nonempty(a, b)?;
    let max_diff = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as i32 - *y as i32).unsigned_abs())
        .max()
        .unwrap_or(0);
    Ok(max_diff as f64)
}

/// Sum of squared differences between corresponding elements (L2
/// squared). Lower is more similar.
pub fn least_squares_score(a: &[u16], b: &[u16]) -> Result<f64, DataProcessingError> {
    check_nonempty(a, b)?;
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum();
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_score_is_zero() {
        let a = vec![1u16, 500, 65535, 0, 42];
        assert_eq!(bove_score(&a, &a).unwrap(), 0.0);
        assert_eq!(least_squares_score(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_bove_symmetric_nonnegative() {
        let a = vec![10u16, 20, 30];
        let b = vec![5u16, 45, 31];
        let ab = bove_score(&a, &b).unwrap();
        let ba = bove_score(&b, &a).unwrap();
        assert_eq!(ab, ba);
        assert!(ab >= 0.0);
        assert_eq!(ab, 25.0);
    }

    #[test]
    fn test_least_squares_uses_both_vectors() {
        let a = vec![1u16, 2, 3];
        let b = vec![2u16, 4, 6];
        assert_eq!(least_squares_score(&a, &b).unwrap(), 1.0 + 4.0 + 9.0);
    }

    #[test]
    fn test_overlapping_prefix_only() {
        let a = vec![10u16, 20];
        let b = vec![10u16, 20, 9999];
        assert_eq!(bove_score(&a, &b).unwrap(), 0.0);
        assert_eq!(least_squares_score(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_operand_is_error() {
        let a = vec![1u16];
        assert!(bove_score(&a, &[]).is_err());
        assert!(least_squares_score(&[], &a).is_err());
    }

    #[test]
    fn test_comparator_lookup() {
        assert_eq!("bove".parse::<Comparator>().unwrap(), Comparator::Bove);
        assert_eq!(
            "LeastSquares".parse::<Comparator>().unwrap(),
            Comparator::LeastSquares
        );
        assert!("euclid".parse::<Comparator>().is_err());
    }
}
