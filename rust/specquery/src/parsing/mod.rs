pub mod jcamp;
pub mod legacy;

use crate::errors::ParseError;
use serde::{
    Deserialize,
    Serialize,
};

/// A parsed but not yet normalized trace: `(domain, signal)` pairs in
/// ascending domain order, plus whatever identification metadata the
/// file carried.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrace {
    pub points: Vec<(f64, f64)>,
    pub name: Option<String>,
    pub substance_class: Option<String>,
}

impl RawTrace {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self {
            points,
            name: None,
            substance_class: None,
        }
    }
}

/// On-disk encodings a spectrum file can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpectrumFormat {
    /// Textual tag/value exchange format (`##TAG=value`).
    #[serde(rename = "jcamp")]
    JcampDx,
    /// Legacy binary instrument dump: point count, first/last domain
    /// value, then single-precision signal values.
    #[serde(rename = "legacy")]
    LegacyBinary,
}

impl SpectrumFormat {
    /// Sniffs the format from the leading bytes. JCAMP files open with a
    /// `##` data label (possibly after whitespace); anything else is
    /// assumed to be the binary instrument dump.
    pub fn detect(raw: &[u8]) -> Result<Self, ParseError> {
        if raw.is_empty() {
            return Err(ParseError::UnknownFormat);
        }
        let head: Vec<u8> = raw
            .iter()
            .copied()
            .skip_while(|b| b.is_ascii_whitespace())
            .take(2)
            .collect();
        if head == b"##" {
            Ok(SpectrumFormat::JcampDx)
        } else {
            Ok(SpectrumFormat::LegacyBinary)
        }
    }
}

/// Parses raw bytes into a trace, auto-detecting the format unless the
/// caller declared one.
pub fn parse_trace(raw: &[u8], format: Option<SpectrumFormat>) -> Result<RawTrace, ParseError> {
    let format = match format {
        Some(f) => f,
        None => SpectrumFormat::detect(raw)?,
    };
    match format {
        SpectrumFormat::JcampDx => {
            let text = std::str::from_utf8(raw).map_err(|_| ParseError::UnknownFormat)?;
            jcamp::parse_jcamp(text)
        }
        SpectrumFormat::LegacyBinary => legacy::parse_legacy(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_jcamp() {
        assert_eq!(
            SpectrumFormat::detect(b"##TITLE=foo\n").unwrap(),
            SpectrumFormat::JcampDx
        );
        assert_eq!(
            SpectrumFormat::detect(b"\n  ##TITLE=foo\n").unwrap(),
            SpectrumFormat::JcampDx
        );
    }

    #[test]
    fn test_detect_binary() {
        let raw = [0u8, 1, 2, 3];
        assert_eq!(
            SpectrumFormat::detect(&raw).unwrap(),
            SpectrumFormat::LegacyBinary
        );
    }

    #[test]
    fn test_detect_empty_is_unknown() {
        assert_eq!(
            SpectrumFormat::detect(b"").unwrap_err(),
            ParseError::UnknownFormat
        );
    }
}
