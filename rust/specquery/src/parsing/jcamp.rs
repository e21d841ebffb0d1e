use crate::errors::ParseError;
use crate::parsing::RawTrace;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

// Syntax notes, mostly inherited from the exchange-format reference:
//   ##  starts a data label, `=` ends the label and starts its value
//   $$  the rest of the line is a comment
//   ##$ a user-defined, nonstandard data label
//   a literal `=` at the end of a line continues onto the next line
const COMMENT: &str = "$$";

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[+-]?\d+(?:\.\d*)?(?:[eE][+-]?\d+)?").unwrap())
}

#[derive(Debug, PartialEq)]
enum DataEncoding {
    /// `(X++(Y..Y))`: one leading x per line, then signal values at a
    /// fixed step.
    FixedStep,
    /// `(XY..XY)`: explicit x,y pairs.
    ExplicitPairs,
}

fn parse_encoding(value: &str) -> Result<DataEncoding, ParseError> {
    match value.trim() {
        "(X++(Y..Y))" => Ok(DataEncoding::FixedStep),
        "(XY..XY)" => Ok(DataEncoding::ExplicitPairs),
        other => Err(ParseError::UnsupportedEncoding {
            found: other.to_string(),
        }),
    }
}

fn numbers_in(line: &str) -> Vec<f64> {
    number_re()
        .find_iter(line)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

fn required_tag(tags: &HashMap<String, String>, tag: &'static str) -> Result<f64, ParseError> {
    let value = tags.get(tag).ok_or(ParseError::MissingTag { tag })?;
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ParseError::MalformedNumber {
            line: 0,
            found: value.clone(),
        })
}

fn optional_tag(tags: &HashMap<String, String>, tag: &str) -> Option<f64> {
    tags.get(tag).and_then(|v| v.trim().parse::<f64>().ok())
}

/// Parses the textual spectral-exchange format into a trace.
///
/// Tag lines before the data marker are collected into a label map;
/// everything between `##XYDATA=` and `##END=` is walked in file order,
/// accumulating the running domain value by the declared delta and
/// scaling signal values by `YFACTOR`. A negative delta means the file
/// stores the trace descending, so the result is reversed to ascending.
pub fn parse_jcamp(text: &str) -> Result<RawTrace, ParseError> {
    // First pass: strip comments and glue continuation lines. A label
    // line ending in a bare `=` continues onto the next line, unless
    // that next line opens a new label itself (`##END=` is the usual
    // empty-valued case).
    let mut logical: Vec<String> = Vec::new();
    for raw_line in text.lines() {
        let cleaned = raw_line.split(COMMENT).next().unwrap_or("").trim_end();
        if cleaned.trim().is_empty() {
            continue;
        }
        let continues = logical
            .last()
            .map(|prev| prev.starts_with("##") && prev.ends_with('='))
            .unwrap_or(false);
        if continues && !cleaned.trim_start().starts_with("##") {
            let prev = logical.last_mut().unwrap();
            prev.pop();
            prev.push_str(cleaned.trim_start());
        } else {
            logical.push(cleaned.to_string());
        }
    }

    let mut tags: HashMap<String, String> = HashMap::new();
    let mut data_lines: Vec<String> = Vec::new();
    let mut encoding: Option<DataEncoding> = None;

    for line in logical {
        if let Some(label) = line.strip_prefix("##") {
            let (key, value) = match label.split_once('=') {
                Some((k, v)) => (k.trim().to_ascii_uppercase(), v.trim().to_string()),
                None => (label.trim().to_ascii_uppercase(), String::new()),
            };
            if key == "END" {
                break;
            }
            if key == "XYDATA" {
                encoding = Some(parse_encoding(&value)?);
                continue;
            }
            // User-defined `##$` labels ride along as ordinary tags.
            tags.insert(key.trim_start_matches('$').to_string(), value);
        } else if encoding.is_some() {
            data_lines.push(line);
        }
        // Stray text before the data marker is ignored, some archives
        // prepend free-form headers.
    }

    let encoding = encoding.ok_or(ParseError::MissingDataBlock)?;
    let x_factor = required_tag(&tags, "XFACTOR")?;
    let y_factor = required_tag(&tags, "YFACTOR")?;

    let mut points: Vec<(f64, f64)> = Vec::new();
    let delta = match encoding {
        DataEncoding::FixedStep => {
            let first_x = required_tag(&tags, "FIRSTX")?;
            let delta = match optional_tag(&tags, "DELTAX") {
                Some(d) => d,
                None => {
                    let last_x = required_tag(&tags, "LASTX")?;
                    let npoints = required_tag(&tags, "NPOINTS")?;
                    if npoints < 2.0 {
                        return Err(ParseError::DegenerateTrace {
                            npoints: npoints as usize,
                        });
                    }
                    (last_x - first_x) / (npoints - 1.0)
                }
            };
            for line in &data_lines {
                let values = numbers_in(line);
                let Some((x_start, ys)) = values.split_first() else {
                    continue;
                };
                let mut x = x_start * x_factor;
                for y in ys {
                    points.push((x, y * y_factor));
                    x += delta;
                }
            }
            delta
        }
        DataEncoding::ExplicitPairs => {
            for (lineno, line) in data_lines.iter().enumerate() {
                let values = numbers_in(line);
                if values.len() % 2 != 0 {
                    return Err(ParseError::MalformedNumber {
                        line: lineno + 1,
                        found: line.to_string(),
                    });
                }
                for pair in values.chunks_exact(2) {
                    points.push((pair[0] * x_factor, pair[1] * y_factor));
                }
            }
            1.0
        }
    };

    if points.is_empty() {
        return Err(ParseError::MissingDataBlock);
    }
    if delta < 0.0 {
        points.reverse();
    }

    Ok(RawTrace {
        points,
        name: tags.get("TITLE").cloned(),
        substance_class: tags.get("CLASS").cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fixed_step() -> String {
        [
            "##TITLE=Hexane $$ archival copy",
            "##JCAMP-DX=4.24",
            "##CLASS=alkane",
            "##XFACTOR=1.0",
            "##YFACTOR=0.5",
            "##FIRSTX=700.0",
            "##DELTAX=10.0",
            "##XYDATA=(X++(Y..Y))",
            "700.0 2.0 4.0 6.0",
            "730.0 8.0 10.0",
            "##END=",
        ]
        .join("\n")
    }

    #[test]
    fn test_fixed_step_reconstruction() {
        let trace = parse_jcamp(&sample_fixed_step()).unwrap();
        assert_eq!(trace.name.as_deref(), Some("Hexane"));
        assert_eq!(trace.substance_class.as_deref(), Some("alkane"));
        assert_eq!(
            trace.points,
            vec![
                (700.0, 1.0),
                (710.0, 2.0),
                (720.0, 3.0),
                (730.0, 4.0),
                (740.0, 5.0),
            ]
        );
    }

    #[test]
    fn test_delta_from_lastx_npoints() {
        let text = [
            "##XFACTOR=1.0",
            "##YFACTOR=1.0",
            "##FIRSTX=0.0",
            "##LASTX=4.0",
            "##NPOINTS=5",
            "##XYDATA=(X++(Y..Y))",
            "0.0 1.0 1.0 1.0 1.0 1.0",
            "##END=",
        ]
        .join("\n");
        let trace = parse_jcamp(&text).unwrap();
        assert_eq!(trace.points.len(), 5);
        assert_eq!(trace.points[4], (4.0, 1.0));
    }

    #[test]
    fn test_negative_delta_reverses() {
        let text = [
            "##XFACTOR=1.0",
            "##YFACTOR=1.0",
            "##FIRSTX=20.0",
            "##DELTAX=-10.0",
            "##XYDATA=(X++(Y..Y))",
            "20.0 3.0 2.0 1.0",
            "##END=",
        ]
        .join("\n");
        let trace = parse_jcamp(&text).unwrap();
        assert_eq!(trace.points, vec![(0.0, 1.0), (10.0, 2.0), (20.0, 3.0)]);
    }

    #[test]
    fn test_explicit_pairs() {
        let text = [
            "##XFACTOR=2.0",
            "##YFACTOR=1.0",
            "##XYDATA=(XY..XY)",
            "1.0, 5.0; 2.0, 6.0",
            "##END=",
        ]
        .join("\n");
        let trace = parse_jcamp(&text).unwrap();
        assert_eq!(trace.points, vec![(2.0, 5.0), (4.0, 6.0)]);
    }

    #[test]
    fn test_missing_required_tag() {
        let text = ["##YFACTOR=1.0", "##XYDATA=(X++(Y..Y))", "0.0 1.0 2.0"].join("\n");
        assert_eq!(
            parse_jcamp(&text).unwrap_err(),
            ParseError::MissingTag { tag: "XFACTOR" }
        );
    }

    #[test]
    fn test_missing_data_block() {
        let text = ["##TITLE=nothing here", "##XFACTOR=1.0"].join("\n");
        assert_eq!(parse_jcamp(&text).unwrap_err(), ParseError::MissingDataBlock);
    }

    #[test]
    fn test_unrecognized_encoding() {
        let text = ["##XFACTOR=1.0", "##YFACTOR=1.0", "##XYDATA=(PAC)"].join("\n");
        assert_eq!(
            parse_jcamp(&text).unwrap_err(),
            ParseError::UnsupportedEncoding {
                found: "(PAC)".to_string()
            }
        );
    }

    #[test]
    fn test_inline_comments_stripped() {
        let text = [
            "##XFACTOR=1.0 $$ unity",
            "##YFACTOR=1.0",
            "##FIRSTX=0.0",
            "##DELTAX=1.0",
            "##XYDATA=(X++(Y..Y))",
            "0.0 1.0 2.0 $$ trailing noise",
            "##END=",
        ]
        .join("\n");
        let trace = parse_jcamp(&text).unwrap();
        assert_eq!(trace.points, vec![(0.0, 1.0), (1.0, 2.0)]);
    }
}
