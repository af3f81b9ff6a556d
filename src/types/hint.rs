//! RFC 2579 DISPLAY-HINT formatting for OCTET STRING and INTEGER values.
//!
//! [`OctetHint`] is a parsed hint specification with two directions: `render`
//! turns raw bytes into the pretty form, and `parse_pretty` is its strict
//! inverse. The inverse never guesses: pretty input that does not match the
//! hint is an error, because an accepted SET value must re-encode to the
//! exact bytes the caller meant.

use crate::error::ValidationErrorKind;
use std::fmt::Write;

/// One format specification: `[*]<length><format>[separator][terminator]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OctetSpec {
    /// First data byte is the repeat count for this spec.
    star: bool,
    /// Octets consumed per application.
    take: usize,
    /// `d`, `x`, `o`, `a` or `t`.
    fmt: u8,
    sep: Option<char>,
    /// Emitted after a repeat group; only valid with `star`.
    term: Option<char>,
}

/// A parsed OCTET STRING DISPLAY-HINT.
///
/// The last specification repeats until all data is exhausted (implicit
/// repetition rule); trailing separators are suppressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctetHint {
    specs: Vec<OctetSpec>,
}

impl OctetHint {
    /// Parse a hint specification such as `"1x:"` or `"2d-1d-1d,1d:1d:1d.1d"`.
    pub fn parse(hint: &str) -> Result<Self, ValidationErrorKind> {
        let bytes = hint.as_bytes();
        if bytes.is_empty() {
            return Err(ValidationErrorKind::MalformedHint);
        }

        let mut specs = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let star = bytes[pos] == b'*';
            if star {
                pos += 1;
            }

            let mut take = 0usize;
            let digits_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                take = take * 10 + (bytes[pos] - b'0') as usize;
                pos += 1;
            }
            if pos == digits_start || take == 0 {
                return Err(ValidationErrorKind::MalformedHint);
            }

            let fmt = match bytes.get(pos) {
                Some(&c @ (b'd' | b'x' | b'o' | b'a' | b't')) => c,
                _ => return Err(ValidationErrorKind::MalformedHint),
            };
            pos += 1;

            let mut sep = None;
            if pos < bytes.len() && !bytes[pos].is_ascii_digit() && bytes[pos] != b'*' {
                sep = Some(bytes[pos] as char);
                pos += 1;
            }

            let mut term = None;
            if star && pos < bytes.len() && !bytes[pos].is_ascii_digit() && bytes[pos] != b'*' {
                term = Some(bytes[pos] as char);
                pos += 1;
            }

            specs.push(OctetSpec {
                star,
                take,
                fmt,
                sep,
                term,
            });
        }

        Ok(Self { specs })
    }

    /// Render raw bytes through the hint.
    pub fn render(&self, data: &[u8]) -> String {
        let mut out = String::with_capacity(data.len() * 4);
        let mut data_pos = 0;
        let mut spec_idx = 0;

        while data_pos < data.len() {
            let spec = self.specs[spec_idx.min(self.specs.len() - 1)];
            if spec_idx < self.specs.len() {
                spec_idx += 1;
            }

            let repeat = if spec.star {
                let count = data[data_pos] as usize;
                data_pos += 1;
                count
            } else {
                1
            };

            for r in 0..repeat {
                if data_pos >= data.len() {
                    break;
                }
                let end = (data_pos + spec.take).min(data.len());
                let chunk = &data[data_pos..end];

                match spec.fmt {
                    b'd' => {
                        let val = chunk.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
                        let _ = write!(out, "{}", val);
                    }
                    b'o' => {
                        let val = chunk.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
                        let _ = write!(out, "{:o}", val);
                    }
                    b'x' => {
                        for &b in chunk {
                            let _ = write!(out, "{:02x}", b);
                        }
                    }
                    // a and t write bytes directly
                    _ => {
                        for &b in chunk {
                            out.push(b as char);
                        }
                    }
                }
                data_pos = end;

                // Separator suppressed at end of data and before a terminator
                let more = data_pos < data.len();
                if let Some(sep) = spec.sep {
                    if more && !(spec.term.is_some() && r + 1 == repeat) {
                        out.push(sep);
                    }
                }
            }

            if let Some(term) = spec.term {
                if data_pos < data.len() {
                    out.push(term);
                }
            }
        }

        out
    }

    /// Parse a pretty string back into the raw bytes it renders from.
    ///
    /// Strict inverse of [`render`](Self::render): any mismatch with the hint
    /// is an error. Numeric fields re-encode into exactly their declared
    /// width, so round trips hold for data that divides evenly into the
    /// hint's chunks.
    pub fn parse_pretty(&self, text: &str) -> Result<Vec<u8>, ValidationErrorKind> {
        let bytes = text.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut pos = 0;
        let mut spec_idx = 0;

        while pos < bytes.len() {
            let spec = self.specs[spec_idx.min(self.specs.len() - 1)];
            if spec_idx < self.specs.len() {
                spec_idx += 1;
            }

            if spec.star {
                let count_pos = out.len();
                out.push(0);
                let mut count = 0usize;
                while pos < bytes.len() {
                    parse_chunk(spec, bytes, &mut pos, &mut out)?;
                    count += 1;
                    match bytes.get(pos).map(|&b| b as char) {
                        Some(c) if Some(c) == spec.term => {
                            pos += 1;
                            break;
                        }
                        Some(c) if Some(c) == spec.sep => {
                            pos += 1;
                        }
                        _ => break,
                    }
                }
                if count > 255 {
                    return Err(ValidationErrorKind::HintMismatch {
                        detail: "repeat count exceeds 255".into(),
                    });
                }
                out[count_pos] = count as u8;
            } else {
                parse_chunk(spec, bytes, &mut pos, &mut out)?;
                if pos < bytes.len() {
                    if let Some(sep) = spec.sep {
                        if bytes[pos] as char == sep {
                            pos += 1;
                        } else {
                            return Err(ValidationErrorKind::HintMismatch {
                                detail: format!(
                                    "expected separator {:?} at offset {}",
                                    sep, pos
                                )
                                .into(),
                            });
                        }
                    }
                }
            }
        }

        Ok(out)
    }
}

fn parse_chunk(
    spec: OctetSpec,
    bytes: &[u8],
    pos: &mut usize,
    out: &mut Vec<u8>,
) -> Result<(), ValidationErrorKind> {
    match spec.fmt {
        b'd' | b'o' => {
            let radix = if spec.fmt == b'd' { 10 } else { 8 };
            let start = *pos;
            while *pos < bytes.len() && (bytes[*pos] as char).is_digit(radix) {
                *pos += 1;
            }
            if *pos == start {
                return Err(ValidationErrorKind::HintMismatch {
                    detail: format!("expected digits at offset {}", start).into(),
                });
            }
            if spec.take > 8 {
                return Err(ValidationErrorKind::HintMismatch {
                    detail: "numeric field wider than 8 octets".into(),
                });
            }
            let text = std::str::from_utf8(&bytes[start..*pos]).map_err(|_| {
                ValidationErrorKind::HintMismatch {
                    detail: "non-ASCII digits".into(),
                }
            })?;
            let value = u64::from_str_radix(text, radix).map_err(|_| {
                ValidationErrorKind::HintMismatch {
                    detail: format!("number {:?} overflows", text).into(),
                }
            })?;
            if spec.take < 8 && value >= 1u64 << (8 * spec.take) {
                return Err(ValidationErrorKind::HintMismatch {
                    detail: format!("{} does not fit in {} octets", value, spec.take).into(),
                });
            }
            out.extend_from_slice(&value.to_be_bytes()[8 - spec.take..]);
        }
        b'x' => {
            let start = *pos;
            let limit = (*pos + spec.take * 2).min(bytes.len());
            while *pos < limit && bytes[*pos].is_ascii_hexdigit() {
                *pos += 1;
            }
            let run = *pos - start;
            if run == 0 || run % 2 != 0 {
                return Err(ValidationErrorKind::HintMismatch {
                    detail: format!("expected hex octets at offset {}", start).into(),
                });
            }
            for pair in bytes[start..*pos].chunks(2) {
                let text = std::str::from_utf8(pair).map_err(|_| {
                    ValidationErrorKind::HintMismatch {
                        detail: "non-ASCII hex".into(),
                    }
                })?;
                let byte = u8::from_str_radix(text, 16).map_err(|_| {
                    ValidationErrorKind::HintMismatch {
                        detail: "invalid hex pair".into(),
                    }
                })?;
                out.push(byte);
            }
        }
        // a and t copy bytes as-is
        _ => {
            let end = (*pos + spec.take).min(bytes.len());
            out.extend_from_slice(&bytes[*pos..end]);
            *pos = end;
        }
    }
    Ok(())
}

/// Render bytes through a hint, falling back to lowercase hex on any
/// malformed hint or empty input.
pub fn apply(hint: &str, data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }
    match OctetHint::parse(hint) {
        Ok(parsed) => parsed.render(data),
        Err(_) => hex_encode(data),
    }
}

/// Encode bytes as lowercase hex string.
fn hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for &b in data {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// Apply an INTEGER DISPLAY-HINT (`d`, `d-N`, `x`, `o`, `b`).
///
/// `d-N` renders with N implied decimal places. Returns `None` for invalid
/// or unsupported hint formats.
///
/// # Examples
///
/// ```
/// use typed_snmp::types::hint;
///
/// assert_eq!(hint::apply_integer("x", 255), Some("ff".to_string()));
/// assert_eq!(hint::apply_integer("d-2", 1234), Some("12.34".to_string()));
/// assert_eq!(hint::apply_integer("d-2", -500), Some("-5.00".to_string()));
/// ```
pub fn apply_integer(hint: &str, value: i64) -> Option<String> {
    match hint {
        "x" => Some(format!("{:x}", value)),
        "o" => Some(format!("{:o}", value)),
        "b" => Some(format!("{:b}", value)),
        "d" => Some(format!("{}", value)),
        hint if hint.starts_with("d-") => {
            let places: usize = hint[2..].parse().ok()?;
            if places == 0 {
                return Some(format!("{}", value));
            }
            Some(format_with_decimal_point(value, places))
        }
        _ => None,
    }
}

/// Format an integer with an implied decimal point.
///
/// Pure string manipulation to avoid floating-point rounding issues.
fn format_with_decimal_point(value: i64, places: usize) -> String {
    let is_negative = value < 0;
    let abs_str = value.unsigned_abs().to_string();

    let result = if abs_str.len() <= places {
        // e.g. 5 with places=2 -> "0.05"
        let zeros_needed = places - abs_str.len();
        format!("0.{}{}", "0".repeat(zeros_needed), abs_str)
    } else {
        // e.g. 1234 with places=2 -> "12.34"
        let (integer_part, decimal_part) = abs_str.split_at(abs_str.len() - places);
        format!("{}.{}", integer_part, decimal_part)
    };

    if is_negative {
        format!("-{}", result)
    } else {
        result
    }
}
