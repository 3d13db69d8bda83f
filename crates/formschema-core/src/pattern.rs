//! Physical field name resolution
//!
//! A physical pattern such as `Pt4Line{index}a_StreetAddress[0]` names one
//! field per slot of a repeating group. The placeholder is a single `{name}`
//! token (`{index}`, `{n}` and `{}` are all accepted); it is replaced by the
//! one-based physical index of the slot.

use thiserror::Error;

/// Pattern with zero or several index placeholders
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid field pattern '{pattern}': expected exactly one index placeholder, found {found}")]
pub struct InvalidPattern {
    pub pattern: String,
    pub found: usize,
}

/// A validated pattern split around its placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPattern {
    prefix: String,
    suffix: String,
}

impl FieldPattern {
    /// Parse a pattern, requiring exactly one placeholder
    pub fn parse(pattern: &str) -> Result<Self, InvalidPattern> {
        let spans = placeholder_spans(pattern);
        match spans.as_slice() {
            [(start, end)] => Ok(Self {
                prefix: pattern[..*start].to_string(),
                suffix: pattern[*end..].to_string(),
            }),
            _ => Err(InvalidPattern {
                pattern: pattern.to_string(),
                found: spans.len(),
            }),
        }
    }

    /// Instantiate the pattern for a physical index
    pub fn render(&self, physical_index: usize) -> String {
        format!("{}{}{}", self.prefix, physical_index, self.suffix)
    }
}

/// Byte ranges of `{ident}` tokens; braces around anything else are literal
fn placeholder_spans(pattern: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    while let Some(open) = pattern[cursor..].find('{').map(|i| cursor + i) {
        let Some(close) = pattern[open + 1..].find('}').map(|i| open + 1 + i) else {
            break;
        };

        let name = &pattern[open + 1..close];
        if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            spans.push((open, close + 1));
            cursor = close + 1;
        } else {
            cursor = open + 1;
        }
    }

    spans
}

/// Physical index for a logical (zero-based) position
///
/// Uses `overrides[logical_index]` when the override list covers that
/// position, otherwise falls back to one-based numbering.
pub fn physical_index(logical_index: usize, overrides: Option<&[usize]>) -> usize {
    overrides
        .and_then(|indices| indices.get(logical_index).copied())
        .unwrap_or(logical_index + 1)
}

/// Resolve the primary physical field name for a logical index
pub fn resolve(
    pattern: &str,
    logical_index: usize,
    overrides: Option<&[usize]>,
) -> Result<String, InvalidPattern> {
    let parsed = FieldPattern::parse(pattern)?;
    Ok(parsed.render(physical_index(logical_index, overrides)))
}

/// Resolve the supplemental-page field name for an overflow position
///
/// Always one-based; override lists never apply to supplemental pages.
pub fn resolve_supplemental(
    pattern: Option<&str>,
    overflow_index: usize,
) -> Result<Option<String>, InvalidPattern> {
    match pattern {
        None => Ok(None),
        Some(p) => Ok(Some(FieldPattern::parse(p)?.render(overflow_index + 1))),
    }
}
