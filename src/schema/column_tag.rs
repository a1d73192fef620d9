//! Structured column identifiers.
//!
//! Windowed tables name their columns `{base}_t-K` (lagged input, K > 0),
//! `{base}_t` (current output) and `{base}_t+K` (future output, K > 0).
//! Those suffixes are the only contract downstream consumers have for telling
//! inputs from outputs, so the rendered name must stay byte-for-byte stable.
//!
//! Inside the crate the suffix is parsed once into a [`ColumnTag`] and carried
//! as `(base, offset)`; nothing re-derives it from strings afterwards.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Marker between base name and time offset in a wire name.
pub const TIME_MARKER: &str = "_t";

/// Column identifier: base name plus optional signed timestep offset.
///
/// Raw (un-windowed) columns have no offset. Windowed columns carry
/// `offset < 0` for inputs and `offset >= 0` for outputs.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::schema::ColumnTag;
///
/// let tag = ColumnTag::parse("calls_t-3");
/// assert_eq!(tag.base(), "calls");
/// assert_eq!(tag.offset(), Some(-3));
/// assert!(tag.is_input());
/// assert_eq!(tag.to_string(), "calls_t-3");
///
/// // Base names may contain "_t" without being mistaken for a tag
/// let raw = ColumnTag::parse("rate_total");
/// assert!(raw.is_raw());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ColumnTag {
    base: String,
    offset: Option<i64>,
}

impl ColumnTag {
    /// Untagged column, as found in a raw table.
    pub fn raw(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            offset: None,
        }
    }

    /// Column at a timestep offset relative to the present row.
    pub fn at(base: impl Into<String>, offset: i64) -> Self {
        Self {
            base: base.into(),
            offset: Some(offset),
        }
    }

    /// Parse a wire name.
    ///
    /// Names whose suffix does not follow the `_t`, `_t-K`, `_t+K` grammar
    /// (K a positive integer written without leading zeros) are treated as
    /// raw columns.
    pub fn parse(name: &str) -> Self {
        let Some(pos) = name.rfind(TIME_MARKER) else {
            return Self::raw(name);
        };
        let base = &name[..pos];
        let suffix = &name[pos + TIME_MARKER.len()..];
        if base.is_empty() {
            return Self::raw(name);
        }

        let offset = if suffix.is_empty() {
            Some(0)
        } else if let Some(lag) = suffix.strip_prefix('-') {
            parse_step(lag).map(|k| -k)
        } else if let Some(lead) = suffix.strip_prefix('+') {
            parse_step(lead)
        } else {
            None
        };

        match offset {
            Some(offset) => Self::at(base, offset),
            None => Self::raw(name),
        }
    }

    /// Base variable name.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Timestep offset, `None` for raw columns.
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// True if the column has no timestep offset.
    pub fn is_raw(&self) -> bool {
        self.offset.is_none()
    }

    /// True for lagged input columns (`_t-K`).
    pub fn is_input(&self) -> bool {
        matches!(self.offset, Some(o) if o < 0)
    }

    /// True for current/future output columns (`_t`, `_t+K`).
    pub fn is_output(&self) -> bool {
        matches!(self.offset, Some(o) if o >= 0)
    }

    /// Lag depth K for an input column.
    pub fn lag(&self) -> Option<usize> {
        match self.offset {
            Some(o) if o < 0 => Some(o.unsigned_abs() as usize),
            _ => None,
        }
    }

    /// Same base name at another offset.
    pub fn with_offset(&self, offset: i64) -> Self {
        Self::at(self.base.clone(), offset)
    }
}

/// Canonical step count: ASCII digits without a leading zero.
fn parse_step(digits: &str) -> Option<i64> {
    if digits.is_empty()
        || digits.starts_with('0')
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse::<i64>().ok().filter(|&k| k > 0)
}

impl fmt::Display for ColumnTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            None => write!(f, "{}", self.base),
            Some(0) => write!(f, "{}{}", self.base, TIME_MARKER),
            Some(o) if o < 0 => write!(f, "{}{}{}", self.base, TIME_MARKER, o),
            Some(o) => write!(f, "{}{}+{}", self.base, TIME_MARKER, o),
        }
    }
}

impl From<String> for ColumnTag {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<&str> for ColumnTag {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl From<ColumnTag> for String {
    fn from(tag: ColumnTag) -> Self {
        tag.to_string()
    }
}

/// Orders by offset first (raw columns last), then by base name.
impl PartialOrd for ColumnTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColumnTag {
    fn cmp(&self, other: &Self) -> Ordering {
        let key = |t: &ColumnTag| t.offset.map_or((1, 0), |o| (0, o));
        key(self)
            .cmp(&key(other))
            .then_with(|| self.base.cmp(&other.base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_suffixes() {
        assert_eq!(ColumnTag::at("a", -2).to_string(), "a_t-2");
        assert_eq!(ColumnTag::at("a", 0).to_string(), "a_t");
        assert_eq!(ColumnTag::at("a", 3).to_string(), "a_t+3");
        assert_eq!(ColumnTag::raw("a").to_string(), "a");
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(ColumnTag::parse("a_t-2"), ColumnTag::at("a", -2));
        assert_eq!(ColumnTag::parse("a_t"), ColumnTag::at("a", 0));
        assert_eq!(ColumnTag::parse("a_t+1"), ColumnTag::at("a", 1));
        assert_eq!(ColumnTag::parse("a"), ColumnTag::raw("a"));
    }

    #[test]
    fn test_parse_rejects_lookalikes() {
        // Zero steps and non-digit suffixes are not tags
        assert!(ColumnTag::parse("a_t-0").is_raw());
        assert!(ColumnTag::parse("a_t+x").is_raw());
        assert!(ColumnTag::parse("temp_total").is_raw());
        assert!(ColumnTag::parse("_t").is_raw());
    }

    #[test]
    fn test_non_canonical_steps_stay_raw() {
        for name in ["x_t-01", "x_t+007", "x_t-00"] {
            let tag = ColumnTag::parse(name);
            assert!(tag.is_raw(), "{name}");
            assert_eq!(tag.to_string(), name);
        }
        assert_eq!(ColumnTag::parse("x_t-10").offset(), Some(-10));
    }

    #[test]
    fn test_base_containing_marker() {
        let tag = ColumnTag::parse("rate_total_t-1");
        assert_eq!(tag.base(), "rate_total");
        assert_eq!(tag.lag(), Some(1));

        let tag = ColumnTag::parse("x_t_t");
        assert_eq!(tag.base(), "x_t");
        assert_eq!(tag.offset(), Some(0));
    }

    #[test]
    fn test_classification() {
        assert!(ColumnTag::at("a", -1).is_input());
        assert!(!ColumnTag::at("a", -1).is_output());
        assert!(ColumnTag::at("a", 0).is_output());
        assert!(ColumnTag::at("a", 4).is_output());
        let raw = ColumnTag::raw("a");
        assert!(!raw.is_input() && !raw.is_output());
    }

    #[test]
    fn test_ordering() {
        let mut tags = vec![
            ColumnTag::raw("z"),
            ColumnTag::at("b", 1),
            ColumnTag::at("a", -1),
            ColumnTag::at("a", -2),
        ];
        tags.sort();
        let names: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["a_t-2", "a_t-1", "b_t+1", "z"]);
    }

    #[test]
    fn test_serde_as_wire_name() {
        let tag = ColumnTag::at("calls", -4);
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"calls_t-4\"");
        let back: ColumnTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }
}
