//! Media types, parsed and compared the way `Content-Type` and the media
//! ranges in `Accept` need to be: case-insensitive type/subtype, an
//! unordered parameter bag, and a wildcard-aware `matches` predicate used by
//! negotiation (node C4 in the decision graph).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A parsed `type/subtype;param=value;...` media type or media range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub top: String,
    pub sub: String,
    pub params: BTreeMap<String, String>,
}

impl MediaType {
    pub fn new(top: impl Into<String>, sub: impl Into<String>) -> Self {
        MediaType { top: top.into(), sub: sub.into(), params: BTreeMap::new() }
    }

    pub fn text_html() -> Self {
        MediaType::new("text", "html")
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Number of non-wildcard components (0, 1 or 2). Used by negotiation
    /// to prefer the most specific of two equally-weighted media ranges.
    pub fn specificity(&self) -> u8 {
        let mut n = 0;
        if self.top != "*" {
            n += 1;
        }
        if self.sub != "*" {
            n += 1;
        }
        n
    }

    /// Whether `self`, used as a media *range* (as found in `Accept`),
    /// matches the concrete media type `other` (as returned by a
    /// controller's `content_types_provided`).
    pub fn matches(&self, other: &MediaType) -> bool {
        let top_ok = self.top == "*" || self.top.eq_ignore_ascii_case(&other.top);
        let sub_ok = self.sub == "*" || self.sub.eq_ignore_ascii_case(&other.sub);
        top_ok && sub_ok
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.top, self.sub)?;
        for (k, v) in &self.params {
            write!(f, "; {}={}", k, v)?;
        }
        Ok(())
    }
}

/// Parse error for a malformed media type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseMediaTypeError;

impl FromStr for MediaType {
    type Err = ParseMediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(';').map(str::trim);
        let type_part = parts.next().ok_or(ParseMediaTypeError)?;
        let (top, sub) = type_part.split_once('/').ok_or(ParseMediaTypeError)?;
        if top.is_empty() || sub.is_empty() {
            return Err(ParseMediaTypeError);
        }

        let mut media = MediaType::new(top.to_ascii_lowercase(), sub.to_ascii_lowercase());
        for param in parts {
            if let Some((k, v)) = param.split_once('=') {
                let v = v.trim().trim_matches('"');
                media.params.insert(k.trim().to_ascii_lowercase(), v.to_ascii_lowercase());
            }
        }

        Ok(media)
    }
}
