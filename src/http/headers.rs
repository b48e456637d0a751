//! An ordered, case-insensitive, multi-valued header map.
//!
//! HTTP header names are case-insensitive but most servers canonicalize or
//! at least preserve the casing they were sent with for logging purposes;
//! [`Uncased`] gives us case-insensitive `Eq`/`Hash` while still storing the
//! bytes as received. Insertion order matters for `Vary` composition and for
//! replaying multi-valued headers (e.g. repeated `Forwarded` elements) in
//! the order the client sent them, so this wraps an [`IndexMap`] rather
//! than a `HashMap`.

use indexmap::IndexMap;
use std::fmt;
use uncased::{Uncased, UncasedStr};

/// A single request or response header map.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: IndexMap<Uncased<'static>, Vec<String>>,
}

impl HeaderMap {
    pub fn new() -> Self {
        HeaderMap { entries: IndexMap::new() }
    }

    /// Appends a value, preserving any already present under `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let key = Uncased::from(name.into());
        self.entries.entry(key).or_default().push(value.into());
    }

    /// Replaces any existing values for `name` with the single `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let key = Uncased::from(name.into());
        self.entries.insert(key, vec![value.into()]);
    }

    /// The first value for `name`, if any.
    pub fn get_one(&self, name: &str) -> Option<&str> {
        self.entries.get(UncasedStr::new(name)).and_then(|v| v.first()).map(String::as_str)
    }

    /// All values for `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries.get(UncasedStr::new(name)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(UncasedStr::new(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries.shift_remove(UncasedStr::new(name))
    }

    /// Names currently set, in insertion order. Used when composing `Vary`
    /// from the set of headers negotiation actually consulted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

impl fmt::Display for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let mut headers = HeaderMap::new();
        headers.set("Content-Type", "text/html");
        assert_eq!(headers.get_one("content-type"), Some("text/html"));
        assert_eq!(headers.get_one("CONTENT-TYPE"), Some("text/html"));
    }

    #[test]
    fn multi_valued_preserves_order() {
        let mut headers = HeaderMap::new();
        headers.add("Forwarded", "for=1.2.3.4");
        headers.add("Forwarded", "for=5.6.7.8");
        assert_eq!(headers.get_all("forwarded"), &["for=1.2.3.4", "for=5.6.7.8"]);
    }

    #[test]
    fn set_replaces_existing() {
        let mut headers = HeaderMap::new();
        headers.add("X-Custom", "one");
        headers.set("X-Custom", "two");
        assert_eq!(headers.get_all("x-custom"), &["two"]);
    }
}
