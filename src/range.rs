//! `Range:` parsing, normalization against a known body size, and
//! `multipart/byteranges` construction.

use rand::RngCore;

/// One `start-end`, `start-`, or `-suffix` entry from a `Range: bytes=...`
/// header, before normalization against a body size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

/// A parsed but not-yet-normalized `Range` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSpec {
    pub ranges: Vec<RawRange>,
}

/// A normalized `{offset, length}` pair, ready to slice a body of known
/// size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    pub fn end_inclusive(&self) -> u64 {
        self.offset + self.length - 1
    }
}

/// Parses a `Range` header value. Returns `None` if the unit isn't `bytes`
/// or the grammar doesn't parse; the decision graph treats that identically
/// to a missing header (§4.4/§7: ignored, full 200 served).
pub fn parse(header: &str) -> Option<RangeSpec> {
    let rest = header.strip_prefix("bytes=")?;
    let mut ranges = Vec::new();
    for part in rest.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return None;
        }
        let (start_str, end_str) = part.split_once('-')?;
        let start = if start_str.is_empty() { None } else { Some(start_str.parse().ok()?) };
        let end = if end_str.is_empty() { None } else { Some(end_str.parse().ok()?) };
        if start.is_none() && end.is_none() {
            return None;
        }
        ranges.push(RawRange { start, end });
    }
    if ranges.is_empty() {
        None
    } else {
        Some(RangeSpec { ranges })
    }
}

/// Normalizes a parsed range spec against a body of `size` bytes, per the
/// five-row table in §4.4. Entries that don't survive are dropped silently;
/// an empty result means "serve the whole body" (the accepted relaxation
/// over a strict 416).
pub fn normalize(spec: &RangeSpec, size: u64) -> Vec<ByteRange> {
    spec.ranges
        .iter()
        .filter_map(|r| match (r.start, r.end) {
            (None, Some(n)) if n <= size => Some(ByteRange { offset: size - n, length: n }),
            (None, Some(_)) => Some(ByteRange { offset: 0, length: size }),
            (Some(a), None) if a < size => Some(ByteRange { offset: a, length: size - a }),
            (Some(_), None) => None,
            (Some(a), Some(b)) if a <= b && b < size => Some(ByteRange { offset: a, length: b - a + 1 }),
            _ => None,
        })
        .collect()
}

/// Generates a multipart boundary from 8 cryptographically strong random
/// bytes, hex-encoded. Falls back to a pseudorandom source (and logs at
/// info level) if the strong RNG is unavailable — the boundary only needs
/// to be unique within this response, not unpredictable to an adversary.
pub fn generate_boundary() -> String {
    let mut bytes = [0u8; 8];
    match getrandom(&mut bytes) {
        Ok(()) => {}
        Err(_) => {
            tracing::info!("falling back to pseudorandom multipart boundary");
            rand::thread_rng().fill_bytes(&mut bytes);
        }
    }
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn getrandom(buf: &mut [u8]) -> Result<(), rand::Error> {
    use rand::rngs::OsRng;
    OsRng.try_fill_bytes(buf)
}

/// The preamble preceding one part's bytes in a `multipart/byteranges`
/// response.
pub fn part_preamble(boundary: &str, content_type: &str, range: ByteRange, total: u64) -> String {
    format!(
        "--{boundary}\r\ncontent-type: {content_type}\r\ncontent-range: bytes {}-{}/{total}\r\n\r\n",
        range.offset,
        range.end_inclusive(),
    )
}

pub fn closing_boundary(boundary: &str) -> String {
    format!("--{boundary}--\r\n")
}

/// Precomputes the total `Content-Length` of a multipart response: the sum
/// of each part's preamble + body + trailing CRLF, plus the closing
/// boundary.
pub fn multipart_content_length(
    boundary: &str,
    content_type: &str,
    ranges: &[ByteRange],
    total: u64,
) -> u64 {
    let mut len = 0u64;
    for r in ranges {
        len += part_preamble(boundary, content_type, *r, total).len() as u64;
        len += r.length;
        len += 2; // trailing CRLF after each part's bytes
    }
    len += closing_boundary(boundary).len() as u64;
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suffix_range() {
        let spec = parse("bytes=-3").unwrap();
        assert_eq!(spec.ranges, vec![RawRange { start: None, end: Some(3) }]);
    }

    #[test]
    fn parses_multiple_ranges() {
        let spec = parse("bytes=0-0,-1").unwrap();
        assert_eq!(spec.ranges.len(), 2);
    }

    #[test]
    fn rejects_non_bytes_unit() {
        assert!(parse("items=0-5").is_none());
    }

    #[test]
    fn normalize_suffix_within_body() {
        let spec = RangeSpec { ranges: vec![RawRange { start: None, end: Some(3) }] };
        let normalized = normalize(&spec, 10);
        assert_eq!(normalized, vec![ByteRange { offset: 7, length: 3 }]);
    }

    #[test]
    fn normalize_suffix_larger_than_body_clamps_to_full() {
        let spec = RangeSpec { ranges: vec![RawRange { start: None, end: Some(100) }] };
        let normalized = normalize(&spec, 10);
        assert_eq!(normalized, vec![ByteRange { offset: 0, length: 10 }]);
    }

    #[test]
    fn normalize_open_ended_prefix() {
        let spec = RangeSpec { ranges: vec![RawRange { start: Some(7), end: None }] };
        let normalized = normalize(&spec, 10);
        assert_eq!(normalized, vec![ByteRange { offset: 7, length: 3 }]);
    }

    #[test]
    fn normalize_drops_out_of_range_prefix() {
        let spec = RangeSpec { ranges: vec![RawRange { start: Some(20), end: None }] };
        assert!(normalize(&spec, 10).is_empty());
    }

    #[test]
    fn normalize_closed_range() {
        let spec = RangeSpec { ranges: vec![RawRange { start: Some(0), end: Some(0) }] };
        let normalized = normalize(&spec, 10);
        assert_eq!(normalized, vec![ByteRange { offset: 0, length: 1 }]);
    }

    #[test]
    fn normalize_drops_inverted_range() {
        let spec = RangeSpec { ranges: vec![RawRange { start: Some(5), end: Some(2) }] };
        assert!(normalize(&spec, 10).is_empty());
    }

    #[test]
    fn multipart_length_matches_manual_sum() {
        let ranges = vec![ByteRange { offset: 0, length: 1 }, ByteRange { offset: 9, length: 1 }];
        let boundary = "abc123";
        let total = multipart_content_length(boundary, "text/plain", &ranges, 10);

        let mut expected = 0u64;
        for r in &ranges {
            expected += part_preamble(boundary, "text/plain", *r, 10).len() as u64;
            expected += r.length + 2;
        }
        expected += closing_boundary(boundary).len() as u64;
        assert_eq!(total, expected);
    }
}
