//! Content negotiation: parsing the four `Accept*` headers and selecting a
//! winner among what the controller offers.
//!
//! Selection rule, shared by all four dimensions (spec §4.2): highest `q`,
//! then most specific (fewest wildcards), then first offered by the
//! controller (a stable tie-break — the controller's own ordering is
//! authoritative once weights and specificity are exhausted).

use super::media_type::MediaType;

/// One entry of a parsed `Accept*` header: a token or media range together
/// with its `q` weight (`1.0` if unspecified).
#[derive(Debug, Clone)]
pub struct Weighted<T> {
    pub value: T,
    pub q: f32,
}

/// Splits a header value on top-level commas, honoring quoted strings so a
/// comma inside `"..."` doesn't split a parameter value in two.
fn split_commas(header: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in header.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(header[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = header[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

fn extract_q(entry: &str) -> (&str, f32) {
    let mut value = entry;
    let mut q = 1.0;
    for (i, param) in entry.split(';').enumerate() {
        if i == 0 {
            value = param.trim();
            continue;
        }
        let param = param.trim();
        if let Some(rest) = param.strip_prefix("q=") {
            if let Ok(parsed) = rest.trim().parse::<f32>() {
                q = parsed;
            }
        }
    }
    (value, q)
}

/// Parses a simple weighted-token header (`Accept-Language`,
/// `Accept-Charset`, `Accept-Encoding`): `token (";" "q=" qvalue)?` joined by
/// commas.
pub fn parse_tokens(header: &str) -> Vec<Weighted<String>> {
    split_commas(header)
        .into_iter()
        .map(|entry| {
            let (value, q) = extract_q(entry);
            Weighted { value: value.to_ascii_lowercase(), q }
        })
        .collect()
}

/// Parses the `Accept` header's media-range grammar, keeping every
/// parameter (not just `q`) since a media range may carry e.g. `charset` or
/// `version` hints a controller cares about.
pub fn parse_media_ranges(header: &str) -> Vec<Weighted<MediaType>> {
    split_commas(header)
        .into_iter()
        .filter_map(|entry| {
            let mut q = 1.0;
            let mut type_part = entry;
            let mut params = Vec::new();
            for (i, seg) in entry.split(';').enumerate() {
                if i == 0 {
                    type_part = seg.trim();
                    continue;
                }
                let seg = seg.trim();
                if let Some(rest) = seg.strip_prefix("q=") {
                    if let Ok(parsed) = rest.trim().parse::<f32>() {
                        q = parsed;
                        continue;
                    }
                }
                if let Some((k, v)) = seg.split_once('=') {
                    params.push((k.trim().to_ascii_lowercase(), v.trim().trim_matches('"').to_string()));
                }
            }

            let (top, sub) = type_part.split_once('/')?;
            let mut media = MediaType::new(top.trim().to_ascii_lowercase(), sub.trim().to_ascii_lowercase());
            for (k, v) in params {
                media.params.insert(k, v);
            }

            Some(Weighted { value: media, q })
        })
        .collect()
}

/// Selects the best media type among `offered` (in controller-preference
/// order) given an optional `Accept` header. Returns the offered index and
/// whether negotiation actually consulted the header (needed for `Vary`).
///
/// A missing `Accept` header is the wildcard `*/*` (spec §4.2): every
/// offered type is acceptable and the first offered wins, but this does not
/// count as "consulting" the dimension for `Vary` purposes.
pub fn select_media_type(accept: Option<&str>, offered: &[MediaType]) -> Option<usize> {
    let Some(header) = accept else {
        return if offered.is_empty() { None } else { Some(0) };
    };

    let ranges = parse_media_ranges(header);
    best_index(offered, |candidate| {
        ranges
            .iter()
            .filter(|w| w.value.matches(candidate))
            .map(|w| (w.q, w.value.specificity()))
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)))
    })
}

/// Selects the best simple token among `offered` given an optional
/// `Accept-Language`/`Accept-Charset` style header. `*` in the header
/// matches any offered token.
pub fn select_token(header: Option<&str>, offered: &[String]) -> Option<usize> {
    let Some(header) = header else {
        return if offered.is_empty() { None } else { Some(0) };
    };

    let weighted = parse_tokens(header);
    best_index(offered, |candidate| {
        weighted
            .iter()
            .filter(|w| w.value == "*" || w.value.eq_ignore_ascii_case(candidate))
            .map(|w| w.q)
            .fold(None, |acc, q| Some(acc.map_or(q, |a: f32| a.max(q))))
            .map(|q| (q, if weighted.iter().any(|w| w.value.eq_ignore_ascii_case(candidate)) { 1 } else { 0 }))
    })
}

/// Selects a content-coding among `offered`. `identity` is always
/// acceptable at `q=1.0` unless the header explicitly names it (or `*`)
/// with `q=0`, per RFC 7231 §5.3.4.
pub fn select_encoding(header: Option<&str>, offered: &[String]) -> Option<usize> {
    let Some(header) = header else {
        return offered.iter().position(|e| e == "identity").or(if offered.is_empty() { None } else { Some(0) });
    };

    let weighted = parse_tokens(header);
    let identity_explicitly_rejected = weighted.iter().any(|w| {
        (w.value == "identity" || w.value == "*") && w.q == 0.0
    });

    best_index(offered, |candidate| {
        let explicit = weighted
            .iter()
            .filter(|w| w.value.eq_ignore_ascii_case(candidate))
            .map(|w| w.q)
            .fold(None, |acc: Option<f32>, q| Some(acc.map_or(q, |a| a.max(q))));

        if let Some(q) = explicit {
            return Some((q, 1));
        }

        let wildcard = weighted.iter().filter(|w| w.value == "*").map(|w| w.q).next();
        if let Some(q) = wildcard {
            return Some((q, 0));
        }

        if candidate == "identity" && !identity_explicitly_rejected {
            return Some((1.0, 0));
        }

        None
    })
}

/// Finds the offered index maximizing `(q, specificity)` as reported by
/// `score`, skipping any `q=0` (explicitly rejected) and any candidate
/// `score` returns `None` for (not acceptable at all). Ties break toward
/// the earliest (most-preferred-by-the-controller) index.
fn best_index<T>(offered: &[T], score: impl Fn(&T) -> Option<(f32, u8)>) -> Option<usize> {
    offered
        .iter()
        .enumerate()
        .filter_map(|(i, candidate)| score(candidate).map(|s| (i, s)))
        .filter(|(_, (q, _))| *q > 0.0)
        .max_by(|(ia, (qa, sa)), (ib, (qb, sb))| {
            qa.partial_cmp(qb)
                .unwrap()
                .then(sa.cmp(sb))
                .then(ib.cmp(ia)) // reverse index order so the earlier wins ties
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_accept_is_wildcard() {
        let offered = vec![MediaType::new("text", "html"), MediaType::new("application", "json")];
        assert_eq!(select_media_type(None, &offered), Some(0));
    }

    #[test]
    fn highest_q_wins() {
        let offered = vec![MediaType::new("text", "html"), MediaType::new("application", "json")];
        let idx = select_media_type(Some("text/html;q=0.5, application/json;q=0.9"), &offered);
        assert_eq!(idx, Some(1));
    }

    #[test]
    fn specificity_breaks_ties() {
        let offered = vec![MediaType::new("text", "html"), MediaType::new("application", "json")];
        let idx = select_media_type(Some("*/*;q=0.8, text/html;q=0.8"), &offered);
        assert_eq!(idx, Some(0));
    }

    #[test]
    fn not_acceptable_when_q_zero() {
        let offered = vec![MediaType::new("text", "html")];
        assert_eq!(select_media_type(Some("text/html;q=0"), &offered), None);
    }

    #[test]
    fn encoding_identity_default() {
        let offered = vec!["identity".to_string(), "gzip".to_string()];
        assert_eq!(select_encoding(None, &offered), Some(0));
    }

    #[test]
    fn encoding_prefers_explicit_gzip() {
        let offered = vec!["identity".to_string(), "gzip".to_string()];
        assert_eq!(select_encoding(Some("gzip;q=1.0, identity;q=0.5"), &offered), Some(1));
    }

    #[test]
    fn encoding_rejects_identity_when_excluded() {
        let offered = vec!["identity".to_string()];
        assert_eq!(select_encoding(Some("gzip, identity;q=0"), &offered), None);
    }

    #[test]
    fn token_wildcard_selects_first_offered() {
        let offered = vec!["en-us".to_string(), "fr".to_string()];
        assert_eq!(select_token(Some("*"), &offered), Some(0));
    }
}
