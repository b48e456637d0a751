//! The per-request mutable state threaded through the decision graph.

use std::net::IpAddr;

use crate::body::Body;
use crate::http::{HeaderMap, MediaType, Method, Status};
use crate::range::RangeSpec;

/// Sentinel returned by `charsets_provided` to mean "this resource has no
/// meaningful charset" — negotiation is skipped and no `charset` parameter
/// is appended to `Content-Type`.
pub const NO_CHARSET: &str = "no-charset";

/// Which negotiation dimensions were actually consulted this request,
/// tracked so `Vary` can be composed accurately (spec invariant 3: `Vary`
/// reflects dimensions *consulted*, not dimensions merely present on the
/// request).
#[derive(Debug, Default, Clone, Copy)]
pub struct Consulted {
    pub accept: bool,
    pub accept_language: bool,
    pub accept_charset: bool,
    pub accept_encoding: bool,
}

impl Consulted {
    pub fn vary_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.accept {
            names.push("Accept");
        }
        if self.accept_language {
            names.push("Accept-Language");
        }
        if self.accept_charset {
            names.push("Accept-Charset");
        }
        if self.accept_encoding {
            names.push("Accept-Encoding");
        }
        names
    }
}

/// The outcome of content negotiation, populated incrementally as the
/// relevant decision nodes run.
#[derive(Debug, Default, Clone)]
pub struct Negotiation {
    pub content_type: Option<MediaType>,
    pub charset: Option<String>,
    pub language: Option<String>,
    pub content_encoding: Option<String>,
    pub consulted: Consulted,
}

/// The authoritative scheme/host/port/remote established by the proxy front
/// door, plus whether a (trusted) proxy was involved at all.
#[derive(Debug, Clone)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub remote_ip: Option<IpAddr>,
    pub remote: String,
    pub via_proxy: bool,
}

/// The immutable facts about the request as received, after proxy
/// front-door rewriting.
#[derive(Debug, Clone)]
pub struct RequestFacet {
    pub method: Method,
    pub version: (u8, u8),
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub peer_ip: IpAddr,
    pub origin: Origin,
}

/// Everything the response accumulates as the decision graph runs.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    pub status: Option<Status>,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    pub cookies: Vec<String>,
}

/// The single mutable object threaded through every decision node.
///
/// Single-owner: one request per context, no concurrent mutation — the
/// decision engine, emitter, and controller adapter all borrow it in turn
/// rather than sharing it across tasks.
#[derive(Debug)]
pub struct RequestContext {
    pub request: RequestFacet,
    pub negotiation: Negotiation,
    pub response: ResponseAccumulator,

    /// Read exactly once, before `Range` header parsing (spec invariant):
    /// a `false` value forces a full response regardless of client `Range`.
    /// Defaults to `true`; a controller may flip it off for a given
    /// resource (e.g. one that cannot seek).
    pub range_ok: bool,
    pub range: Option<RangeSpec>,

    pub etag: Option<String>,
    pub last_modified: Option<httpdate::HttpDate>,
    /// Cached from `Resource::expires`, so a 304 response (or the
    /// front-facing adapter composing any other status) can emit the
    /// controller's `Expires` value without re-invoking the callback.
    pub expires: Option<httpdate::HttpDate>,

    /// Bumped on every decision-node visit; the engine aborts past a small
    /// bound rather than trust the graph's acyclic-by-construction property
    /// blindly (§4.2's "≤ 50 node visits").
    pub node_visits: usize,

    /// Index into `content_types_provided()` chosen by negotiation; read
    /// back by the render node to find which renderer to invoke.
    pub(crate) renderer_index: Option<usize>,
}

impl RequestContext {
    pub fn new(request: RequestFacet) -> Self {
        RequestContext {
            request,
            negotiation: Negotiation::default(),
            response: ResponseAccumulator::default(),
            range_ok: true,
            range: None,
            etag: None,
            last_modified: None,
            expires: None,
            node_visits: 0,
            renderer_index: None,
        }
    }

    /// Composes the `Vary` header from consulted negotiation dimensions
    /// plus any the controller names via `variances`, and sets it iff at
    /// least two entries result (spec invariant 3).
    pub fn finalize_vary(&mut self, controller_variances: &[String]) {
        let mut names: Vec<String> =
            self.negotiation.consulted.vary_names().into_iter().map(String::from).collect();
        names.extend(controller_variances.iter().cloned());

        if names.len() >= 2 {
            self.response.headers.set("Vary", names.join(", "));
        }
    }
}
