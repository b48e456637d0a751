//! The decision engine: a stack-bounded trampoline over ~40 named decision
//! nodes, transforming (request context, controller) into a final status
//! and fully-populated response accumulators.
//!
//! Each node is one arm of [`Node`]; [`run`] loops calling [`step`] until a
//! node reports a terminal status, bounding total visits rather than
//! trusting the graph's acyclic-by-construction property blindly.

use crate::http::{MediaType, Method, Status};
use crate::outcome::Outcome;
use crate::range::{self, ByteRange};
use crate::request::{RequestContext, NO_CHARSET};
use crate::resource::Resource;

const MAX_NODE_VISITS: usize = 50;

/// A single step of the decision graph, named after its node code for
/// `tracing` span names and test naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    B13ServiceAvailable,
    B12KnownMethod,
    B11UriTooLong,
    B10MethodAllowed,
    B9Malformed,
    B8Authorized,
    B7Forbidden,
    B6ValidContentHeaders,
    B5KnownContentType,
    B4ValidEntityLength,
    B3Options,
    C3Accept,
    C4AcceptableMediaType,
    D4AcceptLanguage,
    D5AcceptableLanguage,
    E5AcceptCharset,
    E6AcceptableCharset,
    F6AcceptEncoding,
    F7AcceptableEncoding,
    G7ResourceExists,
    G8IfMatchExists,
    H7IfUnmodifiedSinceExists,
    I12IfNoneMatchExists,
    K5MovedPermanentlyGone,
    K7PreviouslyExisted,
    L5MovedTemporarily,
    L7PostHandlingGone,
    L13IfModifiedSinceExists,
    M5PostOrMkcol,
    M16DeleteOrPost,
    N5PostAsCreateOrProcess,
    O14Conflict,
    O16Put,
    O18MultipleRepresentations,
    O20HasEntity,
    P3ConflictOnCreate,
    P11NewResource,
    Render(usize),
}

/// Runs the decision graph to completion. On return, `ctx.response` carries
/// a final status, headers and (where applicable) body; the caller passes
/// the result straight to the emitter.
pub async fn run<R: Resource>(ctx: &mut RequestContext, resource: &mut R) {
    let mut node = Node::B13ServiceAvailable;
    loop {
        ctx.node_visits += 1;
        if ctx.node_visits > MAX_NODE_VISITS {
            halt(ctx, Status::INTERNAL_SERVER_ERROR);
            break;
        }

        match step(node, ctx, resource).await {
            Some(next) => node = next,
            None => break,
        }
    }

    let variances = resource.variances();
    ctx.finalize_vary(&variances);

    // finish_request always runs, on every exit path, and may replace the
    // status the graph settled on (spec.md §7: "its return value may
    // replace the status").
    match resource.finish_request(ctx).await {
        Outcome::Halt(status) => halt(ctx, status),
        Outcome::Error(e) => {
            tracing::error!(error = %e, "finish_request error");
            halt(ctx, Status::INTERNAL_SERVER_ERROR);
        }
        Outcome::Success(_) => {}
    }
}

fn halt(ctx: &mut RequestContext, status: Status) {
    ctx.response.status = Some(status);
}

/// Collapses a boolean-returning callback's [`Outcome`] into a plain
/// `bool`, halting the graph immediately on `Halt`/`Error` and signaling
/// that with `None` so the caller can short-circuit to the terminal state.
fn resolve_bool(ctx: &mut RequestContext, outcome: Outcome<bool>) -> Option<bool> {
    match outcome {
        Outcome::Success(v) => Some(v),
        Outcome::Halt(status) => {
            halt(ctx, status);
            None
        }
        Outcome::Error(e) => {
            tracing::error!(error = %e, "controller error");
            halt(ctx, Status::INTERNAL_SERVER_ERROR);
            None
        }
    }
}

async fn step<R: Resource>(node: Node, ctx: &mut RequestContext, resource: &mut R) -> Option<Node> {
    let span = tracing::trace_span!("node", code = ?node);
    let _enter = span.enter();

    match node {
        Node::B13ServiceAvailable => {
            let outcome = resource.service_available(ctx_dup(ctx)).await;
            let available = resolve_bool(ctx, outcome)?;
            if !available {
                halt(ctx, Status::SERVICE_UNAVAILABLE);
                return None;
            }
            Some(Node::B12KnownMethod)
        }

        Node::B12KnownMethod => {
            if !resource.known_methods().contains(&ctx.request.method) {
                halt(ctx, Status::NOT_IMPLEMENTED);
                return None;
            }
            Some(Node::B11UriTooLong)
        }

        Node::B11UriTooLong => {
            let outcome = resource.uri_too_long(ctx_dup(ctx)).await;
            let too_long = resolve_bool(ctx, outcome)?;
            if too_long {
                halt(ctx, Status::URI_TOO_LONG);
                return None;
            }
            Some(Node::B10MethodAllowed)
        }

        Node::B10MethodAllowed => {
            let allowed = resource.allowed_methods();
            if ctx.request.method != Method::OPTIONS && !allowed.contains(&ctx.request.method) {
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                ctx.response.headers.set("Allow", allow);
                halt(ctx, Status::METHOD_NOT_ALLOWED);
                return None;
            }
            Some(Node::B9Malformed)
        }

        Node::B9Malformed => {
            let outcome = resource.malformed_request(ctx_dup(ctx)).await;
            let malformed = resolve_bool(ctx, outcome)?;
            if malformed {
                halt(ctx, Status::BAD_REQUEST);
                return None;
            }
            Some(Node::B8Authorized)
        }

        Node::B8Authorized => {
            let outcome = resource.auth_required(ctx_dup(ctx)).await;
            let auth_required = resolve_bool(ctx, outcome)?;
            if auth_required {
                let outcome = resource.is_authorized(ctx_dup(ctx)).await;
                let authorized = resolve_bool(ctx, outcome)?;
                if !authorized {
                    halt(ctx, Status::UNAUTHORIZED);
                    return None;
                }
            }
            Some(Node::B7Forbidden)
        }

        Node::B7Forbidden => {
            let outcome = resource.forbidden(ctx_dup(ctx)).await;
            let forbidden = resolve_bool(ctx, outcome)?;
            if forbidden {
                halt(ctx, Status::FORBIDDEN);
                return None;
            }
            Some(Node::B6ValidContentHeaders)
        }

        Node::B6ValidContentHeaders => {
            let outcome = resource.valid_content_headers(ctx_dup(ctx)).await;
            let valid = resolve_bool(ctx, outcome)?;
            if !valid {
                halt(ctx, Status::NOT_IMPLEMENTED);
                return None;
            }
            Some(Node::B5KnownContentType)
        }

        Node::B5KnownContentType => {
            let has_body = ctx.request.headers.contains("content-type");
            if has_body {
                let outcome = resource.known_content_type(ctx_dup(ctx)).await;
                let known = resolve_bool(ctx, outcome)?;
                if !known {
                    halt(ctx, Status::UNSUPPORTED_MEDIA_TYPE);
                    return None;
                }
            }
            Some(Node::B4ValidEntityLength)
        }

        Node::B4ValidEntityLength => {
            let outcome = resource.valid_entity_length(ctx_dup(ctx)).await;
            let valid = resolve_bool(ctx, outcome)?;
            if !valid {
                halt(ctx, Status::PAYLOAD_TOO_LARGE);
                return None;
            }
            Some(Node::B3Options)
        }

        Node::B3Options => {
            if ctx.request.method == Method::OPTIONS {
                for (name, value) in resource.options() {
                    ctx.response.headers.add(name, value);
                }
                halt(ctx, Status::OK);
                return None;
            }
            Some(Node::C3Accept)
        }

        Node::C3Accept => Some(Node::C4AcceptableMediaType),

        Node::C4AcceptableMediaType => {
            let offered: Vec<MediaType> =
                resource.content_types_provided().into_iter().map(|(m, _)| m).collect();
            let accept = ctx.request.headers.get_one("accept").map(str::to_string);
            ctx.negotiation.consulted.accept = accept.is_some();

            match crate::http::negotiation::select_media_type(accept.as_deref(), &offered) {
                Some(idx) => {
                    ctx.negotiation.content_type = Some(offered[idx].clone());
                    store_renderer_index(ctx, idx);
                    Some(Node::D4AcceptLanguage)
                }
                None => {
                    halt(ctx, Status::NOT_ACCEPTABLE);
                    None
                }
            }
        }

        Node::D4AcceptLanguage => Some(Node::D5AcceptableLanguage),

        Node::D5AcceptableLanguage => {
            let header = ctx.request.headers.get_one("accept-language").map(str::to_string);
            ctx.negotiation.consulted.accept_language = header.is_some();

            if header.is_some() {
                let outcome = resource.language_available(ctx_dup(ctx)).await;
                let available = resolve_bool(ctx, outcome)?;
                if !available {
                    halt(ctx, Status::NOT_ACCEPTABLE);
                    return None;
                }
                if let Some(lang) = header.as_deref().and_then(|h| h.split(',').next()) {
                    ctx.negotiation.language = Some(lang.trim().split(';').next().unwrap_or("").to_string());
                }
            }
            Some(Node::E5AcceptCharset)
        }

        Node::E5AcceptCharset => Some(Node::E6AcceptableCharset),

        Node::E6AcceptableCharset => {
            match resource.charsets_provided() {
                None => {
                    ctx.negotiation.charset = Some(NO_CHARSET.to_string());
                }
                Some(offered) => {
                    let header = ctx.request.headers.get_one("accept-charset").map(str::to_string);
                    ctx.negotiation.consulted.accept_charset = header.is_some();
                    match crate::http::negotiation::select_token(header.as_deref(), &offered) {
                        Some(idx) => ctx.negotiation.charset = Some(offered[idx].clone()),
                        None => {
                            halt(ctx, Status::NOT_ACCEPTABLE);
                            return None;
                        }
                    }
                }
            }
            Some(Node::F6AcceptEncoding)
        }

        Node::F6AcceptEncoding => Some(Node::F7AcceptableEncoding),

        Node::F7AcceptableEncoding => {
            let offered = resource.content_encodings_provided();
            let header = ctx.request.headers.get_one("accept-encoding").map(str::to_string);
            ctx.negotiation.consulted.accept_encoding = header.is_some();

            match crate::http::negotiation::select_encoding(header.as_deref(), &offered) {
                Some(idx) => {
                    ctx.negotiation.content_encoding = Some(offered[idx].clone());
                    Some(Node::G7ResourceExists)
                }
                None => {
                    halt(ctx, Status::NOT_ACCEPTABLE);
                    None
                }
            }
        }

        Node::G7ResourceExists => {
            let outcome = resource.resource_exists(ctx_dup(ctx)).await;
            let exists = resolve_bool(ctx, outcome)?;
            cache_conditional_fields(ctx, resource);
            if exists {
                Some(Node::G8IfMatchExists)
            } else {
                Some(Node::K5MovedPermanentlyGone)
            }
        }

        Node::G8IfMatchExists => {
            if let Some(if_match) = ctx.request.headers.get_one("if-match") {
                let etag = ctx.etag.as_deref();
                if !if_match_satisfied(if_match, etag, true, true) {
                    halt(ctx, Status::PRECONDITION_FAILED);
                    return None;
                }
            }
            Some(Node::H7IfUnmodifiedSinceExists)
        }

        Node::H7IfUnmodifiedSinceExists => {
            if let Some(since) = ctx.request.headers.get_one("if-unmodified-since") {
                if let (Ok(since), Some(last_modified)) = (httpdate::parse_http_date(since), ctx.last_modified) {
                    if std::time::SystemTime::from(last_modified) > since {
                        halt(ctx, Status::PRECONDITION_FAILED);
                        return None;
                    }
                }
            }
            Some(Node::I12IfNoneMatchExists)
        }

        Node::I12IfNoneMatchExists => {
            if let Some(if_none_match) = ctx.request.headers.get_one("if-none-match") {
                let etag = ctx.etag.as_deref();
                if if_match_satisfied(if_none_match, etag, true, false) {
                    if matches!(ctx.request.method, Method::GET | Method::HEAD) {
                        halt(ctx, Status::NOT_MODIFIED);
                    } else {
                        halt(ctx, Status::PRECONDITION_FAILED);
                    }
                    return None;
                }
            }
            Some(Node::L13IfModifiedSinceExists)
        }

        Node::L13IfModifiedSinceExists => {
            if matches!(ctx.request.method, Method::GET | Method::HEAD) {
                if let Some(since) = ctx.request.headers.get_one("if-modified-since") {
                    if let (Ok(since), Some(last_modified)) = (httpdate::parse_http_date(since), ctx.last_modified) {
                        if std::time::SystemTime::from(last_modified) <= since {
                            halt(ctx, Status::NOT_MODIFIED);
                            return None;
                        }
                    }
                }
            }
            Some(Node::M16DeleteOrPost)
        }

        // Existence branch: resource is gone or never existed.
        Node::K5MovedPermanentlyGone => {
            let outcome = resource.moved_permanently(ctx_dup(ctx)).await;
            if let Some(location) = unwrap_outcome(ctx, outcome)? {
                ctx.response.headers.set("Location", location);
                halt(ctx, Status::MOVED_PERMANENTLY);
                return None;
            }
            Some(Node::K7PreviouslyExisted)
        }

        Node::K7PreviouslyExisted => {
            let outcome = resource.previously_existed(ctx_dup(ctx)).await;
            let previously = resolve_bool(ctx, outcome)?;
            if previously {
                Some(Node::L5MovedTemporarily)
            } else {
                Some(Node::L7PostHandlingGone)
            }
        }

        Node::L5MovedTemporarily => {
            let outcome = resource.moved_temporarily(ctx_dup(ctx)).await;
            if let Some(location) = unwrap_outcome(ctx, outcome)? {
                ctx.response.headers.set("Location", location);
                halt(ctx, Status::FOUND);
                return None;
            }
            halt(ctx, Status::GONE);
            None
        }

        Node::L7PostHandlingGone => {
            if ctx.request.method == Method::POST {
                let outcome = resource.allow_missing_post(ctx_dup(ctx)).await;
                let allow_missing = resolve_bool(ctx, outcome)?;
                if allow_missing {
                    return Some(Node::N5PostAsCreateOrProcess);
                }
            }
            halt(ctx, Status::NOT_FOUND);
            None
        }

        // Action branch: resource exists.
        Node::M16DeleteOrPost => match ctx.request.method {
            Method::DELETE => Some(Node::M5PostOrMkcol),
            Method::POST => Some(Node::N5PostAsCreateOrProcess),
            _ => Some(Node::O14Conflict),
        },

        Node::M5PostOrMkcol => {
            let outcome = resource.delete_resource(ctx_dup(ctx)).await;
            let deleted = resolve_bool(ctx, outcome)?;
            if !deleted {
                halt(ctx, Status::INTERNAL_SERVER_ERROR);
                return None;
            }
            let outcome = resource.delete_completed(ctx_dup(ctx)).await;
            let completed = resolve_bool(ctx, outcome)?;
            halt(ctx, if completed { Status::NO_CONTENT } else { Status::ACCEPTED });
            None
        }

        Node::N5PostAsCreateOrProcess => {
            let outcome = resource.post_is_create(ctx_dup(ctx)).await;
            let is_create = resolve_bool(ctx, outcome)?;
            if is_create {
                match resource.create_path(ctx) {
                    Some(path) => {
                        ctx.response.headers.set("Location", path);
                        halt(ctx, Status::CREATED);
                    }
                    None => halt(ctx, Status::INTERNAL_SERVER_ERROR),
                }
                return None;
            }

            let outcome = resource.process_post(ctx_dup(ctx)).await;

            let handled = resolve_bool(ctx, outcome)?;
            if !handled {
                halt(ctx, Status::INTERNAL_SERVER_ERROR);
                return None;
            }
            Some(Node::O14Conflict)
        }

        Node::O14Conflict => {
            let outcome = resource.is_conflict(ctx_dup(ctx)).await;
            let conflict = resolve_bool(ctx, outcome)?;
            if conflict {
                halt(ctx, Status::CONFLICT);
                return None;
            }
            if ctx.request.method == Method::PUT {
                Some(Node::O16Put)
            } else {
                Some(Node::O18MultipleRepresentations)
            }
        }

        Node::O16Put => Some(Node::P3ConflictOnCreate),

        Node::P3ConflictOnCreate => {
            let outcome = resource.is_conflict(ctx_dup(ctx)).await;
            let conflict = resolve_bool(ctx, outcome)?;
            if conflict {
                halt(ctx, Status::CONFLICT);
                return None;
            }
            Some(Node::P11NewResource)
        }

        Node::P11NewResource => {
            halt(ctx, Status::NO_CONTENT);
            None
        }

        Node::O18MultipleRepresentations => {
            let outcome = resource.multiple_choices(ctx_dup(ctx)).await;
            let multiple = resolve_bool(ctx, outcome)?;
            if multiple {
                halt(ctx, Status::MULTIPLE_CHOICES);
                return None;
            }
            Some(Node::O20HasEntity)
        }

        Node::O20HasEntity => {
            let idx = render_index(ctx).unwrap_or(0);
            Some(Node::Render(idx))
        }

        Node::Render(idx) => {
            let providers = resource.content_types_provided();
            let Some((_, renderer)) = providers.get(idx) else {
                halt(ctx, Status::INTERNAL_SERVER_ERROR);
                return None;
            };
            match renderer(ctx, resource) {
                Outcome::Success(body) => {
                    ctx.response.body = Some(body);
                    halt(ctx, Status::OK);
                    None
                }
                Outcome::Halt(status) => {
                    halt(ctx, status);
                    None
                }
                Outcome::Error(e) => {
                    tracing::error!(error = %e, "renderer error");
                    halt(ctx, Status::INTERNAL_SERVER_ERROR);
                    None
                }
            }
        }

    }
}

fn store_renderer_index(ctx: &mut RequestContext, idx: usize) {
    ctx.renderer_index = Some(idx);
}

fn render_index(ctx: &RequestContext) -> Option<usize> {
    ctx.renderer_index
}

fn unwrap_outcome<T>(ctx: &mut RequestContext, outcome: Outcome<T>) -> Option<T> {
    match outcome {
        Outcome::Success(v) => Some(v),
        Outcome::Halt(status) => {
            halt(ctx, status);
            None
        }
        Outcome::Error(e) => {
            tracing::error!(error = %e, "controller error");
            halt(ctx, Status::INTERNAL_SERVER_ERROR);
            None
        }
    }
}

/// A short-lived reborrow, needed because trait methods take `&mut
/// RequestContext` while the surrounding `step` body also holds `ctx`
/// mutably across the call; reborrowing keeps each call site honest about
/// which fields it touches afterward.
fn ctx_dup(ctx: &mut RequestContext) -> &mut RequestContext {
    ctx
}

fn cache_conditional_fields<R: Resource>(ctx: &mut RequestContext, resource: &mut R) {
    if ctx.etag.is_none() {
        ctx.etag = resource.generate_etag(ctx_for_cache(ctx));
    }
    if ctx.last_modified.is_none() {
        ctx.last_modified = resource.last_modified(ctx_for_cache(ctx));
    }
    if ctx.expires.is_none() {
        ctx.expires = resource.expires(ctx_for_cache(ctx));
    }
}

fn ctx_for_cache(ctx: &mut RequestContext) -> &mut RequestContext {
    ctx
}

/// Evaluates an `If-Match`/`If-None-Match` header against a cached ETag.
/// `*` matches iff the resource exists, per `exists` — both call sites only
/// reach this after `resource_exists` returned true, so `*` always matches
/// there regardless of whether the controller supplied an ETag. `strong`
/// selects strong comparison (`If-Match`) vs weak (`If-None-Match`).
fn if_match_satisfied(header: &str, etag: Option<&str>, exists: bool, strong: bool) -> bool {
    if header.trim() == "*" {
        return exists;
    }

    let Some(etag) = etag else { return false };
    header.split(',').any(|candidate| {
        let candidate = candidate.trim();
        if strong {
            candidate == etag && !candidate.starts_with("W/")
        } else {
            let stripped = candidate.strip_prefix("W/").unwrap_or(candidate);
            let etag_stripped = etag.strip_prefix("W/").unwrap_or(etag);
            stripped == etag_stripped
        }
    })
}

/// Normalizes the `Range` header (if any) against the body's known length,
/// honoring `range_ok`. Called by the caller once a body with known length
/// has been chosen, since normalization needs the body size.
pub fn normalize_range(ctx: &RequestContext, body_len: u64) -> Vec<ByteRange> {
    if !ctx.range_ok {
        return Vec::new();
    }
    match ctx.range.as_ref() {
        Some(spec) => range::normalize(spec, body_len),
        None => Vec::new(),
    }
}

pub fn parse_range_header(ctx: &mut RequestContext) {
    if !ctx.range_ok {
        return;
    }
    if let Some(header) = ctx.request.headers.get_one("range") {
        ctx.range = range::parse(header);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::http::HeaderMap;
    use crate::request::{Origin, RequestContext, RequestFacet};
    use std::net::{IpAddr, Ipv4Addr};

    struct Default404;

    #[derive(Debug)]
    struct NoError;
    impl std::fmt::Display for NoError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "no error")
        }
    }
    impl std::error::Error for NoError {}

    #[async_trait::async_trait]
    impl Resource for Default404 {
        type Error = NoError;
    }

    fn test_context(method: Method) -> RequestContext {
        let origin = Origin {
            scheme: "http".into(),
            host: "a".into(),
            port: 80,
            remote_ip: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            remote: "127.0.0.1".into(),
            via_proxy: false,
        };
        let facet = RequestFacet {
            method,
            version: (1, 1),
            path: "/x".into(),
            query: None,
            headers: HeaderMap::new(),
            peer_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            origin,
        };
        RequestContext::new(facet)
    }

    #[tokio::test]
    async fn simple_get_renders_default_html() {
        struct Echo;

        #[async_trait::async_trait]
        impl Resource for Echo {
            type Error = NoError;

            fn content_types_provided(&self) -> Vec<(MediaType, crate::resource::Renderer<Self>)> {
                vec![(MediaType::text_html(), |_ctx, _res| Outcome::success(Body::from_static(b"hi")))]
            }
        }

        let mut ctx = test_context(Method::GET);
        let mut resource = Echo;
        run(&mut ctx, &mut resource).await;

        assert_eq!(ctx.response.status, Some(Status::OK));
        match ctx.response.body {
            Some(Body::Bytes(b)) => assert_eq!(&b[..], b"hi"),
            _ => panic!("expected bytes body"),
        }
    }

    #[tokio::test]
    async fn options_reflects_resource_options() {
        struct WithOptions;

        #[async_trait::async_trait]
        impl Resource for WithOptions {
            type Error = NoError;

            fn options(&self) -> Vec<(String, String)> {
                vec![("Allow".to_string(), "GET, HEAD".to_string())]
            }
        }

        let mut ctx = test_context(Method::OPTIONS);
        let mut resource = WithOptions;
        run(&mut ctx, &mut resource).await;

        assert_eq!(ctx.response.status, Some(Status::OK));
        assert_eq!(ctx.response.headers.get_one("allow"), Some("GET, HEAD"));
    }

    #[tokio::test]
    async fn unknown_method_is_not_implemented() {
        let mut ctx = test_context(Method::PATCH);
        let mut resource = Default404;
        run(&mut ctx, &mut resource).await;
        assert_eq!(ctx.response.status, Some(Status::NOT_IMPLEMENTED));
    }

    #[tokio::test]
    async fn if_none_match_wildcard_yields_not_modified_on_get() {
        struct Tagged;

        #[async_trait::async_trait]
        impl Resource for Tagged {
            type Error = NoError;

            fn generate_etag(&mut self, _ctx: &mut RequestContext) -> Option<String> {
                Some("\"v1\"".to_string())
            }
        }

        let mut ctx = test_context(Method::GET);
        ctx.request.headers.set("If-None-Match", "*");
        let mut resource = Tagged;
        run(&mut ctx, &mut resource).await;
        assert_eq!(ctx.response.status, Some(Status::NOT_MODIFIED));
    }

    #[tokio::test]
    async fn expires_is_cached_from_resource_for_the_adapter_to_emit() {
        use std::time::{Duration, SystemTime};

        struct Expiring;

        #[async_trait::async_trait]
        impl Resource for Expiring {
            type Error = NoError;

            fn expires(&mut self, _ctx: &mut RequestContext) -> Option<httpdate::HttpDate> {
                Some((SystemTime::UNIX_EPOCH + Duration::from_secs(4_000_000_000)).into())
            }
        }

        let mut ctx = test_context(Method::GET);
        let mut resource = Expiring;
        run(&mut ctx, &mut resource).await;

        let expected = httpdate::fmt_http_date(SystemTime::UNIX_EPOCH + Duration::from_secs(4_000_000_000));
        assert_eq!(ctx.expires.map(|e| httpdate::fmt_http_date(e.into())), Some(expected));
    }

    #[tokio::test]
    async fn if_match_wildcard_succeeds_without_etag_when_resource_exists() {
        let mut ctx = test_context(Method::GET);
        ctx.request.headers.set("If-Match", "*");
        let mut resource = Default404;
        run(&mut ctx, &mut resource).await;
        assert_eq!(ctx.response.status, Some(Status::OK));
    }

    #[tokio::test]
    async fn if_none_match_wildcard_yields_not_modified_without_etag() {
        let mut ctx = test_context(Method::GET);
        ctx.request.headers.set("If-None-Match", "*");
        let mut resource = Default404;
        run(&mut ctx, &mut resource).await;
        assert_eq!(ctx.response.status, Some(Status::NOT_MODIFIED));
    }
}
