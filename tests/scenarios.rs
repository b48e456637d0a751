//! End-to-end scenarios wiring the decision engine, range normalization, and
//! the response emitter together the way a front-facing transport would.

use std::net::{IpAddr, Ipv4Addr};

use truss::body::Body;
use truss::config::{Config, ProxyTrust};
use truss::engine;
use truss::http::{HeaderMap, MediaType, Method, Status};
use truss::request::{Origin, RequestContext, RequestFacet};
use truss::resource::{Renderer, Resource};
use truss::{proxy, Outcome};

#[derive(Debug)]
struct NoError;
impl std::fmt::Display for NoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no error")
    }
}
impl std::error::Error for NoError {}

fn request_context(method: Method, path: &str, headers: HeaderMap) -> RequestContext {
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
        path: path.into(),
        query: None,
        headers,
        peer_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        origin,
    };
    RequestContext::new(facet)
}

/// An in-memory [`truss::emitter::Transport`], recording exactly what a real
/// connection would have been asked to write.
struct RecordingTransport {
    status: Option<Status>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl RecordingTransport {
    fn new() -> Self {
        RecordingTransport { status: None, headers: HeaderMap::new(), body: Vec::new() }
    }
}

#[async_trait::async_trait]
impl truss::emitter::Transport for RecordingTransport {
    async fn write_status_and_headers(&mut self, status: Status, headers: &HeaderMap) -> std::io::Result<()> {
        self.status = Some(status);
        self.headers = headers.clone();
        Ok(())
    }

    async fn write_chunk(&mut self, data: &[u8], _fin: bool) -> std::io::Result<()> {
        self.body.extend_from_slice(data);
        Ok(())
    }
}

/// Drives a decided request through the emitter, applying the range
/// normalization + 206 promotion a real adapter performs between `engine::run`
/// and `emitter::emit` once it knows the body's length.
async fn emit_decided(ctx: &mut RequestContext, config: &Config) -> RecordingTransport {
    let method = ctx.request.method.clone();
    let mut status = ctx.response.status.unwrap_or(Status::INTERNAL_SERVER_ERROR);

    if let Some(media) = ctx.negotiation.content_type.clone() {
        ctx.response.headers.set("Content-Type", media.to_string());
    }
    if let Some(etag) = ctx.etag.clone() {
        ctx.response.headers.set("ETag", etag);
    }
    if let Some(last_modified) = ctx.last_modified {
        ctx.response.headers.set("Last-Modified", httpdate::fmt_http_date(last_modified.into()));
    }
    if let Some(expires) = ctx.expires {
        ctx.response.headers.set("Expires", httpdate::fmt_http_date(expires.into()));
    }

    let body = ctx.response.body.take();

    let known_length = match &body {
        Some(Body::Bytes(bytes)) if status == Status::OK => Some(bytes.len() as u64),
        Some(Body::FilePath(path)) if status == Status::OK => {
            Some(std::fs::metadata(path).unwrap().len())
        }
        _ => None,
    };
    let ranges = match known_length {
        Some(len) => engine::normalize_range(ctx, len),
        None => Vec::new(),
    };
    if !ranges.is_empty() {
        status = Status::PARTIAL_CONTENT;
    }

    let response = truss::emitter::Response { status, headers: std::mem::take(&mut ctx.response.headers), body };
    let mut transport = RecordingTransport::new();
    truss::emitter::emit(response, &method, &ranges, config, &mut transport).await.unwrap();
    transport
}

struct TextResource {
    body: &'static [u8],
    etag: Option<&'static str>,
}

#[async_trait::async_trait]
impl Resource for TextResource {
    type Error = NoError;

    fn content_types_provided(&self) -> Vec<(MediaType, Renderer<Self>)> {
        vec![(MediaType::text_html(), |_ctx, res| Outcome::success(Body::from_static(res.body)))]
    }

    fn generate_etag(&mut self, _ctx: &mut RequestContext) -> Option<String> {
        self.etag.map(str::to_string)
    }
}

/// A resource whose representation is file-backed, the body source the
/// emitter actually range-slices (spec §4.5: a `Bytes` body is always
/// written whole; only file/stream sources honor a normalized `Range`).
struct FileResource {
    path: std::path::PathBuf,
}

#[async_trait::async_trait]
impl Resource for FileResource {
    type Error = NoError;

    fn content_types_provided(&self) -> Vec<(MediaType, Renderer<Self>)> {
        vec![(MediaType::text_html(), |_ctx, res| Outcome::success(Body::path(res.path.clone())))]
    }
}

#[tokio::test]
async fn simple_get() {
    let mut ctx = request_context(Method::GET, "/x", HeaderMap::new());
    let mut resource = TextResource { body: b"hi", etag: None };
    engine::run(&mut ctx, &mut resource).await;

    let transport = emit_decided(&mut ctx, &Config::default()).await;
    assert_eq!(transport.status, Some(Status::OK));
    assert_eq!(transport.headers.get_one("content-type"), Some("text/html"));
    assert_eq!(transport.headers.get_one("content-length"), Some("2"));
    assert_eq!(transport.body, b"hi");
}

#[tokio::test]
async fn suffix_range() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"0123456789").unwrap();

    let mut headers = HeaderMap::new();
    headers.set("Range", "bytes=-3");
    let mut ctx = request_context(Method::GET, "/x", headers);
    engine::parse_range_header(&mut ctx);

    let mut resource = FileResource { path: file.path().to_path_buf() };
    engine::run(&mut ctx, &mut resource).await;

    let transport = emit_decided(&mut ctx, &Config::default()).await;
    assert_eq!(transport.status, Some(Status::PARTIAL_CONTENT));
    assert_eq!(transport.headers.get_one("content-range"), Some("bytes 7-9/10"));
    assert_eq!(transport.headers.get_one("content-length"), Some("3"));
    assert_eq!(transport.body, b"789");
}

#[tokio::test]
async fn multipart_range() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"0123456789").unwrap();

    let mut headers = HeaderMap::new();
    headers.set("Range", "bytes=0-0,-1");
    let mut ctx = request_context(Method::GET, "/x", headers);
    engine::parse_range_header(&mut ctx);

    let mut resource = FileResource { path: file.path().to_path_buf() };
    engine::run(&mut ctx, &mut resource).await;

    let transport = emit_decided(&mut ctx, &Config::default()).await;
    assert_eq!(transport.status, Some(Status::PARTIAL_CONTENT));

    let content_type = transport.headers.get_one("content-type").unwrap();
    assert!(content_type.starts_with("multipart/byteranges; boundary="));

    let body = String::from_utf8(transport.body).unwrap();
    assert!(body.contains("content-range: bytes 0-0/10"));
    assert!(body.contains("content-range: bytes 9-9/10"));
    assert!(body.trim_end().ends_with("--"));
}

#[tokio::test]
async fn conditional_if_none_match() {
    let mut headers = HeaderMap::new();
    headers.set("If-None-Match", "\"v1\"");
    let mut ctx = request_context(Method::GET, "/x", headers);
    let mut resource = TextResource { body: b"hi", etag: Some("\"v1\"") };
    engine::run(&mut ctx, &mut resource).await;

    assert_eq!(ctx.response.status, Some(Status::NOT_MODIFIED));
    assert_eq!(ctx.etag.as_deref(), Some("\"v1\""));

    let transport = emit_decided(&mut ctx, &Config::default()).await;
    assert_eq!(transport.status, Some(Status::NOT_MODIFIED));
    assert!(transport.headers.get_one("content-length").is_none());
    assert!(transport.headers.get_one("content-type").is_none());
    assert_eq!(transport.headers.get_one("etag"), Some("\"v1\""));
}

#[tokio::test]
async fn trusted_proxy_forwarded() {
    let mut headers = HeaderMap::new();
    headers.set("Forwarded", "for=203.0.113.7;proto=https;host=a.example;port=8443");
    let peer = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));

    let origin = proxy::resolve(&headers, peer, "http", &ProxyTrust::Local);

    assert_eq!(origin.remote, "203.0.113.7");
    assert_eq!(origin.scheme, "https");
    assert_eq!(origin.host, "a.example");
    assert_eq!(origin.port, 8443);
    assert!(origin.via_proxy);
}

#[tokio::test]
async fn untrusted_proxy_is_ignored() {
    let mut headers = HeaderMap::new();
    headers.set("Forwarded", "for=203.0.113.7;proto=https;host=a.example;port=8443");
    let peer = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));

    let origin = proxy::resolve(&headers, peer, "http", &ProxyTrust::Local);

    assert_eq!(origin.remote, peer.to_string());
    assert_eq!(origin.scheme, "http");
    assert!(!origin.via_proxy);
}
