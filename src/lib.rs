//! An HTTP/1.1 resource-processing engine: a webmachine-style decision
//! graph that negotiates content type, language, charset and encoding;
//! evaluates authorization, preconditions and conflict rules; dispatches to
//! a pluggable resource controller; and emits a correctly-framed response
//! including range requests, multipart byte ranges, and streamed or
//! file-backed bodies.
//!
//! A front-facing transport parses bytes into a request, resolves the
//! authoritative scheme/host/port/remote through [`proxy`] under a trust
//! policy, builds a [`request::RequestContext`], hands it and a
//! [`resource::Resource`] implementation to [`engine::run`], and passes the
//! result to [`emitter::emit`].

pub mod body;
pub mod config;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod http;
pub mod outcome;
pub mod proxy;
pub mod range;
pub mod request;
pub mod resource;
pub mod trace;

pub use body::Body;
pub use config::Config;
pub use error::EngineError;
pub use http::{HeaderMap, MediaType, Method, Status};
pub use outcome::Outcome;
pub use request::RequestContext;
pub use resource::Resource;
