//! HTTP primitives: method/status reused from the [`http`] crate, plus
//! media types, content negotiation, and the header map this engine builds
//! its own request/response model on top of.

pub mod headers;
pub mod media_type;
pub mod negotiation;

pub use headers::HeaderMap;
pub use http::{Method, StatusCode as Status};
pub use media_type::MediaType;
