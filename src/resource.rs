//! The controller contract.
//!
//! A resource controller implements whichever callbacks it needs; every
//! method here has a default matching the table of built-in defaults, so a
//! controller that only cares about e.g. `content_types_provided` and
//! `delete_resource` need not implement anything else. Because these are
//! trait default methods rather than a reflective name lookup, "does the
//! controller implement this callback" is a compile-time fact, not a
//! runtime check.

use async_trait::async_trait;

use crate::body::Body;
use crate::http::{MediaType, Method};
use crate::outcome::Outcome;
use crate::request::RequestContext;

/// A render function chosen by content negotiation: given the context,
/// produces the response body for the negotiated representation.
pub type Renderer<R> = fn(&mut RequestContext, &mut R) -> Outcome<Body>;

/// Whether a POST was accepted as a resource-create, and if so, the
/// resulting status, mirroring the `post_is_create` / `create_path` pair.
pub enum PostDisposition {
    /// `process_post` handles the request directly.
    Process,
    /// The POST creates a new resource at the path `create_path` returns;
    /// the engine synthesizes 201 with `Location`.
    Create,
}

#[async_trait]
pub trait Resource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    // --- boolean defaults: true ---

    async fn service_available(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(true)
    }

    async fn resource_exists(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(true)
    }

    async fn auth_required(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(true)
    }

    async fn is_authorized(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(true)
    }

    async fn known_content_type(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(true)
    }

    async fn valid_content_headers(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(true)
    }

    async fn valid_entity_length(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(true)
    }

    async fn language_available(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(true)
    }

    async fn finish_request(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(true)
    }

    async fn delete_completed(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(true)
    }

    // --- boolean defaults: false ---

    async fn forbidden(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(false)
    }

    async fn allow_missing_post(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(false)
    }

    async fn malformed_request(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(false)
    }

    async fn uri_too_long(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(false)
    }

    async fn delete_resource(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(false)
    }

    async fn post_is_create(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(false)
    }

    async fn is_conflict(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(false)
    }

    async fn multiple_choices(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(false)
    }

    async fn previously_existed(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(false)
    }

    async fn moved_permanently(&mut self, _ctx: &mut RequestContext) -> Outcome<Option<String>> {
        Outcome::success(None)
    }

    async fn moved_temporarily(&mut self, _ctx: &mut RequestContext) -> Outcome<Option<String>> {
        Outcome::success(None)
    }

    /// Drives a POST that is not a create. May halt with a status (a
    /// redirect or otherwise) via `Outcome::Halt`.
    async fn process_post(&mut self, _ctx: &mut RequestContext) -> Outcome<bool> {
        Outcome::success(false)
    }

    // --- sequence defaults: empty ---

    fn upgrades_provided(&self) -> Vec<String> {
        Vec::new()
    }

    fn options(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn content_types_accepted(&self) -> Vec<MediaType> {
        Vec::new()
    }

    fn transfer_encodings_provided(&self) -> Vec<String> {
        Vec::new()
    }

    fn variances(&self) -> Vec<String> {
        Vec::new()
    }

    // --- structural defaults ---

    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::HEAD]
    }

    fn known_methods(&self) -> Vec<Method> {
        vec![
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::TRACE,
            Method::CONNECT,
            Method::OPTIONS,
        ]
    }

    /// `(media type, renderer)` pairs in preference order. The default
    /// offers only `text/html`, rendered by [`Resource::to_html`].
    fn content_types_provided(&self) -> Vec<(MediaType, Renderer<Self>)>
    where
        Self: Sized,
    {
        vec![(MediaType::text_html(), Resource::to_html)]
    }

    /// Default renderer backing the default `content_types_provided`
    /// entry. A controller overriding `content_types_provided` typically
    /// supplies its own renderers and never calls this.
    fn to_html(_ctx: &mut RequestContext, _res: &mut Self) -> Outcome<Body>
    where
        Self: Sized,
    {
        Outcome::success(Body::from_static(b""))
    }

    fn content_encodings_provided(&self) -> Vec<String> {
        vec!["identity".to_string()]
    }

    /// Offered charsets, or `None` for the `no-charset` sentinel (the
    /// default): charset negotiation is skipped entirely and no `charset`
    /// parameter is appended to `Content-Type`.
    fn charsets_provided(&self) -> Option<Vec<String>> {
        None
    }

    fn create_path(&mut self, _ctx: &mut RequestContext) -> Option<String> {
        None
    }

    fn base_uri(&mut self, _ctx: &mut RequestContext) -> Option<String> {
        None
    }

    fn last_modified(&mut self, _ctx: &mut RequestContext) -> Option<httpdate::HttpDate> {
        None
    }

    fn expires(&mut self, _ctx: &mut RequestContext) -> Option<httpdate::HttpDate> {
        None
    }

    fn generate_etag(&mut self, _ctx: &mut RequestContext) -> Option<String> {
        None
    }
}
