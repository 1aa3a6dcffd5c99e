//! Request body sources.
//!
//! # Data Flow
//! ```text
//! method + Content-Type
//!     → select_source() (pure dispatch)
//!     → QuerySource | FormSource | MultipartSource
//!     → BodySource::param(name)
//! ```
//!
//! # Design Decisions
//! - A source is selected once per request and never re-resolved
//! - Empty values are reported exactly like missing ones
//! - Only multipart file lookups have side effects

pub mod form;
pub mod multipart;
pub mod query;

pub use form::{FormSource, FORM_URLENCODED};
pub use multipart::{MultipartSource, UploadedFile};
pub use query::QuerySource;

use axum::http::Method;

use crate::error::EssenResult;
use crate::observability::metrics;

/// MIME type that selects the multipart source.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Which source a request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Query,
    Form,
    Multipart,
    /// No source for this method.
    Unsupported,
}

/// Pick the body source for a request.
///
/// `content_type` must already be normalized (multipart parameters
/// stripped). Multipart wins over the method check.
pub fn select_source(method: &Method, content_type: Option<&str>) -> SourceKind {
    if content_type == Some(MULTIPART_FORM_DATA) {
        return SourceKind::Multipart;
    }
    if method == Method::GET || method == Method::HEAD {
        return SourceKind::Query;
    }
    if method == Method::POST {
        return SourceKind::Form;
    }
    SourceKind::Unsupported
}

/// The resolved parameter source of one request.
#[derive(Debug)]
pub enum BodySource {
    Query(QuerySource),
    Form(FormSource),
    Multipart(MultipartSource),
}

impl BodySource {
    pub fn kind(&self) -> SourceKind {
        match self {
            BodySource::Query(_) => SourceKind::Query,
            BodySource::Form(_) => SourceKind::Form,
            BodySource::Multipart(_) => SourceKind::Multipart,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            BodySource::Query(_) => "query",
            BodySource::Form(_) => "form",
            BodySource::Multipart(_) => "multipart",
        }
    }

    /// Get the parameter `name` from this source.
    pub async fn param(&self, name: &str) -> EssenResult<String> {
        let result = match self {
            BodySource::Query(s) => s.param(name),
            BodySource::Form(s) => s.param(name),
            BodySource::Multipart(s) => s.param(name).await,
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::record_param(self.label(), outcome);
        tracing::trace!(source = self.label(), param = name, outcome, "Parameter lookup");

        result
    }
}
