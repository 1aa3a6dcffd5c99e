//! Request context handed to handlers.
//!
//! # Responsibilities
//! - Expose method, path, host, header and cookie accessors
//! - Resolve the body source on first parameter access
//! - Keep the resolved source for the life of the request
//!
//! # Design Decisions
//! - Resolution happens at most once; a failure is remembered and returned
//!   again instead of aborting the request
//! - A missing `Content-Type` is not an error, it just is not multipart
//! - Body reads are bounded by the configured body limit

use std::borrow::Cow;
use std::mem;

use axum::body::Body;
use axum::http::{request::Parts, uri::Authority, HeaderMap, Method, Uri};

use crate::error::{EssenError, EssenResult};
use crate::http::body::{
    select_source, BodySource, FormSource, MultipartSource, QuerySource, SourceKind,
};
use crate::upload::UploadSettings;

enum BodyState {
    Pending(Body),
    Resolved(Option<BodySource>),
    Failed(EssenError),
}

/// An inbound request with lazily resolved parameters.
pub struct Request {
    parts: Parts,
    body: BodyState,
    uploads: UploadSettings,
    max_body_bytes: usize,
}

impl Request {
    /// Wrap a raw request.
    pub fn new(request: axum::extract::Request, uploads: UploadSettings, max_body_bytes: usize) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: BodyState::Pending(body),
            uploads,
            max_body_bytes,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Host from the request URI, or from the `Host` header for
    /// origin-form requests.
    pub fn host(&self) -> Option<&str> {
        self.parts
            .uri
            .host()
            .or_else(|| self.header_str("host").and_then(host_from_header))
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn header_str(&self, key: &str) -> Option<&str> {
        header_value(&self.parts.headers, key)
    }

    /// True when `key` is present with a non-empty value.
    pub fn has_header(&self, key: &str) -> bool {
        header_text(&self.parts.headers, key).is_some()
    }

    /// Value of header `key`.
    ///
    /// `multipart/*` values are cut at the first `;`, so
    /// `multipart/form-data; boundary=xyz` yields `multipart/form-data`.
    /// Bytes outside UTF-8 are replaced with U+FFFD.
    pub fn header(&self, key: &str) -> EssenResult<String> {
        header_text(&self.parts.headers, key)
            .map(|v| normalize_header(&v))
            .ok_or_else(|| EssenError::NoHeader("No Header Found".to_string()))
    }

    /// Value of cookie `name` from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.parts
            .headers
            .get_all("cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.trim_matches('"').to_string())
    }

    /// Which source this request resolves to, without reading the body.
    pub fn source_kind(&self) -> SourceKind {
        source_kind(&self.parts)
    }

    /// Resolve the body source on first call and return it.
    ///
    /// `Ok(None)` means the method has no body source.
    pub async fn body(&mut self) -> EssenResult<Option<&BodySource>> {
        if matches!(self.body, BodyState::Pending(_)) {
            // Stays in place if this future is dropped before resolution ends.
            let interrupted = BodyState::Failed(EssenError::FormParseError(
                "body resolution interrupted".to_string(),
            ));
            if let BodyState::Pending(body) = mem::replace(&mut self.body, interrupted) {
                let resolved =
                    Self::resolve(&self.parts, &self.uploads, self.max_body_bytes, body).await;
                self.body = match resolved {
                    Ok(source) => BodyState::Resolved(source),
                    Err(e) => BodyState::Failed(e),
                };
            }
        }

        match &self.body {
            BodyState::Resolved(source) => Ok(source.as_ref()),
            BodyState::Failed(e) => Err(e.clone()),
            BodyState::Pending(_) => Ok(None),
        }
    }

    // Takes the fields it needs rather than `&self`, which is not `Sync`
    // while the raw body is still held.
    async fn resolve(
        parts: &Parts,
        uploads: &UploadSettings,
        max_body_bytes: usize,
        body: Body,
    ) -> EssenResult<Option<BodySource>> {
        let kind = source_kind(parts);
        tracing::debug!(method = %parts.method, path = %parts.uri.path(), source = ?kind, "Resolving request body");

        match kind {
            SourceKind::Multipart => {
                uploads.get_or_init_default();
                let request = rebuild(parts, body);
                let source = MultipartSource::from_request(request, uploads.clone()).await;
                Ok(Some(BodySource::Multipart(source)))
            }
            SourceKind::Query => Ok(Some(BodySource::Query(QuerySource::from_query(
                parts.uri.query(),
            )))),
            SourceKind::Form => {
                let bytes = axum::body::to_bytes(body, max_body_bytes)
                    .await
                    .map_err(|e| EssenError::FormParseError(format!("read form body: {}", e)))?;
                let content_type = header_value(&parts.headers, "content-type");
                let form = FormSource::parse(content_type, &bytes).inspect_err(|e| {
                    tracing::warn!(path = %parts.uri.path(), error = %e, "Form body rejected");
                })?;
                Ok(Some(BodySource::Form(form)))
            }
            SourceKind::Unsupported => Ok(None),
        }
    }

    /// Get the parameter `name`, resolving the body source if needed.
    pub async fn param(&mut self, name: &str) -> EssenResult<String> {
        let method = self.parts.method.clone();
        match self.body().await? {
            Some(source) => source.param(name).await,
            None => Err(EssenError::NoBody(format!(
                "No parameter source for method {}",
                method
            ))),
        }
    }

    /// Request id assigned by the server, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.header_str(crate::http::request_id::X_REQUEST_ID)
    }
}

fn header_value<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    headers
        .get(key)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn header_text<'a>(headers: &'a HeaderMap, key: &str) -> Option<Cow<'a, str>> {
    headers
        .get(key)
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
        .filter(|v| !v.is_empty())
}

fn host_from_header(value: &str) -> Option<&str> {
    let authority = value.parse::<Authority>().ok()?;
    let host = authority.host();
    value
        .find(host)
        .map(|start| &value[start..start + host.len()])
}

fn normalize_header(value: &str) -> String {
    if value.starts_with("multipart") {
        return value.split(';').next().unwrap_or(value).to_string();
    }
    value.to_string()
}

fn source_kind(parts: &Parts) -> SourceKind {
    let content_type = header_value(&parts.headers, "content-type").map(normalize_header);
    select_source(&parts.method, content_type.as_deref())
}

fn rebuild(parts: &Parts, body: Body) -> axum::extract::Request {
    let mut request = axum::extract::Request::new(body);
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = parts.uri.clone();
    *request.version_mut() = parts.version;
    *request.headers_mut() = parts.headers.clone();
    *request.extensions_mut() = parts.extensions.clone();
    request
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .finish_non_exhaustive()
    }
}
