//! Response building.
//!
//! # Responsibilities
//! - Collect headers and cookies set by the handler
//! - Finish with a JSON, HTML, file, template or empty body
//!
//! # Design Decisions
//! - Finishing consumes the builder, so a response is written once
//! - Failures are returned as `EssenError` instead of aborting the request

use std::path::Path;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
};
use minijinja::Environment;
use serde::Serialize;

use crate::error::{EssenError, EssenResult};

/// A `Set-Cookie` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Seconds. `0` omits the attribute, negative expires the cookie now.
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
    pub path: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: 0,
            secure: false,
            http_only: false,
            path: None,
        }
    }

    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Render the `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut cookie = format!("{}={}", self.name, self.value);

        if let Some(path) = &self.path {
            cookie.push_str(&format!("; Path={}", path));
        }

        if self.max_age > 0 {
            cookie.push_str(&format!("; Max-Age={}", self.max_age));
        } else if self.max_age < 0 {
            cookie.push_str("; Max-Age=0");
        }

        if self.http_only {
            cookie.push_str("; HttpOnly");
        }

        if self.secure {
            cookie.push_str("; Secure");
        }

        cookie
    }
}

/// Response under construction.
#[derive(Debug, Default)]
pub struct Response {
    headers: HeaderMap,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set header `key` to `value`, replacing earlier values.
    ///
    /// Invalid names or values are logged and skipped.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        match (
            HeaderName::try_from(key),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = key, "Ignoring invalid response header"),
        }
        self
    }

    /// Append a `Set-Cookie` header.
    pub fn cookie(&mut self, cookie: Cookie) -> &mut Self {
        match HeaderValue::try_from(cookie.to_header_value()) {
            Ok(value) => {
                self.headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!(cookie = %cookie.name, "Ignoring invalid cookie"),
        }
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn finish(mut self, status: StatusCode, content_type: Option<&'static str>, body: Body) -> axum::response::Response {
        if let Some(ct) = content_type {
            self.headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        let mut response = axum::response::Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }

    /// Serialize `value` as a JSON body.
    pub fn json<T: Serialize + ?Sized>(self, status: StatusCode, value: &T) -> EssenResult<axum::response::Response> {
        let bytes = serde_json::to_vec(value).map_err(|e| EssenError::JsonError(e.to_string()))?;
        Ok(self.finish(status, Some("application/json"), Body::from(bytes)))
    }

    /// HTML body.
    pub fn send(self, status: StatusCode, html: impl Into<String>) -> axum::response::Response {
        self.finish(status, Some("text/html"), Body::from(html.into()))
    }

    /// Empty body.
    pub fn send_status(self, status: StatusCode) -> axum::response::Response {
        self.finish(status, None, Body::empty())
    }

    /// Send the contents of the file at `path`. Returns the byte count.
    pub async fn send_file(self, status: StatusCode, path: impl AsRef<Path>) -> EssenResult<(u64, axum::response::Response)> {
        use tokio::io::AsyncReadExt;

        let path = path.as_ref();
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| EssenError::PathError(format!("open {}: {}", path.display(), e)))?;

        let mut bytes = Vec::new();
        let n = file
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| EssenError::FileCopy(format!("read {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), bytes = n, "Sending file");
        Ok((n as u64, self.finish(status, None, Body::from(bytes))))
    }

    /// Render the template file at `path` with `data`.
    ///
    /// `configure` can register filters and functions before rendering.
    pub async fn render<T, F>(
        self,
        status: StatusCode,
        path: impl AsRef<Path>,
        data: &T,
        configure: F,
    ) -> EssenResult<axum::response::Response>
    where
        T: Serialize + Sync + ?Sized,
        F: FnOnce(&mut Environment<'_>) + Send,
    {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| EssenError::PathError(format!("not a template file: {}", path.display())))?;
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EssenError::PathError(format!("read {}: {}", path.display(), e)))?;

        let rendered = {
            let mut env = Environment::new();
            configure(&mut env);
            env.add_template(&name, &source)
                .map_err(|e| EssenError::TemplateError(e.to_string()))?;
            let template = env
                .get_template(&name)
                .map_err(|e| EssenError::TemplateError(e.to_string()))?;
            template
                .render(data)
                .map_err(|e| EssenError::TemplateError(e.to_string()))?
        };

        Ok(self.finish(status, Some("text/html; charset=utf-8"), Body::from(rendered)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_cookie_header_value() {
        let c = Cookie::new("session", "abc").with_max_age(3600).secure(true).http_only(true);
        assert_eq!(c.to_header_value(), "session=abc; Max-Age=3600; HttpOnly; Secure");

        let c = Cookie::new("gone", "").with_max_age(-1).with_path("/");
        assert_eq!(c.to_header_value(), "gone=; Path=/; Max-Age=0");

        assert_eq!(Cookie::new("a", "b").to_header_value(), "a=b");
    }

    #[tokio::test]
    async fn test_json_response() {
        let mut res = Response::new();
        res.set("X-Custom", "1");
        let response = res.json(StatusCode::CREATED, &json!({"ok": true})).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.headers()["x-custom"], "1");
        assert_eq!(body_string(response).await, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_send_and_status() {
        let mut res = Response::new();
        res.cookie(Cookie::new("a", "1")).cookie(Cookie::new("b", "2"));
        let response = res.send(StatusCode::OK, "<p>hi</p>");
        assert_eq!(response.headers()["content-type"], "text/html");
        assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
        assert_eq!(body_string(response).await, "<p>hi</p>");

        let response = Response::new().send_status(StatusCode::NO_CONTENT);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_string(response).await.is_empty());
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let mut res = Response::new();
        res.set("bad header", "x").set("X-Ok", "line\nbreak");
        assert!(res.headers().is_empty());
    }

    #[tokio::test]
    async fn test_send_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, b"payload").unwrap();

        let (n, response) = Response::new().send_file(StatusCode::OK, &path).await.unwrap();
        assert_eq!(n, 7);
        assert_eq!(body_string(response).await, "payload");

        let err = Response::new()
            .send_file(StatusCode::OK, dir.path().join("missing.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "PathError");
    }

    #[tokio::test]
    async fn test_render_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.html");
        std::fs::write(&path, "<h1>Hello {{ name | shout }}!</h1>").unwrap();

        let response = Response::new()
            .render(StatusCode::OK, &path, &json!({"name": "World"}), |env| {
                env.add_filter("shout", |s: String| s.to_uppercase());
            })
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "<h1>Hello WORLD!</h1>");
    }

    #[tokio::test]
    async fn test_render_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = Response::new()
            .render(StatusCode::OK, dir.path().join("none.html"), &json!({}), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "PathError");

        let path = dir.path().join("broken.html");
        std::fs::write(&path, "{% if %}").unwrap();
        let err = Response::new()
            .render(StatusCode::OK, &path, &json!({}), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "TemplateError");
    }
}
