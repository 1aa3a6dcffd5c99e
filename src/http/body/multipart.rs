//! Parameters from a `multipart/form-data` body.
//!
//! The body stream is drained once when the source is built. File fields are
//! written to the upload directory each time they are looked up.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};

use crate::error::{EssenError, EssenResult};
use crate::http::body::QuerySource;
use crate::upload::{store_upload, UploadSettings};

/// A file attached to a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as sent by the client.
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Fields of a multipart request plus the shared upload settings.
#[derive(Debug)]
pub struct MultipartSource {
    settings: UploadSettings,
    files: HashMap<String, UploadedFile>,
    values: HashMap<String, String>,
    query: QuerySource,
    parse_error: Option<String>,
}

impl MultipartSource {
    /// Read every part of `request`.
    ///
    /// A malformed body does not fail construction. The error is kept and
    /// returned by each later lookup.
    pub async fn from_request(request: Request, settings: UploadSettings) -> Self {
        let query = QuerySource::from_query(request.uri().query());
        let mut source = Self {
            settings,
            files: HashMap::new(),
            values: HashMap::new(),
            query,
            parse_error: None,
        };

        let mut multipart = match Multipart::from_request(request, &()).await {
            Ok(m) => m,
            Err(rejection) => {
                tracing::warn!(error = %rejection.body_text(), "Rejected multipart body");
                source.parse_error = Some(rejection.body_text());
                return source;
            }
        };

        if let Err(e) = source.drain(&mut multipart).await {
            tracing::warn!(error = %e, "Failed to read multipart body");
            source.parse_error = Some(e);
        }

        tracing::debug!(
            files = source.files.len(),
            values = source.values.len(),
            "Multipart body read"
        );
        source
    }

    async fn drain(&mut self, multipart: &mut Multipart) -> Result<(), String> {
        while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let filename = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(str::to_owned);
            let data = field.bytes().await.map_err(|e| e.body_text())?;

            match filename {
                Some(filename) if !filename.is_empty() => {
                    self.files.entry(name).or_insert(UploadedFile {
                        filename,
                        content_type,
                        data,
                    });
                }
                _ => {
                    let text = String::from_utf8(data.to_vec())
                        .map_err(|e| format!("field {} is not UTF-8: {}", name, e))?;
                    self.values.entry(name).or_insert(text);
                }
            }
        }
        Ok(())
    }

    /// The file attached under `name`, without touching the disk.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    /// Look up `name`.
    ///
    /// A file field is copied to `<upload_dir>/<filename>` on every call and
    /// the destination path is returned. Otherwise the plain value is
    /// returned, falling back to the query string.
    pub async fn param(&self, name: &str) -> EssenResult<String> {
        if let Some(e) = &self.parse_error {
            return Err(EssenError::FormParseError(e.clone()));
        }

        if let Some(file) = self.files.get(name) {
            let config = self.settings.get_or_init_default();
            let path = store_upload(config.upload_dir(), &file.filename, &file.data).await?;
            return Ok(path.to_string_lossy().into_owned());
        }

        match self.values.get(name) {
            Some(v) if !v.is_empty() => Ok(v.clone()),
            Some(_) => Err(EssenError::invalid_param(name)),
            None => self.query.param(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadConfig;
    use axum::body::Body;

    const BOUNDARY: &str = "essenboundary";

    fn multipart_request(body: impl Into<Body>) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/upload?page=3")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(body.into())
            .unwrap()
    }

    fn sample_body() -> String {
        format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\r\n\
             hello\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"blank\"\r\n\r\n\
             \r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             file contents\r\n\
             --{b}--\r\n",
            b = BOUNDARY
        )
    }

    #[tokio::test]
    async fn test_value_field() {
        let dir = tempfile::tempdir().unwrap();
        let settings = UploadSettings::with_config(UploadConfig::new(dir.path()));
        let source = MultipartSource::from_request(multipart_request(sample_body()), settings).await;

        assert_eq!(source.param("name").await.unwrap(), "hello");
        assert_eq!(source.param("blank").await.unwrap_err().kind(), "InvalidParam");
        assert_eq!(source.param("nope").await.unwrap_err().kind(), "InvalidParam");
        assert_eq!(source.param("page").await.unwrap(), "3");
    }

    #[tokio::test]
    async fn test_file_field_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let settings = UploadSettings::with_config(UploadConfig::new(dir.path()));
        let source = MultipartSource::from_request(multipart_request(sample_body()), settings).await;

        let file = source.file("upload").unwrap();
        assert_eq!(file.filename, "a.txt");
        assert_eq!(file.content_type.as_deref(), Some("text/plain"));

        let path = source.param("upload").await.unwrap();
        assert_eq!(path, dir.path().join("a.txt").to_string_lossy());
        assert_eq!(std::fs::read(&path).unwrap(), b"file contents");
    }

    #[tokio::test]
    async fn test_file_lookup_copies_every_time() {
        let dir = tempfile::tempdir().unwrap();
        let settings = UploadSettings::with_config(UploadConfig::new(dir.path()));
        let source = MultipartSource::from_request(multipart_request(sample_body()), settings).await;

        let first = source.param("upload").await.unwrap();
        std::fs::remove_file(&first).unwrap();

        let second = source.param("upload").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"file contents");
    }

    #[tokio::test]
    async fn test_truncated_body_is_form_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = UploadSettings::with_config(UploadConfig::new(dir.path()));
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nhel",
            b = BOUNDARY
        );
        let source = MultipartSource::from_request(multipart_request(body), settings).await;

        let err = source.param("name").await.unwrap_err();
        assert_eq!(err.kind(), "FormParseError");
    }

    #[tokio::test]
    async fn test_non_utf8_value_is_form_parse_error() {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n",
            b = BOUNDARY
        )
        .into_bytes();
        body.extend_from_slice(b"caf\xe9");
        body.extend_from_slice(format!("\r\n--{b}--\r\n", b = BOUNDARY).as_bytes());

        let source = MultipartSource::from_request(multipart_request(body), UploadSettings::new()).await;
        let err = source.param("name").await.unwrap_err();
        assert_eq!(err.kind(), "FormParseError");
        assert!(err.message().contains("not UTF-8"));
    }

    #[tokio::test]
    async fn test_missing_boundary_is_form_parse_error() {
        let request = axum::http::Request::builder()
            .method("POST")
            .header("Content-Type", "multipart/form-data")
            .body(Body::from("irrelevant"))
            .unwrap();
        let source = MultipartSource::from_request(request, UploadSettings::new()).await;
        assert_eq!(source.param("x").await.unwrap_err().kind(), "FormParseError");
    }
}
