//! Essen: a small web framework over axum.
//!
//! A handler receives a [`Request`] whose parameters are read through a
//! body source chosen from the method and `Content-Type` (query string,
//! URL-encoded form, or multipart with file uploads), and a [`Response`]
//! builder for the reply.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod upload;

pub use config::EssenConfig;
pub use error::{EssenError, EssenResult};
pub use http::{Cookie, HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use upload::{UploadConfig, UploadSettings};
