//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch to handler)
//!     → request.rs (accessors, body source resolved on first param lookup)
//!     → body/ (query, form or multipart parameters)
//!     → handler
//!     → response.rs (status, headers, cookies, body)
//!     → Send to client
//! ```

pub mod body;
pub mod request;
pub mod request_id;
pub mod response;
pub mod server;

pub use body::{BodySource, SourceKind};
pub use request::Request;
pub use request_id::{MakeRequestUuid, X_REQUEST_ID};
pub use response::{Cookie, Response};
pub use server::{Handler, HttpServer};
