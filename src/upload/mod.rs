//! Upload subsystem.
//!
//! # Data Flow
//! ```text
//! multipart request
//!     → settings.rs (upload directory, defaulted on first use)
//!     → storage.rs (create destination, copy bytes)
//!     → <upload_dir>/<filename>
//! ```
//!
//! # Design Decisions
//! - One `UploadSettings` per server, shared via Arc by every request
//! - Check-then-set of the default is a single compare-and-swap
//! - Same filename overwrites: last writer wins

pub mod settings;
pub mod storage;

pub use settings::{UploadConfig, UploadSettings, DEFAULT_UPLOAD_DIR};
pub use storage::{create_file_if_not_exist, store_upload, upload_path};
