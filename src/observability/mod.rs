//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters for requests, parameter lookups, uploads)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Every request runs in a `request` span carrying its `request_id`,
//!   so events logged while handling it inherit the id
//! - Metric updates are cheap and safe to call without a recorder installed

pub mod logging;
pub mod metrics;
