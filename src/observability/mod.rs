//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration phase:
//!     → logging.rs (debug events per registration step, info on freeze)
//!
//! Dispatch:
//!     → logging.rs (predicate failures, not-found warnings)
//!     → metrics.rs (dispatch counter and latency histogram)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON optional) for machine parsing
//! - Request ID from the HTTP adapter is attached to dispatch events
//! - Metrics are cheap (facade calls, no-op without a recorder)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_or_report};
