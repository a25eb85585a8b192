//! Dispatch metrics.
//!
//! # Metrics
//! - `frameroute_dispatch_total` (counter): dispatches by namespace, route, outcome
//! - `frameroute_dispatch_duration_seconds` (histogram): time spent selecting and running a variant
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no exporter is installed here
//! - Labels for namespace, route, outcome

use std::time::Instant;

/// Outcome label of a dispatch that ran a handler.
pub const OUTCOME_MATCHED: &str = "matched";
/// Outcome label when no variant accepted the request.
pub const OUTCOME_NOT_FOUND: &str = "not_found";
/// Outcome label when dispatch returned an error.
pub const OUTCOME_ERROR: &str = "error";

/// Record one dispatch.
pub fn record_dispatch(namespace: &str, route: &str, outcome: &'static str, start: Instant) {
    let labels = [
        ("namespace", namespace.to_string()),
        ("route", route.to_string()),
        ("outcome", outcome.to_string()),
    ];
    ::metrics::counter!("frameroute_dispatch_total", &labels).increment(1);
    ::metrics::histogram!("frameroute_dispatch_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}
