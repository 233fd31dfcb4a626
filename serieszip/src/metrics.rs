//! Metric names exported via the `metrics` crate.
//!
//! It's up to the application to ingest these metrics, some options:
//! - the graphite push loop shipped with `serieszip-app`,
//! - `metrics-exporter-prometheus`.

/// Glob resolution requests received from clients.
pub const METRIC_FIND_REQUESTS: &str = "find_requests";

/// Shard glob responses that failed to decode.
pub const METRIC_FIND_ERRORS: &str = "find_errors";

/// Datapoint retrieval requests received from clients.
pub const METRIC_RENDER_REQUESTS: &str = "render_requests";

/// Render failures: undecodable shard responses, merge shape mismatches and
/// requests no backend answered.
pub const METRIC_RENDER_ERRORS: &str = "render_errors";

/// Gathers cut short by the two-phase deadline.
pub const METRIC_TIMEOUTS: &str = "timeouts";
