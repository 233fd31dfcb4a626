//! Query fan-out proxy core for a clustered time-series metrics store.
//!
//! Clients issue glob resolution (`/metrics/find/`) and datapoint retrieval
//! (`/render/`) queries against one logical service; the proxy scatters each
//! query to every relevant storage backend in parallel, gathers the partial
//! answers under a two-phase deadline and merges them into a single response
//! in the encoding the client asked for.

pub mod encoding;
mod errors;
pub mod find;
mod http;
pub mod limiter;
pub mod metrics;
mod options;
pub mod render;
mod routing;
pub mod scatter;
mod zipper;
mod zipper_inner;

pub use errors::ZipperError;
pub use http::router;
pub use options::{Options, OptionsBuilder};
pub use serieszip_pb::{FetchResponse, GlobMatch, GlobResponse};
pub use zipper::Zipper;
pub use zipper_inner::ZipperInner;
