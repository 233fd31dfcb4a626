//! Public interface for consumers of the library.
//!
//! Entire functionality is exposed via the [`Zipper`] struct, which needs
//! the backend set to be constructed; [`crate::router`] mounts it behind
//! the HTTP surface.

use crate::errors::ZipperError;
use crate::options::Options;
use crate::zipper_inner::ZipperInner;
use serieszip_pb::{FetchResponse, GlobMatch};
use std::sync::Arc;
use std::time::Duration;

/// Handle to the fan-out proxy.
///
/// It is an [`Arc`] wrapper around [`ZipperInner`] which implements the
/// API, so that applications don't have to wrap the proxy inside [`Arc`]
/// themselves in concurrent context which is target audience.
#[derive(Clone)]
pub struct Zipper(Arc<ZipperInner>);

impl Zipper {
    /// Builds a proxy over `backends` with default [`Options`].
    pub fn new(backends: Vec<String>) -> Result<Self, ZipperError> {
        Self::with_options(backends, Options::default())
    }

    /// Allows to customize the proxy via [`Options`].
    pub fn with_options(backends: Vec<String>, options: Options) -> Result<Self, ZipperError> {
        let inner = ZipperInner::new(backends, options)?;
        Ok(Self(Arc::new(inner)))
    }

    /// Resolves a glob query (already rewritten to the backend wire
    /// format) across all backends, returning the unioned matches and
    /// refreshing the routing table for every path observed.
    pub async fn find(&self, uri: &str) -> Result<Vec<GlobMatch>, ZipperError> {
        self.0.find(uri).await
    }

    /// Fetches and merges datapoints for `target`. Fan-out is narrowed to
    /// the backends the last find reported for the path; an unknown path
    /// asks everyone.
    pub async fn render(&self, uri: &str, target: &str) -> Result<FetchResponse, ZipperError> {
        self.0.render(uri, target).await
    }

    /// The configured backend set.
    pub fn backends(&self) -> &[String] {
        self.0.backends()
    }

    /// Number of metric paths currently held by the routing table.
    pub fn known_paths(&self) -> usize {
        self.0.known_paths()
    }

    /// Records one finished request in the latency histogram.
    pub fn observe_latency(&self, elapsed: Duration, uri: &str) {
        self.0.observe_latency(elapsed, uri)
    }

    /// Snapshot of the 100ms latency buckets, overflow bucket last.
    pub fn bucket_counts(&self) -> Vec<u64> {
        self.0.bucket_counts()
    }
}
