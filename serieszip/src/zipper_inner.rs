//! Core proxy logic: dispatch, aggregation and the routing table.

use crate::errors::{InternalZipperError, ZipperError};
use crate::find;
use crate::limiter::BackendLimiter;
use crate::metrics::METRIC_RENDER_ERRORS;
use crate::options::Options;
use crate::render;
use crate::routing::RoutingTable;
use crate::scatter::ScatterEngine;
use anyhow::Context;
use metrics::counter;
use serieszip_pb::{FetchResponse, GlobMatch};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::warn;

/// Core implementation of the proxy API.
pub struct ZipperInner {
    backends: Vec<String>,
    scatter: ScatterEngine,
    routing: RwLock<RoutingTable>,
    time_buckets: Vec<AtomicU64>,
}

impl ZipperInner {
    pub(crate) fn new(backends: Vec<String>, options: Options) -> Result<Self, ZipperError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(options.max_idle_conns_per_host)
            .build()
            .context("building storage client")
            .map_err(InternalZipperError::from)?;

        let limiter = BackendLimiter::new(&backends, options.concurrency_limit);
        let scatter = ScatterEngine::new(
            client,
            limiter,
            options.total_timeout,
            options.after_first_timeout,
        );

        // One extra slot counts everything beyond the tracked range.
        let time_buckets = (0..options.buckets + 1).map(|_| AtomicU64::new(0)).collect();

        Ok(Self {
            backends,
            scatter,
            routing: RwLock::new(RoutingTable::default()),
            time_buckets,
        })
    }

    /// Resolves a glob across every backend and unions the answers.
    ///
    /// As a side effect, every observed path's routing entry is replaced
    /// with the backends that just reported it.
    pub(crate) async fn find(&self, uri: &str) -> Result<Vec<GlobMatch>, ZipperError> {
        let responses = self.scatter.multi_get(&self.backends, uri).await;
        if responses.is_empty() {
            return Err(InternalZipperError::AllShardsAbsent.into());
        }

        let outcome = find::aggregate(&responses);
        if outcome.decoded == 0 {
            return Err(InternalZipperError::AllDecodesFailed.into());
        }

        self.routing.write().unwrap().commit(outcome.paths);

        Ok(outcome.matches)
    }

    /// Fetches datapoints for `target`, fanning out only to the backends
    /// the routing table names (or all of them for an unknown path), and
    /// merges the partial answers.
    pub(crate) async fn render(
        &self,
        uri: &str,
        target: &str,
    ) -> Result<FetchResponse, ZipperError> {
        let backends = self.backends_for(target);

        let responses = self.scatter.multi_get(&backends, uri).await;
        if responses.is_empty() {
            counter!(METRIC_RENDER_ERRORS, 1);
            return Err(InternalZipperError::AllShardsAbsent.into());
        }

        let decoded = render::decode_responses(&responses);
        if decoded.is_empty() {
            counter!(METRIC_RENDER_ERRORS, 1);
            return Err(InternalZipperError::AllDecodesFailed.into());
        }

        Ok(render::merge(decoded))
    }

    fn backends_for(&self, target: &str) -> Vec<String> {
        let routing = self.routing.read().unwrap();
        routing
            .lookup(target)
            .unwrap_or_else(|| self.backends.clone())
    }

    pub(crate) fn backends(&self) -> &[String] {
        &self.backends
    }

    pub(crate) fn known_paths(&self) -> usize {
        self.routing.read().unwrap().len()
    }

    /// Files a finished request into its 100ms latency bucket; anything
    /// past the tracked range lands in the overflow bucket and is logged.
    pub(crate) fn observe_latency(&self, elapsed: Duration, uri: &str) {
        let bucket = (elapsed.as_millis() / 100) as usize;
        let overflow = self.time_buckets.len() - 1;

        if bucket < overflow {
            self.time_buckets[bucket].fetch_add(1, Ordering::Relaxed);
        } else {
            self.time_buckets[overflow].fetch_add(1, Ordering::Relaxed);
            warn!(uri, ?elapsed, "slow request");
        }
    }

    pub(crate) fn bucket_counts(&self) -> Vec<u64> {
        self.time_buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .collect()
    }
}
