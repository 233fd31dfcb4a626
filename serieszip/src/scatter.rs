use crate::limiter::BackendLimiter;
use crate::metrics::METRIC_TIMEOUTS;
use bytes::Bytes;
use metrics::counter;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

/// One backend's answer to a fanned-out query.
#[derive(Debug, Clone)]
pub struct ShardResponse {
    pub backend: String,
    pub body: Bytes,
}

/// What a worker reports back: a body, or the absent sentinel.
struct WorkerReply {
    backend: String,
    body: Option<Bytes>,
}

/// Issues an identical request to a set of backends in parallel and gathers
/// the answers under a two-phase deadline.
#[derive(Clone)]
pub struct ScatterEngine {
    client: reqwest::Client,
    limiter: BackendLimiter,
    total_timeout: Duration,
    after_first_timeout: Duration,
}

impl ScatterEngine {
    pub fn new(
        client: reqwest::Client,
        limiter: BackendLimiter,
        total_timeout: Duration,
        after_first_timeout: Duration,
    ) -> Self {
        Self {
            client,
            limiter,
            total_timeout,
            after_first_timeout,
        }
    }

    /// Fans `uri` out to every backend in `backends` and returns the bodies
    /// that arrived in time, each tagged with the backend that sent it.
    ///
    /// This never fails: an empty result means no backend produced a usable
    /// answer before the deadline. The deadline starts at `total_timeout`
    /// and is rearmed to `after_first_timeout` from the moment the first
    /// successful body arrives, so a stalled minority cannot gate the
    /// common case while an entirely dark cluster still gets the full
    /// budget.
    pub async fn multi_get(&self, backends: &[String], uri: &str) -> Vec<ShardResponse> {
        if backends.is_empty() {
            return Vec::new();
        }

        debug!(?backends, uri, "querying backends");

        // One buffer slot per worker, so workers abandoned at the deadline
        // never block on their final send.
        let (reply_tx, mut reply_rx) = mpsc::channel(backends.len());
        for backend in backends {
            tokio::spawn(single_get(
                self.client.clone(),
                self.limiter.clone(),
                backend.clone(),
                uri.to_string(),
                reply_tx.clone(),
            ));
        }
        drop(reply_tx);

        let mut gathered: Vec<ShardResponse> = Vec::new();
        let mut deadline = Instant::now() + self.total_timeout;
        let mut first_seen = false;

        for _ in 0..backends.len() {
            tokio::select! {
                reply = reply_rx.recv() => {
                    let Some(reply) = reply else { break };
                    let Some(body) = reply.body else { continue };

                    gathered.push(ShardResponse {
                        backend: reply.backend,
                        body,
                    });

                    if !first_seen {
                        first_seen = true;
                        deadline = Instant::now() + self.after_first_timeout;
                    }
                }
                _ = sleep_until(deadline) => {
                    let answered: Vec<&str> =
                        gathered.iter().map(|r| r.backend.as_str()).collect();
                    warn!(uri, ?backends, ?answered, "timeout waiting for more responses");
                    counter!(METRIC_TIMEOUTS, 1);
                    break;
                }
            }
        }

        gathered
    }
}

async fn single_get(
    client: reqwest::Client,
    limiter: BackendLimiter,
    backend: String,
    uri: String,
    reply_tx: mpsc::Sender<WorkerReply>,
) {
    let body = fetch_one(&client, &limiter, &backend, &uri).await;

    // The gather loop may have moved on; the send then lands in this
    // worker's buffer slot and goes nowhere.
    let _ = reply_tx.send(WorkerReply { backend, body }).await;
}

async fn fetch_one(
    client: &reqwest::Client,
    limiter: &BackendLimiter,
    backend: &str,
    uri: &str,
) -> Option<Bytes> {
    let url = format!("{backend}{uri}");
    let _slot = limiter.enter(backend).await;

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(err) => {
            warn!(backend, uri, %err, "error querying backend");
            return None;
        }
    };

    match response.status() {
        StatusCode::OK => {}
        // A backend that doesn't hold the requested metric answers 404.
        StatusCode::NOT_FOUND => return None,
        status => {
            warn!(backend, uri, %status, "bad response code from backend");
            return None;
        }
    }

    match response.bytes().await {
        Ok(body) => Some(body),
        Err(err) => {
            warn!(backend, uri, %err, "error reading response body");
            None
        }
    }
}

/// Hex rendering of an undecodable shard body for trace logs.
pub(crate) fn hex_dump(body: &[u8]) -> String {
    body.iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
