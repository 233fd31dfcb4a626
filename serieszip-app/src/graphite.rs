//! Minute-interval push of process counters to a graphite ingest endpoint.
//!
//! The `metrics` facade is wired to a recorder that keeps every registered
//! counter readable, and a background task writes plaintext graphite lines
//! (`carbon.zipper.<hostname>.<metric> <value> <epoch>`) over TCP. A sink
//! that is down costs a warning, never the process.

use anyhow::{anyhow, Result};
use metrics::{Counter, CounterFn, Gauge, Histogram, Key, KeyName, Recorder, SharedString, Unit};
use serieszip::metrics::{
    METRIC_FIND_ERRORS, METRIC_FIND_REQUESTS, METRIC_RENDER_ERRORS, METRIC_RENDER_REQUESTS,
    METRIC_TIMEOUTS,
};
use serieszip::Zipper;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Installs the counter registry as the global metrics recorder and spawns
/// the push loop. Call at most once per process.
pub fn install(host: String, zipper: Zipper) -> Result<()> {
    let registry: &'static CounterRegistry = Box::leak(Box::new(CounterRegistry::default()));
    metrics::set_recorder(registry)
        .map_err(|err| anyhow!("installing metrics recorder: {err}"))?;

    // Touch every counter so the first push reports zeros instead of
    // omitting metrics that haven't fired yet.
    for name in [
        METRIC_FIND_REQUESTS,
        METRIC_FIND_ERRORS,
        METRIC_RENDER_REQUESTS,
        METRIC_RENDER_ERRORS,
        METRIC_TIMEOUTS,
    ] {
        metrics::counter!(name, 0);
    }

    info!("using graphite host {host}");
    tokio::spawn(push_loop(host, registry, zipper));

    Ok(())
}

async fn push_loop(host: String, registry: &'static CounterRegistry, zipper: Zipper) {
    let hostname = gethostname::gethostname()
        .to_string_lossy()
        .replace('.', "_");
    let prefix = format!("carbon.zipper.{hostname}");

    let mut ticker = tokio::time::interval(Duration::from_secs(60));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(err) = push_once(&host, &prefix, registry, &zipper).await {
            warn!(host, %err, "graphite push failed");
        }
    }
}

async fn push_once(
    host: &str,
    prefix: &str,
    registry: &CounterRegistry,
    zipper: &Zipper,
) -> Result<()> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    let mut lines = String::new();
    for (name, value) in registry.snapshot() {
        lines.push_str(&format!("{prefix}.{name} {value} {now}\n"));
    }
    for (i, count) in zipper.bucket_counts().iter().enumerate() {
        lines.push_str(&format!(
            "{prefix}.requests_in_{}ms_to_{}ms {count} {now}\n",
            i * 100,
            (i + 1) * 100,
        ));
    }

    let mut stream = TcpStream::connect(host).await?;
    stream.write_all(lines.as_bytes()).await?;
    stream.shutdown().await?;

    Ok(())
}

/// Recorder that retains a handle to every counter so the push loop can
/// read current values. Gauges and histograms are not used by the proxy
/// and record nowhere.
#[derive(Default)]
struct CounterRegistry {
    counters: Mutex<HashMap<String, Arc<CounterCell>>>,
}

impl CounterRegistry {
    fn snapshot(&self) -> Vec<(String, u64)> {
        let counters = self.counters.lock().unwrap();
        let mut snapshot: Vec<(String, u64)> = counters
            .iter()
            .map(|(name, cell)| (name.clone(), cell.0.load(Ordering::Relaxed)))
            .collect();
        snapshot.sort();
        snapshot
    }
}

impl Recorder for CounterRegistry {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key) -> Counter {
        let mut counters = self.counters.lock().unwrap();
        let cell = counters
            .entry(key.name().to_string())
            .or_insert_with(|| Arc::new(CounterCell(AtomicU64::new(0))))
            .clone();

        Counter::from(cell)
    }

    fn register_gauge(&self, _key: &Key) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key) -> Histogram {
        Histogram::noop()
    }
}

struct CounterCell(AtomicU64);

impl CounterFn for CounterCell {
    fn increment(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    fn absolute(&self, value: u64) {
        self.0.store(value, Ordering::Relaxed);
    }
}
