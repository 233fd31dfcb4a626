mod common;

use anyhow::{Context, Result};
use common::*;
use metrics::{Counter, CounterFn, Gauge, Histogram, Key, KeyName, Recorder, SharedString, Unit};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use serial_test::serial as serial_test;
use serieszip::OptionsBuilder;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[fixture]
#[once]
pub fn mock_recorder() -> &'static MockRecorder {
    let recorder_mock = &*Box::leak(Box::new(MockRecorder::new()));
    metrics::set_recorder(recorder_mock)
        .expect("setting metrics recorder should succeed as long as it's done once per process");
    recorder_mock
}

#[fixture]
pub fn clean_recorder(mock_recorder: &'static MockRecorder) -> &'static MockRecorder {
    mock_recorder.clean();
    mock_recorder
}

#[rstest]
#[tokio::test]
#[serial_test]
pub async fn find_and_render_requests_are_counted(
    clean_recorder: &'static MockRecorder,
) -> Result<()> {
    let backend = spawn_backend(
        Reply::Body(glob_body(&[("foo.bar", true)])),
        Reply::Body(fetch_body(&fetch_response("foo.bar", 0, 60, &[Some(1.0)]))),
    )
    .await;
    let proxy = spawn_proxy(vec![backend.url.clone()]).await;

    let find = reqwest::get(format!("{proxy}/metrics/find/?query=foo.*&format=json")).await?;
    assert_eq!(find.status(), 200);
    let render = reqwest::get(format!("{proxy}/render/?target=foo.bar&format=json")).await?;
    assert_eq!(render.status(), 200);

    assert_eq!(counter(clean_recorder, "find_requests")?, 1);
    assert_eq!(counter(clean_recorder, "render_requests")?, 1);

    Ok(())
}

#[rstest]
#[tokio::test]
#[serial_test]
pub async fn undecodable_glob_shard_counts_a_find_error(
    clean_recorder: &'static MockRecorder,
) -> Result<()> {
    let garbled = spawn_backend(Reply::Body(b"not a protobuf".to_vec()), Reply::Status(404)).await;
    let healthy = spawn_backend(
        Reply::Body(glob_body(&[("foo.bar", true)])),
        Reply::Status(404),
    )
    .await;
    let proxy = spawn_proxy(vec![garbled.url.clone(), healthy.url.clone()]).await;

    let response = reqwest::get(format!("{proxy}/metrics/find/?query=foo.*&format=json")).await?;
    assert_eq!(response.status(), 200);

    assert_eq!(counter(clean_recorder, "find_errors")?, 1);

    Ok(())
}

#[rstest]
#[tokio::test]
#[serial_test]
pub async fn merge_shape_mismatch_counts_a_render_error(
    clean_recorder: &'static MockRecorder,
) -> Result<()> {
    let backend_a = spawn_backend(
        Reply::Status(404),
        Reply::Body(fetch_body(&fetch_response(
            "m",
            0,
            30,
            &[Some(1.0), None, Some(3.0), Some(4.0)],
        ))),
    )
    .await;
    let backend_b = spawn_backend(
        Reply::Status(404),
        Reply::Body(fetch_body(&fetch_response(
            "m",
            0,
            60,
            &[Some(9.0), Some(9.0), Some(9.0), Some(9.0), Some(9.0)],
        ))),
    )
    .await;
    let proxy = spawn_proxy(vec![backend_a.url.clone(), backend_b.url.clone()]).await;

    let response = reqwest::get(format!("{proxy}/render/?target=m&format=json")).await?;
    assert_eq!(response.status(), 200);

    assert_eq!(counter(clean_recorder, "render_errors")?, 1);

    Ok(())
}

#[rstest]
#[tokio::test]
#[serial_test]
pub async fn dark_cluster_counts_a_timeout_and_a_render_error(
    clean_recorder: &'static MockRecorder,
) -> Result<()> {
    let backend = spawn_backend(Reply::Stall, Reply::Stall).await;
    let options = OptionsBuilder::new()
        .total_timeout(Duration::from_millis(200))
        .after_first_timeout(Duration::from_millis(50))
        .build();
    let proxy = spawn_proxy_with_options(vec![backend.url.clone()], options).await;

    let response = reqwest::get(format!("{proxy}/render/?target=m&format=json")).await?;
    assert_eq!(response.status(), 500);

    assert_eq!(counter(clean_recorder, "timeouts")?, 1);
    assert_eq!(counter(clean_recorder, "render_errors")?, 1);

    Ok(())
}

fn counter(recorder: &'static MockRecorder, metric_name: &str) -> Result<u64> {
    recorder
        .counter_value(metric_name)
        .context(format!("metric '{}' should be set", metric_name))
}

pub struct MockRecorder {
    registered_counters: Mutex<HashMap<String, Arc<MockCounter>>>,
}

impl MockRecorder {
    fn new() -> Self {
        Self {
            registered_counters: Mutex::new(Default::default()),
        }
    }

    fn counter_value(&self, key: &str) -> Option<u64> {
        let counters = self.registered_counters.lock().unwrap();
        counters.get(key).map(|c| {
            let guard = c.count.lock().unwrap();
            *guard
        })
    }

    fn clean(&self) {
        let mut counters = self.registered_counters.lock().unwrap();
        counters.drain();
    }
}

#[derive(Clone)]
struct MockCounter {
    count: Arc<Mutex<u64>>,
}

impl MockCounter {
    fn new() -> Self {
        Self {
            count: Arc::new(Mutex::new(0)),
        }
    }
}

impl CounterFn for MockCounter {
    fn increment(&self, value: u64) {
        let mut guard = self.count.lock().unwrap();
        *guard += value;
    }

    fn absolute(&self, value: u64) {
        let mut guard = self.count.lock().unwrap();
        *guard = value;
    }
}

impl Recorder for MockRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key) -> Counter {
        match self
            .registered_counters
            .lock()
            .unwrap()
            .entry(key.name().to_string())
        {
            Entry::Occupied(e) => {
                let mock_counter = e.get().clone();
                Counter::from(mock_counter)
            }
            Entry::Vacant(e) => {
                let mock_counter = Arc::new(MockCounter::new());
                e.insert(mock_counter.clone());

                Counter::from(mock_counter)
            }
        }
    }

    fn register_gauge(&self, _key: &Key) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key) -> Histogram {
        Histogram::noop()
    }
}
