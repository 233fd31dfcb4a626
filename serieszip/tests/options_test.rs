use pretty_assertions::assert_eq;
use serieszip::{OptionsBuilder, Zipper};
use std::time::Duration;

#[tokio::test]
async fn builder_api_test() {
    let options = OptionsBuilder::new()
        .total_timeout(Duration::from_millis(750))
        .after_first_timeout(Duration::from_millis(50))
        .concurrency_limit(8)
        .max_idle_conns_per_host(32)
        .buckets(20)
        .build();

    let backends = vec![
        "http://storage-1:8080".to_string(),
        "http://storage-2:8080".to_string(),
    ];
    let zipper = Zipper::with_options(backends.clone(), options).unwrap();

    assert_eq!(zipper.backends(), backends.as_slice());
    assert_eq!(zipper.bucket_counts().len(), 21);
    assert_eq!(zipper.known_paths(), 0);
}
