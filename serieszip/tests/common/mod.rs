#![allow(dead_code)]

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prost::Message;
use serieszip::{FetchResponse, GlobMatch, GlobResponse, Options, OptionsBuilder, Zipper};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a mock storage backend answers on one of its routes.
#[derive(Clone)]
pub enum Reply {
    Body(Vec<u8>),
    Status(u16),
    Delayed(Duration, Vec<u8>),
    Stall,
}

pub struct MockBackend {
    pub url: String,
    pub find_hits: Arc<AtomicUsize>,
    pub render_hits: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct BackendState {
    find_reply: Reply,
    render_reply: Reply,
    find_hits: Arc<AtomicUsize>,
    render_hits: Arc<AtomicUsize>,
}

/// Spawns a storage backend on an OS-allocated port that serves canned
/// replies on `/metrics/find/` and `/render/` and counts its hits.
pub async fn spawn_backend(find_reply: Reply, render_reply: Reply) -> MockBackend {
    let find_hits = Arc::new(AtomicUsize::new(0));
    let render_hits = Arc::new(AtomicUsize::new(0));

    let state = BackendState {
        find_reply,
        render_reply,
        find_hits: find_hits.clone(),
        render_hits: render_hits.clone(),
    };

    let router = Router::new()
        .route("/metrics/find/", get(find_route))
        .route("/render/", get(render_route))
        .with_state(state);

    let url = serve(router).await;

    MockBackend {
        url,
        find_hits,
        render_hits,
    }
}

async fn find_route(State(state): State<BackendState>) -> Response {
    state.find_hits.fetch_add(1, Ordering::SeqCst);
    serve_reply(state.find_reply.clone()).await
}

async fn render_route(State(state): State<BackendState>) -> Response {
    state.render_hits.fetch_add(1, Ordering::SeqCst);
    serve_reply(state.render_reply.clone()).await
}

async fn serve_reply(reply: Reply) -> Response {
    match reply {
        Reply::Body(body) => body.into_response(),
        Reply::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
        Reply::Delayed(delay, body) => {
            tokio::time::sleep(delay).await;
            body.into_response()
        }
        Reply::Stall => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Spawns the proxy over `backends` and returns its base URL.
pub async fn spawn_proxy(backends: Vec<String>) -> String {
    spawn_proxy_with_options(backends, fast_options()).await
}

pub async fn spawn_proxy_with_options(backends: Vec<String>, options: Options) -> String {
    let zipper = Zipper::with_options(backends, options).expect("building proxy should succeed");
    serve(serieszip::router(zipper)).await
}

/// Deadlines short enough to keep dark-cluster tests quick.
pub fn fast_options() -> Options {
    OptionsBuilder::new()
        .total_timeout(Duration::from_millis(1000))
        .after_first_timeout(Duration::from_millis(300))
        .build()
}

async fn serve(router: Router) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(router.into_make_service());
    tokio::spawn(server);

    format!("http://{addr}")
}

pub fn glob_body(matches: &[(&str, bool)]) -> Vec<u8> {
    let response = GlobResponse {
        name: String::new(),
        matches: matches
            .iter()
            .map(|(path, is_leaf)| GlobMatch {
                path: path.to_string(),
                is_leaf: *is_leaf,
            })
            .collect(),
    };

    response.encode_to_vec()
}

/// Builds a fetch response where None marks an absent sample.
pub fn fetch_response(name: &str, start: i32, step: i32, values: &[Option<f64>]) -> FetchResponse {
    FetchResponse {
        name: name.to_string(),
        start_time: start,
        stop_time: start + step * values.len() as i32,
        step_time: step,
        values: values.iter().map(|value| value.unwrap_or(0.0)).collect(),
        is_absent: values.iter().map(|value| value.is_none()).collect(),
    }
}

pub fn fetch_body(metric: &FetchResponse) -> Vec<u8> {
    metric.encode_to_vec()
}
