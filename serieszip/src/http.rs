//! Axum surface in front of the proxy: query handlers, the load-balancer
//! probe and runtime introspection.

use crate::encoding::{encode_find, encode_render, Format};
use crate::errors::ZipperError;
use crate::metrics::{METRIC_FIND_REQUESTS, METRIC_RENDER_REQUESTS};
use crate::zipper::Zipper;
use axum::extract::State;
use axum::http::{header, Request, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use metrics::counter;
use serde_json::json;
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Builds the HTTP router for a [`Zipper`]. Query routes are tracked in
/// the latency histogram; the load-balancer probe and debug routes are
/// not.
pub fn router(zipper: Zipper) -> Router {
    Router::new()
        .route("/metrics/find/", get(find_handler))
        .route("/render/", get(render_handler))
        .route_layer(middleware::from_fn_with_state(
            zipper.clone(),
            track_request_time,
        ))
        .route("/lb_check", get(lb_check_handler))
        .route("/debug/vars", get(debug_vars_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(zipper)
}

async fn find_handler(State(zipper): State<Zipper>, uri: Uri) -> Response {
    counter!(METRIC_FIND_REQUESTS, 1);
    debug!(%uri, "find request");

    let params = query_pairs(&uri);
    let Some(format) = Format::from_query(param(&params, "format")) else {
        return (StatusCode::BAD_REQUEST, "unknown format\n").into_response();
    };

    let query = param(&params, "query").unwrap_or("").to_string();
    let rewritten = rewrite_uri(uri.path(), &params);

    match zipper.find(&rewritten).await {
        Ok(matches) => encoded_response(format, encode_find(format, &query, matches)),
        Err(err) => {
            warn!(%uri, %err, "find failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("find: {err}\n")).into_response()
        }
    }
}

async fn render_handler(State(zipper): State<Zipper>, uri: Uri) -> Response {
    counter!(METRIC_RENDER_REQUESTS, 1);
    debug!(%uri, "render request");

    let params = query_pairs(&uri);
    let Some(format) = Format::from_query(param(&params, "format")) else {
        return (StatusCode::BAD_REQUEST, "unknown format\n").into_response();
    };

    let Some(target) = param(&params, "target").filter(|target| !target.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "empty target\n").into_response();
    };
    let target = target.to_string();

    let rewritten = rewrite_uri(uri.path(), &params);

    match zipper.render(&rewritten, &target).await {
        Ok(metric) => encoded_response(format, encode_render(format, metric)),
        Err(err) => {
            warn!(%uri, %err, "render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("render: {err}\n")).into_response()
        }
    }
}

async fn lb_check_handler() -> &'static str {
    "Ok\n"
}

async fn debug_vars_handler(State(zipper): State<Zipper>) -> Json<serde_json::Value> {
    Json(json!({
        "BuildVersion": env!("CARGO_PKG_VERSION"),
        "Backends": zipper.backends(),
        "requestBuckets": zipper.bucket_counts(),
        "knownPaths": zipper.known_paths(),
    }))
}

async fn track_request_time<B>(
    State(zipper): State<Zipper>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let started = Instant::now();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    zipper.observe_latency(started.elapsed(), &path);
    response
}

fn encoded_response(format: Format, encoded: Result<Vec<u8>, ZipperError>) -> Response {
    match encoded {
        Ok(body) => ([(header::CONTENT_TYPE, format.content_type())], body).into_response(),
        Err(err) => {
            error!(%err, "error encoding response");
            (StatusCode::INTERNAL_SERVER_ERROR, "error encoding response\n").into_response()
        }
    }
}

fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    let query = uri.query().unwrap_or("");
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Rebuilds the request's path and query with the backend wire format
/// forced to protobuf. Every other parameter passes through verbatim.
fn rewrite_uri(path: &str, params: &[(String, String)]) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if key != "format" {
            query.append_pair(key, value);
        }
    }
    query.append_pair("format", "protobuf");

    format!("{path}?{}", query.finish())
}
