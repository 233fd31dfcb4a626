use crate::errors::{InternalZipperError, ZipperError};
use prost::Message;
use serde::{Deserialize, Serialize};
use serieszip_pb::{FetchResponse, GlobMatch, GlobResponse};

/// Client-facing response encodings.
///
/// Backends always speak protobuf regardless of what the client asked for;
/// the reply is re-encoded at the last step. An empty or missing `format`
/// selects pickle, which the legacy dashboards expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Protobuf,
    Json,
    Pickle,
}

impl Format {
    /// Parses the `format` query parameter. Returns None for a value
    /// outside the supported set.
    pub fn from_query(value: Option<&str>) -> Option<Format> {
        match value.unwrap_or("") {
            "protobuf" => Some(Format::Protobuf),
            "json" => Some(Format::Json),
            "" | "pickle" => Some(Format::Pickle),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Protobuf => "application/protobuf",
            Format::Json => "application/json",
            Format::Pickle => "application/pickle",
        }
    }
}

/// JSON/pickle shape of one glob match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobMatchPayload {
    pub metric_path: String,
    #[serde(rename = "isLeaf")]
    pub is_leaf: bool,
}

/// JSON/pickle shape of a merged render response. Absent samples serialize
/// as JSON null / pickle None.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPayload {
    pub name: String,
    pub start: i32,
    pub step: i32,
    pub end: i32,
    pub values: Vec<Option<f64>>,
}

/// Re-encodes the unioned find matches in the client's format. The
/// protobuf form echoes the client's glob back in the `name` field.
pub fn encode_find(
    format: Format,
    query: &str,
    matches: Vec<GlobMatch>,
) -> Result<Vec<u8>, ZipperError> {
    match format {
        Format::Protobuf => {
            let response = GlobResponse {
                name: query.to_string(),
                matches,
            };
            Ok(response.encode_to_vec())
        }
        Format::Json => {
            let payload: Vec<GlobMatchPayload> = matches.into_iter().map(find_payload).collect();
            Ok(serde_json::to_vec(&payload).map_err(InternalZipperError::from)?)
        }
        Format::Pickle => {
            let payload: Vec<GlobMatchPayload> = matches.into_iter().map(find_payload).collect();
            Ok(serde_pickle::to_vec(&payload, serde_pickle::SerOptions::new())
                .map_err(InternalZipperError::from)?)
        }
    }
}

/// Re-encodes the merged fetch response in the client's format. The pickle
/// form wraps the payload in a one-element list, matching what the legacy
/// dashboard clients unpack.
pub fn encode_render(format: Format, metric: FetchResponse) -> Result<Vec<u8>, ZipperError> {
    match format {
        Format::Protobuf => Ok(metric.encode_to_vec()),
        Format::Json => {
            let payload = render_payload(metric);
            Ok(serde_json::to_vec(&payload).map_err(InternalZipperError::from)?)
        }
        Format::Pickle => {
            let payload = vec![render_payload(metric)];
            Ok(serde_pickle::to_vec(&payload, serde_pickle::SerOptions::new())
                .map_err(InternalZipperError::from)?)
        }
    }
}

fn find_payload(glob_match: GlobMatch) -> GlobMatchPayload {
    GlobMatchPayload {
        metric_path: glob_match.path,
        is_leaf: glob_match.is_leaf,
    }
}

fn render_payload(metric: FetchResponse) -> RenderPayload {
    let values = metric
        .values
        .iter()
        .zip(metric.is_absent.iter())
        .map(|(value, absent)| if *absent { None } else { Some(*value) })
        .collect();

    RenderPayload {
        name: metric.name,
        start: metric.start_time,
        step: metric.step_time,
        end: metric.stop_time,
        values,
    }
}
