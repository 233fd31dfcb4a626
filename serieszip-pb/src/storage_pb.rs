/// One metric name matched by a glob query.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GlobMatch {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(bool, tag = "2")]
    pub is_leaf: bool,
}

/// A storage node's full answer to a glob query.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GlobResponse {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub matches: Vec<GlobMatch>,
}

/// A storage node's answer to a datapoint query for a single metric.
///
/// `values` and `is_absent` run in parallel and are always the same length
/// in a well-formed response; sample `k` sits at `start_time + k * step_time`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchResponse {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(int32, tag = "2")]
    pub start_time: i32,
    #[prost(int32, tag = "3")]
    pub stop_time: i32,
    #[prost(int32, tag = "4")]
    pub step_time: i32,
    #[prost(double, repeated, tag = "5")]
    pub values: Vec<f64>,
    #[prost(bool, repeated, tag = "6")]
    pub is_absent: Vec<bool>,
}
