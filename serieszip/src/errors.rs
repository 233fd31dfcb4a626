#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct ZipperError {
    #[from]
    error: InternalZipperError,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum InternalZipperError {
    #[error("error querying backends")]
    AllShardsAbsent,

    #[error("no decodable backend responses")]
    AllDecodesFailed,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Pickle(#[from] serde_pickle::Error),

    #[error(transparent)]
    CatchAll(#[from] anyhow::Error),
}
