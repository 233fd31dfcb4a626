//! Wire messages spoken by the storage backends.
//!
//! The structs are hand-maintained prost messages kept in sync with
//! `protos/storage.proto`, so the crate builds without protoc installed.
mod storage_pb;

pub use storage_pb::{FetchResponse, GlobMatch, GlobResponse};
