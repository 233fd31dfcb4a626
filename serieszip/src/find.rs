use crate::metrics::METRIC_FIND_ERRORS;
use crate::scatter::{hex_dump, ShardResponse};
use metrics::counter;
use prost::Message;
use serieszip_pb::{GlobMatch, GlobResponse};
use std::collections::HashMap;
use tracing::{trace, warn};

/// Union of per-shard glob responses.
pub struct FindResult {
    /// Unique matches, in the order their paths were first seen.
    pub matches: Vec<GlobMatch>,
    /// Path to the backends that reported it, in response order. This is
    /// what gets committed to the routing table.
    pub paths: HashMap<String, Vec<String>>,
    /// How many shard bodies actually decoded.
    pub decoded: usize,
}

/// Decodes each shard body and unions the matches by path.
///
/// A body that fails to decode is counted and skipped; the union proceeds
/// with whatever decoded. The first shard to report a path wins the
/// `GlobMatch` record (including its leaf flag); every shard that reports
/// the path is appended to the routing entry.
pub fn aggregate(responses: &[ShardResponse]) -> FindResult {
    let mut matches = Vec::new();
    let mut paths: HashMap<String, Vec<String>> = HashMap::new();
    let mut decoded = 0;

    for shard in responses {
        let glob = match GlobResponse::decode(shard.body.as_ref()) {
            Ok(glob) => glob,
            Err(err) => {
                warn!(backend = %shard.backend, %err, "error decoding glob response");
                trace!("undecodable body:\n{}", hex_dump(&shard.body));
                counter!(METRIC_FIND_ERRORS, 1);
                continue;
            }
        };
        decoded += 1;

        for glob_match in glob.matches {
            let seen = paths.contains_key(&glob_match.path);
            paths
                .entry(glob_match.path.clone())
                .or_default()
                .push(shard.backend.clone());
            if !seen {
                matches.push(glob_match);
            }
        }
    }

    FindResult {
        matches,
        paths,
        decoded,
    }
}
