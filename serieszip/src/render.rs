use crate::metrics::METRIC_RENDER_ERRORS;
use crate::scatter::{hex_dump, ShardResponse};
use metrics::counter;
use prost::Message;
use serieszip_pb::FetchResponse;
use tracing::{trace, warn};

/// Decodes each shard body into a [`FetchResponse`], dropping bodies that
/// fail to decode or whose value/absent sequences disagree in length.
pub fn decode_responses(responses: &[ShardResponse]) -> Vec<FetchResponse> {
    let mut decoded = Vec::with_capacity(responses.len());

    for shard in responses {
        let fetch = match FetchResponse::decode(shard.body.as_ref()) {
            Ok(fetch) => fetch,
            Err(err) => {
                warn!(backend = %shard.backend, %err, "error decoding fetch response");
                trace!("undecodable body:\n{}", hex_dump(&shard.body));
                counter!(METRIC_RENDER_ERRORS, 1);
                continue;
            }
        };

        if fetch.values.len() != fetch.is_absent.len() {
            warn!(
                backend = %shard.backend,
                name = %fetch.name,
                values = fetch.values.len(),
                absent = fetch.is_absent.len(),
                "fetch response with mismatched value/absent lengths"
            );
            counter!(METRIC_RENDER_ERRORS, 1);
            continue;
        }

        decoded.push(fetch);
    }

    decoded
}

/// Merges overlapping fetch responses for the same logical metric.
///
/// The response with the smallest step (highest resolution) becomes the
/// base and supplies the returned metadata; ties go to the earliest
/// response. Samples the base is missing are filled from peers, first
/// present peer wins per index.
///
/// A peer whose value sequence length differs from the base's makes index
/// alignment unsafe, so filling stops entirely at that point; the base
/// plus whatever was already filled is still returned.
///
/// Panics when `decoded` is empty; callers gate on having at least one
/// decoded response.
pub fn merge(mut decoded: Vec<FetchResponse>) -> FetchResponse {
    if decoded.len() > 1 {
        let mut highest = 0;
        for (i, fetch) in decoded.iter().enumerate() {
            if fetch.step_time < decoded[highest].step_time {
                highest = i;
            }
        }
        decoded.swap(0, highest);

        if let Some((base, peers)) = decoded.split_first_mut() {
            fill_gaps(base, peers);
        }
    }

    decoded.swap_remove(0)
}

fn fill_gaps(base: &mut FetchResponse, peers: &[FetchResponse]) {
    for i in 0..base.values.len() {
        if !base.is_absent[i] {
            continue;
        }

        for peer in peers {
            if peer.values.len() != base.values.len() {
                warn!(
                    name = %base.name,
                    base_len = base.values.len(),
                    peer_len = peer.values.len(),
                    "unable to merge values of mismatched length, keeping partial merge"
                );
                counter!(METRIC_RENDER_ERRORS, 1);
                return;
            }

            if !peer.is_absent[i] {
                base.values[i] = peer.values[i];
                base.is_absent[i] = false;
                break;
            }
        }
    }
}
