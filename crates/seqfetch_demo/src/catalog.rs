use std::time::Duration;

use serde_json::json;
use seqfetch_engine::{request_fn, RequestError, Requester};

const PARTS: &[&str] = &[
    "anchor bolt",
    "ball bearing",
    "bolt cutter",
    "bolt m6",
    "bolt m8",
    "brass nut",
    "carriage bolt",
    "cotter pin",
    "eye bolt",
    "hex nut",
    "lock washer",
    "u-bolt",
    "wing nut",
];

/// In-memory parts search.
///
/// Shorter keywords match more rows and answer more slowly, so a fast typist
/// leaves older, slower responses in flight behind newer ones.
pub fn parts_backend() -> impl Requester {
    request_fn(|call| async move {
        let keyword = call.params["keyword"].as_str().unwrap_or_default().to_lowercase();
        let page = call.params["pageNum"].as_u64().unwrap_or(1).max(1);
        let size = call.params["pageSize"].as_u64().unwrap_or(10).max(1);

        let latency = 200u64.saturating_sub(45 * keyword.len() as u64);
        tokio::time::sleep(Duration::from_millis(latency)).await;
        if call.cancel.is_cancelled() {
            return Err(RequestError::other("aborted"));
        }

        let matches: Vec<&str> = PARTS
            .iter()
            .copied()
            .filter(|part| part.contains(keyword.as_str()))
            .collect();
        let start = usize::try_from((page - 1) * size).unwrap_or(usize::MAX);
        let list: Vec<&str> = matches
            .iter()
            .copied()
            .skip(start)
            .take(usize::try_from(size).unwrap_or(usize::MAX))
            .collect();
        Ok(json!({"code": 0, "data": {"list": list, "total": matches.len()}}))
    })
}
