use std::time::Duration;

use serde_json::{json, Value};
use seqfetch_engine::{PagedDataSource, Pagination, Reactive, RequestError, Settle};
use seqfetch_logging::{seqfetch_debug, seqfetch_info};

use crate::catalog::parts_backend;
use crate::config::DemoConfig;

/// What the table shows once the scripted session has settled.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub committed: usize,
    pub discarded: usize,
    pub rows: Value,
    pub pagination: Pagination,
    pub error: Option<RequestError>,
}

/// Types every keystroke into the search box without waiting for answers,
/// then optionally flips the page.
pub async fn run(config: &DemoConfig) -> anyhow::Result<SessionReport> {
    let search = Reactive::new(json!({"keyword": ""}));
    let source = PagedDataSource::builder()
        .label("parts")
        .requester(parts_backend())
        .pagination(config.pagination.clone())
        .search_params(search.clone())
        .delay(Duration::from_millis(config.debounce_ms))
        .auto_load(false)
        .build()?;

    let mut in_flight = Vec::with_capacity(config.keystrokes.len());
    for keyword in &config.keystrokes {
        seqfetch_debug!(slot: "parts", "typed {:?}", keyword);
        search.set(json!({ "keyword": keyword }));
        in_flight.push(source.handle_search());
        tokio::time::sleep(Duration::from_millis(config.typing_interval_ms)).await;
    }

    let (mut committed, mut discarded) = (0, 0);
    for pending in in_flight {
        match pending.await {
            Settle::Cancelled => discarded += 1,
            Settle::Committed(_) | Settle::Failed(_) => committed += 1,
        }
    }
    seqfetch_info!(
        "search settled: {} committed, {} discarded",
        committed,
        discarded
    );

    if config.then_page > 0 {
        source.handle_page_change(config.then_page).await;
    }

    Ok(SessionReport {
        committed,
        discarded,
        rows: source.data().get(),
        pagination: source.pagination().get(),
        error: source.error().get(),
    })
}
