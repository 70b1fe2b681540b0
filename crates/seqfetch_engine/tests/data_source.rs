use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use seqfetch_engine::{
    request_fn, ConfigError, PagedDataSource, Pagination, Reactive, RequestError, Requester,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(seqfetch_logging::initialize_for_tests);
}

type Sent = Arc<Mutex<Vec<Value>>>;

/// Serves `rows` integers paged by `pageNum`/`pageSize`, in the
/// `{data: {list, total}}` envelope. Page 2 is deliberately slow.
fn paged_backend(sent: Sent, rows: u64) -> impl Requester {
    request_fn(move |call| {
        let sent = Arc::clone(&sent);
        async move {
            sent.lock().unwrap().push(call.params.clone());
            let page = call.params["pageNum"].as_u64().unwrap_or(1);
            let size = call.params["pageSize"].as_u64().unwrap_or(10);
            if call.params["keyword"] == json!("boom") {
                return Err(RequestError::network("connection reset"));
            }
            let latency = if page == 2 { 50 } else { 5 };
            tokio::time::sleep(Duration::from_millis(latency)).await;
            let start = (page - 1) * size;
            let list: Vec<u64> = (start..(start + size).min(rows)).collect();
            Ok(json!({"code": 0, "data": {"list": list, "total": rows}}))
        }
    })
}

fn nested_pagination() -> Pagination {
    Pagination {
        data_field: "data.list".to_string(),
        page_size: 5,
        ..Pagination::default()
    }
}

fn manual_source(sent: &Sent) -> PagedDataSource {
    PagedDataSource::builder()
        .requester(paged_backend(Arc::clone(sent), 23))
        .pagination(nested_pagination())
        .auto_load(false)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn auto_load_fetches_first_page_and_total() {
    init_logging();
    let sent = Sent::default();
    let source = PagedDataSource::builder()
        .requester(paged_backend(Arc::clone(&sent), 23))
        .pagination(nested_pagination())
        .build()
        .unwrap();

    assert!(!source.initialized().get());
    assert!(source.loading().get());
    source.wait_idle().await;

    assert_eq!(source.data().get(), json!([0, 1, 2, 3, 4]));
    assert_eq!(source.pagination().get().total, 23);
    assert_eq!(source.pagination().get().page_count(), 5);
    assert!(source.initialized().get());
    assert_eq!(*sent.lock().unwrap(), vec![json!({"pageNum": 1, "pageSize": 5})]);
}

#[tokio::test(start_paused = true)]
async fn page_change_updates_pagination_and_fetches() {
    init_logging();
    let sent = Sent::default();
    let source = manual_source(&sent);

    let pending = source.handle_page_change(3);
    assert_eq!(source.pagination().get().page_num, 3);
    pending.await;

    assert_eq!(source.data().get(), json!([10, 11, 12, 13, 14]));
    assert_eq!(*sent.lock().unwrap(), vec![json!({"pageNum": 3, "pageSize": 5})]);
}

#[tokio::test(start_paused = true)]
async fn fast_flip_after_slow_page_keeps_latest_rows() {
    init_logging();
    let sent = Sent::default();
    let source = manual_source(&sent);

    let slow = source.handle_page_change(2);
    let fast = source.handle_page_change(3);
    let (slow, fast) = tokio::join!(slow, fast);

    assert!(slow.is_cancelled());
    assert!(!fast.is_cancelled());
    assert_eq!(source.data().get(), json!([10, 11, 12, 13, 14]));
    assert_eq!(source.pagination().get().page_num, 3);
}

#[tokio::test(start_paused = true)]
async fn size_change_resets_page_and_fetches_once() {
    init_logging();
    let sent = Sent::default();
    let source = manual_source(&sent);
    source.handle_page_change(4).await;
    sent.lock().unwrap().clear();

    source.handle_size_change(20).await;

    let pagination = source.pagination().get();
    assert_eq!(pagination.page_num, 1);
    assert_eq!(pagination.page_size, 20);
    assert_eq!(*sent.lock().unwrap(), vec![json!({"pageNum": 1, "pageSize": 20})]);
    assert_eq!(source.data().get().as_array().map(Vec::len), Some(20));
}

#[tokio::test(start_paused = true)]
async fn reset_restores_configured_page_size() {
    init_logging();
    let sent = Sent::default();
    let source = manual_source(&sent);
    source.handle_size_change(10).await;
    source.handle_page_change(2).await;

    source.reset().await;

    let pagination = source.pagination().get();
    assert_eq!(pagination.page_num, 1);
    assert_eq!(pagination.page_size, 5);
    assert_eq!(source.data().get(), json!([0, 1, 2, 3, 4]));
}

#[tokio::test(start_paused = true)]
async fn search_params_are_merged_and_win_on_collision() {
    init_logging();
    let sent = Sent::default();
    let search = Reactive::new(json!({"keyword": "bolt", "pageSize": 2}));
    let source = PagedDataSource::builder()
        .requester(paged_backend(Arc::clone(&sent), 23))
        .pagination(nested_pagination())
        .search_params(search.clone())
        .auto_load(false)
        .build()
        .unwrap();

    source.fetch_data().await;
    search.set(json!({"keyword": "nut"}));
    source.handle_page_change(2).await;
    source.handle_search().await;

    assert_eq!(
        *sent.lock().unwrap(),
        vec![
            json!({"pageNum": 1, "pageSize": 2, "keyword": "bolt"}),
            json!({"pageNum": 2, "pageSize": 5, "keyword": "nut"}),
            json!({"pageNum": 1, "pageSize": 5, "keyword": "nut"}),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn pagination_keys_can_be_left_out() {
    init_logging();
    let sent = Sent::default();
    let source = PagedDataSource::builder()
        .requester(paged_backend(Arc::clone(&sent), 3))
        .pagination(nested_pagination())
        .search_params(Reactive::new(json!({"status": "open"})))
        .include_pagination(false)
        .auto_load(false)
        .build()
        .unwrap();

    source.fetch_data().await;
    assert_eq!(*sent.lock().unwrap(), vec![json!({"status": "open"})]);
}

#[tokio::test(start_paused = true)]
async fn failed_page_keeps_previous_rows_and_reports_error() {
    init_logging();
    let search = Reactive::new(json!({}));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let source = PagedDataSource::builder()
        .requester(paged_backend(Sent::default(), 23))
        .pagination(nested_pagination())
        .search_params(search.clone())
        .on_error(move |error, _params| sink.lock().unwrap().push(error.clone()))
        .auto_load(false)
        .build()
        .unwrap();
    source.fetch_data().await;

    search.set(json!({"keyword": "boom"}));
    let settled = source.handle_search().await;

    let expected = RequestError::network("connection reset");
    assert_eq!(settled.error(), Some(&expected));
    assert_eq!(source.error().get(), Some(expected.clone()));
    assert_eq!(*errors.lock().unwrap(), vec![expected]);
    assert_eq!(source.data().get(), json!([0, 1, 2, 3, 4]));
    assert!(!source.loading().get());
    assert!(source.initialized().get());
}

#[tokio::test(start_paused = true)]
async fn on_success_receives_rows_and_raw_response() {
    init_logging();
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let source = PagedDataSource::builder()
        .requester(paged_backend(Sent::default(), 2))
        .pagination(nested_pagination())
        .on_success(move |rows, params, raw| {
            *sink.lock().unwrap() = Some((rows.clone(), params.clone(), raw["code"].clone()));
        })
        .auto_load(false)
        .build()
        .unwrap();

    source.fetch_data().await;

    assert_eq!(
        seen.lock().unwrap().clone(),
        Some((
            json!([0, 1]),
            json!({"pageNum": 1, "pageSize": 5}),
            json!(0)
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn missing_data_field_yields_empty_rows() {
    init_logging();
    let source = PagedDataSource::builder()
        .requester(request_fn(|_call| async { Ok(json!({"code": 0})) }))
        .auto_load(false)
        .build()
        .unwrap();

    source.fetch_data().await;

    assert_eq!(source.data().get(), json!([]));
    assert_eq!(source.pagination().get().total, 0);
    assert!(source.initialized().get());
}

#[tokio::test(start_paused = true)]
async fn cancel_drops_in_flight_page() {
    init_logging();
    let sent = Sent::default();
    let source = manual_source(&sent);

    let pending = source.handle_page_change(2);
    source.cancel();

    assert!(pending.await.is_cancelled());
    assert_eq!(source.data().get(), json!([]));
    assert!(!source.loading().get());
    assert!(!source.initialized().get());
}

#[tokio::test(start_paused = true)]
async fn refresh_repeats_last_request() {
    init_logging();
    let sent = Sent::default();
    let source = manual_source(&sent);
    source.handle_page_change(3).await;

    source.refresh().await;

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
}

#[tokio::test(start_paused = true)]
async fn hidden_loading_never_shows() {
    init_logging();
    let source = PagedDataSource::builder()
        .requester(paged_backend(Sent::default(), 23))
        .pagination(nested_pagination())
        .show_loading(false)
        .auto_load(false)
        .build()
        .unwrap();

    let pending = source.fetch_data();
    assert!(!source.loading().get());
    pending.await;
    assert!(source.initialized().get());
}

#[test]
fn invalid_pagination_fails_fast() {
    let err = PagedDataSource::builder()
        .requester(paged_backend(Sent::default(), 1))
        .pagination(Pagination {
            page_size: 0,
            ..Pagination::default()
        })
        .auto_load(false)
        .build()
        .err();

    assert_eq!(err, Some(ConfigError::ZeroPageSize));
}

#[test]
fn missing_requester_fails_fast() {
    let err = PagedDataSource::builder().auto_load(false).build().err();
    assert_eq!(err, Some(ConfigError::MissingRequester));
}

#[test]
fn auto_load_without_runtime_fails_fast() {
    let err = PagedDataSource::builder()
        .requester(paged_backend(Sent::default(), 1))
        .build()
        .err();
    assert_eq!(err, Some(ConfigError::NoRuntime));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn total_follows_latest_page_when_listeners_are_slow() {
    init_logging();
    let source = PagedDataSource::builder()
        .requester(request_fn(|call| async move {
            let page = call.params["pageNum"].as_u64().unwrap_or(1);
            let total = if page == 1 { 100 } else { 7 };
            Ok(json!({"data": {"list": [page], "total": total}}))
        }))
        .pagination(nested_pagination())
        .auto_load(false)
        .build()
        .unwrap();
    // Holds page 1's worker after its rows land, while page 2 commits.
    source.data().on_change(|rows| {
        if *rows == json!([1]) {
            std::thread::sleep(Duration::from_millis(200));
        }
    });

    let first = source.handle_page_change(1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = source.handle_page_change(2);
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.data(), Some(&json!([1])));
    assert_eq!(second.data(), Some(&json!([2])));
    assert_eq!(source.data().get(), json!([2]));
    let pagination = source.pagination().get();
    assert_eq!(pagination.page_num, 2);
    assert_eq!(pagination.total, 7);
}
