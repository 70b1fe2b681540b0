use pretty_assertions::assert_eq;
use serde_json::json;
use seqfetch_core::{build_request_params, read_total, ConfigError, Pagination};

fn custom_keys() -> Pagination {
    Pagination {
        current_page_key: "current".to_string(),
        page_size_key: "size".to_string(),
        data_field: "data.list".to_string(),
        ..Pagination::default()
    }
}

#[test]
fn defaults_match_backend_conventions() {
    let pagination = Pagination::default();

    assert_eq!(pagination.current_page_key, "pageNum");
    assert_eq!(pagination.page_size_key, "pageSize");
    assert_eq!(pagination.data_field, "records");
    assert_eq!(pagination.page_num, 1);
    assert_eq!(pagination.page_size, 10);
    assert_eq!(pagination.total, 0);
    assert_eq!(pagination.validate(), Ok(()));
}

#[test]
fn params_merge_pagination_and_search() {
    let mut pagination = custom_keys();
    pagination.go_to_page(3);

    let params = build_request_params(&pagination, true, &json!({"keyword": "bolt"}));
    assert_eq!(params, json!({"current": 3, "size": 10, "keyword": "bolt"}));
}

#[test]
fn search_params_win_on_key_collision() {
    let pagination = Pagination::default();

    let params = build_request_params(&pagination, true, &json!({"pageSize": 500}));
    assert_eq!(params, json!({"pageNum": 1, "pageSize": 500}));
}

#[test]
fn pagination_keys_omitted_when_disabled() {
    let pagination = Pagination::default();

    let params = build_request_params(&pagination, false, &json!({"status": "open"}));
    assert_eq!(params, json!({"status": "open"}));
}

#[test]
fn null_or_scalar_search_contributes_nothing() {
    let pagination = Pagination::default();

    assert_eq!(
        build_request_params(&pagination, true, &json!(null)),
        json!({"pageNum": 1, "pageSize": 10})
    );
    assert_eq!(
        build_request_params(&pagination, true, &json!("oops")),
        json!({"pageNum": 1, "pageSize": 10})
    );
}

#[test]
fn resize_returns_to_first_page() {
    let mut pagination = Pagination::default();
    pagination.go_to_page(4);
    pagination.resize(20);

    assert_eq!(pagination.page_num, 1);
    assert_eq!(pagination.page_size, 20);
}

#[test]
fn rewind_restores_default_size() {
    let mut pagination = Pagination::default();
    pagination.resize(50);
    pagination.go_to_page(2);
    pagination.rewind(10);

    assert_eq!(pagination.page_num, 1);
    assert_eq!(pagination.page_size, 10);
}

#[test]
fn zero_page_and_size_are_clamped() {
    let mut pagination = Pagination::default();
    pagination.go_to_page(0);
    assert_eq!(pagination.page_num, 1);

    pagination.resize(0);
    assert_eq!(pagination.page_size, 1);
}

#[test]
fn page_count_rounds_up() {
    let mut pagination = Pagination::default();
    assert_eq!(pagination.page_count(), 1);

    pagination.total = 21;
    assert_eq!(pagination.page_count(), 3);
}

#[test]
fn total_read_beside_data_field_then_top_level() {
    let nested = json!({"data": {"list": [1, 2, 3], "total": 3}});
    assert_eq!(read_total(&nested, "data.list"), Some(3));

    let top = json!({"records": [], "total": "42"});
    assert_eq!(read_total(&top, "records"), Some(42));

    let both = json!({"total": 99, "data": {"list": [], "total": 5}});
    assert_eq!(read_total(&both, "data.list"), Some(5));

    assert_eq!(read_total(&json!({"records": []}), "records"), None);
}

#[test]
fn invalid_configs_are_rejected() {
    let mut empty = Pagination::default();
    empty.page_size_key.clear();
    assert_eq!(
        empty.validate(),
        Err(ConfigError::EmptyKey {
            field: "pageSizeKey"
        })
    );

    let duplicate = Pagination {
        page_size_key: "pageNum".to_string(),
        ..Pagination::default()
    };
    assert_eq!(
        duplicate.validate(),
        Err(ConfigError::DuplicateKeys {
            key: "pageNum".to_string()
        })
    );

    let zero = Pagination {
        page_size: 0,
        ..Pagination::default()
    };
    assert_eq!(zero.validate(), Err(ConfigError::ZeroPageSize));
}

#[test]
fn config_deserializes_from_camel_case_with_defaults() {
    let pagination: Pagination =
        serde_json::from_value(json!({"dataField": "data.list", "pageSize": 20})).unwrap();

    assert_eq!(pagination.data_field, "data.list");
    assert_eq!(pagination.page_size, 20);
    assert_eq!(pagination.current_page_key, "pageNum");
}
