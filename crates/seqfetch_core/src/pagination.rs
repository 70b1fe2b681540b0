use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use seqfetch_logging::seqfetch_warn;

use crate::path::{extract_path, parent_path};
use crate::ConfigError;

pub const DEFAULT_PAGE_KEY: &str = "pageNum";
pub const DEFAULT_SIZE_KEY: &str = "pageSize";
pub const DEFAULT_DATA_FIELD: &str = "records";
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Pagination state of a paged data source, also used as its configuration.
///
/// The keys name the request parameters; `data_field` is the response path
/// holding the current page's rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pagination {
    pub current_page_key: String,
    pub page_size_key: String,
    pub data_field: String,
    pub page_num: u64,
    pub page_size: u64,
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page_key: DEFAULT_PAGE_KEY.to_string(),
            page_size_key: DEFAULT_SIZE_KEY.to_string(),
            data_field: DEFAULT_DATA_FIELD.to_string(),
            page_num: 1,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
        }
    }
}

impl Pagination {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.current_page_key.is_empty() {
            return Err(ConfigError::EmptyKey {
                field: "currentPageKey",
            });
        }
        if self.page_size_key.is_empty() {
            return Err(ConfigError::EmptyKey {
                field: "pageSizeKey",
            });
        }
        if self.current_page_key == self.page_size_key {
            return Err(ConfigError::DuplicateKeys {
                key: self.current_page_key.clone(),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.page_num == 0 {
            return Err(ConfigError::ZeroPageNum);
        }
        Ok(())
    }

    pub fn go_to_page(&mut self, page: u64) {
        self.page_num = at_least_one(page, "page number");
    }

    /// Changes the page size; the old page number is meaningless afterwards.
    pub fn resize(&mut self, size: u64) {
        self.page_size = at_least_one(size, "page size");
        self.page_num = 1;
    }

    pub fn rewind(&mut self, default_size: u64) {
        self.page_num = 1;
        self.page_size = at_least_one(default_size, "page size");
    }

    /// Number of pages implied by `total`, never less than one.
    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(self.page_size.max(1)).max(1)
    }
}

fn at_least_one(value: u64, what: &str) -> u64 {
    if value == 0 {
        seqfetch_warn!("{} of 0 requested; using 1", what);
        1
    } else {
        value
    }
}

/// Request parameters for the current page.
///
/// Search entries are applied last and win over the pagination keys.
pub fn build_request_params(
    pagination: &Pagination,
    include_pagination: bool,
    search: &Value,
) -> Value {
    let mut params = Map::new();
    if include_pagination {
        params.insert(
            pagination.current_page_key.clone(),
            Value::from(pagination.page_num),
        );
        params.insert(
            pagination.page_size_key.clone(),
            Value::from(pagination.page_size),
        );
    }
    match search {
        Value::Object(entries) => {
            params.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Value::Null => {}
        other => {
            seqfetch_warn!("ignoring non-object search params: {}", other);
        }
    }
    Value::Object(params)
}

/// Total row count carried by a page response.
///
/// Looked up next to the data field first (`data.total` for `data.list`),
/// then at the top level.
pub fn read_total(raw: &Value, data_field: &str) -> Option<u64> {
    let parent = parent_path(data_field);
    let beside = extract_path(raw, parent).and_then(|container| container.get("total"));
    let top = raw.get("total");
    beside.and_then(as_count).or_else(|| top.and_then(as_count))
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
