use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use seqfetch_core::{build_request_params, read_total, ConfigError, Pagination, RequestError};
use seqfetch_logging::seqfetch_debug;

use crate::reactive::Reactive;
use crate::request::Requester;
use crate::sequencer::{CommitSink, Pending, RequestSequencer};

type PageHook = Arc<dyn Fn(&Value, &Value, &Value) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&RequestError, &Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataSourceOptions {
    /// Fetch the first page from `build()`.
    pub auto_load: bool,
    pub show_loading: bool,
    /// Send the page number and size keys with every request.
    pub include_pagination: bool,
    /// Debounce applied to every fetch; 0 disables it.
    pub delay_ms: u64,
}

impl Default for DataSourceOptions {
    fn default() -> Self {
        Self {
            auto_load: true,
            show_loading: true,
            include_pagination: true,
            delay_ms: 0,
        }
    }
}

/// Paginated table data, fetched through a [`RequestSequencer`].
///
/// Page and size handlers update `pagination` immediately and issue a fetch;
/// the slowest of several quick page flips can never overwrite the rows of
/// the last one.
#[derive(Clone)]
pub struct PagedDataSource {
    sequencer: RequestSequencer,
    pagination: Reactive<Pagination>,
    initialized: Reactive<bool>,
    search_params: Reactive<Value>,
    options: DataSourceOptions,
    default_page_size: u64,
}

impl PagedDataSource {
    pub fn builder() -> DataSourceBuilder {
        DataSourceBuilder::default()
    }

    /// Fetches the current page with the current search snapshot.
    pub fn fetch_data(&self) -> Pending {
        let params = build_request_params(
            &self.pagination.get(),
            self.options.include_pagination,
            &self.search_params.get(),
        );
        self.sequencer.execute(Some(params))
    }

    pub fn handle_page_change(&self, page: u64) -> Pending {
        self.pagination.update(|pagination| pagination.go_to_page(page));
        self.fetch_data()
    }

    pub fn handle_size_change(&self, size: u64) -> Pending {
        self.pagination.update(|pagination| pagination.resize(size));
        self.fetch_data()
    }

    /// Back to page one with the configured page size.
    pub fn reset(&self) -> Pending {
        let default_page_size = self.default_page_size;
        self.pagination
            .update(|pagination| pagination.rewind(default_page_size));
        self.fetch_data()
    }

    /// Applies changed search params: back to page one, then fetch.
    pub fn handle_search(&self) -> Pending {
        self.pagination.update(|pagination| pagination.go_to_page(1));
        self.fetch_data()
    }

    /// Re-sends the last request unchanged.
    pub fn refresh(&self) -> Pending {
        self.sequencer.refresh()
    }

    pub fn cancel(&self) {
        self.sequencer.cancel();
    }

    /// Rows of the last committed page.
    pub fn data(&self) -> Reactive<Value> {
        self.sequencer.data()
    }

    pub fn loading(&self) -> Reactive<bool> {
        self.sequencer.loading()
    }

    pub fn error(&self) -> Reactive<Option<RequestError>> {
        self.sequencer.error()
    }

    pub fn pagination(&self) -> Reactive<Pagination> {
        self.pagination.clone()
    }

    /// True once any page has been committed.
    pub fn initialized(&self) -> Reactive<bool> {
        self.initialized.clone()
    }

    pub fn search_params(&self) -> Reactive<Value> {
        self.search_params.clone()
    }

    pub fn sequencer(&self) -> &RequestSequencer {
        &self.sequencer
    }

    pub async fn wait_idle(&self) {
        self.sequencer.wait_idle().await;
    }
}

/// Commits `total` and `initialized` together with the rows, so a
/// superseded page can never leave its total behind.
struct PageState {
    label: String,
    data_field: String,
    pagination: Reactive<Pagination>,
    initialized: Reactive<bool>,
    first_commit: AtomicBool,
}

impl CommitSink for PageState {
    fn store(&self, raw: &Value) {
        if let Some(total) = read_total(raw, &self.data_field) {
            self.pagination
                .store_with(|pagination| pagination.total = total);
        }
        if !self.initialized.get() {
            self.initialized.store(true);
            self.first_commit.store(true, Ordering::Release);
        }
    }

    fn notify(&self) {
        self.pagination.notify();
        if self.first_commit.swap(false, Ordering::AcqRel) {
            seqfetch_debug!(slot: self.label, "first page loaded");
            self.initialized.notify();
        }
    }
}

/// Builder for [`PagedDataSource`].
#[derive(Default)]
pub struct DataSourceBuilder {
    label: Option<String>,
    requester: Option<Arc<dyn Requester>>,
    pagination: Pagination,
    options: DataSourceOptions,
    search_params: Option<Reactive<Value>>,
    on_success: Option<PageHook>,
    on_error: Option<ErrorHook>,
}

impl DataSourceBuilder {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn requester(mut self, requester: impl Requester + 'static) -> Self {
        self.requester = Some(Arc::new(requester));
        self
    }

    pub fn shared_requester(mut self, requester: Arc<dyn Requester>) -> Self {
        self.requester = Some(requester);
        self
    }

    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn options(mut self, options: DataSourceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn auto_load(mut self, auto_load: bool) -> Self {
        self.options.auto_load = auto_load;
        self
    }

    pub fn show_loading(mut self, show_loading: bool) -> Self {
        self.options.show_loading = show_loading;
        self
    }

    pub fn include_pagination(mut self, include_pagination: bool) -> Self {
        self.options.include_pagination = include_pagination;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.options.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Externally owned search params, read as a snapshot on every fetch.
    pub fn search_params(mut self, search_params: Reactive<Value>) -> Self {
        self.search_params = Some(search_params);
        self
    }

    /// Called with `(rows, params, raw response)` after a page commits.
    pub fn on_success(
        mut self,
        hook: impl Fn(&Value, &Value, &Value) + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&RequestError, &Value) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<PagedDataSource, ConfigError> {
        self.pagination.validate()?;
        let requester = self.requester.ok_or(ConfigError::MissingRequester)?;
        if self.options.auto_load {
            tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        }

        let label = self.label.unwrap_or_else(|| "table".to_string());
        let data_field = self.pagination.data_field.clone();
        let default_page_size = self.pagination.page_size;
        let pagination = Reactive::new(self.pagination);
        let initialized = Reactive::new(false);
        let search_params = self
            .search_params
            .unwrap_or_else(|| Reactive::new(Value::Object(Map::new())));

        let page_state = PageState {
            label: label.clone(),
            data_field: data_field.clone(),
            pagination: pagination.clone(),
            initialized: initialized.clone(),
            first_commit: AtomicBool::new(false),
        };

        let mut builder = RequestSequencer::builder()
            .label(label)
            .shared_requester(requester)
            .path(data_field)
            .immediate(false)
            .show_loading(self.options.show_loading)
            .delay(Duration::from_millis(self.options.delay_ms))
            .initial(Value::Array(Vec::new()))
            .fallback(Value::Array(Vec::new()))
            .commit_sink(Arc::new(page_state));
        if let Some(on_success) = self.on_success {
            builder = builder.on_success(move |rows, params, raw| on_success(rows, params, raw));
        }
        if let Some(on_error) = self.on_error {
            builder = builder.on_error(move |error, params| on_error(error, params));
        }
        let sequencer = builder.build()?;

        let source = PagedDataSource {
            sequencer,
            pagination,
            initialized,
            search_params,
            options: self.options,
            default_page_size,
        };
        if source.options.auto_load {
            // Runs as a task on the current runtime.
            drop(source.fetch_data());
        }
        Ok(source)
    }
}
