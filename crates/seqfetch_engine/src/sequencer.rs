use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use seqfetch_core::{extract_or, ConfigError, Fence, Generation, RequestError};
use seqfetch_logging::{seqfetch_debug, seqfetch_trace, seqfetch_warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::reactive::Reactive;
use crate::request::{RequestCall, Requester};

/// Future returned by every call that issues a request.
///
/// The request is already issued when this is returned; awaiting it only
/// waits for the outcome.
pub type Pending = BoxFuture<'static, Settle>;

type SuccessHook = Arc<dyn Fn(&Value, &Value, &Value) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&RequestError, &Value) + Send + Sync>;
type FinallyHook = Arc<dyn Fn() + Send + Sync>;
type Transform = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// State a wrapper commits together with `data`, under the same
/// generation check.
pub(crate) trait CommitSink: Send + Sync {
    /// Runs with the slot locked. Store-only writes; no listeners.
    fn store(&self, raw: &Value);
    /// Runs once the slot is released.
    fn notify(&self);
}

/// How an issued call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Settle {
    /// Current call succeeded; carries the committed data.
    Committed(Value),
    /// Current call failed; the error was committed.
    Failed(RequestError),
    /// The call was superseded or cancelled before it could commit.
    Cancelled,
}

impl Settle {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Settle::Cancelled)
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Settle::Committed(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RequestError> {
        match self {
            Settle::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Where `execute(None)` takes its parameters from.
#[derive(Debug, Clone)]
pub enum ParamSource {
    Value(Value),
    Reactive(Reactive<Value>),
}

impl Default for ParamSource {
    fn default() -> Self {
        ParamSource::Value(Value::Object(Map::new()))
    }
}

impl ParamSource {
    fn resolve(&self) -> Value {
        match self {
            ParamSource::Value(value) => value.clone(),
            ParamSource::Reactive(cell) => cell.get(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerOptions {
    /// Response path committed to `data`.
    pub path: String,
    /// Per-call wait before the request function runs; 0 disables it.
    pub delay_ms: u64,
    /// Issue one call from `build()`.
    pub immediate: bool,
    /// When false, `loading` stays false.
    pub show_loading: bool,
    /// Value of `data` before the first commit and after `reset(None)`.
    pub initial: Value,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            path: "data".to_string(),
            delay_ms: 0,
            immediate: true,
            show_loading: true,
            initial: Value::Null,
        }
    }
}

impl SequencerOptions {
    pub fn delay(&self) -> Option<Duration> {
        (self.delay_ms > 0).then(|| Duration::from_millis(self.delay_ms))
    }
}

/// One logical fetch slot.
///
/// Every issued call is stamped with a fresh generation; a completion may
/// write `data`, `error` or `loading` only if its generation is still the
/// current one. Older calls keep running but settle as [`Settle::Cancelled`].
#[derive(Clone)]
pub struct RequestSequencer {
    inner: Arc<Shared>,
}

struct Shared {
    label: String,
    requester: Arc<dyn Requester>,
    params: ParamSource,
    options: SequencerOptions,
    fallback: Value,
    transform: Option<Transform>,
    on_success: Option<SuccessHook>,
    on_error: Option<ErrorHook>,
    on_finally: Option<FinallyHook>,
    sink: Option<Arc<dyn CommitSink>>,
    data: Reactive<Value>,
    loading: Reactive<bool>,
    error: Reactive<Option<RequestError>>,
    slot: Mutex<Slot>,
}

struct Slot {
    fence: Fence,
    params: Value,
    cancel: CancellationToken,
}

struct Ticket {
    generation: Generation,
    params: Value,
    cancel: CancellationToken,
    send_at: Option<Instant>,
}

/// Clears `loading` if a still-current call is dropped or unwinds before it
/// settles.
struct Unsettled {
    inner: Arc<Shared>,
    generation: Generation,
}

impl Drop for Unsettled {
    fn drop(&mut self) {
        self.inner.abandon(self.generation);
    }
}

impl RequestSequencer {
    pub fn builder() -> SequencerBuilder {
        SequencerBuilder::default()
    }

    /// Issues a call with `params`, or with the bound parameter source.
    ///
    /// Inside a tokio runtime the call runs as its own task, so dropping the
    /// returned future does not stop it. Elsewhere it runs when polled, and a
    /// configured delay is skipped since there is no timer to drive it.
    /// Either way a call that ends without settling (its task aborted, or the
    /// request function panicking) clears `loading` if it is still current.
    pub fn execute(&self, params: Option<Value>) -> Pending {
        let ticket = self.inner.begin(params);
        let guard = Unsettled {
            inner: Arc::clone(&self.inner),
            generation: ticket.generation,
        };
        let call = async move {
            let guard = guard;
            guard.inner.run(ticket).await
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(call);
                async move {
                    match task.await {
                        Ok(settled) => settled,
                        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                        Err(_) => Settle::Cancelled,
                    }
                }
                .boxed()
            }
            Err(_) => call.boxed(),
        }
    }

    /// Re-sends the parameters of the last issued call.
    pub fn refresh(&self) -> Pending {
        let params = self.inner.slot().params.clone();
        self.execute(Some(params))
    }

    /// Replaces `data` and clears `error`. In-flight calls are untouched and
    /// may still overwrite `data` when they commit.
    pub fn reset(&self, value: Option<Value>) {
        let value = value.unwrap_or_else(|| self.inner.options.initial.clone());
        self.inner.data.set(value);
        self.inner.error.set(None);
    }

    /// Retires any in-flight call so it can never commit.
    pub fn cancel(&self) {
        let generation = {
            let mut slot = self.inner.slot();
            let generation = slot.fence.invalidate();
            let retired = std::mem::replace(&mut slot.cancel, CancellationToken::new());
            retired.cancel();
            self.inner.loading.store(false);
            generation
        };
        self.inner.loading.notify();
        seqfetch_debug!(slot: self.inner.label, "cancelled, generation now {}", generation);
    }

    pub fn data(&self) -> Reactive<Value> {
        self.inner.data.clone()
    }

    pub fn loading(&self) -> Reactive<bool> {
        self.inner.loading.clone()
    }

    pub fn error(&self) -> Reactive<Option<RequestError>> {
        self.inner.error.clone()
    }

    /// Deserializes the committed data.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.inner.data.get())
    }

    pub fn generation(&self) -> Generation {
        self.inner.slot().fence.current()
    }

    /// Parameters of the last issued call.
    pub fn current_params(&self) -> Value {
        self.inner.slot().params.clone()
    }

    /// Resolves once `loading` is false.
    pub async fn wait_idle(&self) {
        self.inner.loading.wait_for(|loading| !*loading).await;
    }
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, params: Option<Value>) -> Ticket {
        let params = params.unwrap_or_else(|| self.params.resolve());
        let ticket = {
            let mut slot = self.slot();
            let generation = slot.fence.issue();
            let cancel = CancellationToken::new();
            let superseded = std::mem::replace(&mut slot.cancel, cancel.clone());
            superseded.cancel();
            slot.params = params.clone();
            if self.options.show_loading {
                self.loading.store(true);
            }
            self.error.store(None);
            Ticket {
                generation,
                params,
                cancel,
                send_at: self.options.delay().map(|delay| Instant::now() + delay),
            }
        };
        if self.options.show_loading {
            self.loading.notify();
        }
        self.error.notify();
        seqfetch_debug!(
            slot: self.label,
            "issued generation {} (delay {}ms)",
            ticket.generation,
            self.options.delay_ms
        );
        ticket
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.slot().fence.is_current(generation)
    }

    async fn run(&self, ticket: Ticket) -> Settle {
        if let Some(send_at) = ticket.send_at {
            if tokio::runtime::Handle::try_current().is_ok() {
                tokio::time::sleep_until(send_at).await;
            } else {
                seqfetch_warn!(
                    slot: self.label,
                    "no runtime to time the delay of generation {}; sending now",
                    ticket.generation
                );
            }
            if !self.is_current(ticket.generation) {
                seqfetch_trace!(
                    slot: self.label,
                    "generation {} superseded during delay, not sent",
                    ticket.generation
                );
                return Settle::Cancelled;
            }
        }

        let call = RequestCall {
            params: ticket.params.clone(),
            generation: ticket.generation,
            cancel: ticket.cancel,
        };
        match self.requester.request(call).await {
            Ok(raw) => self.commit_success(ticket.generation, &ticket.params, raw),
            Err(error) => self.commit_failure(ticket.generation, &ticket.params, error),
        }
    }

    fn commit_success(&self, generation: Generation, params: &Value, raw: Value) -> Settle {
        let data = match &self.transform {
            Some(transform) => transform(&raw),
            None => extract_or(&raw, &self.options.path, self.fallback.clone()),
        };
        {
            let slot = self.slot();
            if !slot.fence.is_current(generation) {
                seqfetch_debug!(
                    slot: self.label,
                    "discarded stale response of generation {} (current {})",
                    generation,
                    slot.fence.current()
                );
                return Settle::Cancelled;
            }
            self.data.store(data.clone());
            self.loading.store(false);
            if let Some(sink) = &self.sink {
                sink.store(&raw);
            }
        }
        self.data.notify();
        if let Some(sink) = &self.sink {
            sink.notify();
        }
        self.loading.notify();
        seqfetch_debug!(slot: self.label, "committed generation {}", generation);

        if let Some(on_success) = &self.on_success {
            on_success(&data, params, &raw);
        }
        self.finish();
        Settle::Committed(data)
    }

    fn commit_failure(&self, generation: Generation, params: &Value, error: RequestError) -> Settle {
        {
            let slot = self.slot();
            if !slot.fence.is_current(generation) {
                seqfetch_debug!(
                    slot: self.label,
                    "discarded stale failure of generation {}: {}",
                    generation,
                    error
                );
                return Settle::Cancelled;
            }
            self.error.store(Some(error.clone()));
            self.loading.store(false);
        }
        self.error.notify();
        self.loading.notify();
        seqfetch_warn!(slot: self.label, "generation {} failed: {}", generation, error);

        if let Some(on_error) = &self.on_error {
            on_error(&error, params);
        }
        self.finish();
        Settle::Failed(error)
    }

    /// No-op unless `generation` is current and still shows as loading.
    fn abandon(&self, generation: Generation) {
        let cleared = {
            let slot = self.slot();
            let stuck = slot.fence.is_current(generation) && self.loading.get();
            if stuck {
                self.loading.store(false);
            }
            stuck
        };
        if cleared {
            self.loading.notify();
            seqfetch_warn!(
                slot: self.label,
                "generation {} ended without settling",
                generation
            );
        }
    }

    fn finish(&self) {
        if let Some(on_finally) = &self.on_finally {
            on_finally();
        }
    }
}

/// Builder for [`RequestSequencer`].
#[derive(Default)]
pub struct SequencerBuilder {
    label: Option<String>,
    requester: Option<Arc<dyn Requester>>,
    params: ParamSource,
    options: SequencerOptions,
    fallback: Value,
    transform: Option<Transform>,
    on_success: Option<SuccessHook>,
    on_error: Option<ErrorHook>,
    on_finally: Option<FinallyHook>,
    sink: Option<Arc<dyn CommitSink>>,
}

impl SequencerBuilder {
    /// Name used in log lines.
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

    pub fn params(mut self, params: Value) -> Self {
        self.params = ParamSource::Value(params);
        self
    }

    /// Binds a live parameter cell, read at every `execute(None)`.
    pub fn params_ref(mut self, params: Reactive<Value>) -> Self {
        self.params = ParamSource::Reactive(params);
        self
    }

    pub fn options(mut self, options: SequencerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.options.path = path.into();
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.options.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.options.immediate = immediate;
        self
    }

    pub fn show_loading(mut self, show_loading: bool) -> Self {
        self.options.show_loading = show_loading;
        self
    }

    pub fn initial(mut self, initial: Value) -> Self {
        self.options.initial = initial;
        self
    }

    /// Committed when `path` is missing from a successful response.
    pub fn fallback(mut self, fallback: Value) -> Self {
        self.fallback = fallback;
        self
    }

    /// Replaces path extraction with a function of the raw response.
    pub fn transform(mut self, transform: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Called with `(data, params, raw response)` after a commit.
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

    /// Called once per current call after its success or error hook.
    pub fn on_finally(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_finally = Some(Arc::new(hook));
        self
    }

    pub(crate) fn commit_sink(mut self, sink: Arc<dyn CommitSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<RequestSequencer, ConfigError> {
        let requester = self.requester.ok_or(ConfigError::MissingRequester)?;
        if self.options.immediate {
            tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        }

        let initial_params = self.params.resolve();
        let sequencer = RequestSequencer {
            inner: Arc::new(Shared {
                label: self.label.unwrap_or_else(|| "request".to_string()),
                requester,
                params: self.params,
                fallback: self.fallback,
                transform: self.transform,
                on_success: self.on_success,
                on_error: self.on_error,
                on_finally: self.on_finally,
                sink: self.sink,
                data: Reactive::new(self.options.initial.clone()),
                loading: Reactive::new(false),
                error: Reactive::new(None),
                slot: Mutex::new(Slot {
                    fence: Fence::new(),
                    params: initial_params,
                    cancel: CancellationToken::new(),
                }),
                options: self.options,
            }),
        };

        if sequencer.inner.options.immediate {
            // Runs as a task on the current runtime.
            drop(sequencer.execute(None));
        }
        Ok(sequencer)
    }
}
