//! Seqfetch engine: stale-response-safe async request slots.
mod data_source;
mod reactive;
mod request;
mod sequencer;

pub use data_source::{DataSourceBuilder, DataSourceOptions, PagedDataSource};
pub use reactive::{ListenerId, Reactive};
pub use request::{request_fn, RequestCall, Requester};
pub use sequencer::{
    ParamSource, Pending, RequestSequencer, SequencerBuilder, SequencerOptions, Settle,
};

pub use seqfetch_core::{ConfigError, FailureKind, Generation, Pagination, RequestError};
pub use tokio_util::sync::CancellationToken;
