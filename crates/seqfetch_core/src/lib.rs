//! Seqfetch core: generation fencing, path extraction and pagination state.
//!
//! Everything here is synchronous and runtime-free; the async layer lives in
//! `seqfetch_engine`.
mod error;
mod fence;
mod pagination;
mod path;

pub use error::{ConfigError, FailureKind, RequestError};
pub use fence::{Fence, Generation};
pub use pagination::{build_request_params, read_total, Pagination};
pub use path::{extract_or, extract_path, parent_path};
