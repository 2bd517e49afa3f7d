//! find-or-error: fail-on-empty single-record lookups
//!
//! Lets a data access layer treat "no record found" as an explicit,
//! configurable failure instead of a silent empty result.
//!
//! ## Key Components
//!
//! - `RecordSource`: the storage engine's single-record lookup
//! - `Model`: a source plus post-find hooks and query helpers
//! - `FindOrError::attach`: augments a model per a `RegistrationConfig`
//! - `AugmentedModel`: exposes `findOneOrError` / `findByIdOrError` entry
//!   points, callable in deferred or continuation style
//! - `EnforceOnEmpty`: the post-find hook that rejects empty results
//! - `EmptyErrorBuilder`: builds the `DocumentNotFoundError`, replaceable
//!
//! ## Example
//!
//! ```ignore
//! let collection = MemoryCollection::new("example");
//! let model = FindOrError::attach(Model::new(collection), RegistrationConfig::default())?;
//!
//! // Deferred style
//! let err = model.find_one_or_error()?.exec(json!({"name": "x"})).await.unwrap_err();
//! assert_eq!(err.as_not_found().unwrap().message, "Example not found.");
//!
//! // Query helper on a plain lookup
//! let record = model.find_one(json!({"name": "x"})).throw_empty_with(404)?.await;
//! ```

pub mod adapter;
pub mod config;
mod error;
pub mod fakes;
pub mod hook;
mod model;
pub mod options;
mod plugin;
mod query;
pub mod source;
pub mod synth;

pub use adapter::{CallArgs, CallStyle, Dispatch, EntryKind, OrErrorEntry};
pub use config::RegistrationConfig;
pub use error::{
    ConfigError, EntryPointError, FindError, NotFoundError, StorageError, DOCUMENT_NOT_FOUND,
};
pub use hook::{EnforceOnEmpty, PostFindHook, QueryContext};
pub use model::Model;
pub use options::{EnforcementFlag, ErrorCode, FindOptions, OptionResolver};
pub use plugin::{AugmentedModel, FindOrError};
pub use query::{Query, QueryHelperFn};
pub use source::{Filter, Projection, RecordSource, StorageResult};
pub use synth::{DefaultEmptyError, EmptyErrorBuilder};

/// Result type for lookups
pub type Result<T> = std::result::Result<T, FindError>;
