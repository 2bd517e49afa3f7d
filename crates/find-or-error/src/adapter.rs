//! Or-error entry points
//!
//! An [`OrErrorEntry`] behaves like the base lookup it wraps except that the
//! enforcement flag defaults to enabled. Each call picks its delivery style
//! explicitly through [`CallStyle`]:
//!
//! - `CallStyle::Deferred` returns a future that resolves or rejects once.
//! - `CallStyle::Continuation(done)` runs the lookup on the current tokio
//!   runtime and calls `done` exactly once with the outcome. Outside a
//!   runtime the call fails with [`EntryPointError::NoRuntime`] instead.

use std::fmt;

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::EntryPointError;
use crate::model::Model;
use crate::options::{FindOptions, OptionResolver};
use crate::query::Query;
use crate::source::{Filter, Projection, RecordSource};
use crate::Result;

/// Which base lookup an entry point wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// `findOneOrError(filter, ...)`
    FindOne,
    /// `findByIdOrError(id, ...)`
    FindById,
}

/// Positional arguments of a lookup: `(target, projection?, options?)`.
///
/// `target` is a predicate for [`EntryKind::FindOne`] and an identifier for
/// [`EntryKind::FindById`].
#[derive(Debug, Clone, PartialEq)]
pub struct CallArgs {
    pub target: Value,
    pub projection: Option<Projection>,
    pub options: Option<FindOptions>,
}

impl CallArgs {
    pub fn new(target: impl Into<Value>) -> Self {
        Self {
            target: target.into(),
            projection: None,
            options: None,
        }
    }

    pub fn projection(mut self, projection: impl Into<Projection>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    pub fn options(mut self, options: FindOptions) -> Self {
        self.options = Some(options);
        self
    }
}

impl From<Value> for CallArgs {
    fn from(target: Value) -> Self {
        Self::new(target)
    }
}

impl From<Filter> for CallArgs {
    fn from(filter: Filter) -> Self {
        Self::new(filter.into_value())
    }
}

/// Outcome delivered by an or-error call.
pub type Outcome<R> = Result<Option<R>>;

/// Continuation receiving the outcome of a call.
pub type Continuation<R> = Box<dyn FnOnce(Outcome<R>) + Send + 'static>;

/// Deferred outcome of a call.
pub type Deferred<R> = BoxFuture<'static, Outcome<R>>;

/// How the caller wants the outcome delivered.
pub enum CallStyle<R> {
    Deferred,
    Continuation(Continuation<R>),
}

impl<R> CallStyle<R> {
    pub fn continuation<F>(done: F) -> Self
    where
        F: FnOnce(Outcome<R>) + Send + 'static,
    {
        CallStyle::Continuation(Box::new(done))
    }
}

impl<R> fmt::Debug for CallStyle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallStyle::Deferred => f.write_str("Deferred"),
            CallStyle::Continuation(_) => f.write_str("Continuation"),
        }
    }
}

/// What [`Query::invoke`] or [`OrErrorEntry::invoke`] handed back.
pub enum Dispatch<R> {
    /// Await this for the outcome
    Deferred(Deferred<R>),
    /// The continuation will be called from this task
    Continued(JoinHandle<()>),
}

impl<R> Dispatch<R> {
    pub fn into_deferred(self) -> Option<Deferred<R>> {
        match self {
            Dispatch::Deferred(deferred) => Some(deferred),
            Dispatch::Continued(_) => None,
        }
    }

    pub fn into_handle(self) -> Option<JoinHandle<()>> {
        match self {
            Dispatch::Continued(handle) => Some(handle),
            Dispatch::Deferred(_) => None,
        }
    }
}

/// A registered or-error entry point, borrowed from its model.
pub struct OrErrorEntry<'m, S: RecordSource> {
    name: &'m str,
    kind: EntryKind,
    model: &'m Model<S>,
    resolver: &'m OptionResolver,
}

impl<'m, S: RecordSource> OrErrorEntry<'m, S> {
    pub(crate) fn new(
        name: &'m str,
        kind: EntryKind,
        model: &'m Model<S>,
        resolver: &'m OptionResolver,
    ) -> Self {
        Self {
            name,
            kind,
            model,
            resolver,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Build the underlying query with enforcement defaulted on.
    pub fn query(&self, args: impl Into<CallArgs>) -> Query<S> {
        let args = args.into();
        let options = self.resolver.for_entry_point(args.options);

        let query = match self.kind {
            EntryKind::FindOne => self.model.find_one(Filter::new(args.target)),
            EntryKind::FindById => self.model.find_by_id(args.target),
        };
        let query = query.set_options(options);
        match args.projection {
            Some(projection) => query.projection(projection),
            None => query,
        }
    }

    /// Dispatch a call in the requested style.
    pub fn invoke(
        &self,
        args: impl Into<CallArgs>,
        style: CallStyle<S::Record>,
    ) -> std::result::Result<Dispatch<S::Record>, EntryPointError> {
        let query = self.query(args);
        debug!(entry = self.name, style = ?style, "dispatching or-error lookup");
        query.invoke(style)
    }

    /// Deferred style: resolve with the record or reject with the error.
    pub fn exec(&self, args: impl Into<CallArgs>) -> Deferred<S::Record> {
        self.query(args).exec().boxed()
    }

    /// Continuation style: `done` is called exactly once.
    ///
    /// Fails with [`EntryPointError::NoRuntime`] outside a tokio runtime.
    pub fn exec_with<F>(
        &self,
        args: impl Into<CallArgs>,
        done: F,
    ) -> std::result::Result<JoinHandle<()>, EntryPointError>
    where
        F: FnOnce(Outcome<S::Record>) + Send + 'static,
    {
        self.query(args).exec_with(done)
    }
}

impl<S: RecordSource> fmt::Debug for OrErrorEntry<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrErrorEntry")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("model", &self.model.name())
            .field("option_key", &self.resolver.key())
            .finish()
    }
}
