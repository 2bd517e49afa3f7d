//! Deferred single-record query
//!
//! A `Query` is built by [`Model::find_one`](crate::Model::find_one) or
//! [`Model::find_by_id`](crate::Model::find_by_id) and does nothing until it
//! is executed, either with [`Query::exec`], by awaiting it directly, or
//! with a continuation through [`Query::exec_with`].
//! Until then options may be adjusted, including through query helpers
//! registered on the model (such as `throwEmpty`).

use std::collections::HashMap;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::adapter::{CallStyle, Dispatch, Outcome};
use crate::config::DEFAULT_QUERY_FNAME;
use crate::error::EntryPointError;
use crate::hook::{PostFindHook, QueryContext};
use crate::options::{EnforcementFlag, FindOptions};
use crate::source::{Filter, Projection, RecordSource};
use crate::Result;

/// Chainable query helper: edits the option bag of an in-flight query.
/// Receives the helper's single optional argument.
pub type QueryHelperFn = Arc<dyn Fn(&mut FindOptions, Option<EnforcementFlag>) + Send + Sync>;

pub(crate) type HookList<R> = Arc<Vec<Arc<dyn PostFindHook<R>>>>;
pub(crate) type HelperMap = Arc<HashMap<String, QueryHelperFn>>;

/// A single-record lookup that has not run yet.
pub struct Query<S: RecordSource> {
    source: Arc<S>,
    hooks: HookList<S::Record>,
    helpers: HelperMap,
    filter: Filter,
    projection: Option<Projection>,
    options: FindOptions,
}

impl<S: RecordSource> Query<S> {
    pub(crate) fn new(
        source: Arc<S>,
        hooks: HookList<S::Record>,
        helpers: HelperMap,
        filter: Filter,
    ) -> Self {
        Self {
            source,
            hooks,
            helpers,
            filter,
            projection: None,
            options: FindOptions::new(),
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn projection_ref(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    /// Select fields to return.
    pub fn projection(mut self, projection: impl Into<Projection>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    /// Merge an option bag into this query's options; later values win.
    pub fn set_options(mut self, options: FindOptions) -> Self {
        self.options.merge(options);
        self
    }

    pub fn set_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.set(key, value);
        self
    }

    /// Apply a registered query helper by name.
    ///
    /// Fails immediately if no helper is registered under `name`.
    pub fn helper(
        mut self,
        name: &str,
        arg: Option<EnforcementFlag>,
    ) -> std::result::Result<Self, EntryPointError> {
        let helper = self
            .helpers
            .get(name)
            .cloned()
            .ok_or_else(|| EntryPointError::NoSuchQueryHelper {
                name: name.to_string(),
            })?;
        helper(&mut self.options, arg);
        Ok(self)
    }

    /// `throwEmpty()`: fail if nothing matches.
    pub fn throw_empty(self) -> std::result::Result<Self, EntryPointError> {
        self.helper(DEFAULT_QUERY_FNAME, None)
    }

    /// `throwEmpty(flag)`: `false` turns enforcement off, a code enables it
    /// and tags the error.
    pub fn throw_empty_with(
        self,
        flag: impl Into<EnforcementFlag>,
    ) -> std::result::Result<Self, EntryPointError> {
        self.helper(DEFAULT_QUERY_FNAME, Some(flag.into()))
    }

    /// Run the lookup, then every post-find hook.
    #[instrument(skip(self), fields(model = %self.source.model_name(), filter = %self.filter))]
    pub async fn exec(self) -> Result<Option<S::Record>> {
        for hook in self.hooks.iter() {
            hook.before_exec(&self.options)?;
        }

        let record = self
            .source
            .find_one(&self.filter, self.projection.as_ref(), &self.options)
            .await?;
        debug!(found = record.is_some(), "lookup finished");

        let ctx = QueryContext {
            model_name: self.source.model_name(),
            filter: &self.filter,
            options: &self.options,
        };
        for hook in self.hooks.iter() {
            hook.after_find_one(&ctx, record.as_ref())?;
        }
        Ok(record)
    }

    /// Continuation style: run on the current tokio runtime and call `done`
    /// once with the outcome.
    ///
    /// Fails with [`EntryPointError::NoRuntime`] outside a runtime; `done`
    /// is then dropped without being called.
    pub fn exec_with<F>(self, done: F) -> std::result::Result<JoinHandle<()>, EntryPointError>
    where
        F: FnOnce(Outcome<S::Record>) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| EntryPointError::NoRuntime)?;
        Ok(runtime.spawn(async move {
            done(self.exec().await);
        }))
    }

    /// Run in the requested style.
    pub fn invoke(
        self,
        style: CallStyle<S::Record>,
    ) -> std::result::Result<Dispatch<S::Record>, EntryPointError> {
        match style {
            CallStyle::Deferred => Ok(Dispatch::Deferred(self.exec().boxed())),
            CallStyle::Continuation(done) => self.exec_with(done).map(Dispatch::Continued),
        }
    }
}

impl<S: RecordSource> IntoFuture for Query<S> {
    type Output = Result<Option<S::Record>>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.exec().boxed()
    }
}

impl<S: RecordSource> fmt::Debug for Query<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("model", &self.source.model_name())
            .field("filter", &self.filter)
            .field("projection", &self.projection)
            .field("options", &self.options)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
