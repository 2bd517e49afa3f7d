//! Model: a record source plus its registered hooks and query helpers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::hook::PostFindHook;
use crate::options::{EnforcementFlag, FindOptions};
use crate::query::{HelperMap, HookList, Query, QueryHelperFn};
use crate::source::{Filter, RecordSource};

/// Base retrieval capability.
///
/// Hooks and helpers are registered while the model is being set up;
/// queries built afterwards share them read-only.
pub struct Model<S: RecordSource> {
    source: Arc<S>,
    hooks: HookList<S::Record>,
    helpers: HelperMap,
}

impl<S: RecordSource> Model<S> {
    pub fn new(source: S) -> Self {
        Self::from_arc(Arc::new(source))
    }

    pub fn from_arc(source: Arc<S>) -> Self {
        Self {
            source,
            hooks: Arc::new(Vec::new()),
            helpers: Arc::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        self.source.model_name()
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Register a hook run after every single-record lookup.
    pub fn post_find_one(&mut self, hook: impl PostFindHook<S::Record> + 'static) -> &mut Self {
        Arc::make_mut(&mut self.hooks).push(Arc::new(hook));
        self
    }

    /// Register a chainable query helper under `name`, replacing any
    /// previous helper with that name.
    pub fn query_helper<F>(&mut self, name: impl Into<String>, helper: F) -> &mut Self
    where
        F: Fn(&mut FindOptions, Option<EnforcementFlag>) + Send + Sync + 'static,
    {
        let helper: QueryHelperFn = Arc::new(helper);
        Arc::make_mut(&mut self.helpers).insert(name.into(), helper);
        self
    }

    pub fn has_query_helper(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Lookup by predicate.
    pub fn find_one(&self, filter: impl Into<Filter>) -> Query<S> {
        Query::new(
            Arc::clone(&self.source),
            Arc::clone(&self.hooks),
            Arc::clone(&self.helpers),
            filter.into(),
        )
    }

    /// Lookup by identifier; runs as `find_one({"_id": id})`.
    pub fn find_by_id(&self, id: impl Into<Value>) -> Query<S> {
        self.find_one(Filter::by_id(id))
    }
}

impl<S: RecordSource> fmt::Debug for Model<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name())
            .field("hooks", &self.hooks.len())
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}
