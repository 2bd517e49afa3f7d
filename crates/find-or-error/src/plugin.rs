//! Attaching the find-or-error augmentation to a model.
//!
//! [`FindOrError::attach`] takes a base [`Model`] and a
//! [`RegistrationConfig`] and returns an [`AugmentedModel`] that:
//!
//! - runs [`EnforceOnEmpty`] after every single-record lookup,
//! - registers the enforcement toggle as a query helper (default
//!   `throwEmpty`),
//! - exposes the configured or-error entry points, and only those.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use crate::adapter::{CallArgs, CallStyle, Dispatch, EntryKind, OrErrorEntry};
use crate::config::{RegistrationConfig, DEFAULT_FIND_BY_ID_FNAME, DEFAULT_FIND_ONE_FNAME};
use crate::error::{ConfigError, EntryPointError};
use crate::hook::EnforceOnEmpty;
use crate::model::Model;
use crate::options::{EnforcementFlag, OptionResolver};
use crate::query::Query;
use crate::source::{Filter, RecordSource};

/// Factory for augmented models.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOrError;

impl FindOrError {
    /// Attach the augmentation to `model` using `config`.
    #[instrument(skip_all, fields(model = %model.name()))]
    pub fn attach<S: RecordSource>(
        mut model: Model<S>,
        config: RegistrationConfig,
    ) -> Result<AugmentedModel<S>, ConfigError> {
        config.validate()?;
        let resolver = config.option_resolver();

        model.post_find_one(EnforceOnEmpty::new(resolver.clone(), config.error_builder()));

        if let Some(helper) = config.query_fname() {
            let toggle = resolver.clone();
            model.query_helper(helper, move |options, arg| {
                toggle.set_flag(options, arg.unwrap_or(EnforcementFlag::Enabled));
            });
        }

        let mut statics = BTreeMap::new();
        if let Some(name) = config.find_one_fname() {
            statics.insert(name.to_string(), EntryKind::FindOne);
        }
        if let Some(name) = config.find_by_id_fname() {
            statics.insert(name.to_string(), EntryKind::FindById);
        }

        info!(
            entry_points = ?statics.keys().collect::<Vec<_>>(),
            query_helper = ?config.query_fname(),
            option_key = resolver.key(),
            "find-or-error attached"
        );

        Ok(AugmentedModel {
            model,
            registration: Arc::new(config),
            resolver,
            statics,
        })
    }
}

/// A model with the or-error entry points attached.
pub struct AugmentedModel<S: RecordSource> {
    model: Model<S>,
    registration: Arc<RegistrationConfig>,
    resolver: OptionResolver,
    statics: BTreeMap<String, EntryKind>,
}

impl<S: RecordSource> AugmentedModel<S> {
    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn model(&self) -> &Model<S> {
        &self.model
    }

    pub fn registration(&self) -> &RegistrationConfig {
        &self.registration
    }

    /// Option key the enforcement hook reads.
    pub fn option_key(&self) -> &str {
        self.resolver.key()
    }

    /// Plain lookup by predicate; enforcement only if the option bag or a
    /// query helper asks for it.
    pub fn find_one(&self, filter: impl Into<Filter>) -> Query<S> {
        self.model.find_one(filter)
    }

    /// Plain lookup by identifier.
    pub fn find_by_id(&self, id: impl Into<Value>) -> Query<S> {
        self.model.find_by_id(id)
    }

    /// Names of the registered or-error entry points.
    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.statics.keys().map(String::as_str)
    }

    pub fn has_entry_point(&self, name: &str) -> bool {
        self.statics.contains_key(name)
    }

    /// Look up an or-error entry point by its registered name.
    pub fn entry_point(&self, name: &str) -> Result<OrErrorEntry<'_, S>, EntryPointError> {
        let (name, kind) = self
            .statics
            .get_key_value(name)
            .ok_or_else(|| EntryPointError::NoSuchMethod {
                name: name.to_string(),
            })?;
        Ok(OrErrorEntry::new(name, *kind, &self.model, &self.resolver))
    }

    /// The by-predicate entry point, whatever it was named.
    pub fn find_one_or_error(&self) -> Result<OrErrorEntry<'_, S>, EntryPointError> {
        self.entry_of_kind(EntryKind::FindOne, DEFAULT_FIND_ONE_FNAME)
    }

    /// The by-id entry point, whatever it was named.
    pub fn find_by_id_or_error(&self) -> Result<OrErrorEntry<'_, S>, EntryPointError> {
        self.entry_of_kind(EntryKind::FindById, DEFAULT_FIND_BY_ID_FNAME)
    }

    /// Call an entry point by name.
    ///
    /// An unknown name fails here, before anything is dispatched. So does
    /// continuation style outside a tokio runtime
    /// ([`EntryPointError::NoRuntime`]). In both cases the continuation is
    /// dropped without being called.
    pub fn call(
        &self,
        name: &str,
        args: impl Into<CallArgs>,
        style: CallStyle<S::Record>,
    ) -> Result<Dispatch<S::Record>, EntryPointError> {
        self.entry_point(name)?.invoke(args, style)
    }

    fn entry_of_kind(
        &self,
        kind: EntryKind,
        default_name: &str,
    ) -> Result<OrErrorEntry<'_, S>, EntryPointError> {
        self.statics
            .iter()
            .find(|(_, k)| **k == kind)
            .map(|(name, kind)| OrErrorEntry::new(name, *kind, &self.model, &self.resolver))
            .ok_or_else(|| EntryPointError::NoSuchMethod {
                name: default_name.to_string(),
            })
    }
}

impl<S: RecordSource> fmt::Debug for AugmentedModel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AugmentedModel")
            .field("model", &self.model)
            .field("registration", &self.registration)
            .field("entry_points", &self.statics)
            .finish()
    }
}
