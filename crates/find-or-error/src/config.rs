//! Registration configuration
//!
//! Chosen once when the augmentation is attached to a model and immutable
//! afterwards. The serialized shape follows the plugin options object:
//!
//! ```json
//! {
//!   "static": { "findOneFname": "findOneOrError", "findByIdFname": "findByIdOrError" },
//!   "query":  { "queryFname": "throwEmpty", "queryOption": "emptyError" }
//! }
//! ```
//!
//! Missing fields keep their defaults. A name set to `false`, `null` or `""`
//! disables that entry point or helper.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::options::{OptionResolver, DEFAULT_QUERY_OPTION};
use crate::synth::{DefaultEmptyError, EmptyErrorBuilder};

pub const DEFAULT_FIND_ONE_FNAME: &str = "findOneOrError";
pub const DEFAULT_FIND_BY_ID_FNAME: &str = "findByIdOrError";
pub const DEFAULT_QUERY_FNAME: &str = "throwEmpty";

/// Environment variables read by [`RegistrationConfig::from_env`].
pub const ENV_FIND_ONE_FNAME: &str = "FIND_OR_ERROR_FIND_ONE_FNAME";
pub const ENV_FIND_BY_ID_FNAME: &str = "FIND_OR_ERROR_FIND_BY_ID_FNAME";
pub const ENV_QUERY_FNAME: &str = "FIND_OR_ERROR_QUERY_FNAME";
pub const ENV_QUERY_OPTION: &str = "FIND_OR_ERROR_QUERY_OPTION";

/// Names of the or-error entry points (`static` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticNames {
    #[serde(deserialize_with = "entry_name")]
    pub find_one_fname: Option<String>,
    #[serde(deserialize_with = "entry_name")]
    pub find_by_id_fname: Option<String>,
}

impl Default for StaticNames {
    fn default() -> Self {
        Self {
            find_one_fname: Some(DEFAULT_FIND_ONE_FNAME.to_string()),
            find_by_id_fname: Some(DEFAULT_FIND_BY_ID_FNAME.to_string()),
        }
    }
}

/// Query helper name and option key (`query` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryNames {
    #[serde(deserialize_with = "entry_name")]
    pub query_fname: Option<String>,
    pub query_option: String,
}

impl Default for QueryNames {
    fn default() -> Self {
        Self {
            query_fname: Some(DEFAULT_QUERY_FNAME.to_string()),
            query_option: DEFAULT_QUERY_OPTION.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NameOrFlag {
    Name(String),
    Flag(bool),
}

fn entry_name<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NameOrFlag>::deserialize(deserializer)? {
        None | Some(NameOrFlag::Flag(false)) => Ok(None),
        Some(NameOrFlag::Name(name)) if name.is_empty() => Ok(None),
        Some(NameOrFlag::Name(name)) => Ok(Some(name)),
        Some(NameOrFlag::Flag(true)) => Err(serde::de::Error::custom(
            "expected an entry point name or false",
        )),
    }
}

/// Everything fixed at attach time.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    #[serde(rename = "static")]
    pub statics: StaticNames,
    pub query: QueryNames,
    /// Replacement for the default not-found error (`sendEmptyError`)
    #[serde(skip)]
    error_builder: Option<Arc<dyn EmptyErrorBuilder>>,
}

impl RegistrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename the by-predicate entry point.
    pub fn with_find_one_fname(mut self, name: impl Into<String>) -> Self {
        self.statics.find_one_fname = Some(name.into());
        self
    }

    /// Do not register the by-predicate entry point.
    pub fn without_find_one(mut self) -> Self {
        self.statics.find_one_fname = None;
        self
    }

    pub fn with_find_by_id_fname(mut self, name: impl Into<String>) -> Self {
        self.statics.find_by_id_fname = Some(name.into());
        self
    }

    pub fn without_find_by_id(mut self) -> Self {
        self.statics.find_by_id_fname = None;
        self
    }

    pub fn with_query_fname(mut self, name: impl Into<String>) -> Self {
        self.query.query_fname = Some(name.into());
        self
    }

    pub fn without_query_helper(mut self) -> Self {
        self.query.query_fname = None;
        self
    }

    /// Option key read by the enforcement hook.
    pub fn with_query_option(mut self, key: impl Into<String>) -> Self {
        self.query.query_option = key.into();
        self
    }

    /// Replace the default not-found error builder.
    pub fn with_error_builder(mut self, builder: impl EmptyErrorBuilder + 'static) -> Self {
        self.error_builder = Some(Arc::new(builder));
        self
    }

    pub fn find_one_fname(&self) -> Option<&str> {
        self.statics.find_one_fname.as_deref()
    }

    pub fn find_by_id_fname(&self) -> Option<&str> {
        self.statics.find_by_id_fname.as_deref()
    }

    pub fn query_fname(&self) -> Option<&str> {
        self.query.query_fname.as_deref()
    }

    pub fn query_option(&self) -> &str {
        &self.query.query_option
    }

    pub fn has_custom_error_builder(&self) -> bool {
        self.error_builder.is_some()
    }

    /// The configured builder, or [`DefaultEmptyError`].
    pub fn error_builder(&self) -> Arc<dyn EmptyErrorBuilder> {
        match &self.error_builder {
            Some(builder) => Arc::clone(builder),
            None => Arc::new(DefaultEmptyError),
        }
    }

    pub fn option_resolver(&self) -> OptionResolver {
        OptionResolver::new(self.query.query_option.clone())
    }

    /// Check invariants the attach step relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.query_option.is_empty() {
            return Err(ConfigError::EmptyOptionKey);
        }
        if let (Some(one), Some(by_id)) = (self.find_one_fname(), self.find_by_id_fname()) {
            if one == by_id {
                return Err(ConfigError::DuplicateEntryPoint(one.to_string()));
            }
        }
        Ok(())
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loading registration config");

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&source),
            Some("toml") => Self::from_toml(&source),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - FIND_OR_ERROR_FIND_ONE_FNAME (optional, default: "findOneOrError")
    /// - FIND_OR_ERROR_FIND_BY_ID_FNAME (optional, default: "findByIdOrError")
    /// - FIND_OR_ERROR_QUERY_FNAME (optional, default: "throwEmpty")
    /// - FIND_OR_ERROR_QUERY_OPTION (optional, default: "emptyError")
    ///
    /// A name variable set to `false` or to the empty string disables it.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = |var: &str, default: &str| match lookup(var) {
            Some(value) if value.is_empty() || value.eq_ignore_ascii_case("false") => None,
            Some(value) => Some(value),
            None => Some(default.to_string()),
        };

        let config = Self {
            statics: StaticNames {
                find_one_fname: name(ENV_FIND_ONE_FNAME, DEFAULT_FIND_ONE_FNAME),
                find_by_id_fname: name(ENV_FIND_BY_ID_FNAME, DEFAULT_FIND_BY_ID_FNAME),
            },
            query: QueryNames {
                query_fname: name(ENV_QUERY_FNAME, DEFAULT_QUERY_FNAME),
                query_option: lookup(ENV_QUERY_OPTION)
                    .unwrap_or_else(|| DEFAULT_QUERY_OPTION.to_string()),
            },
            error_builder: None,
        };
        config.validate()?;
        Ok(config)
    }
}

impl fmt::Debug for RegistrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationConfig")
            .field("statics", &self.statics)
            .field("query", &self.query)
            .field("custom_error_builder", &self.error_builder.is_some())
            .finish()
    }
}
