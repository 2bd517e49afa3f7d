//! Record source abstraction
//!
//! A `RecordSource` is the storage engine seen from this crate: something
//! that can execute a single-record lookup for a predicate and yield a record
//! or nothing. Lookup by identifier is expressed as a predicate on
//! [`ID_FIELD`], so both lookups share one execution path and one set of
//! post-find hooks.
//!
//! An in-memory implementation lives in the `fakes` module.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::options::FindOptions;

/// Result type for record source operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Field holding a record's identifier.
pub const ID_FIELD: &str = "_id";

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Query predicate (first positional argument of a lookup).
///
/// Kept as raw JSON; interpreting it is the source's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Value);

impl Filter {
    pub fn new(value: impl Into<Value>) -> Self {
        Filter(value.into())
    }

    /// Predicate matching a single identifier.
    pub fn by_id(id: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert(ID_FIELD.to_string(), id.into());
        Filter(Value::Object(map))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Filter {
    fn from(value: Value) -> Self {
        Filter(value)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Field selection (second positional argument of a lookup).
///
/// Accepts the two usual spellings: a space-separated list (`"_id name"`,
/// `"-secret"` to exclude) or an object (`{"name": 1, "_id": 0}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl Projection {
    /// Inclusive projection of the given fields.
    pub fn fields<I, T>(fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            include: fields.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    pub fn parse(spec: &str) -> Self {
        let mut projection = Self::default();
        for token in spec.split_whitespace() {
            match token.strip_prefix('-') {
                Some(field) => projection.exclude.push(field.to_string()),
                None => projection.include.push(token.to_string()),
            }
        }
        projection
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(spec) => Self::parse(spec),
            Value::Object(map) => {
                let mut projection = Self::default();
                for (field, flag) in map {
                    let keep = match flag {
                        Value::Bool(b) => *b,
                        Value::Number(n) => n.as_i64() != Some(0),
                        Value::Null => false,
                        _ => true,
                    };
                    if keep {
                        projection.include.push(field.clone());
                    } else {
                        projection.exclude.push(field.clone());
                    }
                }
                projection
            }
            _ => Self::default(),
        }
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

impl From<&str> for Projection {
    fn from(spec: &str) -> Self {
        Self::parse(spec)
    }
}

impl From<Value> for Projection {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

// ---------------------------------------------------------------------------
// RecordSource
// ---------------------------------------------------------------------------

/// Single-record retrieval capability.
///
/// Guarantees expected of implementations:
/// - `find_one` returns `Ok(None)` when nothing matches; absence is never
///   an error at this level.
/// - Failures are reported as `StorageError` and are passed to callers
///   unchanged.
/// - Unknown option keys are ignored.
#[async_trait]
pub trait RecordSource: Send + Sync + 'static {
    /// Record type yielded by lookups.
    type Record: Send + Sync + 'static;

    /// Subject name used in error messages (the model/collection name).
    fn model_name(&self) -> &str;

    /// Return the first record matching `filter`, if any.
    async fn find_one(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> StorageResult<Option<Self::Record>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_by_id() {
        let filter = Filter::by_id("111f00000000000000000001");
        assert_eq!(
            filter.as_value(),
            &json!({"_id": "111f00000000000000000001"})
        );
    }

    #[test]
    fn test_projection_parse_string() {
        let projection = Projection::parse("_id name -secret");
        assert_eq!(projection.include(), ["_id", "name"]);
        assert_eq!(projection.exclude(), ["secret"]);
    }

    #[test]
    fn test_projection_from_object() {
        let projection = Projection::from(json!({"name": 1, "_id": 0}));
        assert_eq!(projection.include(), ["name"]);
        assert_eq!(projection.exclude(), ["_id"]);
    }
}
