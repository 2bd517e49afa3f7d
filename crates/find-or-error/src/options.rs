//! Per-call option bags and the enforcement flag they carry.
//!
//! The effective option set for one lookup is resolved from three sources,
//! lowest precedence first:
//!
//! 1. the built-in option key `emptyError`
//! 2. the option key chosen at registration (`query.queryOption`)
//! 3. whatever value the caller put in the call's option bag
//!
//! The or-error entry points additionally default a missing value to `true`;
//! plain lookups leave it absent, which means "no enforcement".

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FindError;

/// Built-in option key read by the enforcement hook.
pub const DEFAULT_QUERY_OPTION: &str = "emptyError";

/// A discriminator attached to not-found errors.
///
/// Only integers and strings are accepted; any other JSON value in the
/// enforcement slot is rejected as [`FindError::InvalidOption`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Int(i64),
    Text(String),
}

impl ErrorCode {
    pub fn to_value(&self) -> Value {
        match self {
            ErrorCode::Int(n) => Value::from(*n),
            ErrorCode::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Int(n) => write!(f, "{}", n),
            ErrorCode::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ErrorCode {
    fn from(n: i64) -> Self {
        ErrorCode::Int(n)
    }
}

impl From<i32> for ErrorCode {
    fn from(n: i32) -> Self {
        ErrorCode::Int(n.into())
    }
}

impl From<u16> for ErrorCode {
    fn from(n: u16) -> Self {
        ErrorCode::Int(n.into())
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        ErrorCode::Text(s.to_string())
    }
}

impl From<String> for ErrorCode {
    fn from(s: String) -> Self {
        ErrorCode::Text(s)
    }
}

impl PartialEq<i64> for ErrorCode {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, ErrorCode::Int(n) if n == other)
    }
}

impl PartialEq<&str> for ErrorCode {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, ErrorCode::Text(s) if s == other)
    }
}

/// Whether an empty result should fail, and with which code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnforcementFlag {
    #[default]
    Disabled,
    Enabled,
    /// Enabled, and the code is copied onto the synthesized error
    Code(ErrorCode),
}

impl EnforcementFlag {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, EnforcementFlag::Disabled)
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            EnforcementFlag::Code(code) => Some(code),
            _ => None,
        }
    }

    /// JSON form stored in an option bag.
    pub fn to_value(&self) -> Value {
        match self {
            EnforcementFlag::Disabled => Value::Bool(false),
            EnforcementFlag::Enabled => Value::Bool(true),
            EnforcementFlag::Code(code) => code.to_value(),
        }
    }

    /// Interpret the value found under `key` in an option bag.
    ///
    /// `null` counts as disabled, booleans map directly, integers and
    /// strings become codes.
    pub fn from_value(key: &str, value: &Value) -> Result<Self, FindError> {
        match value {
            Value::Null => Ok(EnforcementFlag::Disabled),
            Value::Bool(true) => Ok(EnforcementFlag::Enabled),
            Value::Bool(false) => Ok(EnforcementFlag::Disabled),
            Value::Number(n) => match n.as_i64() {
                Some(code) => Ok(EnforcementFlag::Code(ErrorCode::Int(code))),
                None if n.is_u64() => Err(FindError::InvalidOption {
                    key: key.to_string(),
                    reason: format!("integer code {} is out of range", n),
                }),
                None => Err(FindError::InvalidOption {
                    key: key.to_string(),
                    reason: format!("numeric code must be an integer, got {}", n),
                }),
            },
            Value::String(s) => Ok(EnforcementFlag::Code(ErrorCode::Text(s.clone()))),
            Value::Array(_) | Value::Object(_) => Err(FindError::InvalidOption {
                key: key.to_string(),
                reason: "expected a boolean, integer or string".to_string(),
            }),
        }
    }
}

impl From<bool> for EnforcementFlag {
    fn from(enabled: bool) -> Self {
        if enabled {
            EnforcementFlag::Enabled
        } else {
            EnforcementFlag::Disabled
        }
    }
}

impl From<ErrorCode> for EnforcementFlag {
    fn from(code: ErrorCode) -> Self {
        EnforcementFlag::Code(code)
    }
}

impl From<i64> for EnforcementFlag {
    fn from(n: i64) -> Self {
        EnforcementFlag::Code(n.into())
    }
}

impl From<i32> for EnforcementFlag {
    fn from(n: i32) -> Self {
        EnforcementFlag::Code(n.into())
    }
}

impl From<u16> for EnforcementFlag {
    fn from(n: u16) -> Self {
        EnforcementFlag::Code(n.into())
    }
}

impl From<&str> for EnforcementFlag {
    fn from(s: &str) -> Self {
        EnforcementFlag::Code(s.into())
    }
}

impl From<String> for EnforcementFlag {
    fn from(s: String) -> Self {
        EnforcementFlag::Code(s.into())
    }
}

/// Option bag passed alongside a lookup (third positional argument).
///
/// Keys the enforcement layer does not own (`lean`, ...) travel through to
/// the record source untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindOptions(Map<String, Value>);

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value; `null` yields an empty bag.
    pub fn from_value(value: Value) -> Result<Self, FindError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(FindError::InvalidOption {
                key: "options".to_string(),
                reason: format!("option bag must be an object, got {}", other),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Chainable form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Overlay `other` on top of this bag; keys in `other` win.
    pub fn merge(&mut self, other: FindOptions) {
        self.0.extend(other.0);
    }

    /// Whether the caller asked for plain records (`lean: true`).
    pub fn lean(&self) -> bool {
        matches!(self.0.get("lean"), Some(Value::Bool(true)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for FindOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Resolves the enforcement flag for one call.
///
/// Holds only the option key; cloned by value into every hook and entry
/// point so no call observes another's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionResolver {
    key: String,
}

impl OptionResolver {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Option bag for an or-error entry point: a missing enforcement value
    /// defaults to enabled, an explicit one is kept as-is.
    pub fn for_entry_point(&self, options: Option<FindOptions>) -> FindOptions {
        let mut options = options.unwrap_or_default();
        if !options.contains(&self.key) {
            self.set_flag(&mut options, EnforcementFlag::Enabled);
        }
        options
    }

    /// Effective flag carried by an option bag; absent means disabled.
    pub fn flag(&self, options: &FindOptions) -> Result<EnforcementFlag, FindError> {
        match options.get(&self.key) {
            Some(value) => EnforcementFlag::from_value(&self.key, value),
            None => Ok(EnforcementFlag::Disabled),
        }
    }

    pub fn set_flag(&self, options: &mut FindOptions, flag: EnforcementFlag) {
        options.set(self.key.clone(), flag.to_value());
    }
}

impl Default for OptionResolver {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_OPTION)
    }
}
