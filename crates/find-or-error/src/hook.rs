//! Post-find hooks
//!
//! Hooks registered on a [`Model`](crate::Model) run after every
//! single-record lookup, by predicate or by id. A hook returning an error
//! turns the lookup into a failure; the record is discarded.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::FindError;
use crate::options::{FindOptions, OptionResolver};
use crate::source::Filter;
use crate::synth::EmptyErrorBuilder;
use crate::Result;

/// What a hook can see about the lookup that just ran.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    /// Model name of the source
    pub model_name: &'a str,
    /// Predicate the lookup ran with
    pub filter: &'a Filter,
    /// Effective option bag of this call
    pub options: &'a FindOptions,
}

/// Hook invoked around a single-record lookup.
pub trait PostFindHook<R>: Send + Sync {
    /// Called with the effective options before the source is queried.
    /// Rejecting here means the source is never called.
    fn before_exec(&self, _options: &FindOptions) -> Result<()> {
        Ok(())
    }

    /// Called exactly once with the lookup outcome.
    fn after_find_one(&self, ctx: &QueryContext<'_>, record: Option<&R>) -> Result<()>;
}

/// Fails empty lookups whose option bag enables enforcement.
#[derive(Clone)]
pub struct EnforceOnEmpty {
    resolver: OptionResolver,
    builder: Arc<dyn EmptyErrorBuilder>,
}

impl EnforceOnEmpty {
    pub fn new(resolver: OptionResolver, builder: Arc<dyn EmptyErrorBuilder>) -> Self {
        Self { resolver, builder }
    }

    pub fn option_key(&self) -> &str {
        self.resolver.key()
    }
}

impl fmt::Debug for EnforceOnEmpty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnforceOnEmpty")
            .field("option_key", &self.resolver.key())
            .finish_non_exhaustive()
    }
}

impl<R> PostFindHook<R> for EnforceOnEmpty {
    fn before_exec(&self, options: &FindOptions) -> Result<()> {
        if let Err(err) = self.resolver.flag(options) {
            warn!(option_key = self.resolver.key(), error = %err, "rejecting lookup");
            return Err(err);
        }
        Ok(())
    }

    fn after_find_one(&self, ctx: &QueryContext<'_>, record: Option<&R>) -> Result<()> {
        if record.is_some() {
            return Ok(());
        }

        let flag = self.resolver.flag(ctx.options)?;
        if !flag.is_enabled() {
            debug!(model = ctx.model_name, "empty result, enforcement off");
            return Ok(());
        }

        let err = self.builder.build(ctx.model_name, ctx.filter, &flag);
        debug!(
            model = ctx.model_name,
            filter = %ctx.filter,
            kind = %err.kind,
            code = ?err.code,
            "empty result rejected"
        );
        Err(FindError::NotFound(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotFoundError;
    use crate::options::{EnforcementFlag, ErrorCode};
    use crate::synth::DefaultEmptyError;
    use serde_json::json;

    fn hook() -> EnforceOnEmpty {
        EnforceOnEmpty::new(OptionResolver::default(), Arc::new(DefaultEmptyError))
    }

    fn run(hook: &EnforceOnEmpty, options: &FindOptions, record: Option<&u32>) -> Result<()> {
        let filter = Filter::new(json!({"name": "x"}));
        let ctx = QueryContext {
            model_name: "example",
            filter: &filter,
            options,
        };
        PostFindHook::<u32>::after_find_one(hook, &ctx, record)
    }

    #[test]
    fn test_present_record_passes() {
        let options = FindOptions::new().with("emptyError", true);
        assert!(run(&hook(), &options, Some(&7)).is_ok());
    }

    #[test]
    fn test_empty_without_flag_passes() {
        assert!(run(&hook(), &FindOptions::new(), None).is_ok());
        let disabled = FindOptions::new().with("emptyError", false);
        assert!(run(&hook(), &disabled, None).is_ok());
    }

    #[test]
    fn test_empty_with_flag_fails() {
        let options = FindOptions::new().with("emptyError", true);
        let err = run(&hook(), &options, None).unwrap_err();

        let not_found = err.as_not_found().expect("not found error");
        assert_eq!(not_found.kind, "DocumentNotFoundError");
        assert_eq!(not_found.message, "Example not found.");
        assert!(not_found.code.is_none());
    }

    #[test]
    fn test_empty_with_code_attaches_code() {
        let options = FindOptions::new().with("emptyError", "GONE");
        let err = run(&hook(), &options, None).unwrap_err();

        assert_eq!(
            err.as_not_found().and_then(|e| e.code.clone()),
            Some(ErrorCode::Text("GONE".to_string()))
        );
    }

    #[test]
    fn test_custom_builder_receives_inputs() {
        let builder = |model: &str, filter: &Filter, flag: &EnforcementFlag| {
            NotFoundError::new("NotFoundError", format!("{} {}", model, filter))
                .with_code(flag.code().cloned().unwrap_or(ErrorCode::Int(0)))
        };
        let hook = EnforceOnEmpty::new(OptionResolver::default(), Arc::new(builder));
        let options = FindOptions::new().with("emptyError", true);
        let err = run(&hook, &options, None).unwrap_err();

        let not_found = err.as_not_found().expect("not found error");
        assert_eq!(not_found.kind, "NotFoundError");
        assert_eq!(not_found.message, r#"example {"name":"x"}"#);
        assert_eq!(not_found.code, Some(ErrorCode::Int(0)));
    }

    #[test]
    fn test_before_exec_rejects_invalid_flag() {
        let options = FindOptions::new().with("emptyError", json!([1]));
        let result = PostFindHook::<u32>::before_exec(&hook(), &options);
        assert!(matches!(result, Err(FindError::InvalidOption { .. })));
    }
}
