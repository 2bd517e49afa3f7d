//! Not-found error synthesis
//!
//! `EmptyErrorBuilder` turns `(model name, predicate, flag)` into the error
//! raised for an empty lookup. Registrations may supply their own builder;
//! it replaces [`DefaultEmptyError`] entirely.

use convert_case::{Case, Casing};

use crate::error::{NotFoundError, DOCUMENT_NOT_FOUND};
use crate::options::EnforcementFlag;
use crate::source::Filter;

/// Strategy for building the not-found error.
///
/// Implementations must be pure: the same inputs always produce the same
/// error. Closures with the matching signature implement this trait.
pub trait EmptyErrorBuilder: Send + Sync {
    fn build(&self, model_name: &str, filter: &Filter, flag: &EnforcementFlag) -> NotFoundError;
}

impl<F> EmptyErrorBuilder for F
where
    F: Fn(&str, &Filter, &EnforcementFlag) -> NotFoundError + Send + Sync,
{
    fn build(&self, model_name: &str, filter: &Filter, flag: &EnforcementFlag) -> NotFoundError {
        self(model_name, filter, flag)
    }
}

/// `"<Model> not found."` with kind `DocumentNotFoundError`; a code flag is
/// attached verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEmptyError;

impl EmptyErrorBuilder for DefaultEmptyError {
    fn build(&self, model_name: &str, _filter: &Filter, flag: &EnforcementFlag) -> NotFoundError {
        let error = NotFoundError::new(
            DOCUMENT_NOT_FOUND,
            format!("{} not found.", subject_name(model_name)),
        );
        match flag.code() {
            Some(code) => error.with_code(code.clone()),
            None => error,
        }
    }
}

/// Model name normalized for messages: `"user profile"` -> `"UserProfile"`.
///
/// Every run of non-alphanumeric characters separates words.
pub fn subject_name(model_name: &str) -> String {
    model_name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_case(Case::Pascal)
}
