//! In-memory record source (testing only)
//!
//! `MemoryCollection` holds JSON documents and answers single-record lookups
//! with top-level equality matching. It can be told to fail, to exercise the
//! upstream error path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::options::FindOptions;
use crate::source::{Filter, Projection, RecordSource, StorageResult, ID_FIELD};

/// In-memory collection backed by a `Vec` of JSON objects.
#[derive(Debug)]
pub struct MemoryCollection {
    name: String,
    documents: Mutex<Vec<Map<String, Value>>>,
    failure: Mutex<Option<StorageError>>,
    lookups: AtomicUsize,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Insert a document, assigning an `_id` if it has none.
    /// Returns the document's id.
    pub fn insert(&self, document: Value) -> StorageResult<Value> {
        let Value::Object(mut document) = document else {
            return Err(StorageError::Query(
                "documents must be JSON objects".to_string(),
            ));
        };
        let id = document
            .entry(ID_FIELD)
            .or_insert_with(|| Value::String(new_object_id()))
            .clone();
        self.documents
            .lock()
            .map_err(|_| poisoned())?
            .push(document);
        Ok(id)
    }

    /// Insert several documents; returns their ids in order.
    pub fn insert_many<I>(&self, documents: I) -> StorageResult<Vec<Value>>
    where
        I: IntoIterator<Item = Value>,
    {
        documents.into_iter().map(|doc| self.insert(doc)).collect()
    }

    /// Make every following lookup fail with `err`.
    pub fn fail_with(&self, err: StorageError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(err);
        }
    }

    pub fn clear_failure(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Number of lookups that reached this collection.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordSource for MemoryCollection {
    type Record = Value;

    fn model_name(&self) -> &str {
        &self.name
    }

    async fn find_one(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
        _options: &FindOptions,
    ) -> StorageResult<Option<Value>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.failure.lock().map_err(|_| poisoned())?.clone() {
            return Err(err);
        }

        let predicate = match filter.as_value() {
            Value::Object(map) => map,
            Value::Null => return Err(invalid_filter("filter is null")),
            other => return Err(invalid_filter(&format!("expected an object, got {}", other))),
        };

        let documents = self.documents.lock().map_err(|_| poisoned())?;
        let found = documents
            .iter()
            .find(|doc| predicate.iter().all(|(field, value)| doc.get(field) == Some(value)))
            .map(|doc| apply_projection(doc, projection));
        Ok(found)
    }
}

fn apply_projection(document: &Map<String, Value>, projection: Option<&Projection>) -> Value {
    let Some(projection) = projection.filter(|p| !p.is_empty()) else {
        return Value::Object(document.clone());
    };

    let excluded = |field: &str| projection.exclude().iter().any(|f| f == field);
    let projected: Map<String, Value> = if projection.include().is_empty() {
        document
            .iter()
            .filter(|(field, _)| !excluded(field.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    } else {
        document
            .iter()
            .filter(|(field, _)| {
                let included = projection.include().iter().any(|f| f == *field)
                    || field.as_str() == ID_FIELD;
                included && !excluded(field.as_str())
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    };
    Value::Object(projected)
}

fn new_object_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..24].to_string()
}

fn invalid_filter(reason: &str) -> StorageError {
    StorageError::InvalidFilter {
        reason: reason.to_string(),
    }
}

fn poisoned() -> StorageError {
    StorageError::Backend("collection lock poisoned".to_string())
}
