//! Plain lookups with enforcement requested through the option bag or the
//! `throwEmpty` query helper.

use std::sync::{Arc, Mutex};

use find_or_error::fakes::MemoryCollection;
use find_or_error::{
    AugmentedModel, EntryPointError, ErrorCode, FindError, FindOptions, FindOrError, Model,
    PostFindHook, QueryContext, RegistrationConfig,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn attach(config: RegistrationConfig) -> AugmentedModel<MemoryCollection> {
    init_tracing();
    let collection = MemoryCollection::new("example");
    collection
        .insert_many([json!({"name": "example 1"}), json!({"name": "example 2"})])
        .unwrap();
    FindOrError::attach(Model::new(collection), config).unwrap()
}

fn code_of(err: &FindError) -> Option<ErrorCode> {
    err.as_not_found().and_then(|e| e.code.clone())
}

#[tokio::test]
async fn plain_lookup_without_option_returns_none() {
    let model = attach(RegistrationConfig::default());

    assert_eq!(model.find_one(json!({"name": "example"})).await.unwrap(), None);
    assert_eq!(model.find_by_id("111f00000000000000000001").await.unwrap(), None);
}

#[tokio::test]
async fn throw_empty_enables_enforcement() -> anyhow::Result<()> {
    let model = attach(RegistrationConfig::default());

    let err = model
        .find_one(json!({"name": "example"}))
        .throw_empty()?
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(code_of(&err), None);

    let err = model
        .find_by_id("111f00000000000000000001")
        .throw_empty()?
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn throw_empty_without_argument_equals_true() -> anyhow::Result<()> {
    let model = attach(RegistrationConfig::default());

    let bare = model.find_one(json!({"name": "x"})).throw_empty()?;
    let explicit = model.find_one(json!({"name": "x"})).throw_empty_with(true)?;
    assert_eq!(bare.options(), explicit.options());

    assert_eq!(bare.await.unwrap_err(), explicit.await.unwrap_err());
    Ok(())
}

#[tokio::test]
async fn throw_empty_with_code() -> anyhow::Result<()> {
    let model = attach(RegistrationConfig::default());

    let err = model
        .find_one(json!({"name": "example"}))
        .throw_empty_with(404)?
        .await
        .unwrap_err();
    assert_eq!(code_of(&err), Some(ErrorCode::Int(404)));
    Ok(())
}

#[tokio::test]
async fn throw_empty_false_overrides_option() -> anyhow::Result<()> {
    let model = attach(RegistrationConfig::default());

    let record = model
        .find_one(json!({"name": "example"}))
        .set_option("emptyError", true)
        .throw_empty_with(false)?
        .await?;
    assert_eq!(record, None);
    Ok(())
}

#[tokio::test]
async fn option_bag_enables_enforcement() {
    let model = attach(RegistrationConfig::default());

    let err = model
        .find_one(json!({"name": "example"}))
        .set_options(FindOptions::new().with("emptyError", true))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = model
        .find_one(json!({"name": "example"}))
        .set_options(FindOptions::new().with("emptyError", 404))
        .await
        .unwrap_err();
    assert_eq!(code_of(&err), Some(ErrorCode::Int(404)));

    let err = model
        .find_by_id("111f00000000000000000001")
        .set_option("emptyError", "E_GONE")
        .await
        .unwrap_err();
    assert_eq!(code_of(&err), Some(ErrorCode::Text("E_GONE".to_string())));
}

#[tokio::test]
async fn enforcement_does_not_touch_found_records() -> anyhow::Result<()> {
    let model = attach(RegistrationConfig::default());

    let record = model
        .find_one(json!({"name": "example 1"}))
        .projection("name")
        .throw_empty_with(404)?
        .await?
        .expect("record");
    assert_eq!(record["name"], "example 1");
    Ok(())
}

#[tokio::test]
async fn renamed_helper() {
    let model = attach(RegistrationConfig::new().with_query_fname("orFail"));

    let err = model.find_one(json!({"name": "x"})).throw_empty().unwrap_err();
    assert_eq!(
        err,
        EntryPointError::NoSuchQueryHelper {
            name: "throwEmpty".to_string()
        }
    );

    let err = model
        .find_one(json!({"name": "x"}))
        .helper("orFail", None)
        .unwrap()
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn disabled_helper_is_a_caller_error() {
    let model = attach(RegistrationConfig::new().without_query_helper());

    assert!(matches!(
        model.find_one(json!({"name": "x"})).throw_empty(),
        Err(EntryPointError::NoSuchQueryHelper { .. })
    ));

    // The option bag still works without the helper.
    let err = model
        .find_one(json!({"name": "x"}))
        .set_option("emptyError", true)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn plain_find_one_with_continuation() {
    let model = attach(RegistrationConfig::default());
    let (tx, rx) = oneshot::channel();

    model
        .find_one(json!({"name": "example"}))
        .set_option("emptyError", true)
        .exec_with(move |outcome| {
            let _ = tx.send(outcome);
        })
        .unwrap()
        .await
        .unwrap();

    let err = rx.await.unwrap().unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(code_of(&err), None);
}

#[tokio::test]
async fn plain_find_by_id_with_continuation_and_code() -> anyhow::Result<()> {
    let model = attach(RegistrationConfig::default());
    let (tx, rx) = oneshot::channel();

    model
        .find_by_id("111f00000000000000000001")
        .throw_empty_with(404)?
        .exec_with(move |outcome| {
            let _ = tx.send(outcome);
        })?
        .await?;

    let err = rx.await?.unwrap_err();
    assert_eq!(code_of(&err), Some(ErrorCode::Int(404)));
    Ok(())
}

#[tokio::test]
async fn plain_continuation_without_option_yields_none() {
    let model = attach(RegistrationConfig::default());
    let (tx, rx) = oneshot::channel();

    model
        .find_one(json!({"name": "example"}))
        .exec_with(move |outcome| {
            let _ = tx.send(outcome);
        })
        .unwrap()
        .await
        .unwrap();

    assert_eq!(rx.await.unwrap().unwrap(), None);
}

#[test]
fn plain_continuation_outside_runtime_is_a_caller_error() {
    let model = attach(RegistrationConfig::default());

    let result = model
        .find_one(json!({"name": "example"}))
        .exec_with(|_| panic!("continuation must not run"));
    assert!(matches!(result, Err(EntryPointError::NoRuntime)));
}

#[derive(Clone, Default)]
struct RecordSeen(Arc<Mutex<Vec<bool>>>);

impl PostFindHook<Value> for RecordSeen {
    fn after_find_one(
        &self,
        _ctx: &QueryContext<'_>,
        record: Option<&Value>,
    ) -> find_or_error::Result<()> {
        self.0.lock().unwrap().push(record.is_some());
        Ok(())
    }
}

#[tokio::test]
async fn hooks_fire_once_per_lookup() {
    let seen = RecordSeen::default();
    let mut model = Model::new(MemoryCollection::new("example"));
    model.post_find_one(seen.clone());
    let model = FindOrError::attach(model, RegistrationConfig::default()).unwrap();

    let _ = model.find_one(json!({"name": "x"})).await;
    let _ = model.find_one_or_error().unwrap().exec(json!({"name": "x"})).await;

    assert_eq!(*seen.0.lock().unwrap(), vec![false, false]);
}
