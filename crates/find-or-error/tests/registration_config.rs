//! Loading registration configs from files and attaching them.

use std::io::Write;

use find_or_error::fakes::MemoryCollection;
use find_or_error::{ConfigError, FindOrError, Model, RegistrationConfig};
use serde_json::json;

fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn load_toml_config() {
    let file = write_config(
        ".toml",
        r#"
[static]
findOneFname = "getOne"
findByIdFname = false

[query]
queryFname = "mustExist"
"#,
    );

    let config = RegistrationConfig::load(file.path()).unwrap();
    assert_eq!(config.find_one_fname(), Some("getOne"));
    assert_eq!(config.find_by_id_fname(), None);
    assert_eq!(config.query_fname(), Some("mustExist"));
    assert_eq!(config.query_option(), "emptyError");
}

#[test]
fn load_json_config() {
    let file = write_config(".json", r#"{"query": {"queryOption": "orFail"}}"#);

    let config = RegistrationConfig::load(file.path()).unwrap();
    assert_eq!(config.query_option(), "orFail");
    assert_eq!(config.find_one_fname(), Some("findOneOrError"));
}

#[test]
fn load_rejects_unknown_extension() {
    let file = write_config(".yaml", "static: {}");
    let err = RegistrationConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "yaml"));
}

#[test]
fn load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = RegistrationConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn load_rejects_empty_option_key() {
    let file = write_config(".json", r#"{"query": {"queryOption": ""}}"#);
    let err = RegistrationConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::EmptyOptionKey));
}

#[tokio::test]
async fn loaded_config_drives_entry_points() {
    let file = write_config(
        ".toml",
        r#"
[static]
findOneFname = "getOne"
"#,
    );
    let config = RegistrationConfig::load(file.path()).unwrap();
    let model =
        FindOrError::attach(Model::new(MemoryCollection::new("user_profile")), config).unwrap();

    assert!(model.entry_point("findOneOrError").is_err());
    let err = model
        .entry_point("getOne")
        .unwrap()
        .exec(json!({"name": "nobody"}))
        .await
        .unwrap_err();
    assert_eq!(
        err.as_not_found().map(|e| e.message.as_str()),
        Some("UserProfile not found.")
    );
}
