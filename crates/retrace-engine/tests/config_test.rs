use retrace_engine::classify::ClassifierKind;
use retrace_engine::config::{ConfigError, ConfigLoader, RetraceConfig, validate};
use std::path::PathBuf;

#[test]
fn test_partial_yaml_fills_defaults() {
    let yaml = r#"
store:
  documents_dir: /srv/sessions
  blob_base_url: https://captures.example.com/html/
pipeline:
  classifier: markup
"#;
    let config: RetraceConfig = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.store.documents_dir, PathBuf::from("/srv/sessions"));
    assert_eq!(
        config.store.blob_base_url.as_deref(),
        Some("https://captures.example.com/html/")
    );
    assert_eq!(config.store.blob_dir, PathBuf::from("./data/blobs"));
    assert_eq!(config.pipeline.classifier, ClassifierKind::Markup);
    assert_eq!(config.pipeline.concurrency, 4);
    assert_eq!(config.axtree.concurrency, 1);
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.retry_delay_ms, 1000);
}

#[test]
fn test_defaults() {
    let config = RetraceConfig::default();
    assert_eq!(config.pipeline.classifier, ClassifierKind::Tag);
    assert_eq!(config.axtree.endpoint, "http://127.0.0.1:8765/axtree");
    assert_eq!(config.axtree.timeout_ms, 60000);
    assert_eq!(
        config.store.output_path,
        PathBuf::from("./data/processed/steps.jsonl")
    );
    assert!(validate(&config).is_ok());
    assert_eq!(config.store.blob_base_url().unwrap(), None);
}

#[tokio::test]
async fn test_load_from_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("retrace.yaml");
    tokio::fs::write(&path, "retry:\n  max_retries: 0\naxtree:\n  concurrency: 3\n")
        .await
        .unwrap();

    let config = ConfigLoader::load_from(&path).await.unwrap();
    assert_eq!(config.retry.max_retries, 0);
    assert_eq!(config.axtree.concurrency, 3);
    assert_eq!(config.pipeline.concurrency, 4);
}

#[tokio::test]
async fn test_load_errors() {
    let temp_dir = tempfile::tempdir().unwrap();

    let missing = ConfigLoader::load_from(&temp_dir.path().join("none.yaml")).await;
    assert!(matches!(missing, Err(ConfigError::Io { .. })));

    let path = temp_dir.path().join("bad.yaml");
    tokio::fs::write(&path, "pipeline:\n  classifier: telepathy\n")
        .await
        .unwrap();
    let bad = ConfigLoader::load_from(&path).await;
    assert!(matches!(bad, Err(ConfigError::Parse { .. })));
}

#[tokio::test]
async fn test_invalid_urls_are_rejected_at_load() {
    let temp_dir = tempfile::tempdir().unwrap();

    let path = temp_dir.path().join("endpoint.yaml");
    tokio::fs::write(&path, "axtree:\n  endpoint: not a url\n")
        .await
        .unwrap();
    let err = ConfigLoader::load_from(&path).await.unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "axtree.endpoint",
            ..
        }
    ));

    let path = temp_dir.path().join("blobs.yaml");
    tokio::fs::write(&path, "store:\n  blob_base_url: captures/html\n")
        .await
        .unwrap();
    let err = ConfigLoader::load_from(&path).await.unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "store.blob_base_url",
            ..
        }
    ));
}

#[test]
fn test_zero_concurrency_is_invalid() {
    let config: RetraceConfig = serde_yaml::from_str("pipeline:\n  concurrency: 0\n").unwrap();
    assert!(matches!(
        validate(&config),
        Err(ConfigError::Invalid {
            field: "pipeline.concurrency",
            ..
        })
    ));
}

#[test]
fn test_parsed_urls() {
    let config: RetraceConfig = serde_yaml::from_str(
        "store:\n  blob_base_url: https://captures.example.com/html/\naxtree:\n  endpoint: http://10.0.0.2:9000/tree\n",
    )
    .unwrap();
    assert_eq!(
        config.store.blob_base_url().unwrap().unwrap().as_str(),
        "https://captures.example.com/html/"
    );
    assert_eq!(config.axtree.endpoint_url().unwrap().port(), Some(9000));
}
