use async_trait::async_trait;
use retrace_engine::action::ActionKind;
use retrace_engine::builder::TrajectoryBuilder;
use retrace_engine::classify::ClassifierKind;
use retrace_engine::protocol::RawDocument;
use retrace_engine::retry::RetryPolicy;
use retrace_engine::store::{BlobStore, StoreError};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;

fn capture(t: f64) -> Value {
    json!({"type": "htmlCapture", "timestamp": t, "video_timestamp": t / 10.0,
           "html": format!("<html data-t=\"{}\"></html>", t)})
}

fn stored_capture(t: f64, key: &str) -> Value {
    json!({"type": "htmlCapture", "timestamp": t, "video_timestamp": t / 10.0,
           "html_file_url": key})
}

fn click(t: f64, bid: &str) -> Value {
    json!({"type": "click", "timestamp": t, "video_timestamp": t / 10.0,
           "url": "https://example.com/", "target": {"tag": "BUTTON", "bid": bid}})
}

fn input(t: f64, bid: &str, value: &str) -> Value {
    json!({"type": "input", "timestamp": t, "video_timestamp": t / 10.0,
           "url": "https://example.com/", "target": {"tag": "INPUT", "bid": bid, "value": value}})
}

fn document(data: Vec<Value>) -> RawDocument {
    serde_json::from_value(json!({"_id": "session-1", "task_description": "demo", "data": data}))
        .unwrap()
}

#[derive(Default)]
struct MockBlobStore {
    blobs: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn fetch(&self, key: &str) -> Result<String, StoreError> {
        self.fetched.lock().unwrap().push(key.to_string());
        self.blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[test]
fn test_unsorted_log_is_reconstructed_in_time_order() {
    let doc = document(vec![
        click(50.0, "c"),
        capture(40.0),
        click(10.0, "a"),
        capture(20.0),
        click(25.0, "b"),
        capture(5.0),
    ]);

    let steps = TrajectoryBuilder::default().reconstruct(&doc);
    let summary: Vec<(f64, Vec<&str>)> = steps
        .iter()
        .map(|s| {
            (
                s.observation.timestamp,
                s.actions.iter().map(|a| a.target_id.as_str()).collect(),
            )
        })
        .collect();

    assert_eq!(
        summary,
        vec![(5.0, vec!["a"]), (20.0, vec!["b"]), (40.0, vec!["c"])]
    );
}

#[test]
fn test_typing_burst_becomes_one_fill() {
    let doc = document(vec![
        capture(5.0),
        input(10.0, "q", "h"),
        input(12.0, "q", "he"),
        input(15.0, "q", "hello"),
    ]);

    let steps = TrajectoryBuilder::default().reconstruct(&doc);
    assert_eq!(steps.len(), 1);
    let action = &steps[0].actions[0];
    assert_eq!(action.timestamp, 10.0);
    assert_eq!(
        action.kind,
        ActionKind::Fill {
            value: "hello".into(),
            end_timestamp: 15.0
        }
    );
}

#[test]
fn test_fill_aligns_on_its_start_time() {
    // The snapshot at t=12 was taken mid-burst; the fill belongs to the one before it.
    let doc = document(vec![
        capture(5.0),
        input(10.0, "q", "h"),
        capture(12.0),
        input(15.0, "q", "hello"),
    ]);

    let steps = TrajectoryBuilder::default().reconstruct(&doc);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].observation.timestamp, 5.0);
}

#[test]
fn test_select_and_unmatched_actions() {
    let doc = document(vec![
        click(3.0, "early"),
        capture(5.0),
        json!({"type": "input", "timestamp": 8, "video_timestamp": 0.8,
               "target": {"tag": "SELECT", "bid": "country", "value": "Canada"}}),
    ]);

    let steps = TrajectoryBuilder::default().reconstruct(&doc);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].actions.len(), 1);
    assert_eq!(steps[0].actions[0].target_id, "country");
    assert_eq!(
        steps[0].actions[0].kind,
        ActionKind::SelectOption {
            option: "Canada".into()
        }
    );
}

#[test]
fn test_second_action_under_same_snapshot_is_dropped() {
    let doc = document(vec![
        capture(5.0),
        click(10.0, "first"),
        click(12.0, "second"),
        capture(20.0),
        click(25.0, "third"),
    ]);

    let steps = TrajectoryBuilder::default().reconstruct(&doc);
    let targets: Vec<Vec<&str>> = steps
        .iter()
        .map(|s| s.actions.iter().map(|a| a.target_id.as_str()).collect())
        .collect();
    assert_eq!(targets, vec![vec!["first"], vec!["third"]]);
}

#[test]
fn test_malformed_records_do_not_abort() {
    let doc = document(vec![
        capture(5.0),
        json!({"type": "click", "timestamp": 6}),
        json!({"type": "htmlCapture", "timestamp": 7, "video_timestamp": 0.7}),
        click(10.0, "ok"),
    ]);

    let steps = TrajectoryBuilder::default().reconstruct(&doc);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].actions[0].target_id, "ok");
}

#[test]
fn test_markup_strategy_keeps_composite_gesture_together() {
    let combobox = json!({"type": "click", "timestamp": 10, "video_timestamp": 1.0,
        "target": {"tag": "DIV", "bid": "city",
                   "outerHTMLSnippet": "<div role=\"combobox\" aria-expanded=\"false\" class=\"dropdown\">"}});
    let scroll = json!({"type": "scroll", "timestamp": 12, "video_timestamp": 1.2,
        "target": {"tag": "DIV", "bid": "page"}});
    let doc = document(vec![capture(5.0), combobox, capture(11.0), scroll]);

    let steps = TrajectoryBuilder::with_kind(ClassifierKind::Markup).reconstruct(&doc);
    assert_eq!(steps.len(), 1);
    let names: Vec<&str> = steps[0].actions.iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["press", "click"]);

    // The default strategy sees the same click as a single action.
    let steps = TrajectoryBuilder::default().reconstruct(&doc);
    assert_eq!(steps[0].actions.len(), 1);
}

#[test]
fn test_trajectory_invariants_hold() {
    let mut data = Vec::new();
    for t in [1.0, 4.0, 4.0, 9.0, 15.0, 22.0, 23.0, 40.0] {
        data.push(capture(t));
    }
    for (t, bid) in [(2.0, "a"), (3.0, "b"), (6.0, "c"), (16.0, "d"), (21.0, "e"), (41.0, "f")] {
        data.push(click(t, bid));
    }
    data.push(input(10.0, "g", "x"));
    data.push(input(11.0, "g", "xy"));
    let doc = document(data);

    let steps = TrajectoryBuilder::default().reconstruct(&doc);
    assert!(steps.len() <= 7);

    let mut last_time = f64::MIN;
    for step in &steps {
        assert!(!step.actions.is_empty());
        for action in &step.actions {
            assert!(step.observation.timestamp < action.timestamp);
            assert!(action.timestamp >= last_time);
            last_time = action.timestamp;
        }
    }
}

#[tokio::test]
async fn test_enrich_resolves_stored_html() {
    let doc = document(vec![
        stored_capture(5.0, "captures/s1/5.html"),
        click(10.0, "a"),
        capture(20.0),
        click(25.0, "b"),
        stored_capture(30.0, "captures/s1/30.html"),
    ]);
    let blobs = MockBlobStore {
        blobs: HashMap::from([(
            "captures/s1/5.html".to_string(),
            "<html bid=\"a\"></html>".to_string(),
        )]),
        ..Default::default()
    };

    let steps = TrajectoryBuilder::default()
        .build(&doc, &blobs, &RetryPolicy::none())
        .await
        .unwrap();

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].observation.html, "<html bid=\"a\"></html>");
    assert_eq!(steps[1].observation.html, "<html data-t=\"20\"></html>");
    // Unpaired snapshots are never fetched.
    assert_eq!(*blobs.fetched.lock().unwrap(), vec!["captures/s1/5.html"]);
}

#[tokio::test]
async fn test_enrich_reports_missing_blob() {
    let doc = document(vec![stored_capture(5.0, "gone.html"), click(10.0, "a")]);
    let blobs = MockBlobStore::default();

    let err = TrajectoryBuilder::default()
        .build(&doc, &blobs, &RetryPolicy::none())
        .await
        .unwrap_err();

    assert_eq!(err.key, "gone.html");
    assert!(matches!(err.source, StoreError::NotFound(_)));
}
