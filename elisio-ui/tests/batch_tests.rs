//! Batch criterion submission against the mock server

mod helpers;

use elisio_common::events::EventBus;
use elisio_common::models::{Level, Selection};
use elisio_ui::batch::{BatchBuilder, CriterionRow};
use elisio_ui::{spawn_selector, ApiError, HttpApi};
use helpers::{MockServer, MOCK_CSRF_TOKEN};
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn test_rows_submitted_in_order() {
    let server = MockServer::start().await;
    let api = HttpApi::new(&server.config()).unwrap();

    let builder: BatchBuilder = ["all", "3", "3/7", "3/7/8/42@after"]
        .iter()
        .map(|row| row.parse::<CriterionRow>().unwrap())
        .collect();
    assert_eq!(builder.submit(&api).await.unwrap(), 4);

    let request = server.last_request("/json/batchitem/save/").unwrap();
    assert_eq!(request.csrf_header.as_deref(), Some(MOCK_CSRF_TOKEN));
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        body,
        json!([
            {"type": "all", "id": 0},
            {"type": "author", "id": 3},
            {"type": "opus", "id": 7},
            {"type": "poem", "id": 42, "relation": "after"}
        ])
    );
}

#[tokio::test]
async fn test_empty_batch_not_sent() {
    let server = MockServer::start().await;
    let api = HttpApi::new(&server.config()).unwrap();

    let err = BatchBuilder::new().submit(&api).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
    assert!(server.last_request("/json/batchitem/save/").is_none());
}

#[tokio::test]
async fn test_row_from_current_selection() {
    let server = MockServer::start().await;
    let api = HttpApi::new(&server.config()).unwrap();
    let handle = spawn_selector(Arc::new(api), EventBus::new(16));

    handle.load_authors().await.unwrap();
    handle.select(Level::Author, Selection::Id(1)).await.unwrap();
    handle.select(Level::Opus, Selection::Id(11)).await.unwrap();

    let state = handle.snapshot().await.unwrap();
    let row = CriterionRow::from(&state.selection);
    assert_eq!(row.to_string(), "1/11/all/all");
    assert_eq!(
        serde_json::to_value(row.criterion()).unwrap(),
        json!({"type": "opus", "id": 11})
    );
}
