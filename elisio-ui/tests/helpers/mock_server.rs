//! In-process mock of the Elisio server
//!
//! Corpus: authors 1 (Vergilius) and 2 (Ovidius); Vergilius wrote opera 10
//! (Aeneis) and 11 (Georgica); every opus N has book N*10 and every book N
//! has poem N*10; every poem has 10 verses except poem 999, which has none.
//! The random verse is 1/10/100/1000 verse 5.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use elisio_common::config::ClientConfig;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const MOCK_CSRF_TOKEN: &str = "mock-csrf-token";

/// A request as the mock server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub csrf_header: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockState {
    fn record(
        &self,
        method: Method,
        path: String,
        query: HashMap<String, String>,
        headers: &HeaderMap,
        body: String,
    ) {
        let csrf_header = headers
            .get("x-csrftoken")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            path,
            query,
            csrf_header,
            body,
        });
    }
}

pub struct MockServer {
    pub url: String,
    pub state: Arc<MockState>,
}

impl MockServer {
    /// Bind to an ephemeral port and serve in the background
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockServer { url: format!("http://{}/", addr), state }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig { server_url: self.url.clone(), ..Default::default() }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Last recorded request whose path starts with `prefix`
    pub fn last_request(&self, prefix: &str) -> Option<RecordedRequest> {
        self.requests().into_iter().rev().find(|r| r.path.starts_with(prefix))
    }
}

type Shared = State<Arc<MockState>>;

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/json/authors/", get(authors))
        .route("/json/author/:id", get(opera))
        .route("/json/opus/:id", get(books))
        .route("/json/book/:id", get(poems))
        .route("/json/poem/:id", get(max_verse))
        .route("/json/verse/random/", get(random_verse))
        .route("/json/verse/:poem/:verse", get(verse))
        .route("/json/scan/dbverse/:poem/:verse", get(scan_verse))
        .route("/json/scan/text/:text", get(scan_text))
        .route("/json/batchitem/save/", post(save_batch_items))
        .route("/json/batch/save/", post(save_batch))
        .route("/json/batches/", get(batches))
        .route("/json/batch/delete/:id", delete(delete_batch))
        .route("/json/batch/run/:id", post(run_batch))
        .route("/json/batch/clearcurrentsession", get(clear_session))
        .route("/json/batch/deleteverse/:hash", get(delete_verse))
        .route("/json/admin/sync/files/", get(sync_files))
        .route("/json/admin/users/", get(users))
        .route("/json/admin/meta/", post(post_meta))
        .with_state(state)
}

fn records(model: &str, rows: Vec<(i64, Value)>) -> Json<Value> {
    Json(Value::Array(
        rows.into_iter()
            .map(|(pk, fields)| json!({"model": model, "pk": pk, "fields": fields}))
            .collect(),
    ))
}

fn verse_metadata(poem: i64, number: u32) -> Value {
    json!({
        "verse": {"text": format!("verse {} of poem {}", number, poem), "number": number, "type": "HEXAMETER"},
        "poem": {"id": poem},
    })
}

/// Whether the request carries a header token matching its `csrftoken` cookie
fn csrf_ok(headers: &HeaderMap) -> bool {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let expected = format!("csrftoken={}", MOCK_CSRF_TOKEN);
    let header = headers.get("x-csrftoken").and_then(|v| v.to_str().ok());
    cookie.split("; ").any(|c| c == expected) && header == Some(MOCK_CSRF_TOKEN)
}

async fn root() -> Response {
    (
        [(header::SET_COOKIE, format!("csrftoken={}; Path=/", MOCK_CSRF_TOKEN))],
        "<html></html>",
    )
        .into_response()
}

async fn authors() -> Json<Value> {
    records(
        "elisio.author",
        vec![
            (1, json!({"short_name": "Vergilius", "full_name": "Publius Vergilius Maro"})),
            (2, json!({"short_name": "Ovidius"})),
        ],
    )
}

async fn opera(Path(id): Path<i64>) -> Json<Value> {
    let rows = match id {
        1 => vec![(10, json!({"full_name": "Aeneis"})), (11, json!({"full_name": "Georgica"}))],
        2 => vec![(20, json!({"full_name": "Metamorphoses"}))],
        _ => vec![],
    };
    records("elisio.opus", rows)
}

async fn books(Path(id): Path<i64>) -> Json<Value> {
    records("elisio.book", vec![(id * 10, json!({"number": 1}))])
}

async fn poems(Path(id): Path<i64>) -> Json<Value> {
    records("elisio.poem", vec![(id * 10, json!({"number": 1}))])
}

async fn max_verse(Path(id): Path<i64>) -> String {
    if id == 999 {
        "None".to_string()
    } else {
        "10".to_string()
    }
}

async fn verse(Path((poem, number)): Path<(i64, u32)>) -> Response {
    if number > 10 {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(verse_metadata(poem, number)).into_response()
}

async fn random_verse() -> Json<Value> {
    let mut metadata = verse_metadata(1000, 5);
    metadata["author"] = json!({"id": 1, "name": "Vergilius"});
    metadata["opus"] = json!({"id": 10, "name": "Aeneis"});
    metadata["book"] = json!({"id": 100});
    Json(metadata)
}

async fn scan_verse(
    State(state): Shared,
    Path((poem, number)): Path<(i64, u32)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    let path = format!("/json/scan/dbverse/{}/{}", poem, number);
    state.record(Method::GET, path, query, &headers, String::new());
    Json(json!({"text": format!("scanned {}", number), "zeleny": [4, 3, 3, 4]}))
}

async fn scan_text(
    State(state): Shared,
    Path(text): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    state.record(Method::GET, format!("/json/scan/text/{}", text), query, &headers, String::new());
    if text == "xyz" {
        Json(json!({"error": "no valid scansion for 'xyz'"}))
    } else {
        Json(json!({"text": text.to_uppercase(), "zeleny": [4, 3]}))
    }
}

async fn save_batch_items(State(state): Shared, headers: HeaderMap, body: String) -> StatusCode {
    state.record(
        Method::POST,
        "/json/batchitem/save/".to_string(),
        HashMap::new(),
        &headers,
        body,
    );
    if csrf_ok(&headers) {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    }
}

async fn save_batch(State(state): Shared, headers: HeaderMap) -> StatusCode {
    state.record(Method::POST, "/json/batch/save/".to_string(), HashMap::new(), &headers, String::new());
    if csrf_ok(&headers) {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    }
}

async fn batches() -> Json<Value> {
    Json(json!([
        {
            "id": 4,
            "name": "Aeneis I",
            "timing": "2024-03-01 10:15:00.123456+00:00",
            "itemsAtCreation": 756,
            "itemsNow": 756,
            "scans": {"number": 2, "recent": "2024-03-02"}
        },
        {"id": 5, "name": "empty", "timing": "2024-03-05 08:00:00+01:00", "itemsAtCreation": null, "itemsNow": 0}
    ]))
}

async fn delete_batch(State(state): Shared, Path(id): Path<i64>, headers: HeaderMap) -> StatusCode {
    state.record(Method::DELETE, format!("/json/batch/delete/{}", id), HashMap::new(), &headers, String::new());
    match (csrf_ok(&headers), id) {
        (false, _) => StatusCode::FORBIDDEN,
        // Someone else's batch
        (true, 99) => StatusCode::UNAUTHORIZED,
        (true, _) => StatusCode::OK,
    }
}

async fn run_batch(State(state): Shared, Path(id): Path<i64>, headers: HeaderMap) -> StatusCode {
    state.record(Method::POST, format!("/json/batch/run/{}", id), HashMap::new(), &headers, String::new());
    if csrf_ok(&headers) {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    }
}

async fn clear_session(State(state): Shared, headers: HeaderMap) -> StatusCode {
    state.record(
        Method::GET,
        "/json/batch/clearcurrentsession".to_string(),
        HashMap::new(),
        &headers,
        String::new(),
    );
    StatusCode::OK
}

async fn delete_verse(State(state): Shared, Path(hash): Path<String>, headers: HeaderMap) -> StatusCode {
    state.record(Method::GET, format!("/json/batch/deleteverse/{}", hash), HashMap::new(), &headers, String::new());
    StatusCode::OK
}

async fn sync_files(State(state): Shared, headers: HeaderMap) -> &'static str {
    state.record(Method::GET, "/json/admin/sync/files/".to_string(), HashMap::new(), &headers, String::new());
    "done syncing files"
}

/// Member list for superuser sessions (`sessionid=admin`) only
async fn users(headers: HeaderMap) -> Response {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !cookie.split("; ").any(|c| c == "sessionid=admin") {
        return StatusCode::FORBIDDEN.into_response();
    }
    records(
        "auth.user",
        vec![(
            1,
            json!({
                "username": "admin",
                "date_joined": "2023-01-01T00:00:00Z",
                "last_login": null,
                "is_superuser": true,
                "is_active": true
            }),
        )],
    )
    .into_response()
}

async fn post_meta(State(state): Shared, headers: HeaderMap, body: String) -> StatusCode {
    state.record(Method::POST, "/json/admin/meta/".to_string(), HashMap::new(), &headers, body);
    if csrf_ok(&headers) {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    }
}
