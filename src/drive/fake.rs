//! In-process stand-in for the Drive and OAuth endpoints, used by tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::FOLDER_MIME_TYPE;
use crate::config::DriveConfig;

pub const FAKE_ACCESS_TOKEN: &str = "fake-access-token";

#[derive(Debug, Clone)]
pub struct FakeFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parents: Vec<String>,
    pub content: Vec<u8>,
    pub public: bool,
}

#[derive(Default)]
struct FakeState {
    folders: Vec<(String, String)>,
    files: HashMap<String, FakeFile>,
    next_id: usize,
    reject_sign_in: bool,
    fail_uploads: bool,
    fail_permissions: bool,
    fail_metadata: bool,
    search_delay_ms: u64,
    token_delay_ms: u64,
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeDrive {
    base_url: String,
    state: Shared,
}

impl FakeDrive {
    /// Bind a random local port and serve the fake endpoints.
    pub async fn start() -> Self {
        let state: Shared = Arc::default();

        let app = Router::new()
            .route("/token", post(token))
            .route("/drive/v3/files", get(list_files).post(create_folder))
            .route("/drive/v3/files/{id}", get(get_file))
            .route("/drive/v3/files/{id}/permissions", post(create_permission))
            .route("/upload/drive/v3/files", post(upload_file))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Drive");
        let addr = listener.local_addr().expect("Failed to get addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn config(&self) -> DriveConfig {
        DriveConfig {
            client_id: "test-client".to_string(),
            token_url: format!("{}/token", self.base_url),
            api_base: format!("{}/drive/v3", self.base_url),
            upload_base: format!("{}/upload/drive/v3", self.base_url),
            folder_name: "Portfolio Test".to_string(),
            ..DriveConfig::default()
        }
    }

    pub fn set_reject_sign_in(&self, value: bool) {
        self.state.lock().unwrap().reject_sign_in = value;
    }

    pub fn set_fail_uploads(&self, value: bool) {
        self.state.lock().unwrap().fail_uploads = value;
    }

    pub fn set_fail_permissions(&self, value: bool) {
        self.state.lock().unwrap().fail_permissions = value;
    }

    pub fn set_fail_metadata(&self, value: bool) {
        self.state.lock().unwrap().fail_metadata = value;
    }

    pub fn set_search_delay_ms(&self, value: u64) {
        self.state.lock().unwrap().search_delay_ms = value;
    }

    /// Hold token responses back for `value` milliseconds.
    pub fn set_token_delay_ms(&self, value: u64) {
        self.state.lock().unwrap().token_delay_ms = value;
    }

    pub fn folder_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .folders
            .iter()
            .filter(|(_, n)| n == name)
            .count()
    }

    pub fn file(&self, id: &str) -> Option<FakeFile> {
        self.state.lock().unwrap().files.get(id).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }
}

fn google_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", FAKE_ACCESS_TOKEN))
}

fn next_id(state: &mut FakeState, prefix: &str) -> String {
    state.next_id += 1;
    format!("{}-{}", prefix, state.next_id)
}

async fn token(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    let (reject, delay) = {
        let state = state.lock().unwrap();
        (state.reject_sign_in, state.token_delay_ms)
    };
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if reject || !form.contains_key("grant_type") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Bad Request" })),
        )
            .into_response();
    }

    Json(json!({
        "access_token": FAKE_ACCESS_TOKEN,
        "expires_in": 3600,
        "token_type": "Bearer",
    }))
    .into_response()
}

#[derive(Deserialize)]
struct ListQuery {
    q: String,
}

async fn list_files(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }

    let delay = state.lock().unwrap().search_delay_ms;
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    // q looks like: name = 'X' and mimeType = '...' and trashed = false
    let name = query.q.split('\'').nth(1).unwrap_or_default().to_string();
    let files: Vec<Value> = state
        .lock()
        .unwrap()
        .folders
        .iter()
        .filter(|(_, n)| *n == name)
        .map(|(id, n)| json!({ "id": id, "name": n }))
        .collect();

    Json(json!({ "files": files })).into_response()
}

async fn create_folder(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    if body["mimeType"] != FOLDER_MIME_TYPE {
        return google_error(StatusCode::BAD_REQUEST, "Expected a folder");
    }

    let mut state = state.lock().unwrap();
    let id = next_id(&mut state, "folder");
    let name = body["name"].as_str().unwrap_or_default().to_string();
    state.folders.push((id.clone(), name));

    Json(json!({ "id": id })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadQuery {
    upload_type: String,
}

async fn upload_file(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<UploadQuery>,
    body: String,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    if state.lock().unwrap().fail_uploads {
        return google_error(StatusCode::INTERNAL_SERVER_ERROR, "Backend Error");
    }
    if query.upload_type != "multipart" {
        return google_error(StatusCode::BAD_REQUEST, "Unsupported upload type");
    }

    let Some(boundary) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("multipart/related; boundary="))
        .map(str::to_string)
    else {
        return google_error(StatusCode::BAD_REQUEST, "Missing multipart boundary");
    };

    let parts: Vec<&str> = body
        .split(&format!("--{}", boundary))
        .filter_map(|part| part.split_once("\r\n\r\n").map(|(_, content)| content.trim_end()))
        .collect();
    if parts.len() != 2 {
        return google_error(StatusCode::BAD_REQUEST, "Expected metadata and media parts");
    }

    let Ok(metadata) = serde_json::from_str::<Value>(parts[0]) else {
        return google_error(StatusCode::BAD_REQUEST, "Invalid metadata part");
    };
    let Ok(content) = base64::engine::general_purpose::STANDARD.decode(parts[1]) else {
        return google_error(StatusCode::BAD_REQUEST, "Invalid media part");
    };

    let mut state = state.lock().unwrap();
    let id = next_id(&mut state, "file");
    let parents = metadata["parents"]
        .as_array()
        .map(|p| {
            p.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    state.files.insert(
        id.clone(),
        FakeFile {
            id: id.clone(),
            name: metadata["name"].as_str().unwrap_or_default().to_string(),
            mime_type: metadata["mimeType"].as_str().unwrap_or_default().to_string(),
            parents,
            content,
            public: false,
        },
    );

    Json(json!({ "id": id })).into_response()
}

async fn create_permission(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }

    let mut state = state.lock().unwrap();
    if state.fail_permissions {
        return google_error(
            StatusCode::FORBIDDEN,
            "The user does not have sufficient permissions",
        );
    }
    let Some(file) = state.files.get_mut(&id) else {
        return google_error(StatusCode::NOT_FOUND, "File not found");
    };
    if body["type"] == "anyone" && body["role"] == "reader" {
        file.public = true;
    }

    Json(json!({ "id": "anyoneWithLink", "type": "anyone", "role": "reader" })).into_response()
}

async fn get_file(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }

    let state = state.lock().unwrap();
    if state.fail_metadata {
        return google_error(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable");
    }
    if !state.files.contains_key(&id) {
        return google_error(StatusCode::NOT_FOUND, "File not found");
    }

    Json(json!({
        "id": id,
        "webViewLink": format!("https://drive.google.com/file/d/{}/view?usp=drivesdk", id),
        "webContentLink": format!("https://drive.google.com/uc?id={}&export=download", id),
    }))
    .into_response()
}
