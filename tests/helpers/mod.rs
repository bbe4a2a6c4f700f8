use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use poemshelf::domain::{NewPoem, PoemDto, PoemPatch};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub use poemshelf::util::testing::tang_poems;

/// Request as seen by the fake server
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub apikey: Option<String>,
}

#[derive(Default)]
struct ServerState {
    poems: Vec<PoemDto>,
    requests: Vec<RecordedRequest>,
    failing: bool,
    delay: Option<Duration>,
}

type Shared = Arc<Mutex<ServerState>>;

/// Serves both the custom `/api` surface and a PostgREST `/rest/v1/poems` table
/// from the same rows, on a random localhost port.
#[allow(dead_code)]
pub struct FakePoemServer {
    state: Shared,
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

#[allow(dead_code)]
impl FakePoemServer {
    pub async fn start(poems: Vec<PoemDto>) -> Result<Self> {
        let state: Shared = Arc::new(Mutex::new(ServerState {
            poems,
            ..ServerState::default()
        }));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind fake server")?;
        let addr = listener.local_addr().context("Failed to get server address")?;

        let app = Router::new()
            .route("/api/health", get(health))
            .route("/api/poems", get(rest_list).post(rest_insert))
            .route(
                "/api/poems/{id}",
                get(rest_get).patch(rest_update).delete(rest_delete),
            )
            .route("/api/poems/{id}/favorite", post(rest_toggle))
            .route(
                "/rest/v1/{table}",
                get(pg_select)
                    .post(pg_insert)
                    .patch(pg_update)
                    .delete(pg_delete),
            )
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Ok(Self {
            state,
            base_url: format!("http://{addr}"),
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn api_url(&self) -> String {
        format!("{}/api", self.base_url)
    }

    pub fn supabase_url(&self) -> String {
        self.base_url.clone()
    }

    pub fn poem(&self, id: i64) -> Option<PoemDto> {
        lock(&self.state).poems.iter().find(|p| p.id == id).cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }

    pub fn set_delay(&self, delay: Duration) {
        lock(&self.state).delay = Some(delay);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }
}

impl Drop for FakePoemServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, ServerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn record(state: &Shared, method: &Method, path: String, headers: &HeaderMap) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    lock(state).requests.push(RecordedRequest {
        method: method.to_string(),
        path,
        authorization: header("authorization"),
        apikey: header("apikey"),
    });
}

async fn pause(state: &Shared) {
    let delay = lock(state).delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

/// MySQL hands TINYINT(1) back as a number.
fn mysql_row(poem: &PoemDto) -> Value {
    json!({
        "id": poem.id,
        "title": poem.title,
        "author": poem.author,
        "dynasty": poem.dynasty,
        "content": poem.content,
        "appreciation": poem.appreciation,
        "favorite": if poem.favorite { 1 } else { 0 },
    })
}

fn db_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"code": 1, "message": "DB_ERROR"})),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"code": 1, "message": "NOT_FOUND"})),
    )
        .into_response()
}

fn insert_row(state: &Shared, new: NewPoem) -> PoemDto {
    let mut state = lock(state);
    let id = state.poems.iter().map(|p| p.id).max().unwrap_or(0) + 1;
    let row = PoemDto {
        id,
        title: new.title,
        author: new.author,
        dynasty: new.dynasty,
        content: new.content,
        appreciation: new.appreciation,
        favorite: new.favorite,
        image: None,
    };
    state.poems.push(row.clone());
    row
}

fn delete_row(state: &Shared, id: i64) -> Option<PoemDto> {
    let mut state = lock(state);
    let index = state.poems.iter().position(|p| p.id == id)?;
    Some(state.poems.remove(index))
}

fn update_row(state: &Shared, id: i64, patch: &PoemPatch) -> Option<PoemDto> {
    let mut state = lock(state);
    let row = state.poems.iter_mut().find(|p| p.id == id)?;
    patch.apply(row);
    Some(row.clone())
}

async fn health(State(state): State<Shared>, method: Method, headers: HeaderMap) -> Response {
    record(&state, &method, "/api/health".to_string(), &headers);
    let failing = lock(&state).failing;
    Json(json!({"ok": true, "db": !failing})).into_response()
}

async fn rest_list(State(state): State<Shared>, method: Method, headers: HeaderMap) -> Response {
    record(&state, &method, "/api/poems".to_string(), &headers);
    pause(&state).await;
    let state = lock(&state);
    if state.failing {
        return db_error();
    }
    let mut rows: Vec<&PoemDto> = state.poems.iter().collect();
    rows.sort_by(|a, b| b.id.cmp(&a.id));
    let data: Vec<Value> = rows.into_iter().map(mysql_row).collect();
    Json(json!({"code": 0, "data": data})).into_response()
}

async fn rest_get(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    record(&state, &method, format!("/api/poems/{id}"), &headers);
    let state = lock(&state);
    if state.failing {
        return db_error();
    }
    match state.poems.iter().find(|p| p.id == id) {
        Some(poem) => Json(json!({"code": 0, "data": mysql_row(poem)})).into_response(),
        None => not_found(),
    }
}

async fn rest_insert(
    State(state): State<Shared>,
    method: Method,
    headers: HeaderMap,
    Json(new): Json<NewPoem>,
) -> Response {
    record(&state, &method, "/api/poems".to_string(), &headers);
    if lock(&state).failing {
        return db_error();
    }
    let row = insert_row(&state, new);
    Json(json!({"code": 0, "data": mysql_row(&row)})).into_response()
}

async fn rest_update(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    method: Method,
    headers: HeaderMap,
    Json(patch): Json<PoemPatch>,
) -> Response {
    record(&state, &method, format!("/api/poems/{id}"), &headers);
    if lock(&state).failing {
        return db_error();
    }
    match update_row(&state, id, &patch) {
        Some(row) => Json(json!({"code": 0, "data": mysql_row(&row)})).into_response(),
        None => not_found(),
    }
}

async fn rest_delete(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    record(&state, &method, format!("/api/poems/{id}"), &headers);
    if lock(&state).failing {
        return db_error();
    }
    match delete_row(&state, id) {
        Some(_) => Json(json!({"code": 0, "data": {"id": id}})).into_response(),
        None => not_found(),
    }
}

async fn rest_toggle(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    record(&state, &method, format!("/api/poems/{id}/favorite"), &headers);
    let mut state = lock(&state);
    if state.failing {
        return db_error();
    }
    match state.poems.iter_mut().find(|p| p.id == id) {
        Some(poem) => {
            poem.favorite = !poem.favorite;
            // The route parameter comes back as a string
            Json(json!({"code": 0, "data": {"id": id.to_string(), "favorite": poem.favorite}}))
                .into_response()
        }
        None => not_found(),
    }
}

/// Extract the needle from `ilike.*x*` or `ilike."*x*"`.
fn ilike_needle(value: &str) -> String {
    value
        .trim_start_matches("ilike.")
        .trim_matches('"')
        .trim_matches('*')
        .to_string()
}

fn pg_guard(state: &Shared, table: &str, headers: &HeaderMap) -> Option<Response> {
    if headers.get("apikey").is_none() {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "No API key found in request"})),
            )
                .into_response(),
        );
    }
    if table != "poems" {
        return Some(
            (
                StatusCode::NOT_FOUND,
                Json(json!({"code": "42P01", "message": format!("relation \"public.{table}\" does not exist")})),
            )
                .into_response(),
        );
    }
    if lock(state).failing {
        return Some(
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"message": "database unavailable"})),
            )
                .into_response(),
        );
    }
    None
}

fn pg_id(query: &HashMap<String, String>) -> Option<i64> {
    query
        .get("id")
        .and_then(|v| v.strip_prefix("eq."))
        .and_then(|v| v.parse().ok())
}

async fn pg_select(
    State(state): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    record(&state, &method, format!("/rest/v1/{table}"), &headers);
    pause(&state).await;
    if let Some(rejection) = pg_guard(&state, &table, &headers) {
        return rejection;
    }
    let state = lock(&state);
    let mut rows: Vec<PoemDto> = state
        .poems
        .iter()
        .filter(|p| pg_id(&query).map_or(true, |id| p.id == id))
        .filter(|p| {
            query
                .get("author")
                .and_then(|v| v.strip_prefix("eq."))
                .map_or(true, |a| p.author == a)
        })
        .filter(|p| {
            query
                .get("dynasty")
                .map_or(true, |v| p.dynasty.contains(&ilike_needle(v)))
        })
        .filter(|p| {
            query.get("or").map_or(true, |v| {
                let needle = v
                    .split("content.ilike.")
                    .nth(1)
                    .and_then(|rest| rest.split(',').next())
                    .map(ilike_needle)
                    .unwrap_or_default();
                p.content.contains(&needle)
                    || p.appreciation.as_deref().is_some_and(|a| a.contains(&needle))
            })
        })
        .cloned()
        .collect();
    if query.get("order").map(String::as_str) == Some("id.desc") {
        rows.sort_by(|a, b| b.id.cmp(&a.id));
    }
    if let Some(limit) = query.get("limit").and_then(|l| l.parse::<usize>().ok()) {
        rows.truncate(limit);
    }
    Json(rows).into_response()
}

async fn pg_insert(
    State(state): State<Shared>,
    Path(table): Path<String>,
    method: Method,
    headers: HeaderMap,
    Json(new): Json<NewPoem>,
) -> Response {
    record(&state, &method, format!("/rest/v1/{table}"), &headers);
    if let Some(rejection) = pg_guard(&state, &table, &headers) {
        return rejection;
    }
    let row = insert_row(&state, new);
    (StatusCode::CREATED, Json(vec![row])).into_response()
}

async fn pg_update(
    State(state): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    method: Method,
    headers: HeaderMap,
    Json(patch): Json<PoemPatch>,
) -> Response {
    record(&state, &method, format!("/rest/v1/{table}"), &headers);
    if let Some(rejection) = pg_guard(&state, &table, &headers) {
        return rejection;
    }
    let rows: Vec<PoemDto> = pg_id(&query)
        .and_then(|id| update_row(&state, id, &patch))
        .into_iter()
        .collect();
    Json(rows).into_response()
}

async fn pg_delete(
    State(state): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    record(&state, &method, format!("/rest/v1/{table}"), &headers);
    if let Some(rejection) = pg_guard(&state, &table, &headers) {
        return rejection;
    }
    let rows: Vec<Value> = pg_id(&query)
        .and_then(|id| delete_row(&state, id))
        .map(|row| json!({"id": row.id}))
        .into_iter()
        .collect();
    Json(rows).into_response()
}
