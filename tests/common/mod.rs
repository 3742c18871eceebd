//! In-process fake of the target web service
//!
//! Implements just enough of the API for the benchmark to pass against it:
//! ES256 auth with session cookies, device registration through the
//! association service, condition ingestion and the read endpoints.

#![allow(dead_code)]

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use condbench_http::{HttpAgent, HttpConfig, HttpRequest, Transport};
use condbench_scenario::credentials::PUBLIC_KEY_PEM;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const INDEX_HTML: &str = "<!DOCTYPE html><html><body><div id=\"root\"></div></body></html>";
const DEFAULT_ICON: &[u8] = b"default-icon";

#[derive(Debug, Clone)]
struct Isu {
    id: i64,
    uuid: String,
    name: String,
    character: String,
    owner: String,
    image: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
struct Reading {
    timestamp: i64,
    is_sitting: bool,
    condition: String,
    message: String,
}

#[derive(Default)]
pub struct FakeState {
    base_url: Mutex<String>,
    jia_url: Mutex<Option<String>>,
    sessions: Mutex<HashMap<String, String>>,
    isus: Mutex<Vec<Isu>>,
    readings: Mutex<HashMap<String, Vec<Reading>>>,
    next_id: AtomicI64,
    next_session: AtomicI64,
    /// Alter the message of the first record of every condition page
    pub corrupt_conditions: AtomicBool,
    /// Return readings sharing a timestamp oldest post first
    pub reverse_ties: AtomicBool,
    /// Accept the device, wait, then fail registration with 500
    pub reject_isu_after: Mutex<Option<Duration>>,
    pub condition_posts: AtomicUsize,
    pub poster_agents: Mutex<Vec<String>>,
}

impl FakeState {
    pub fn readings_for(&self, uuid: &str) -> usize {
        self.readings.lock().get(uuid).map_or(0, Vec::len)
    }

    pub fn total_readings(&self) -> usize {
        self.readings.lock().values().map(Vec::len).sum()
    }

    pub fn isu_count(&self) -> usize {
        self.isus.lock().len()
    }

    pub fn set_jia_url(&self, url: impl Into<String>) {
        *self.jia_url.lock() = Some(url.into());
    }
}

pub struct FakeTarget {
    pub state: Arc<FakeState>,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl FakeTarget {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(FakeState::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let base_url = format!("http://{}", addr);
        *state.base_url.lock() = base_url.clone();

        let app = router(state.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self {
            state,
            base_url,
            handle,
        })
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::default()
            .with_base_url(self.base_url.clone())
            .with_timeout(Duration::from_secs(5))
    }
}

impl Drop for FakeTarget {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: Arc<FakeState>) -> Router {
    Router::new()
        .route("/initialize", post(initialize))
        .route("/api/auth", post(auth))
        .route("/api/signout", post(signout))
        .route("/api/user/me", get(me))
        .route("/api/isu", get(list_isu).post(post_isu))
        .route("/api/isu/{uuid}", get(get_isu))
        .route("/api/isu/{uuid}/icon", get(get_icon))
        .route("/api/isu/{uuid}/graph", get(get_graph))
        .route("/api/condition/{uuid}", get(get_conditions).post(post_conditions))
        .route("/api/trend", get(trend))
        .route("/assets/{file}", get(asset))
        .fallback(index)
        .with_state(state)
}

fn text(status: StatusCode, body: &'static str) -> Response {
    (status, body).into_response()
}

fn not_signed_in() -> Response {
    text(StatusCode::UNAUTHORIZED, "you are not signed in")
}

fn not_found_isu() -> Response {
    text(StatusCode::NOT_FOUND, "not found: isu")
}

fn session_user(state: &FakeState, headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let session = cookies
        .split(';')
        .map(str::trim)
        .find_map(|c| c.strip_prefix("isucondition="))?;
    state.sessions.lock().get(session).cloned()
}

fn owned_isu(state: &FakeState, user: &str, uuid: &str) -> Option<Isu> {
    state
        .isus
        .lock()
        .iter()
        .find(|i| i.uuid == uuid && i.owner == user)
        .cloned()
}

fn level_of(condition: &str) -> &'static str {
    match condition.matches("=true").count() {
        0 => "info",
        3 => "critical",
        _ => "warning",
    }
}

fn condition_json(isu: &Isu, r: &Reading) -> Value {
    json!({
        "jia_isu_uuid": isu.uuid,
        "isu_name": isu.name,
        "timestamp": r.timestamp,
        "is_sitting": r.is_sitting,
        "condition": r.condition,
        "condition_level": level_of(&r.condition),
        "message": r.message,
    })
}

async fn index() -> Response {
    ([(header::CONTENT_TYPE, "text/html")], INDEX_HTML).into_response()
}

async fn asset(Path(file): Path<String>) -> Response {
    format!("/* asset {} */", file).into_response()
}

#[derive(Deserialize)]
struct InitializeBody {
    jia_service_url: String,
}

async fn initialize(State(state): State<Arc<FakeState>>, Json(body): Json<InitializeBody>) -> Response {
    state.set_jia_url(body.jia_service_url);
    state.sessions.lock().clear();
    state.isus.lock().clear();
    state.readings.lock().clear();
    Json(json!({ "language": "rust" })).into_response()
}

async fn auth(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let Some(token) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return text(StatusCode::FORBIDDEN, "forbidden");
    };
    let Ok(key) = DecodingKey::from_ec_pem(PUBLIC_KEY_PEM.as_bytes()) else {
        return text(StatusCode::INTERNAL_SERVER_ERROR, "bad key");
    };
    let claims = match decode::<Value>(token, &key, &Validation::new(Algorithm::ES256)) {
        Ok(data) => data.claims,
        Err(_) => return text(StatusCode::FORBIDDEN, "forbidden"),
    };
    let Some(user) = claims.get("jia_user_id").and_then(Value::as_str) else {
        return text(StatusCode::BAD_REQUEST, "invalid JWT payload");
    };

    let session = format!("s{}", state.next_session.fetch_add(1, Ordering::Relaxed));
    state.sessions.lock().insert(session.clone(), user.to_string());
    (
        [(header::SET_COOKIE, format!("isucondition={}; Path=/", session))],
        StatusCode::OK,
    )
        .into_response()
}

async fn signout(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let Some(user) = session_user(&state, &headers) else {
        return not_signed_in();
    };
    state.sessions.lock().retain(|_, u| *u != user);
    StatusCode::OK.into_response()
}

async fn me(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    match session_user(&state, &headers) {
        Some(user) => Json(json!({ "jia_user_id": user })).into_response(),
        None => not_signed_in(),
    }
}

async fn list_isu(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let Some(user) = session_user(&state, &headers) else {
        return not_signed_in();
    };
    let mut isus: Vec<Isu> = state.isus.lock().iter().filter(|i| i.owner == user).cloned().collect();
    isus.sort_by(|a, b| b.id.cmp(&a.id));

    let readings = state.readings.lock();
    let list: Vec<Value> = isus
        .iter()
        .map(|isu| {
            let reverse_ties = state.reverse_ties.load(Ordering::Relaxed);
            let latest = readings
                .get(&isu.uuid)
                .and_then(|rs| {
                    if reverse_ties {
                        rs.iter().rev().max_by_key(|r| r.timestamp)
                    } else {
                        rs.iter().max_by_key(|r| r.timestamp)
                    }
                })
                .map(|r| condition_json(isu, r));
            json!({
                "id": isu.id,
                "jia_isu_uuid": isu.uuid,
                "name": isu.name,
                "character": isu.character,
                "latest_isu_condition": latest,
            })
        })
        .collect();
    Json(Value::Array(list)).into_response()
}

async fn activate(jia_url: &str, target_base_url: &str, uuid: &str) -> Option<String> {
    let agent = HttpAgent::new(HttpConfig::default().with_base_url(jia_url)).ok()?;
    let request = HttpRequest::post("/api/activate")
        .json(json!({ "target_base_url": target_base_url, "isu_uuid": uuid }));
    let response = agent.send(request).await.ok()?;
    if response.status != 202 {
        return None;
    }
    let body: Value = response.json().ok()?;
    body.get("character").and_then(Value::as_str).map(str::to_string)
}

async fn post_isu(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let Some(user) = session_user(&state, &headers) else {
        return not_signed_in();
    };

    let (mut uuid, mut name, mut image) = (None, None, None);
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().map(str::to_string);
        let Ok(bytes) = field.bytes().await else {
            return text(StatusCode::BAD_REQUEST, "bad request body");
        };
        match field_name.as_deref() {
            Some("jia_isu_uuid") => uuid = Some(String::from_utf8_lossy(&bytes).into_owned()),
            Some("isu_name") => name = Some(String::from_utf8_lossy(&bytes).into_owned()),
            Some("image") => image = Some(bytes.to_vec()),
            _ => {}
        }
    }
    let (Some(uuid), Some(name)) = (uuid, name) else {
        return text(StatusCode::BAD_REQUEST, "bad request body");
    };
    if state.isus.lock().iter().any(|i| i.uuid == uuid) {
        return text(StatusCode::CONFLICT, "duplicated: isu");
    }
    let Some(jia_url) = state.jia_url.lock().clone() else {
        return text(StatusCode::INTERNAL_SERVER_ERROR, "not initialized");
    };

    let id = state.next_id.fetch_add(1, Ordering::Relaxed) + 1;
    state.isus.lock().push(Isu {
        id,
        uuid: uuid.clone(),
        name: name.clone(),
        character: String::new(),
        owner: user,
        image,
    });

    let base_url = state.base_url.lock().clone();
    let Some(character) = activate(&jia_url, &base_url, &uuid).await else {
        state.isus.lock().retain(|i| i.uuid != uuid);
        return text(StatusCode::BAD_GATEWAY, "activation failed");
    };

    let reject_after = *state.reject_isu_after.lock();
    if let Some(delay) = reject_after {
        tokio::time::sleep(delay).await;
        state.isus.lock().retain(|i| i.uuid != uuid);
        return text(StatusCode::INTERNAL_SERVER_ERROR, "db error");
    }

    if let Some(isu) = state.isus.lock().iter_mut().find(|i| i.uuid == uuid) {
        isu.character = character.clone();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "jia_isu_uuid": uuid,
            "name": name,
            "character": character,
        })),
    )
        .into_response()
}

async fn get_isu(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
) -> Response {
    let Some(user) = session_user(&state, &headers) else {
        return not_signed_in();
    };
    match owned_isu(&state, &user, &uuid) {
        Some(isu) => Json(json!({
            "id": isu.id,
            "jia_isu_uuid": isu.uuid,
            "name": isu.name,
            "character": isu.character,
        }))
        .into_response(),
        None => not_found_isu(),
    }
}

async fn get_icon(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
) -> Response {
    let Some(user) = session_user(&state, &headers) else {
        return not_signed_in();
    };
    match owned_isu(&state, &user, &uuid) {
        Some(isu) => isu.image.unwrap_or_else(|| DEFAULT_ICON.to_vec()).into_response(),
        None => not_found_isu(),
    }
}

#[derive(Deserialize)]
struct GraphParams {
    datetime: i64,
}

async fn get_graph(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
    Query(params): Query<GraphParams>,
) -> Response {
    let Some(user) = session_user(&state, &headers) else {
        return not_signed_in();
    };
    if owned_isu(&state, &user, &uuid).is_none() {
        return not_found_isu();
    }
    let readings = state.readings.lock().get(&uuid).cloned().unwrap_or_default();

    let graph: Vec<Value> = (0..24)
        .map(|hour| {
            let start = params.datetime + 3600 * hour;
            let end = start + 3600;
            let mut bucket: Vec<&Reading> =
                readings.iter().filter(|r| r.timestamp >= start && r.timestamp < end).collect();
            bucket.sort_by_key(|r| r.timestamp);
            let n = bucket.len() as i64;
            let data = (n > 0).then(|| {
                let pct = |f: &dyn Fn(&Reading) -> bool| {
                    bucket.iter().filter(|r| f(r)).count() as i64 * 100 / n
                };
                let raised: i64 = bucket.iter().map(|r| r.condition.matches("=true").count() as i64).sum();
                json!({
                    "score": (100 - raised * 100 / (3 * n)).max(0),
                    "percentage": {
                        "sitting": pct(&|r: &Reading| r.is_sitting),
                        "is_broken": pct(&|r: &Reading| r.condition.contains("is_broken=true")),
                        "is_dirty": pct(&|r: &Reading| r.condition.contains("is_dirty=true")),
                        "is_overweight": pct(&|r: &Reading| r.condition.contains("is_overweight=true")),
                    }
                })
            });
            json!({
                "start_at": start,
                "end_at": end,
                "data": data,
                "condition_timestamps": bucket.iter().map(|r| r.timestamp).collect::<Vec<_>>(),
            })
        })
        .collect();
    Json(Value::Array(graph)).into_response()
}

#[derive(Deserialize)]
struct ConditionParams {
    start_time: Option<i64>,
    end_time: i64,
    condition_level: String,
    limit: Option<usize>,
}

async fn get_conditions(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
    Query(params): Query<ConditionParams>,
) -> Response {
    let Some(user) = session_user(&state, &headers) else {
        return not_signed_in();
    };
    let Some(isu) = owned_isu(&state, &user, &uuid) else {
        return not_found_isu();
    };
    let levels: Vec<&str> = params.condition_level.split(',').collect();
    let start = params.start_time.unwrap_or(i64::MIN);

    let readings = state.readings.lock().get(&uuid).cloned().unwrap_or_default();
    // newest first; ties keep whichever post order the switch selects
    let posted: Box<dyn Iterator<Item = &Reading>> = if state.reverse_ties.load(Ordering::Relaxed) {
        Box::new(readings.iter())
    } else {
        Box::new(readings.iter().rev())
    };
    let mut page: Vec<&Reading> = posted
        .filter(|r| r.timestamp >= start && r.timestamp < params.end_time)
        .filter(|r| levels.contains(&level_of(&r.condition)))
        .collect();
    page.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut body: Vec<Value> = page
        .into_iter()
        .take(params.limit.unwrap_or(20))
        .map(|r| condition_json(&isu, r))
        .collect();
    if state.corrupt_conditions.load(Ordering::Relaxed) {
        if let Some(first) = body.first_mut() {
            first["message"] = json!("corrupted");
        }
    }
    Json(Value::Array(body)).into_response()
}

#[derive(Deserialize)]
struct PostedCondition {
    is_sitting: bool,
    condition: String,
    message: String,
    timestamp: i64,
}

async fn post_conditions(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(uuid): Path<String>,
    Json(body): Json<Vec<PostedCondition>>,
) -> Response {
    if !state.isus.lock().iter().any(|i| i.uuid == uuid) {
        return not_found_isu();
    }
    if let Some(agent) = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        state.poster_agents.lock().push(agent.to_string());
    }
    state.condition_posts.fetch_add(1, Ordering::Relaxed);
    state.readings.lock().entry(uuid).or_default().extend(body.into_iter().map(|c| Reading {
        timestamp: c.timestamp,
        is_sitting: c.is_sitting,
        condition: c.condition,
        message: c.message,
    }));
    StatusCode::ACCEPTED.into_response()
}

async fn trend(State(state): State<Arc<FakeState>>) -> Response {
    let isus = state.isus.lock().clone();
    let readings = state.readings.lock();
    let mut by_character: HashMap<String, [Vec<Value>; 3]> = HashMap::new();
    for isu in isus.iter().filter(|i| !i.character.is_empty()) {
        let entry = by_character.entry(isu.character.clone()).or_default();
        let latest = readings.get(&isu.uuid).and_then(|rs| rs.iter().max_by_key(|r| r.timestamp));
        if let Some(r) = latest {
            let slot = match level_of(&r.condition) {
                "info" => 0,
                "warning" => 1,
                _ => 2,
            };
            entry[slot].push(json!({ "isu_id": isu.id, "timestamp": r.timestamp }));
        }
    }
    let body: Vec<Value> = by_character
        .into_iter()
        .map(|(character, [info, warning, critical])| {
            json!({ "character": character, "info": info, "warning": warning, "critical": critical })
        })
        .collect();
    Json(Value::Array(body)).into_response()
}
