//! Verification pipeline
//!
//! Each action sends one request and reduces the exchange to a value plus a
//! list of [`BenchError`]s:
//!
//! 1. send, a transport failure becomes [`BenchError::Http`]
//! 2. check the status against the expected set
//! 3. decode into the response type and run [`Validate`]
//!
//! Comparison against ground truth is done by the caller with the
//! functions in [`crate::verify`]. Actions never touch a store.

use crate::api::{
    ConditionResponse, GraphEntry, InitializeResponse, IsuListEntry, IsuResponse, MeResponse,
    TrendEntry, Validate,
};
use condbench_core::{BenchError, ConditionLevel, Device};
use condbench_http::{FormPart, HttpRequest, HttpResponse, Transport};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::trace;

pub const SESSION_COOKIE: &str = "isucondition";
pub const NOT_SIGNED_IN: &str = "you are not signed in";
pub const DEFAULT_CONDITION_LIMIT: usize = 20;

const BODY_EXCERPT: usize = 200;

/// Result of one action
#[derive(Debug, Clone)]
pub struct ActionOutcome<T> {
    /// Present only when the exchange passed every step
    pub value: Option<T>,
    pub response: Option<HttpResponse>,
    pub errors: Vec<BenchError>,
}

impl<T> ActionOutcome<T> {
    fn failed(error: BenchError, response: Option<HttpResponse>) -> Self {
        Self {
            value: None,
            response,
            errors: vec![error],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.value.is_some() && self.errors.is_empty()
    }

    /// Value and errors, dropping the raw response
    pub fn into_parts(self) -> (Option<T>, Vec<BenchError>) {
        (self.value, self.errors)
    }
}

/// Steps 1 and 2
pub async fn exchange(
    transport: &dyn Transport,
    request: HttpRequest,
    expected: &[u16],
) -> Result<HttpResponse, BenchError> {
    let described = request.describe();
    let response = transport.send(request).await.map_err(|e| BenchError::Http {
        request: described.clone(),
        message: e.to_string(),
        timeout: e.is_timeout(),
    })?;

    trace!("{} -> {}", described, response.status);
    if !expected.contains(&response.status) {
        return Err(BenchError::StatusMismatch {
            request: described,
            expected: expected.to_vec(),
            actual: response.status,
            body: response.body_excerpt(BODY_EXCERPT),
        });
    }
    Ok(response)
}

/// Step 3
pub fn decode<T: DeserializeOwned + Validate>(
    request: &str,
    response: &HttpResponse,
) -> Result<T, BenchError> {
    let value: T = response
        .json()
        .map_err(|e| BenchError::schema(request, e.to_string()))?;
    value
        .validate()
        .map_err(|message| BenchError::schema(request, message))?;
    Ok(value)
}

/// Steps 1 to 3 for a JSON endpoint
pub async fn json_action<T: DeserializeOwned + Validate>(
    transport: &dyn Transport,
    request: HttpRequest,
    expected: &[u16],
) -> ActionOutcome<T> {
    let described = request.describe();
    let response = match exchange(transport, request, expected).await {
        Ok(response) => response,
        Err(e) => return ActionOutcome::failed(e, None),
    };
    match decode(&described, &response) {
        Ok(value) => ActionOutcome {
            value: Some(value),
            response: Some(response),
            errors: Vec::new(),
        },
        Err(e) => ActionOutcome::failed(e, Some(response)),
    }
}

/// Request expected to fail with one of `expected` and, when given, exactly
/// `expected_body`
pub async fn expect_error(
    transport: &dyn Transport,
    request: HttpRequest,
    expected: &[u16],
    expected_body: Option<&str>,
) -> Vec<BenchError> {
    let described = request.describe();
    let response = match exchange(transport, request, expected).await {
        Ok(response) => response,
        Err(e) => return vec![e],
    };
    match expected_body {
        Some(body) if response.text() != body => vec![BenchError::data_mismatch(
            described,
            0,
            "body",
            body,
            response.body_excerpt(BODY_EXCERPT),
        )],
        _ => Vec::new(),
    }
}

pub async fn initialize(
    transport: &dyn Transport,
    jia_service_url: &str,
) -> ActionOutcome<InitializeResponse> {
    let request = HttpRequest::post("/initialize").json(json!({ "jia_service_url": jia_service_url }));
    json_action(transport, request, &[200]).await
}

/// `POST /api/auth`; success also requires the session cookie
pub async fn auth(transport: &dyn Transport, token: &str) -> ActionOutcome<()> {
    let request = HttpRequest::post("/api/auth").header("Authorization", token);
    let described = request.describe();
    match exchange(transport, request, &[200]).await {
        Ok(response) if response.has_cookie(SESSION_COOKIE) => ActionOutcome {
            value: Some(()),
            response: Some(response),
            errors: Vec::new(),
        },
        Ok(response) => ActionOutcome::failed(
            BenchError::schema(described, format!("cookie `{}` not set", SESSION_COOKIE)),
            Some(response),
        ),
        Err(e) => ActionOutcome::failed(e, None),
    }
}

/// `POST /api/auth` with a bad or missing token
pub async fn auth_rejected(
    transport: &dyn Transport,
    token: Option<&str>,
    expected_status: u16,
    expected_body: &str,
) -> Vec<BenchError> {
    let mut request = HttpRequest::post("/api/auth");
    if let Some(token) = token {
        request = request.header("Authorization", token);
    }
    expect_error(transport, request, &[expected_status], Some(expected_body)).await
}

pub async fn signout(transport: &dyn Transport) -> Vec<BenchError> {
    match exchange(transport, HttpRequest::post("/api/signout"), &[200]).await {
        Ok(_) => Vec::new(),
        Err(e) => vec![e],
    }
}

pub async fn get_me(transport: &dyn Transport) -> ActionOutcome<MeResponse> {
    json_action(transport, HttpRequest::get("/api/user/me"), &[200]).await
}

pub async fn get_isu_list(transport: &dyn Transport) -> ActionOutcome<Vec<IsuListEntry>> {
    json_action(transport, HttpRequest::get("/api/isu"), &[200]).await
}

/// Multipart device registration; the image part is sent only when the
/// device has one
pub async fn post_isu(transport: &dyn Transport, device: &Device) -> ActionOutcome<IsuResponse> {
    let mut parts = vec![
        FormPart::Text {
            name: "jia_isu_uuid".to_string(),
            value: device.uuid.clone(),
        },
        FormPart::Text {
            name: "isu_name".to_string(),
            value: device.name.clone(),
        },
    ];
    if let Some(image) = &device.image {
        parts.push(FormPart::File {
            name: "image".to_string(),
            file_name: "image.jpeg".to_string(),
            mime: "image/jpeg".to_string(),
            bytes: image.clone(),
        });
    }
    json_action(transport, HttpRequest::post("/api/isu").multipart(parts), &[201]).await
}

pub async fn get_isu(transport: &dyn Transport, uuid: &str) -> ActionOutcome<IsuResponse> {
    json_action(transport, HttpRequest::get(format!("/api/isu/{}", uuid)), &[200]).await
}

pub async fn get_isu_icon(transport: &dyn Transport, uuid: &str) -> ActionOutcome<Vec<u8>> {
    let request = HttpRequest::get(format!("/api/isu/{}/icon", uuid));
    let described = request.describe();
    match exchange(transport, request, &[200]).await {
        Ok(response) if response.body.is_empty() => {
            ActionOutcome::failed(BenchError::schema(described, "empty icon"), Some(response))
        }
        Ok(response) => ActionOutcome {
            value: Some(response.body.clone()),
            response: Some(response),
            errors: Vec::new(),
        },
        Err(e) => ActionOutcome::failed(e, None),
    }
}

/// Parameters of `GET /api/condition/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionQuery {
    pub start_time: Option<i64>,
    /// Exclusive
    pub end_time: i64,
    pub min_level: ConditionLevel,
    pub limit: usize,
}

impl ConditionQuery {
    pub fn new(end_time: i64, min_level: ConditionLevel) -> Self {
        Self {
            start_time: None,
            end_time,
            min_level,
            limit: DEFAULT_CONDITION_LIMIT,
        }
    }

    pub fn with_start(mut self, start_time: i64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn to_request(&self, uuid: &str) -> HttpRequest {
        let mut request = HttpRequest::get(format!("/api/condition/{}", uuid));
        if let Some(start) = self.start_time {
            request = request.query("start_time", start);
        }
        request
            .query("end_time", self.end_time)
            .query("condition_level", self.min_level.at_least_query())
            .query("limit", self.limit)
    }
}

pub async fn get_conditions(
    transport: &dyn Transport,
    uuid: &str,
    query: &ConditionQuery,
) -> ActionOutcome<Vec<ConditionResponse>> {
    json_action(transport, query.to_request(uuid), &[200]).await
}

pub async fn get_graph(
    transport: &dyn Transport,
    uuid: &str,
    datetime: i64,
) -> ActionOutcome<Vec<GraphEntry>> {
    let request = HttpRequest::get(format!("/api/isu/{}/graph", uuid)).query("datetime", datetime);
    json_action(transport, request, &[200]).await
}

pub async fn get_trend(transport: &dyn Transport) -> ActionOutcome<Vec<TrendEntry>> {
    json_action(transport, HttpRequest::get("/api/trend"), &[200]).await
}
