//! Device association service
//!
//! Devices are registered here before they are announced to the target.
//! When the target activates a device (`POST /api/activate`), its generator
//! starts and every reading is posted back to the target.

use crate::actions::exchange;
use crate::error::{ScenarioError, ScenarioResult};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use condbench_core::{
    Character, Condition, ConditionGenerator, ConditionPoster, Device, GeneratorSettings,
    GeneratorStreams, VirtualClock,
};
use condbench_http::{HttpAgent, HttpConfig, HttpRequest};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

struct Registration {
    catalog_id: String,
    character: Character,
    seed: u64,
    /// Taken on first activation
    streams: Option<GeneratorStreams>,
}

/// Settings for posting readings to the target
#[derive(Debug, Clone)]
pub struct PosterSettings {
    pub user_agent: String,
    pub http: HttpConfig,
}

pub struct JiaService {
    registry: Mutex<HashMap<String, Registration>>,
    clock: VirtualClock,
    generator: GeneratorSettings,
    poster: PosterSettings,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl JiaService {
    /// Generator tasks are spawned on `tracker` and stop with `cancel`
    pub fn new(
        clock: VirtualClock,
        generator: GeneratorSettings,
        poster: PosterSettings,
        cancel: CancellationToken,
        tracker: TaskTracker,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(HashMap::new()),
            clock,
            generator,
            poster,
            cancel,
            tracker,
        })
    }

    pub fn register(&self, device: &Device, streams: GeneratorStreams, seed: u64) {
        debug!("Registering device {} ({})", device.uuid, device.character);
        self.registry.lock().insert(
            device.uuid.clone(),
            Registration {
                catalog_id: device.catalog_id.clone(),
                character: device.character,
                seed,
                streams: Some(streams),
            },
        );
    }

    pub fn is_registered(&self, uuid: &str) -> bool {
        self.registry.lock().contains_key(uuid)
    }

    pub fn catalog_id(&self, uuid: &str) -> Option<String> {
        self.registry.lock().get(uuid).map(|r| r.catalog_id.clone())
    }

    /// Start the device's generator. With `target_base_url` every reading is
    /// posted there first; without it readings are kept locally only.
    /// Activating twice returns the character without a second generator.
    pub fn activate(&self, uuid: &str, target_base_url: Option<&str>) -> ScenarioResult<Character> {
        let (character, seed, streams) = {
            let mut registry = self.registry.lock();
            let registration = registry
                .get_mut(uuid)
                .ok_or_else(|| ScenarioError::Association(format!("unknown device {}", uuid)))?;
            (registration.character, registration.seed, registration.streams.take())
        };

        let Some(streams) = streams else {
            debug!("Device {} already active", uuid);
            return Ok(character);
        };

        let poster: Option<Arc<dyn ConditionPoster>> = match target_base_url {
            Some(base_url) => Some(Arc::new(TargetPoster::new(base_url, &self.poster)?)),
            None => None,
        };

        let generator = ConditionGenerator::new(uuid, character, seed);
        self.tracker.spawn(generator.run(
            streams,
            self.clock,
            self.generator,
            self.cancel.child_token(),
            poster,
        ));
        debug!("Activated device {}", uuid);
        Ok(character)
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/api/activate", post(activate_handler))
            .with_state(self)
    }

    /// Serve the router until cancelled; returns the bound address
    pub async fn serve(
        self: Arc<Self>,
        bind_address: &str,
    ) -> ScenarioResult<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .map_err(|source| ScenarioError::Bind {
                address: bind_address.to_string(),
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| ScenarioError::Bind {
            address: bind_address.to_string(),
            source,
        })?;
        info!("Association service listening on {}", addr);

        let cancel = self.cancel.clone();
        let app = self.router();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
            {
                warn!("Association service stopped: {}", e);
            }
        });
        Ok((addr, handle))
    }
}

#[derive(Debug, Deserialize)]
struct ActivateRequest {
    target_base_url: String,
    isu_uuid: String,
}

#[derive(Debug, Serialize)]
struct ActivateResponse {
    character: String,
}

async fn activate_handler(
    State(jia): State<Arc<JiaService>>,
    Json(request): Json<ActivateRequest>,
) -> Response {
    match jia.activate(&request.isu_uuid, Some(&request.target_base_url)) {
        Ok(character) => (
            StatusCode::ACCEPTED,
            Json(ActivateResponse {
                character: character.to_string(),
            }),
        )
            .into_response(),
        Err(ScenarioError::Association(message)) => (StatusCode::NOT_FOUND, message).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Posts readings to the target's `POST /api/condition/{uuid}`
pub struct TargetPoster {
    agent: HttpAgent,
}

impl TargetPoster {
    pub fn new(base_url: &str, settings: &PosterSettings) -> ScenarioResult<Self> {
        let mut config = settings.http.clone().with_base_url(base_url);
        config.user_agent = settings.user_agent.clone();
        Ok(Self {
            agent: HttpAgent::new(config)?,
        })
    }
}

#[async_trait::async_trait]
impl ConditionPoster for TargetPoster {
    async fn post(&self, device_uuid: &str, conditions: &[Condition]) -> Result<(), String> {
        let body: Vec<serde_json::Value> = conditions
            .iter()
            .map(|c| {
                json!({
                    "is_sitting": c.is_sitting,
                    "condition": c.condition_string(),
                    "message": c.message,
                    "timestamp": c.timestamp,
                })
            })
            .collect();
        let request =
            HttpRequest::post(format!("/api/condition/{}", device_uuid)).json(serde_json::Value::Array(body));
        exchange(&self.agent, request, &[202])
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use condbench_core::ConditionStore;
    use std::time::Duration;

    fn service(cancel: CancellationToken, tracker: TaskTracker) -> Arc<JiaService> {
        JiaService::new(
            VirtualClock::starting_now(Utc.with_ymd_and_hms(2020, 7, 1, 0, 0, 0).unwrap(), 3000),
            GeneratorSettings {
                interval: Duration::from_millis(10),
                pending_capacity: 16,
            },
            PosterSettings {
                user_agent: "JIA-Members-Client/1.2".to_string(),
                http: HttpConfig::default(),
            },
            cancel,
            tracker,
        )
    }

    fn device() -> (Device, GeneratorStreams) {
        Device::new(
            "dev-1".to_string(),
            "isu".to_string(),
            "catalog-007".to_string(),
            Character::Lonely,
            "u".to_string(),
            64,
        )
    }

    #[tokio::test]
    async fn test_unknown_device_rejected() {
        let jia = service(CancellationToken::new(), TaskTracker::new());
        assert!(matches!(
            jia.activate("nope", None),
            Err(ScenarioError::Association(_))
        ));
    }

    #[tokio::test]
    async fn test_activate_starts_generator_once() {
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let jia = service(cancel.clone(), tracker.clone());

        let (mut device, streams) = device();
        jia.register(&device, streams, 11);
        assert!(jia.is_registered("dev-1"));
        assert_eq!(jia.catalog_id("dev-1").as_deref(), Some("catalog-007"));

        assert_eq!(jia.activate("dev-1", None).unwrap(), Character::Lonely);
        assert_eq!(jia.activate("dev-1", None).unwrap(), Character::Lonely);
        assert_eq!(tracker.len(), 1);

        device.confirm();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(device.drain_into(&mut ConditionStore::new()) > 0);

        cancel.cancel();
        tracker.close();
        tracker.wait().await;
    }

    #[tokio::test]
    async fn test_activate_endpoint() {
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let jia = service(cancel.clone(), tracker.clone());
        let (device, streams) = device();
        jia.register(&device, streams, 1);

        let (addr, handle) = jia.clone().serve("127.0.0.1:0").await.unwrap();
        let agent = HttpAgent::new(HttpConfig::default().with_base_url(&format!("http://{}", addr))).unwrap();

        let unknown = post_json(
            &agent,
            "/api/activate",
            json!({ "target_base_url": "http://127.0.0.1:9", "isu_uuid": "x" }),
        )
        .await;
        assert_eq!(unknown.status, 404);

        let ok = post_json(
            &agent,
            "/api/activate",
            json!({ "target_base_url": "http://127.0.0.1:9", "isu_uuid": "dev-1" }),
        )
        .await;
        assert_eq!(ok.status, 202);
        let body: serde_json::Value = ok.json().unwrap();
        assert_eq!(body["character"], "lonely");

        cancel.cancel();
        handle.await.unwrap();
        tracker.close();
        tracker.wait().await;
    }

    async fn post_json(agent: &HttpAgent, path: &str, body: serde_json::Value) -> condbench_http::HttpResponse {
        use condbench_http::Transport;
        agent.send(HttpRequest::post(path).json(body)).await.unwrap()
    }
}
