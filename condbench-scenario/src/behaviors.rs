//! Virtual user behaviours
//!
//! One task per user: sign in, create devices, then loop over a weighted
//! mix of page loads and API reads until cancelled. Every error found is
//! reported to the run's sink; only a critical error ends the task early.

use crate::actions::{
    auth, expect_error, get_conditions, get_graph, get_isu, get_isu_icon, get_isu_list, get_me,
    get_trend, post_isu, signout, ConditionQuery, NOT_SIGNED_IN,
};
use crate::assets::{load_page, PageType, StaticCache};
use crate::auth_matrix::{run_auth_case, AuthCase};
use crate::context::ScenarioContext;
use crate::verify::{
    verify_conditions, verify_graph, verify_icon, verify_isu, verify_isu_list, verify_me,
};
use chrono::Utc;
use condbench_core::{BenchError, ConditionLevel, Device, GeneratorStreams, UserKind, VirtualUser};
use condbench_http::{HttpRequest, Transport};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

pub const NOT_FOUND_ISU: &str = "not found: isu";

const SECONDS_PER_DAY: i64 = 86_400;
const MANIAC_DEVICES: usize = 3;
const MANIAC_PAGES: usize = 3;

/// How a user task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserExit {
    Cancelled,
    /// Sign-in or setup failed; the error is already in the sink
    Aborted,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserAction {
    Home,
    Detail,
    Conditions,
    Graph,
    Trend,
    AuthCheck,
    SignedOut,
    UnknownDevice,
}

impl UserAction {
    fn weights(kind: UserKind) -> &'static [(UserAction, u32)] {
        match kind {
            UserKind::Normal => &[
                (UserAction::Home, 3),
                (UserAction::Detail, 2),
                (UserAction::Conditions, 3),
                (UserAction::Graph, 2),
                (UserAction::Trend, 1),
                (UserAction::AuthCheck, 1),
                (UserAction::SignedOut, 1),
                (UserAction::UnknownDevice, 1),
            ],
            UserKind::Maniac => &[
                (UserAction::Home, 1),
                (UserAction::Conditions, 6),
                (UserAction::Graph, 2),
                (UserAction::Trend, 1),
                (UserAction::AuthCheck, 1),
            ],
            UserKind::Company => &[
                (UserAction::Home, 3),
                (UserAction::Detail, 1),
                (UserAction::Conditions, 3),
                (UserAction::Graph, 1),
                (UserAction::Trend, 2),
            ],
        }
    }
}

/// Drive one virtual user until `cancel` fires or a critical error occurs
pub async fn run_user(ctx: Arc<ScenarioContext>, kind: UserKind, cancel: CancellationToken) -> UserExit {
    let transport = match ctx.agents.create() {
        Ok(transport) => transport,
        Err(e) => {
            ctx.errors.record(BenchError::Http {
                request: "create agent".to_string(),
                message: e.to_string(),
                timeout: false,
            });
            return UserExit::Aborted;
        }
    };

    let mut session = UserSession::new(ctx, transport, kind);
    let exit = session.run(&cancel).await;
    debug!("User {} finished: {:?}", session.user.user_id, exit);
    exit
}

pub(crate) struct UserSession {
    ctx: Arc<ScenarioContext>,
    transport: Arc<dyn Transport>,
    pub(crate) user: VirtualUser,
    rng: StdRng,
    cache: StaticCache,
    signed_in: bool,
}

impl UserSession {
    pub(crate) fn new(ctx: Arc<ScenarioContext>, transport: Arc<dyn Transport>, kind: UserKind) -> Self {
        let rng = ctx.user_rng();
        Self {
            ctx,
            transport,
            user: VirtualUser::new(kind),
            rng,
            cache: StaticCache::new(),
            signed_in: false,
        }
    }

    async fn run(&mut self, cancel: &CancellationToken) -> UserExit {
        if let Err(exit) = self.sign_in().await {
            return exit;
        }
        self.signed_in = true;
        if let Err(exit) = self.create_devices().await {
            return exit;
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return UserExit::Cancelled,
                _ = tokio::time::sleep(self.ctx.config.action_interval) => {}
            }

            self.user.drain_generated_conditions();
            match self.ensure_signed_in().await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(exit) => return exit,
            }
            let action = self.pick_action();
            let reported = match self.perform(action).await {
                Ok(errors) => self.report(errors),
                Err(exit) => Err(exit),
            };
            if let Err(exit) = reported {
                return exit;
            }
        }
    }

    /// Record errors; a critical one ends the task
    fn report(&self, errors: Vec<BenchError>) -> Result<(), UserExit> {
        let critical = errors.iter().any(BenchError::is_critical);
        self.ctx.errors.extend(errors);
        if critical {
            Err(UserExit::Critical)
        } else {
            Ok(())
        }
    }

    /// Authenticate and check `/api/user/me`
    pub(crate) async fn sign_in(&mut self) -> Result<(), UserExit> {
        let token = match self.ctx.issuer.sign(&self.user.user_id, Utc::now()) {
            Ok(token) => token,
            Err(e) => {
                self.report(vec![BenchError::critical(format!("signing token: {}", e))])?;
                return Err(UserExit::Critical);
            }
        };

        let outcome = auth(&*self.transport, &token).await;
        if !outcome.is_ok() {
            warn!("User {} could not sign in", self.user.user_id);
            self.report(outcome.errors)?;
            return Err(UserExit::Aborted);
        }

        let (me, mut errors) = get_me(&*self.transport).await.into_parts();
        if let Some(me) = me {
            errors.extend(verify_me("GET /api/user/me", &me, &self.user));
        }
        self.report(errors)
    }

    /// Retry a session lost during a signed-out check. `Ok(false)` while
    /// still signed out.
    pub(crate) async fn ensure_signed_in(&mut self) -> Result<bool, UserExit> {
        if self.signed_in {
            return Ok(true);
        }
        match self.sign_in().await {
            Ok(()) => {
                self.signed_in = true;
                Ok(true)
            }
            Err(UserExit::Aborted) => Ok(false),
            Err(exit) => Err(exit),
        }
    }

    async fn create_devices(&mut self) -> Result<(), UserExit> {
        match self.user.kind {
            UserKind::Normal => self.create_device().await.map(|_| ()),
            UserKind::Maniac => {
                for _ in 0..MANIAC_DEVICES {
                    self.create_device().await?;
                }
                Ok(())
            }
            UserKind::Company => {
                let upper = self.ctx.config.max_company_devices.max(2);
                let count = self.rng.gen_range(2..=upper);
                self.create_devices_concurrently(count).await
            }
        }
    }

    /// Register, announce and confirm one device. Returns whether the
    /// target accepted it.
    pub(crate) async fn create_device(&mut self) -> Result<bool, UserExit> {
        let errors = load_page(&*self.transport, &mut self.cache, PageType::Register, "").await;
        self.report(errors)?;

        let (device, streams) = self.new_device();
        let (accepted, errors) = announce(&*self.transport, &self.ctx, device, streams, self.rng.gen()).await;
        self.report(errors)?;
        match accepted {
            Some(device) => {
                self.user.add_device(device);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Post `count` devices at once and adopt the order the target lists
    /// them in
    async fn create_devices_concurrently(&mut self, count: usize) -> Result<(), UserExit> {
        let prepared: Vec<(Device, GeneratorStreams, u64)> = (0..count)
            .map(|_| {
                let (device, streams) = self.new_device();
                (device, streams, self.rng.gen())
            })
            .collect();

        let transport = self.transport.clone();
        let ctx = self.ctx.clone();
        let results = join_all(
            prepared
                .into_iter()
                .map(|(device, streams, seed)| announce(&*transport, &ctx, device, streams, seed)),
        )
        .await;

        let mut accepted = Vec::new();
        for (device, errors) in results {
            self.report(errors)?;
            accepted.extend(device);
        }

        let (list, errors) = get_isu_list(&*self.transport).await.into_parts();
        self.report(errors)?;
        for uuid in list.unwrap_or_default().iter().rev().map(|entry| &entry.jia_isu_uuid) {
            if let Some(pos) = accepted.iter().position(|d| &d.uuid == uuid) {
                self.user.add_device(accepted.swap_remove(pos));
            }
        }
        // accepted but not listed: keep them, the next list check reports it
        for device in accepted {
            self.user.add_device(device);
        }
        Ok(())
    }

    fn new_device(&mut self) -> (Device, GeneratorStreams) {
        Device::new_random(
            &self.user.user_id,
            &mut self.rng,
            self.ctx.config.condition_channel_capacity,
        )
    }

    fn pick_action(&mut self) -> UserAction {
        UserAction::weights(self.user.kind)
            .choose_weighted(&mut self.rng, |(_, weight)| *weight)
            .map(|(action, _)| *action)
            .unwrap_or(UserAction::Home)
    }

    async fn perform(&mut self, action: UserAction) -> Result<Vec<BenchError>, UserExit> {
        let errors = match action {
            UserAction::Home => self.browse_home().await,
            UserAction::Detail => self.browse_detail().await,
            UserAction::Conditions => self.browse_conditions().await,
            UserAction::Graph => self.browse_graph().await,
            UserAction::Trend => self.browse_trend().await,
            UserAction::AuthCheck => {
                let case = AuthCase::from_index(self.ctx.next_auth_case());
                run_auth_case(&*self.transport, &*self.ctx.issuer, &self.user.user_id, case).await
            }
            UserAction::SignedOut => return self.signed_out_round_trip().await,
            UserAction::UnknownDevice => {
                let path = format!("/api/isu/{}", Uuid::new_v4());
                expect_error(&*self.transport, HttpRequest::get(path), &[404], Some(NOT_FOUND_ISU)).await
            }
        };
        Ok(errors)
    }

    fn random_device_with_data(&mut self) -> Option<usize> {
        let candidates: Vec<usize> = self
            .user
            .devices()
            .iter()
            .enumerate()
            .filter(|(_, d)| d.conditions().back().is_some())
            .map(|(i, _)| i)
            .collect();
        candidates.choose(&mut self.rng).copied()
    }

    async fn browse_home(&mut self) -> Vec<BenchError> {
        let mut errors = load_page(&*self.transport, &mut self.cache, PageType::Home, "").await;

        let (list, list_errors) = get_isu_list(&*self.transport).await.into_parts();
        errors.extend(list_errors);
        if let Some(list) = list {
            errors.extend(verify_isu_list("GET /api/isu", &list, &self.user));
        }

        let transport = &*self.transport;
        let icons = self.user.devices().iter().map(|device| async move {
            let request = format!("GET /api/isu/{}/icon", device.uuid);
            let (icon, mut errors) = get_isu_icon(transport, &device.uuid).await.into_parts();
            if let Some(icon) = icon {
                errors.extend(verify_icon(&request, &icon, device));
            }
            errors
        });
        errors.extend(join_all(icons).await.into_iter().flatten());
        errors
    }

    async fn browse_detail(&mut self) -> Vec<BenchError> {
        let Some(device) = self.user.devices().choose(&mut self.rng) else {
            return Vec::new();
        };
        let uuid = device.uuid.clone();
        let mut errors = load_page(&*self.transport, &mut self.cache, PageType::IsuDetail, &uuid).await;

        let (isu, isu_errors) = get_isu(&*self.transport, &uuid).await.into_parts();
        errors.extend(isu_errors);
        if let (Some(isu), Some(device)) = (isu, self.user.device(&uuid)) {
            errors.extend(verify_isu(&format!("GET /api/isu/{}", uuid), &isu, device));
        }
        errors
    }

    /// Condition pages up to the newest drained reading. Maniacs follow
    /// the pagination backwards.
    async fn browse_conditions(&mut self) -> Vec<BenchError> {
        let Some(index) = self.random_device_with_data() else {
            return Vec::new();
        };
        let device = &self.user.devices()[index];
        let uuid = device.uuid.clone();
        let Some(latest) = device.conditions().back().map(|c| c.timestamp) else {
            return Vec::new();
        };

        let level = ConditionLevel::ALL.choose(&mut self.rng).copied().unwrap_or(ConditionLevel::Info);
        let mut query = ConditionQuery::new(latest, level);
        if self.rng.gen_bool(0.3) {
            query = query.with_start(latest - self.rng.gen_range(0..SECONDS_PER_DAY));
        }
        let pages = match self.user.kind {
            UserKind::Maniac => MANIAC_PAGES,
            _ => 1,
        };

        let mut errors = load_page(&*self.transport, &mut self.cache, PageType::IsuCondition, &uuid).await;
        for _ in 0..pages {
            let request = query.to_request(&uuid).describe();
            let (page, page_errors) = get_conditions(&*self.transport, &uuid, &query).await.into_parts();
            errors.extend(page_errors);
            let Some(page) = page else { break };
            let Some(device) = self.user.device(&uuid) else { break };
            let mismatches = verify_conditions(&request, &page, device, &query);
            let stop = !mismatches.is_empty() || page.len() < query.limit;
            errors.extend(mismatches);
            match page.last() {
                Some(last) if !stop => query.end_time = last.timestamp,
                _ => break,
            }
        }
        errors
    }

    async fn browse_graph(&mut self) -> Vec<BenchError> {
        let Some(index) = self.random_device_with_data() else {
            return Vec::new();
        };
        let uuid = self.user.devices()[index].uuid.clone();
        // a day every device of the user has reached
        let latest = self.user.oldest_latest_timestamp(self.ctx.virtual_start_unix());
        let day_start = latest - latest.rem_euclid(SECONDS_PER_DAY);

        let mut errors = load_page(&*self.transport, &mut self.cache, PageType::IsuGraph, &uuid).await;
        let request = format!("GET /api/isu/{}/graph?datetime={}", uuid, day_start);
        let (graph, graph_errors) = get_graph(&*self.transport, &uuid, day_start).await.into_parts();
        errors.extend(graph_errors);
        if let (Some(graph), Some(device)) = (graph, self.user.device(&uuid)) {
            errors.extend(verify_graph(&request, &graph, device, day_start));
        }
        errors
    }

    async fn browse_trend(&mut self) -> Vec<BenchError> {
        let mut errors = load_page(&*self.transport, &mut self.cache, PageType::Trend, "").await;
        let (_, trend_errors) = get_trend(&*self.transport).await.into_parts();
        errors.extend(trend_errors);
        errors
    }

    /// Sign out, check that protected endpoints refuse us, sign back in.
    /// A failed sign-in is retried before the next action.
    pub(crate) async fn signed_out_round_trip(&mut self) -> Result<Vec<BenchError>, UserExit> {
        let mut errors = signout(&*self.transport).await;
        for path in ["/api/user/me", "/api/isu"] {
            errors.extend(
                expect_error(&*self.transport, HttpRequest::get(path), &[401], Some(NOT_SIGNED_IN)).await,
            );
        }
        self.report(errors)?;
        self.signed_in = false;
        self.ensure_signed_in().await?;
        Ok(Vec::new())
    }
}

/// Register the device with the association service, post it to the target
/// and confirm or roll back its generator
async fn announce(
    transport: &dyn Transport,
    ctx: &ScenarioContext,
    mut device: Device,
    streams: GeneratorStreams,
    seed: u64,
) -> (Option<Device>, Vec<BenchError>) {
    ctx.jia.register(&device, streams, seed);

    let (isu, mut errors) = post_isu(transport, &device).await.into_parts();
    match isu {
        Some(isu) => {
            errors.extend(verify_isu("POST /api/isu", &isu, &device));
            device.server_id = Some(isu.id);
            if !device.confirm() {
                debug!("Generator for {} gone before confirmation", device.uuid);
            }
            ctx.counters.record_device_created();
            (Some(device), errors)
        }
        None => {
            debug!("Rolling back device {}", device.uuid);
            device.rollback();
            ctx.counters.record_device_rolled_back();
            (None, errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::{JiaService, PosterSettings};
    use crate::credentials::JwtIssuer;
    use crate::context::{generator_settings, AgentFactory};
    use condbench_config::ScenarioConfig;
    use condbench_core::{ErrorKind, ErrorSink, ScenarioCounters, VirtualClock};
    use condbench_http::{FormPart, HttpConfig, HttpMethod, HttpResponse, MockTransport, RequestBody};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_util::task::TaskTracker;

    fn context(mock: &MockTransport, tracker: &TaskTracker, cancel: &CancellationToken) -> Arc<ScenarioContext> {
        let config = ScenarioConfig {
            post_interval: Duration::from_millis(5),
            action_interval: Duration::from_millis(5),
            seed: Some(7),
            ..ScenarioConfig::default()
        };
        let clock = VirtualClock::starting_now(config.virtual_time_start, config.virtual_time_multiplier);
        let jia = JiaService::new(
            clock,
            generator_settings(&config),
            PosterSettings {
                user_agent: "JIA-Members-Client/1.2".to_string(),
                http: HttpConfig::default(),
            },
            cancel.clone(),
            tracker.clone(),
        );
        let agents: Arc<dyn AgentFactory> = Arc::new(mock.clone());
        Arc::new(ScenarioContext::new(
            config,
            clock,
            ScenarioCounters::new(),
            ErrorSink::new(),
            Arc::new(JwtIssuer::new().unwrap()),
            jia,
            agents,
        ))
    }

    fn posted_uuid(request: &condbench_http::HttpRequest) -> Option<String> {
        match &request.body {
            RequestBody::Multipart(parts) => parts.iter().find_map(|part| match part {
                FormPart::Text { name, value } if name == "jia_isu_uuid" => Some(value.clone()),
                _ => None,
            }),
            _ => None,
        }
    }

    fn serve_pages(mock: &MockTransport) {
        for path in ["/register", "/"] {
            mock.add_mock(HttpMethod::Get, path, HttpResponse::new(200).with_body("<html></html>"));
        }
        for asset in crate::assets::ASSETS {
            mock.add_mock(HttpMethod::Get, asset, HttpResponse::new(200).with_body(asset));
        }
    }

    #[tokio::test]
    async fn test_failed_auth_aborts_only_this_user() {
        let mock = MockTransport::new();
        mock.add_mock(HttpMethod::Post, "/api/auth", HttpResponse::new(500));
        let (tracker, cancel) = (TaskTracker::new(), CancellationToken::new());
        let ctx = context(&mock, &tracker, &cancel);

        let exit = run_user(ctx.clone(), UserKind::Normal, cancel.clone()).await;
        assert_eq!(exit, UserExit::Aborted);
        assert_eq!(ctx.errors.count(ErrorKind::StatusMismatch), 1);
        assert!(!ctx.errors.has_critical());
    }

    #[tokio::test]
    async fn test_sign_in_checks_me() {
        let mock = MockTransport::new();
        mock.add_mock(HttpMethod::Post, "/api/auth", HttpResponse::new(200).with_cookie("isucondition"));
        mock.add_mock(
            HttpMethod::Get,
            "/api/user/me",
            HttpResponse::new(200).with_json(&json!({ "jia_user_id": "someone-else" })),
        );
        let (tracker, cancel) = (TaskTracker::new(), CancellationToken::new());
        let ctx = context(&mock, &tracker, &cancel);

        let mut session = UserSession::new(ctx.clone(), Arc::new(mock.clone()), UserKind::Normal);
        assert!(session.sign_in().await.is_ok());
        assert_eq!(ctx.errors.count(ErrorKind::DataMismatch), 1);
    }

    #[tokio::test]
    async fn test_rejected_device_rolled_back() {
        let mock = MockTransport::new();
        serve_pages(&mock);
        let (tracker, cancel) = (TaskTracker::new(), CancellationToken::new());
        let ctx = context(&mock, &tracker, &cancel);

        let jia = ctx.jia.clone();
        mock.add_handler(HttpMethod::Post, "/api/isu", move |req| {
            if let Some(uuid) = posted_uuid(req) {
                let _ = jia.activate(&uuid, None);
            }
            Ok(HttpResponse::new(500))
        });

        let mut session = UserSession::new(ctx.clone(), Arc::new(mock.clone()), UserKind::Normal);
        assert_eq!(session.create_device().await, Ok(false));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(session.user.drain_generated_conditions(), 0);
        assert!(session.user.devices().is_empty());
        assert!(session.user.conditions().is_empty());
        assert_eq!(ctx.counters.snapshot().devices_rolled_back, 1);
        assert_eq!(ctx.errors.count(ErrorKind::StatusMismatch), 1);

        cancel.cancel();
        tracker.close();
        tracker.wait().await;
    }

    #[tokio::test]
    async fn test_accepted_device_produces_ground_truth() {
        let mock = MockTransport::new();
        serve_pages(&mock);
        let (tracker, cancel) = (TaskTracker::new(), CancellationToken::new());
        let ctx = context(&mock, &tracker, &cancel);

        let jia = ctx.jia.clone();
        mock.add_handler(HttpMethod::Post, "/api/isu", move |req| {
            let uuid = posted_uuid(req).unwrap_or_default();
            let character = jia.activate(&uuid, None).map(|c| c.to_string()).unwrap_or_default();
            Ok(HttpResponse::new(201).with_json(&json!({
                "id": 1,
                "jia_isu_uuid": uuid,
                "name": "",
                "character": character,
            })))
        });

        let mut session = UserSession::new(ctx.clone(), Arc::new(mock.clone()), UserKind::Normal);
        assert_eq!(session.create_device().await, Ok(true));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(session.user.drain_generated_conditions() > 0);
        assert_eq!(session.user.devices().len(), 1);
        assert_eq!(session.user.devices()[0].server_id, Some(1));
        // the name echoed back is wrong
        assert_eq!(ctx.errors.count(ErrorKind::DataMismatch), 1);

        cancel.cancel();
        tracker.close();
        tracker.wait().await;
    }

    #[tokio::test]
    async fn test_failed_sign_in_after_signout_is_retried() {
        let mock = MockTransport::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        mock.add_handler(HttpMethod::Post, "/api/auth", move |_| {
            match seen.fetch_add(1, Ordering::SeqCst) {
                1 => Ok(HttpResponse::new(503)),
                _ => Ok(HttpResponse::new(200).with_cookie("isucondition")),
            }
        });
        mock.add_mock(HttpMethod::Post, "/api/signout", HttpResponse::new(200));
        mock.add_mock(HttpMethod::Get, "/api/isu", HttpResponse::new(401).with_body(NOT_SIGNED_IN));
        let (tracker, cancel) = (TaskTracker::new(), CancellationToken::new());
        let ctx = context(&mock, &tracker, &cancel);
        let mut session = UserSession::new(ctx.clone(), Arc::new(mock.clone()), UserKind::Normal);
        mock.add_mock(
            HttpMethod::Get,
            "/api/user/me",
            HttpResponse::new(200).with_json(&json!({ "jia_user_id": session.user.user_id })),
        );

        assert_eq!(session.ensure_signed_in().await, Ok(true));
        assert_eq!(session.signed_out_round_trip().await, Ok(Vec::new()));
        assert!(!session.signed_in);
        assert_eq!(ctx.errors.count(ErrorKind::StatusMismatch), 2);

        // the next iteration signs in again instead of ending the user
        assert_eq!(session.ensure_signed_in().await, Ok(true));
        assert!(session.signed_in);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(!ctx.errors.has_critical());
    }

    #[tokio::test]
    async fn test_graph_day_is_one_every_device_reached() {
        let mock = MockTransport::new();
        let (tracker, cancel) = (TaskTracker::new(), CancellationToken::new());
        let ctx = context(&mock, &tracker, &cancel);
        let mut session = UserSession::new(ctx.clone(), Arc::new(mock.clone()), UserKind::Maniac);

        let day = SECONDS_PER_DAY;
        let mut streams = Vec::new();
        for (uuid, latest) in [("ahead", 5 * day + 100), ("behind", 2 * day + 7200)] {
            let (device, s) = Device::new(
                uuid.to_string(),
                uuid.to_string(),
                "catalog-001".to_string(),
                condbench_core::Character::Calm,
                session.user.user_id.clone(),
                8,
            );
            s.conditions_tx
                .send(condbench_core::Condition {
                    device_uuid: uuid.to_string(),
                    timestamp: latest,
                    is_sitting: false,
                    flags: Default::default(),
                    message: String::new(),
                })
                .await
                .unwrap();
            mock.add_mock(
                HttpMethod::Get,
                &format!("/api/isu/{}/graph", uuid),
                HttpResponse::new(200).with_json(&json!([])),
            );
            session.user.add_device(device);
            streams.push(s);
        }
        assert_eq!(session.user.drain_generated_conditions(), 2);

        for _ in 0..4 {
            session.browse_graph().await;
        }
        let days: Vec<String> = mock
            .requests()
            .into_iter()
            .filter(|r| r.path.starts_with("/api/isu/"))
            .filter_map(|r| r.query_value("datetime").map(str::to_string))
            .collect();
        assert_eq!(days.len(), 4);
        assert!(days.iter().all(|d| *d == (2 * day).to_string()), "{:?}", days);
    }

    #[test]
    fn test_every_kind_has_actions() {
        for kind in [UserKind::Normal, UserKind::Maniac, UserKind::Company] {
            assert!(UserAction::weights(kind).iter().all(|(_, w)| *w > 0));
        }
    }
}
