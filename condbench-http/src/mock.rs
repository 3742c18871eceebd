//! Canned-response transport for tests
//!
//! Routes are matched on method and path (query string ignored). A route
//! handler sees the full request, so responses can depend on query
//! parameters or headers.

use crate::client::Transport;
use crate::errors::TransportError;
use crate::types::{HttpMethod, HttpRequest, HttpResponse};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

type Handler = Arc<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

struct Route {
    method: HttpMethod,
    path: String,
    handler: Handler,
}

/// In-memory [`Transport`] returning registered responses
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `method path` with `response`
    pub fn add_mock(&self, method: HttpMethod, path: &str, response: HttpResponse) {
        self.add_handler(method, path, move |_| Ok(response.clone()));
    }

    /// Answer `method path` with a computed response
    pub fn add_handler<F>(&self, method: HttpMethod, path: &str, handler: F)
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        debug!("Added HTTP mock for {} {}", method, path);
        let mut routes = self.routes.lock();
        // later registrations replace earlier ones
        routes.retain(|r| !(r.method == method && r.path == path));
        routes.push(Route {
            method,
            path: path.to_string(),
            handler: Arc::new(handler),
        });
    }

    /// Requests seen so far, in send order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request.clone());

        let handler = {
            let routes = self.routes.lock();
            routes
                .iter()
                .find(|r| r.method == request.method && r.path == request.path)
                .map(|r| r.handler.clone())
        };

        match handler {
            Some(handler) => handler(&request),
            None => Err(TransportError::NoMock(request.describe())),
        }
    }

    fn base_url(&self) -> &str {
        "http://mock.invalid/"
    }
}
