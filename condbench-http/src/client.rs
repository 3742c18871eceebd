//! HTTP agent implementation

use crate::config::HttpConfig;
use crate::errors::TransportError;
use crate::types::{FormPart, HttpRequest, HttpResponse, RequestBody};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    multipart, Client,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, trace};
use url::Url;

/// Sends one request and returns the fully read response.
///
/// Implementations must be safe to call concurrently from many tasks.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Base URL relative paths are resolved against
    fn base_url(&self) -> &str;
}

/// A virtual user's browser: one reqwest client with its own cookie jar
#[derive(Debug, Clone)]
pub struct HttpAgent {
    client: Client,
    base_url: Url,
    config: HttpConfig,
}

impl HttpAgent {
    /// Create a new agent with a fresh cookie jar
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        debug!(
            "Creating HttpAgent for {} with timeout: {}ms",
            base_url,
            config.timeout.as_millis()
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .cookie_store(true)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Resolve a relative path against the base URL
    pub fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", path, e)));
        }
        self.base_url
            .join(path)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", path, e)))
    }

    fn build_headers(request: &HttpRequest) -> Result<HeaderMap, TransportError> {
        let mut header_map = HeaderMap::new();
        for (key, value) in &request.headers {
            let name = HeaderName::from_str(key)
                .map_err(|_| TransportError::InvalidHeader(key.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::InvalidHeader(format!("{}: {}", key, value)))?;
            header_map.insert(name, value);
        }
        Ok(header_map)
    }

    fn build_form(parts: &[FormPart]) -> Result<multipart::Form, TransportError> {
        let mut form = multipart::Form::new();
        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let file = multipart::Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(mime)?;
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait::async_trait]
impl Transport for HttpAgent {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.resolve(&request.path)?;
        let started = Instant::now();

        let mut builder = self
            .client
            .request(reqwest::Method::from(request.method), url.clone())
            .headers(Self::build_headers(&request)?);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.describe())
            } else {
                TransportError::NetworkError(e)
            }
        })?;

        let status = response.status().as_u16();
        let cookies: Vec<String> = response.cookies().map(|c| c.name().to_string()).collect();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.describe())
            } else {
                TransportError::NetworkError(e)
            }
        })?;

        trace!(
            "{} -> {} ({} bytes, {}ms)",
            request.describe(),
            status,
            body.len(),
            started.elapsed().as_millis()
        );

        Ok(HttpResponse {
            status,
            headers,
            cookies,
            body: body.to_vec(),
        })
    }

    fn base_url(&self) -> &str {
        self.base_url.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let agent = HttpAgent::new(HttpConfig::default().with_base_url("http://127.0.0.1:3000")).unwrap();

        assert_eq!(
            agent.resolve("/api/isu").unwrap().as_str(),
            "http://127.0.0.1:3000/api/isu"
        );
        assert_eq!(
            agent.resolve("http://10.0.0.1:5000/api/activate").unwrap().as_str(),
            "http://10.0.0.1:5000/api/activate"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpAgent::new(HttpConfig::default().with_base_url("not a url"));
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let request = HttpRequest::get("/").header("bad header", "x");
        assert!(matches!(
            HttpAgent::build_headers(&request),
            Err(TransportError::InvalidHeader(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Port 9 (discard) is closed on test machines
        let agent = HttpAgent::new(
            HttpConfig::default()
                .with_base_url("http://127.0.0.1:9")
                .with_timeout(std::time::Duration::from_secs(2)),
        )
        .unwrap();

        let result = agent.send(HttpRequest::get("/")).await;
        assert!(result.is_err());
    }
}
