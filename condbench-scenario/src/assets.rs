//! Browser page loads and static asset integrity
//!
//! A page load fetches the SPA entry point and then every asset it
//! references concurrently. Content hashes are remembered per user; the
//! first hash seen for a path is authoritative.

use crate::actions::exchange;
use condbench_core::BenchError;
use condbench_http::{HttpRequest, Transport};
use futures::future::join_all;
use std::collections::HashMap;

pub const INDEX_HTML: &str = "/index.html";

pub const ASSETS: [&str; 4] = [
    "/assets/favicon.svg",
    "/assets/index.css",
    "/assets/vendor.js",
    "/assets/index.js",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    Trend,
    Home,
    IsuDetail,
    IsuCondition,
    IsuGraph,
    Register,
}

impl PageType {
    /// Browser path of the page; `uuid` is ignored by pages not tied to a
    /// device
    pub fn path(&self, uuid: &str) -> String {
        match self {
            PageType::Trend | PageType::Home => "/".to_string(),
            PageType::IsuDetail => format!("/isu/{}", uuid),
            PageType::IsuCondition => format!("/isu/{}/condition", uuid),
            PageType::IsuGraph => format!("/isu/{}/graph", uuid),
            PageType::Register => "/register".to_string(),
        }
    }

    pub fn assets(&self) -> &'static [&'static str] {
        &ASSETS
    }
}

/// Per-user first-seen content hashes
#[derive(Debug, Default, Clone)]
pub struct StaticCache {
    hashes: HashMap<String, md5::Digest>,
}

impl StaticCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<md5::Digest> {
        self.hashes.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Remember `body`'s hash on first sight; later bodies must match it
    pub fn check(&mut self, request: &str, path: &str, body: &[u8]) -> Option<BenchError> {
        let digest = md5::compute(body);
        match self.hashes.get(path) {
            None => {
                self.hashes.insert(path.to_string(), digest);
                None
            }
            Some(known) if *known == digest => None,
            Some(known) => Some(BenchError::data_mismatch(
                request,
                0,
                "md5",
                format!("{:x}", known),
                format!("{:x}", digest),
            )),
        }
    }
}

/// Load a page: entry point first, then its assets concurrently
pub async fn load_page(
    transport: &dyn Transport,
    cache: &mut StaticCache,
    page: PageType,
    uuid: &str,
) -> Vec<BenchError> {
    let request = HttpRequest::get(page.path(uuid));
    let described = request.describe();
    let index = match exchange(transport, request, &[200]).await {
        Ok(response) => response,
        Err(e) => return vec![e],
    };
    if let Some(err) = cache.check(&described, INDEX_HTML, &index.body) {
        return vec![err];
    }

    let fetches = page.assets().iter().map(|path| async move {
        let request = HttpRequest::get(*path);
        let described = request.describe();
        (path, described, exchange(transport, request, &[200]).await)
    });

    let mut errors = Vec::new();
    for (path, described, result) in join_all(fetches).await {
        match result {
            Ok(response) => {
                if let Some(err) = cache.check(&described, path, &response.body) {
                    errors.push(err);
                }
            }
            Err(e) => errors.push(e),
        }
    }
    errors
}
