//! Test doubles shared by the integration suites.

// Each suite uses a subset of these doubles.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use synergia::error::TransportError;
use synergia::gateway::Gateway;
use synergia::transport::{Exchange, HttpTransport, Method, RequestSpec};

/// HashMap-backed gateway double; unknown paths report absent resources,
/// which is exactly how a school with a disabled endpoint behaves.
#[derive(Default)]
pub struct MockGateway {
    json: HashMap<String, Value>,
    pages: HashMap<String, String>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, path: &str, value: Value) -> Self {
        self.json.insert(path.to_string(), value);
        self
    }

    pub fn with_page(mut self, path: &str, html: &str) -> Self {
        self.pages.insert(path.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn fetch_json(&self, path: &str) -> Option<Value> {
        self.json.get(path).cloned()
    }

    async fn fetch_page(&self, path: &str) -> Option<String> {
        self.pages.get(path).cloned()
    }
}

/// What the transport double observed about one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub host: String,
    pub path: String,
    pub referer: Option<String>,
    pub cookie_header: String,
    pub form_body: Option<String>,
}

/// Transport double that replays a scripted sequence of exchanges and
/// records every request it served.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Exchange>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Exchange>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, spec: RequestSpec<'_>) -> Result<Exchange, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: spec.method,
            host: spec.host.to_string(),
            path: spec.path.to_string(),
            referer: spec.referer.map(str::to_string),
            cookie_header: spec.cookies.header_value(),
            form_body: spec.form_body.clone(),
        });

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::InvalidRequest("script exhausted".to_string()))
    }
}

/// Exchange builder for scripted flows.
pub fn exchange(status: u16, body: &str) -> Exchange {
    Exchange {
        status,
        body: body.to_string(),
        ..Exchange::default()
    }
}

pub fn with_cookies(mut exchange: Exchange, cookies: &[(&str, &str)]) -> Exchange {
    exchange.new_cookies = cookies
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    exchange
}

pub fn with_location(mut exchange: Exchange, location: &str) -> Exchange {
    exchange.location = Some(location.to_string());
    exchange
}
