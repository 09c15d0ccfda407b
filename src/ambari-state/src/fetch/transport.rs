// ambari-state/src/fetch/transport.rs

use crate::config::ServerConfig;
use crate::constants::{REQUESTED_BY_HEADER, REQUESTED_BY_VALUE};
use crate::error::FetchError;
use async_trait::async_trait;
use log::{debug, trace};
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Issues GET requests for paths below the API root and decodes the body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError>;
}

/// [`Transport`] against a live Ambari server.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    credentials: Option<(String, Option<String>)>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Unavailable {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    pub fn from_config(server: &ServerConfig) -> Result<Self, FetchError> {
        let mut transport = Self::new(server.url(), server.timeout())?;
        if let Some((user, password)) = server.credentials() {
            transport = transport.with_basic_auth(user, password);
        }
        Ok(transport)
    }

    pub fn with_basic_auth(mut self, user: &str, password: Option<&str>) -> Self {
        self.credentials = Some((user.to_string(), password.map(str::to_string)));
        self
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = self.url_for(path);
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(REQUESTED_BY_HEADER, REQUESTED_BY_VALUE);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_ref());
        }

        let response = request.send().await.map_err(|e| FetchError::Unavailable {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Unavailable {
            url: url.clone(),
            message: e.to_string(),
        })?;
        trace!("{} answered with {} bytes", url, body.len());

        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

/// Canned responses keyed by path (query string ignored).
///
/// Responses for a path are served in the order they were queued; the last
/// one is repeated once the queue is down to it. Every requested path,
/// including its query, is recorded.
#[derive(Default)]
pub struct MemoryTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, FetchError>>>>,
    requests: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait this long before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(&self, path: &str, body: Value) {
        self.push(path, Ok(body));
    }

    pub fn fail(&self, path: &str, error: FetchError) {
        self.push(path, Err(error));
    }

    pub fn push(&self, path: &str, response: Result<Value, FetchError>) {
        self.responses
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn next_response(&self, path: &str) -> Option<Result<Value, FetchError>> {
        let mut responses = self.responses.lock();
        let queue = responses.get_mut(path)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        self.requests.lock().push(path.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let key = path.split('?').next().unwrap_or(path);
        self.next_response(key).unwrap_or_else(|| {
            Err(FetchError::Status {
                url: path.to_string(),
                status: 404,
            })
        })
    }
}
