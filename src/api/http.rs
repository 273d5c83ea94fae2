use super::transport::{Connector, Method, Transport};
use crate::error::{PlaneError, Result};
use serde_json::Value;
use std::sync::{Arc, Once, OnceLock};
use std::time::Duration;
use url::Url;

/// Per-request timeout so a hung connection cannot stall the retry loop.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static CRYPTO_PROVIDER: Once = Once::new();

fn ensure_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Transport backed by a blocking reqwest client.
///
/// The underlying client is created on first use, which always happens on a
/// blocking worker thread.
pub struct HttpTransport {
    base_url: String,
    api_key: String,
    timeout: Duration,
    http: OnceLock<reqwest::blocking::Client>,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
            http: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.http.get() {
            return Ok(client);
        }
        ensure_crypto_provider();
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("planecli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlaneError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(self.http.get_or_init(|| client))
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let raw = format!("{}/api/v1/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw)
            .map_err(|e| PlaneError::Config(format!("invalid request URL {}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }
}

impl Transport for HttpTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(path, query)?;
        let http_method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        tracing::debug!(method = ?method, url = %url, "API request");

        let mut request = self
            .client()?
            .request(http_method, url)
            .header("X-API-Key", &self.api_key)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .map_err(|e| PlaneError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| PlaneError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(PlaneError::Http {
                status: status.as_u16(),
                message: error_message(&text, status.canonical_reason()),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Pull the human-readable message out of an error body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["detail", "error", "message"] {
            if let Some(msg) = map.get(field).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.len() > 200 {
        reason.unwrap_or("request failed").to_string()
    } else {
        trimmed.to_string()
    }
}

/// Creates a fresh [`HttpTransport`] for every batch.
pub struct HttpConnector {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

impl Connector for HttpConnector {
    fn connect(&self) -> Arc<dyn Transport> {
        Arc::new(HttpTransport::new(&self.base_url, &self.api_key, self.timeout))
    }
}
