//! HTTP/HTTPS Transport for webhook notifications
//!
//! ## Overview
//!
//! Posts the sink's JSON bodies to a webhook (chat incoming-webhook,
//! alerting gateway, home-automation endpoint). HTTP is the least efficient
//! option on a relay device but the one every receiving service understands.
//!
//! ## Implementation Choices
//!
//! We intentionally keep this simple and lightweight:
//! - Blocking `ureq` client, run on tokio's blocking pool so the worker task
//!   never stalls the runtime
//! - One request per message; no batching, no retries (the sink owns both)
//! - Any non-2xx status or network error is a failure
//!
//! ## Security
//!
//! - The endpoint URL is treated as a secret and comes from the key-value
//!   store, never from this configuration
//! - Optional bearer token or API key header for gateways that need one
//!
//! ## Example Usage
//!
//! ```rust
//! use coolguard_connectors::http::{HttpConfig, HttpTransport};
//!
//! let config = HttpConfig::default()
//!     .bearer_token("your-api-token")
//!     .timeout_secs(10)
//!     .header("X-Device", "fridge-kitchen");
//!
//! let transport = HttpTransport::new(config).unwrap();
//! # let _ = transport;
//! ```

use std::collections::HashMap;
use std::time::Duration;

use crate::{Transport, TransportError};

/// HTTP configuration
#[derive(Clone)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Authentication method
    pub auth: AuthMethod,
    /// Custom headers
    pub headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

/// Authentication methods
#[derive(Clone)]
pub enum AuthMethod {
    /// No authentication (the URL carries the secret)
    None,
    /// Bearer token
    Bearer(String),
    /// API key in header
    ApiKey { header: String, value: String },
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            auth: AuthMethod::None,
            headers: HashMap::new(),
            user_agent: format!("CoolGuard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Set bearer token authentication
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::Bearer(token.into());
        self
    }

    /// Set API key authentication
    pub fn api_key(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = AuthMethod::ApiKey {
            header: header.into(),
            value: value.into(),
        };
        self
    }

    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Add custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Webhook transport using lightweight ureq client
#[derive(Clone)]
pub struct HttpTransport {
    config: HttpConfig,
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Create new HTTP transport
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        if config.timeout.is_zero() {
            return Err(TransportError::Config("timeout must be positive".into()));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self { config, agent })
    }

    /// Build request with authentication and headers
    fn build_request(&self, url: &str) -> ureq::Request {
        let mut request = self.agent.post(url);

        match &self.config.auth {
            AuthMethod::None => {}
            AuthMethod::Bearer(token) => {
                request = request.set("Authorization", &format!("Bearer {}", token));
            }
            AuthMethod::ApiKey { header, value } => {
                request = request.set(header, value);
            }
        }

        for (name, value) in &self.config.headers {
            request = request.set(name, value);
        }

        request.set("Content-Type", "application/json")
    }
}

fn check_url(url: &str) -> Result<(), TransportError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(TransportError::Config("URL must start with http:// or https://".into()))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: String) -> Result<(), TransportError> {
        check_url(url)?;
        let request = self.build_request(url);

        let response = tokio::task::spawn_blocking(move || request.send_string(&body))
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        match response {
            Ok(resp) if (200..300).contains(&resp.status()) => Ok(()),
            Ok(resp) => Err(TransportError::Status {
                status: resp.status(),
            }),
            Err(ureq::Error::Status(code, _)) => Err(TransportError::Status { status: code }),
            Err(ureq::Error::Transport(e)) => Err(TransportError::Request(e.to_string())),
        }
    }
}
