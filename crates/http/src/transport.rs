//! Blocking HTTP transport over `ureq`.
//!
//! Every request is sent as `POST` with the logical verb in
//! `X-HTTP-Method-Override`, which lets `GET` queries carry a JSON body.

use std::io::BufReader;
use std::time::Duration;

use base64::Engine;
use icinga2_api::{ApiError, ApiRequest, ApiResponse, Transport};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::stream::EventStream;

pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    authorization: Option<String>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("authorization", &self.authorization.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.base_url()?;

        let mut builder = ureq::Agent::config_builder().http_status_as_error(false);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout_global(Some(Duration::from_secs(secs)));
        }
        if !config.verify_tls {
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }
        let agent = ureq::Agent::new_with_config(builder.build());

        let authorization = config.username.as_ref().map(|user| {
            basic_auth(user, config.password.as_deref().unwrap_or(""))
        });

        Ok(HttpTransport {
            agent,
            base_url,
            authorization,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a request path.
    pub fn url_for(&self, request: &ApiRequest) -> String {
        format!("{}{}", self.base_url, request.path)
    }

    fn call(&self, request: &ApiRequest) -> Result<ureq::http::Response<ureq::Body>, ApiError> {
        let url = self.url_for(request);
        tracing::debug!(method = %request.method, %url, body = %request.body_value(), "API request");

        let mut builder = self
            .agent
            .post(&url)
            .header("Accept", "application/json")
            .header("X-HTTP-Method-Override", request.method.as_str());
        if let Some(ref auth) = self.authorization {
            builder = builder.header("Authorization", auth);
        }
        for (key, value) in &request.params {
            builder = builder.query(key, value);
        }

        builder
            .send_json(request.body_value())
            .map_err(|e| ApiError::Transport(format!("{} {}: {}", request.method, url, e)))
    }

    /// Opens an event stream. The request should target `events` with a
    /// `queue` and `types` body.
    pub fn stream_events(
        &self,
        request: &ApiRequest,
    ) -> Result<EventStream<BufReader<ureq::BodyReader<'static>>>, ApiError> {
        let response = self.call(request)?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let text = response.into_body().read_to_string().unwrap_or_default();
            let failed = ApiResponse::new(status, decode_lenient(&text));
            return Err(ApiError::RequestFailed {
                status,
                message: failed.error_message(),
                outcomes: failed.outcomes(),
            });
        }
        let reader = response.into_body().into_reader();
        Ok(EventStream::new(BufReader::new(reader)))
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.call(request)?;
        let status = response.status().as_u16();

        let text = response
            .into_body()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(|e| ApiError::Transport(format!("error reading response: {}", e)))?;

        let body = if (200..300).contains(&status) {
            decode(&text)?
        } else {
            decode_lenient(&text)
        };
        Ok(ApiResponse::new(status, body))
    }
}

/// `Basic` authorization header value.
pub fn basic_auth(username: &str, password: &str) -> String {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {token}")
}

fn decode(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text)
        .map_err(|e| ApiError::InvalidResponse(format!("body is not JSON: {}", e)))
}

/// Error pages are not always JSON; keep their text as the status message.
fn decode_lenient(text: &str) -> Value {
    decode(text).unwrap_or_else(|_| serde_json::json!({ "status": text.trim() }))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
