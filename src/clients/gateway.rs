//! Authenticated JSON calls against the search backend.
//!
//! Every call goes through [`RequestGateway`], which attaches the host token,
//! retries transport failures a bounded number of times and decodes error
//! bodies. Non-success responses are terminal and never retried.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::error::RequestError;
use crate::auth::AuthResolver;
use crate::config::ApiConfig;

pub const DEFAULT_RETRIES: u32 = 1;
pub const DEFAULT_AUTH_HEADER: &str = "X-Telegram-Init-Data";

#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl OutgoingRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One network round trip. Implementations report "no response" as
/// [`RequestError::Transport`]; any received response, whatever its status,
/// is returned as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: OutgoingRequest) -> Result<RawResponse, RequestError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: OutgoingRequest) -> Result<RawResponse, RequestError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse { status, body })
    }
}

#[derive(Clone)]
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    auth: AuthResolver,
    base_url: String,
    auth_header: String,
    retries: u32,
}

impl RequestGateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        auth: AuthResolver,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            auth,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            retries: DEFAULT_RETRIES,
        }
    }

    /// Gateway over the reqwest transport, configured from `[api]`.
    pub fn from_config(config: &ApiConfig, auth: AuthResolver) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(
            Duration::from_secs(config.request_timeout_seconds),
            &config.user_agent,
        )?;
        Ok(Self::new(Arc::new(transport), auth, config.base_url.as_str())
            .with_retries(config.retries)
            .with_auth_header(config.auth_header.as_str()))
    }

    /// Number of extra attempts after a transport failure.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn with_auth_header(mut self, name: impl Into<String>) -> Self {
        self.auth_header = name.into();
        self
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthResolver {
        &self.auth
    }

    /// Absolute URL for an endpoint path such as `/search`.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, RequestError> {
        let path = endpoint.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{path}", self.base_url))?)
    }

    pub async fn send(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Value, RequestError> {
        let url = self.endpoint_url(endpoint)?;
        let response = self.execute(method, url, body.cloned()).await?;

        if response.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body).map_err(|e| RequestError::Decode(e.to_string()))
    }

    /// Typed variant of [`RequestGateway::send`].
    pub async fn send_json<B, R>(
        &self,
        endpoint: &str,
        method: Method,
        body: &B,
    ) -> Result<R, RequestError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|e| RequestError::Encode(e.to_string()))?;
        let value = self.send(endpoint, method, Some(&body)).await?;
        serde_json::from_value(value).map_err(|e| RequestError::Decode(e.to_string()))
    }

    /// Raw `GET` under the same auth and retry policy.
    pub async fn fetch_bytes(&self, url: Url) -> Result<Vec<u8>, RequestError> {
        Ok(self.execute(Method::GET, url, None).await?.body)
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<RawResponse, RequestError> {
        let token = self.auth.resolve();
        let mut headers = Vec::new();
        if !token.is_empty() {
            headers.push((self.auth_header.clone(), token.as_str().to_string()));
        }
        let request = OutgoingRequest {
            method,
            url,
            headers,
            body,
        };

        let attempts = self.retries.saturating_add(1);
        let mut last_error = RequestError::Transport("no attempt was made".to_string());

        for attempt in 1..=attempts {
            debug!(
                method = %request.method,
                url = %request.url,
                attempt,
                anonymous = token.is_empty(),
                "Sending request"
            );

            match self.transport.execute(request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    let err = RequestError::from_response(response.status, &response.body);
                    warn!(url = %request.url, error = %err, "Request rejected by server");
                    return Err(err);
                }
                Err(err) if err.is_transport() => {
                    warn!(url = %request.url, attempt, attempts, error = %err, "Request attempt failed");
                    last_error = err;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Transport that replays canned outcomes and records what was sent.
    #[derive(Default)]
    pub struct ScriptedTransport {
        script: Mutex<VecDeque<Result<RawResponse, RequestError>>>,
        sent: Mutex<Vec<OutgoingRequest>>,
    }

    impl ScriptedTransport {
        pub fn push_json(&self, status: u16, body: Value) -> &Self {
            self.script.lock().unwrap().push_back(Ok(RawResponse {
                status,
                body: serde_json::to_vec(&body).unwrap(),
            }));
            self
        }

        pub fn script_raw(&self, status: u16, body: Vec<u8>) -> &Self {
            self.script
                .lock()
                .unwrap()
                .push_back(Ok(RawResponse { status, body }));
            self
        }

        pub fn push_error(&self, err: RequestError) -> &Self {
            self.script.lock().unwrap().push_back(Err(err));
            self
        }

        pub fn sent(&self) -> Vec<OutgoingRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: OutgoingRequest) -> Result<RawResponse, RequestError> {
            self.sent.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RequestError::Transport("script exhausted".to_string())))
        }
    }
}
