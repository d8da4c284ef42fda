use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::device_code::{
    DeviceCodeGrant, DeviceFlowRequest, TokenEndpointResponse, TokenResult,
    DEVICE_CODE_GRANT_TYPE,
};
use super::error::TransportError;
use super::profile::UserProfile;
use crate::config::DeviceAuthConfig;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The three outbound calls a device flow needs.
///
/// Implementations are stateless and never retry: retry cadence belongs to
/// the flow machine, which is the only party that knows the server-dictated
/// polling interval.
#[async_trait]
pub trait AuthorizationServer: Send + Sync {
    /// Ask for a fresh device/user code pair.
    async fn request_device_code(
        &self,
        request: &DeviceFlowRequest,
    ) -> Result<DeviceCodeGrant, TransportError>;

    /// Exchange a device code for tokens.
    async fn exchange_device_code(
        &self,
        client_id: &str,
        device_code: &str,
    ) -> Result<TokenResult, TransportError>;

    /// Fetch userinfo claims for an access token.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, TransportError>;
}

/// HTTP adapter for an OAuth authorization server.
///
/// # Example
/// ```no_run
/// use devauth::auth::HttpAuthorizationServer;
///
/// let server = HttpAuthorizationServer::new("https://tenant.example.com")
///     .with_token_url("https://tenant.example.com/custom/token");
/// ```
#[derive(Debug, Clone)]
pub struct HttpAuthorizationServer {
    client: reqwest::Client,
    device_code_url: String,
    token_url: String,
    userinfo_url: String,
}

impl HttpAuthorizationServer {
    /// Adapter with the standard endpoint layout under `domain`.
    pub fn new(domain: &str) -> Self {
        let base = domain.trim_end_matches('/');
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            device_code_url: format!("{base}/oauth/device/code"),
            token_url: format!("{base}/oauth/token"),
            userinfo_url: format!("{base}/userinfo"),
        }
    }

    /// Adapter using the endpoints and timeout from a resolved config.
    pub fn from_config(config: &DeviceAuthConfig) -> Self {
        Self {
            client: build_client(config.http_timeout),
            device_code_url: config.device_code_url(),
            token_url: config.token_url(),
            userinfo_url: config.userinfo_url(),
        }
    }

    pub fn with_device_code_url(mut self, url: impl Into<String>) -> Self {
        self.device_code_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.userinfo_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn device_code_url(&self) -> &str {
        &self.device_code_url
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn userinfo_url(&self) -> &str {
        &self.userinfo_url
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    // Building only fails when the TLS backend cannot initialise; the default
    // client is the same configuration minus the timeout.
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

#[async_trait]
impl AuthorizationServer for HttpAuthorizationServer {
    async fn request_device_code(
        &self,
        request: &DeviceFlowRequest,
    ) -> Result<DeviceCodeGrant, TransportError> {
        let mut form = vec![
            ("client_id", request.client_id.as_str()),
            ("scope", request.scope.as_str()),
        ];
        if let Some(audience) = request.audience.as_deref() {
            form.push(("audience", audience));
        }
        let resp = self
            .client
            .post(&self.device_code_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn exchange_device_code(
        &self,
        client_id: &str,
        device_code: &str,
    ) -> Result<TokenResult, TransportError> {
        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT_TYPE),
                ("device_code", device_code),
                ("client_id", client_id),
            ])
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        // Pending/denied/expired arrive as 4xx bodies; anything 5xx is transport.
        if status.is_server_error() || status.is_informational() || status.is_redirection() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let payload: TokenEndpointResponse = serde_json::from_str(&body)?;
        Ok(payload.into_result())
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, TransportError> {
        let resp = self
            .client
            .get(&self.userinfo_url)
            .header("Accept", "application/json")
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
