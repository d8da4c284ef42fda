use serde::{Deserialize, Serialize};

use super::Token;

/// Grant type sent to the token endpoint while polling.
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Client identity and requested access for a device authorization request.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct DeviceFlowRequest {
    #[builder(into)]
    pub client_id: String,
    #[builder(into)]
    pub scope: String,
    #[builder(into)]
    pub audience: Option<String>,
}

/// Payload of the device authorization endpoint.
///
/// # Example
/// ```
/// use devauth::auth::DeviceCodeGrant;
///
/// let grant: DeviceCodeGrant = serde_json::from_str(r#"{
///     "device_code": "dev-1",
///     "user_code": "ABCD-EFGH",
///     "verification_uri": "https://example.com/activate",
///     "expires_in": 600
/// }"#).unwrap();
/// assert_eq!(grant.interval, 5);
/// assert_eq!(grant.display_uri(), "https://example.com/activate");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodeGrant {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl DeviceCodeGrant {
    /// URI to encode into a scannable code: the complete URI when offered.
    pub fn display_uri(&self) -> &str {
        self.verification_uri_complete
            .as_deref()
            .unwrap_or(&self.verification_uri)
    }
}

fn default_interval() -> u64 {
    5
}

/// Interpreted outcome of a single token-endpoint exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResult {
    Granted { token: Token },
    Pending,
    SlowDown,
    ExpiredUpstream,
    Denied,
    UpstreamError { description: String },
}

/// Token-endpoint body: either a token or an RFC 8628 error identifier.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenEndpointResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenEndpointResponse {
    /// Map the wire payload onto [`TokenResult`].
    ///
    /// An error identifier wins over a token when both are present.
    pub fn into_result(self) -> TokenResult {
        if let Some(error) = self.error {
            return match error.as_str() {
                "authorization_pending" => TokenResult::Pending,
                "slow_down" => TokenResult::SlowDown,
                "expired_token" => TokenResult::ExpiredUpstream,
                "access_denied" => TokenResult::Denied,
                _ => TokenResult::UpstreamError {
                    description: self.error_description.unwrap_or(error),
                },
            };
        }
        match self.access_token {
            Some(access_token) => TokenResult::Granted {
                token: Token {
                    access_token,
                    token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
                    expires_in: self.expires_in,
                    refresh_token: self.refresh_token,
                    id_token: self.id_token,
                    scope: self.scope,
                },
            },
            None => TokenResult::UpstreamError {
                description: "unexpected response from authorization server".to_string(),
            },
        }
    }
}
