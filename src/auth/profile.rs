use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claims returned by the userinfo endpoint.
///
/// The shape is not validated: any JSON object is accepted and absent claims
/// simply read back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile {
    claims: Map<String, Value>,
}

impl UserProfile {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Raw claim lookup.
    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    /// String claim lookup; non-string values read as absent.
    pub fn claim_str(&self, key: &str) -> Option<&str> {
        self.claims.get(key).and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.claim_str("sub")
    }

    pub fn name(&self) -> Option<&str> {
        self.claim_str("name")
    }

    pub fn given_name(&self) -> Option<&str> {
        self.claim_str("given_name")
    }

    pub fn email(&self) -> Option<&str> {
        self.claim_str("email")
    }

    pub fn picture(&self) -> Option<&str> {
        self.claim_str("picture")
    }

    /// Preferred greeting name: `given_name`, then `name`.
    pub fn display_name(&self) -> Option<&str> {
        self.given_name().or_else(|| self.name())
    }
}

impl From<Map<String, Value>> for UserProfile {
    fn from(claims: Map<String, Value>) -> Self {
        Self::new(claims)
    }
}
