//! Per-session authentication outcome.
//!
//! A session is either unauthenticated or holds a token *and* a profile,
//! written together by the one device flow that succeeded under it.

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::InMemorySessionStore;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{Token, UserProfile};
use crate::error::Result;

/// Opaque session identifier owned by the session transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token and profile bound to a session, always stored as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: Token,
    pub profile: UserProfile,
    pub bound_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(token: Token, profile: UserProfile, bound_at: DateTime<Utc>) -> Self {
        Self {
            token,
            profile,
            bound_at,
        }
    }
}

/// What a session currently holds.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Authenticated { token: Token, profile: UserProfile },
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Authenticated { profile, .. } => Some(profile),
            Self::Unauthenticated => None,
        }
    }
}

impl From<Option<SessionRecord>> for SessionState {
    fn from(record: Option<SessionRecord>) -> Self {
        match record {
            Some(record) => Self::Authenticated {
                token: record.token,
                profile: record.profile,
            },
            None => Self::Unauthenticated,
        }
    }
}

/// Storage abstraction for session outcomes.
pub trait SessionStore: Send + Sync {
    /// Store token and profile together, replacing anything already bound.
    fn bind(&self, session: &SessionId, record: SessionRecord) -> Result<()>;
    fn read(&self, session: &SessionId) -> Result<SessionState>;
    /// Remove token and profile together. Clearing an empty session is not an error.
    fn clear(&self, session: &SessionId) -> Result<()>;
}
