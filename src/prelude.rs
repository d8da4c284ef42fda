//! Convenience re-exports for common use.

pub use crate::auth::{AuthorizationServer, HttpAuthorizationServer, Token, UserProfile};
pub use crate::config::DeviceAuthConfig;
pub use crate::error::{DevauthError, Result};
pub use crate::flow::{FlowState, PollResponse};
pub use crate::service::{DeviceAuthService, DeviceFlowView};
pub use crate::session::{SessionId, SessionState, SessionStore};
