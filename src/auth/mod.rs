//! Authorization-server adapter: wire types and the HTTP client for the
//! device authorization, token and userinfo endpoints.

pub mod client;
pub mod device_code;
pub mod error;
pub mod profile;
pub mod token;

pub use client::{AuthorizationServer, HttpAuthorizationServer};
pub use device_code::{DeviceCodeGrant, DeviceFlowRequest, TokenResult, DEVICE_CODE_GRANT_TYPE};
pub use error::TransportError;
pub use profile::UserProfile;
pub use token::Token;
