//! devauth: OAuth 2.0 Device Authorization Grant orchestration.
//!
//! Signs a user in on a constrained device by delegating login to a second
//! device. The crate owns the device-flow state machine (cadence, expiry,
//! outcome interpretation), the registry of in-flight flows, and the store
//! that binds a successful flow's token and profile to a session. Rendering
//! and session transport sit in front of [`service::DeviceAuthService`].
//!
//! # Quick Start
//!
//! ```no_run
//! use devauth::prelude::*;
//!
//! # async fn example() -> devauth::error::Result<()> {
//! let config = DeviceAuthConfig::from_env()?;
//! let service = DeviceAuthService::from_config(&config);
//! let session = SessionId::generate();
//!
//! let view = service.initiate_flow(&session).await?;
//! println!("Go to {} and enter {}", view.verification_uri, view.user_code);
//!
//! loop {
//!     tokio::time::sleep(std::time::Duration::from_secs(view.interval)).await;
//!     let poll = service.poll_flow(&view.device_code).await?;
//!     if poll.status.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod flow;
pub mod prelude;
pub mod service;
pub mod session;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
