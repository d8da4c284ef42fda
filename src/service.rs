//! Request/response boundary for presentation and session transports.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AuthorizationServer, DeviceFlowRequest, HttpAuthorizationServer};
use crate::config::DeviceAuthConfig;
use crate::error::{DevauthError, Result};
use crate::flow::{DeviceFlow, FlowMachine, FlowRegistry, FlowState, PollResponse};
use crate::session::{InMemorySessionStore, SessionId, SessionState, SessionStore};
use crate::util::clock::{Clock, SystemClock};

/// What the login page needs to show for a fresh flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFlowView {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    pub expires_in: u64,
    pub interval: u64,
}

impl DeviceFlowView {
    fn from_flow(flow: &DeviceFlow, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            device_code: flow.device_code.clone(),
            user_code: flow.user_code.clone(),
            verification_uri: flow.verification_uri.clone(),
            verification_uri_complete: flow.verification_uri_complete.clone(),
            expires_in: flow.expires_in(now),
            interval: flow.interval_secs(),
        }
    }

    /// URI to encode into a scannable code.
    pub fn display_uri(&self) -> &str {
        self.verification_uri_complete
            .as_deref()
            .unwrap_or(&self.verification_uri)
    }
}

/// Device-flow login facade.
///
/// All I/O decisions (rendering, cookies, redirects) belong to the caller;
/// the service only returns typed results.
///
/// # Example
/// ```no_run
/// use devauth::config::DeviceAuthConfig;
/// use devauth::service::DeviceAuthService;
/// use devauth::session::SessionId;
///
/// # async fn example() -> devauth::error::Result<()> {
/// let config = DeviceAuthConfig::new("https://tenant.example.com", "client-123");
/// let service = DeviceAuthService::from_config(&config);
/// let session = SessionId::generate();
/// let view = service.initiate_flow(&session).await?;
/// println!("Visit {} and enter {}", view.verification_uri, view.user_code);
/// let status = service.poll_flow(&view.device_code).await?;
/// println!("{}", status.status);
/// # Ok(())
/// # }
/// ```
pub struct DeviceAuthService {
    machine: FlowMachine,
    registry: FlowRegistry,
    sessions: Arc<dyn SessionStore>,
    request: DeviceFlowRequest,
    logout_redirect: Option<String>,
}

impl DeviceAuthService {
    pub fn new(
        config: &DeviceAuthConfig,
        server: Arc<dyn AuthorizationServer>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let machine = FlowMachine::new(server, sessions.clone(), clock)
            .with_slow_down_increment(config.slow_down_increment);
        Self {
            machine,
            registry: FlowRegistry::new(config.eviction_grace),
            sessions,
            request: config.flow_request(),
            logout_redirect: config.logout_redirect(),
        }
    }

    /// HTTP adapter, in-memory sessions and the system clock.
    pub fn from_config(config: &DeviceAuthConfig) -> Self {
        Self::new(
            config,
            Arc::new(HttpAuthorizationServer::from_config(config)),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Start a flow for `session` with the configured client identity and scope.
    pub async fn initiate_flow(&self, session: &SessionId) -> Result<DeviceFlowView> {
        let request = self.request.clone();
        self.initiate_flow_with(session, &request).await
    }

    /// Start a flow for `session` with explicit request parameters.
    ///
    /// Fails with `AlreadyAuthenticated` without contacting the server when
    /// the session already holds a token.
    pub async fn initiate_flow_with(
        &self,
        session: &SessionId,
        request: &DeviceFlowRequest,
    ) -> Result<DeviceFlowView> {
        if self.sessions.read(session)?.is_authenticated() {
            return Err(DevauthError::AlreadyAuthenticated);
        }
        let now = self.machine.clock().now();
        self.registry.sweep(now);

        let flow = self.machine.initiate(request, session.clone()).await?;
        let view = DeviceFlowView::from_flow(&flow, self.machine.clock().now());
        self.registry.register(flow);
        Ok(view)
    }

    /// Report the state of a flow, polling the server when the interval allows.
    ///
    /// Safe to call at any cadence. Unknown or evicted codes are `UnknownFlow`.
    pub async fn poll_flow(&self, device_code: &str) -> Result<PollResponse> {
        let handle = self
            .registry
            .lookup(device_code, self.machine.clock().now())?;
        let response = {
            let mut flow = handle.lock().await;
            self.machine.poll(&mut flow).await
        };
        if matches!(response.status, FlowState::Succeeded | FlowState::Denied) {
            self.registry
                .retire(device_code, self.machine.clock().now());
        }
        Ok(response)
    }

    pub fn get_session(&self, session: &SessionId) -> Result<SessionState> {
        self.sessions.read(session)
    }

    /// Clear the session. Returns the authorization-server logout URL to
    /// redirect to, when one is configured.
    pub fn end_session(&self, session: &SessionId) -> Result<Option<String>> {
        self.sessions.clear(session)?;
        info!("session ended");
        Ok(self.logout_redirect.clone())
    }
}
