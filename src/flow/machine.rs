use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::state::{DeviceFlow, FlowState, PollGate};
use crate::auth::{AuthorizationServer, DeviceFlowRequest, Token, TokenResult};
use crate::error::{DevauthError, Result};
use crate::session::{SessionId, SessionRecord, SessionStore};
use crate::util::clock::Clock;
use crate::util::fingerprint::fingerprint;

/// Answer to a poll request, ready to hand to any transport.
///
/// Serializes as `{"status": "pending"}` or
/// `{"status": "denied", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    pub status: FlowState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PollResponse {
    pub fn pending() -> Self {
        Self {
            status: FlowState::Pending,
            message: None,
        }
    }

    pub fn from_flow(flow: &DeviceFlow) -> Self {
        Self {
            status: flow.state(),
            message: flow.reason().map(str::to_string),
        }
    }
}

/// Drives device flows: initiation, cadence enforcement and outcome handling.
///
/// `poll` takes the flow by `&mut`, so whoever owns the flow (the registry's
/// per-flow lock) serializes the upstream exchange and the session write.
pub struct FlowMachine {
    server: Arc<dyn AuthorizationServer>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    slow_down_increment: u64,
}

impl FlowMachine {
    pub fn new(
        server: Arc<dyn AuthorizationServer>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            server,
            sessions,
            clock,
            slow_down_increment: crate::config::DEFAULT_SLOW_DOWN_SECS,
        }
    }

    pub fn with_slow_down_increment(mut self, secs: u64) -> Self {
        self.slow_down_increment = secs;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Request a device code and build a pending flow bound to `session`.
    pub async fn initiate(
        &self,
        request: &DeviceFlowRequest,
        session: SessionId,
    ) -> Result<DeviceFlow> {
        let grant = self
            .server
            .request_device_code(request)
            .await
            .map_err(|err| {
                warn!(error = %err, "device code request failed");
                DevauthError::InitiationFailed(err)
            })?;
        let flow = DeviceFlow::from_grant(grant, &request.client_id, session, self.clock.now());
        info!(
            flow = %fingerprint(&flow.device_code),
            expires_at = %flow.expires_at,
            interval_secs = flow.interval_secs(),
            "device flow started"
        );
        Ok(flow)
    }

    /// Run one poll step against `flow`.
    ///
    /// Terminal flows, expired flows and polls inside the current interval
    /// are answered locally; only a due poll reaches the token endpoint.
    pub async fn poll(&self, flow: &mut DeviceFlow) -> PollResponse {
        let now = self.clock.now();
        match flow.gate(now) {
            PollGate::Terminal(_) => return PollResponse::from_flow(flow),
            PollGate::JustExpired => {
                info!(flow = %fingerprint(&flow.device_code), "device flow expired");
                return PollResponse::from_flow(flow);
            }
            PollGate::Throttled { next_poll_at } => {
                debug!(
                    flow = %fingerprint(&flow.device_code),
                    next_poll_at = %next_poll_at,
                    "poll inside interval, not contacting server"
                );
                return PollResponse::pending();
            }
            PollGate::Due => {}
        }

        flow.record_poll(now);
        let outcome = self
            .server
            .exchange_device_code(&flow.client_id, &flow.device_code)
            .await;

        match outcome {
            Ok(TokenResult::Granted { token }) => self.complete(flow, token).await,
            Ok(TokenResult::Pending) => {}
            Ok(TokenResult::SlowDown) => {
                flow.slow_down(self.slow_down_increment);
                debug!(
                    flow = %fingerprint(&flow.device_code),
                    interval_secs = flow.interval_secs(),
                    "server asked to slow down"
                );
            }
            Ok(TokenResult::ExpiredUpstream) => {
                flow.finish(FlowState::Expired, Some("device code expired".to_string()));
            }
            Ok(TokenResult::Denied) => {
                flow.finish(FlowState::Denied, Some("authorization denied".to_string()));
            }
            Ok(TokenResult::UpstreamError { description }) => {
                flow.finish(FlowState::Error, Some(description));
            }
            Err(err) => {
                flow.finish(FlowState::Error, Some(err.to_string()));
            }
        }

        if flow.state().is_terminal() {
            info!(
                flow = %fingerprint(&flow.device_code),
                state = %flow.state(),
                reason = flow.reason().unwrap_or(""),
                "device flow finished"
            );
        }
        PollResponse::from_flow(flow)
    }

    async fn complete(&self, flow: &mut DeviceFlow, token: Token) {
        // The code may lapse while an upstream call is in flight.
        if self.expire_if_lapsed(flow) {
            return;
        }
        let profile = match self.server.fetch_profile(&token.access_token).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(flow = %fingerprint(&flow.device_code), error = %err, "profile fetch failed");
                flow.finish(
                    FlowState::Error,
                    Some(format!("token issued but profile unavailable: {err}")),
                );
                return;
            }
        };
        if self.expire_if_lapsed(flow) {
            return;
        }
        let record = SessionRecord::new(token, profile, self.clock.now());
        if let Err(err) = self.sessions.bind(flow.session(), record) {
            warn!(flow = %fingerprint(&flow.device_code), error = %err, "session write failed");
            flow.finish(FlowState::Error, Some(format!("could not store session: {err}")));
            return;
        }
        flow.finish(FlowState::Succeeded, None);
    }

    fn expire_if_lapsed(&self, flow: &mut DeviceFlow) -> bool {
        if self.clock.now() <= flow.expires_at {
            return false;
        }
        info!(flow = %fingerprint(&flow.device_code), "grant arrived after expiry, discarded");
        flow.finish(FlowState::Expired, Some("device code expired".to_string()))
    }
}
