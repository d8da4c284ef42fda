use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::auth::DeviceCodeGrant;
use crate::session::SessionId;

/// Lifecycle state of a device flow. Every state except `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowState {
    Pending,
    Succeeded,
    Denied,
    Expired,
    Error,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// What a poll request should do before touching the authorization server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollGate {
    /// Flow already finished; report its state.
    Terminal(FlowState),
    /// Lifetime elapsed; the flow has just been moved to `Expired`.
    JustExpired,
    /// Minimum interval since the last upstream poll has not passed.
    Throttled { next_poll_at: DateTime<Utc> },
    /// An upstream exchange is allowed now.
    Due,
}

/// One device authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFlow {
    pub device_code: String,
    pub client_id: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    pub expires_at: DateTime<Utc>,
    interval_secs: u64,
    state: FlowState,
    reason: Option<String>,
    last_poll_at: Option<DateTime<Utc>>,
    session: SessionId,
}

impl DeviceFlow {
    /// Pending flow from a device authorization response received at `now`.
    pub fn from_grant(
        grant: DeviceCodeGrant,
        client_id: impl Into<String>,
        session: SessionId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            device_code: grant.device_code,
            client_id: client_id.into(),
            user_code: grant.user_code,
            verification_uri: grant.verification_uri,
            verification_uri_complete: grant.verification_uri_complete,
            expires_at: after_secs(now, grant.expires_in),
            interval_secs: grant.interval,
            state: FlowState::Pending,
            reason: None,
            last_poll_at: None,
            session,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Human-readable reason attached to a terminal non-success state.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub fn last_poll_at(&self) -> Option<DateTime<Utc>> {
        self.last_poll_at
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Whole seconds of lifetime left at `now`, never negative.
    pub fn expires_in(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((self.expires_at - now).num_seconds()).unwrap_or(0)
    }

    /// Earliest instant another upstream poll is allowed.
    pub fn next_poll_at(&self) -> Option<DateTime<Utc>> {
        self.last_poll_at.map(|last| after_secs(last, self.interval_secs))
    }

    /// Local checks run before any upstream call: terminal state, expiry, cadence.
    ///
    /// Expiry is checked before cadence and moves the flow to `Expired`.
    pub fn gate(&mut self, now: DateTime<Utc>) -> PollGate {
        if self.state.is_terminal() {
            return PollGate::Terminal(self.state);
        }
        if now > self.expires_at {
            self.finish(FlowState::Expired, Some("device code expired".to_string()));
            return PollGate::JustExpired;
        }
        match self.next_poll_at() {
            Some(next_poll_at) if now < next_poll_at => PollGate::Throttled { next_poll_at },
            _ => PollGate::Due,
        }
    }

    /// Record that an upstream exchange was sent at `now`.
    pub fn record_poll(&mut self, now: DateTime<Utc>) {
        self.last_poll_at = Some(now);
    }

    /// Grow the polling interval after a `slow_down` response.
    pub fn slow_down(&mut self, increment_secs: u64) {
        self.interval_secs = self.interval_secs.saturating_add(increment_secs.max(1));
    }

    /// Move to a terminal state. Returns `false` if the flow had already finished.
    pub fn finish(&mut self, state: FlowState, reason: Option<String>) -> bool {
        if self.state.is_terminal() || !state.is_terminal() {
            return false;
        }
        self.state = state;
        self.reason = reason;
        true
    }
}

/// `at + secs`, saturating at the latest representable instant.
fn after_secs(at: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    at.checked_add_signed(Duration::seconds(secs))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
