#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use devauth::auth::{
    AuthorizationServer, DeviceCodeGrant, DeviceFlowRequest, Token, TokenResult, TransportError,
    UserProfile,
};
use devauth::config::DeviceAuthConfig;
use devauth::error::Result;
use devauth::service::DeviceAuthService;
use devauth::session::{
    InMemorySessionStore, SessionId, SessionRecord, SessionState, SessionStore,
};
use devauth::util::clock::ManualClock;
use serde_json::json;

/// Authorization server double with a scripted queue of token-endpoint outcomes.
///
/// An empty queue answers `Pending`.
#[derive(Default)]
pub struct ScriptedServer {
    pub expires_in: u64,
    pub interval: u64,
    fail_device_code: AtomicBool,
    exchanges: Mutex<VecDeque<std::result::Result<TokenResult, TransportError>>>,
    profile: Mutex<Option<UserProfile>>,
    exchange_delay: Option<Duration>,
    exchange_clock_advance: Mutex<Option<(Arc<ManualClock>, chrono::Duration)>>,
    pub device_code_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub last_request: Mutex<Option<DeviceFlowRequest>>,
}

impl ScriptedServer {
    pub fn new(expires_in: u64, interval: u64) -> Self {
        Self {
            expires_in,
            interval,
            profile: Mutex::new(Some(profile())),
            ..Self::default()
        }
    }

    pub fn with_exchange_delay(mut self, delay: Duration) -> Self {
        self.exchange_delay = Some(delay);
        self
    }

    pub fn fail_device_code(&self) {
        self.fail_device_code.store(true, Ordering::SeqCst);
    }

    pub fn push(&self, result: TokenResult) {
        self.exchanges.lock().unwrap().push_back(Ok(result));
    }

    pub fn push_transport_error(&self, message: &str) {
        self.exchanges
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Network(message.to_string())));
    }

    /// Move `clock` forward by `by` while each exchange is in flight.
    pub fn advance_clock_during_exchange(&self, clock: Arc<ManualClock>, by: chrono::Duration) {
        *self.exchange_clock_advance.lock().unwrap() = Some((clock, by));
    }

    pub fn fail_profile(&self) {
        *self.profile.lock().unwrap() = None;
    }

    pub fn exchanges(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationServer for ScriptedServer {
    async fn request_device_code(
        &self,
        request: &DeviceFlowRequest,
    ) -> std::result::Result<DeviceCodeGrant, TransportError> {
        let n = self.device_code_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail_device_code.load(Ordering::SeqCst) {
            return Err(TransportError::Network("connection refused".to_string()));
        }
        Ok(DeviceCodeGrant {
            device_code: format!("device-code-{n}"),
            user_code: format!("USER-{n:04}"),
            verification_uri: "https://tenant.example.com/activate".to_string(),
            verification_uri_complete: Some(format!(
                "https://tenant.example.com/activate?user_code=USER-{n:04}"
            )),
            expires_in: self.expires_in,
            interval: self.interval,
        })
    }

    async fn exchange_device_code(
        &self,
        _client_id: &str,
        _device_code: &str,
    ) -> std::result::Result<TokenResult, TransportError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.exchange_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((clock, by)) = self.exchange_clock_advance.lock().unwrap().as_ref() {
            clock.advance(*by);
        }
        self.exchanges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(TokenResult::Pending))
    }

    async fn fetch_profile(
        &self,
        _access_token: &str,
    ) -> std::result::Result<UserProfile, TransportError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TransportError::Status {
                status: 401,
                body: "unauthorized".to_string(),
            })
    }
}

/// In-memory store that counts `bind` calls and remembers the last bind time.
#[derive(Default)]
pub struct CountingSessionStore {
    inner: InMemorySessionStore,
    pub binds: AtomicUsize,
    last_bound_at: Mutex<Option<DateTime<Utc>>>,
}

impl CountingSessionStore {
    pub fn binds(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn last_bound_at(&self) -> Option<DateTime<Utc>> {
        *self.last_bound_at.lock().unwrap()
    }
}

impl SessionStore for CountingSessionStore {
    fn bind(&self, session: &SessionId, record: SessionRecord) -> Result<()> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        *self.last_bound_at.lock().unwrap() = Some(record.bound_at);
        self.inner.bind(session, record)
    }

    fn read(&self, session: &SessionId) -> Result<SessionState> {
        self.inner.read(session)
    }

    fn clear(&self, session: &SessionId) -> Result<()> {
        self.inner.clear(session)
    }
}

pub struct Harness {
    pub service: DeviceAuthService,
    pub server: Arc<ScriptedServer>,
    pub sessions: Arc<CountingSessionStore>,
    pub clock: Arc<ManualClock>,
}

pub fn config() -> DeviceAuthConfig {
    DeviceAuthConfig::new("https://tenant.example.com", "client-123")
        .with_logout_return_to("https://tv.example.com/")
}

pub fn harness(server: ScriptedServer) -> Harness {
    let server = Arc::new(server);
    let sessions = Arc::new(CountingSessionStore::default());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
    ));
    let service = DeviceAuthService::new(
        &config(),
        server.clone(),
        sessions.clone(),
        clock.clone(),
    );
    Harness {
        service,
        server,
        sessions,
        clock,
    }
}

pub fn profile() -> UserProfile {
    serde_json::from_value(json!({
        "sub": "auth0|42",
        "given_name": "Ada",
        "name": "Ada Lovelace",
        "email": "ada@example.com"
    }))
    .unwrap()
}

pub fn granted(access_token: &str) -> TokenResult {
    TokenResult::Granted {
        token: Token::bearer(access_token),
    }
}
