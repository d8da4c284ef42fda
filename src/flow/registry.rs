use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::state::DeviceFlow;
use crate::error::{DevauthError, Result};
use crate::util::fingerprint::fingerprint;

/// Shared handle to one in-flight flow. Holding its lock serializes polls.
pub type FlowHandle = Arc<Mutex<DeviceFlow>>;

#[derive(Debug)]
struct Entry {
    flow: FlowHandle,
    evict_after: DateTime<Utc>,
}

/// Maps device codes to their in-flight flows.
///
/// An entry stays readable until `expires_at + grace`; a flow that finished
/// as succeeded or denied can have that deadline pulled in with
/// [`FlowRegistry::retire`].
#[derive(Debug)]
pub struct FlowRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    grace: Duration,
}

impl FlowRegistry {
    /// Negative grace is treated as zero: an entry never disappears before
    /// its flow expires.
    pub fn new(grace: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            grace: grace.max(Duration::zero()),
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Add a flow, replacing any previous entry with the same device code.
    pub fn register(&self, flow: DeviceFlow) -> FlowHandle {
        let device_code = flow.device_code.clone();
        let evict_after = saturating_add(flow.expires_at, self.grace);
        let handle = Arc::new(Mutex::new(flow));
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                device_code,
                Entry {
                    flow: handle.clone(),
                    evict_after,
                },
            );
        handle
    }

    /// Find a live flow. Unknown codes and entries past their deadline are
    /// `UnknownFlow`; stale entries are dropped on the way.
    pub fn lookup(&self, device_code: &str, now: DateTime<Utc>) -> Result<FlowHandle> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(device_code) {
                Some(entry) if now <= entry.evict_after => return Ok(entry.flow.clone()),
                Some(_) => {}
                None => return Err(DevauthError::UnknownFlow),
            }
        }
        self.evict(device_code);
        Err(DevauthError::UnknownFlow)
    }

    /// Remove a flow. Returns whether it was present.
    pub fn evict(&self, device_code: &str) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(device_code)
            .is_some();
        if removed {
            debug!(flow = %fingerprint(device_code), "device flow evicted");
        }
        removed
    }

    /// Keep a finished flow readable only for the grace period after `now`.
    pub fn retire(&self, device_code: &str, now: DateTime<Utc>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(device_code) {
            entry.evict_after = entry.evict_after.min(saturating_add(now, self.grace));
        }
    }

    /// Drop every entry past its deadline. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.evict_after);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "swept device flows");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn saturating_add(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Default for FlowRegistry {
    fn default() -> Self {
        Self::new(Duration::seconds(crate::config::DEFAULT_EVICTION_GRACE_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DeviceCodeGrant;
    use crate::session::SessionId;

    fn flow(code: &str, now: DateTime<Utc>) -> DeviceFlow {
        DeviceFlow::from_grant(
            DeviceCodeGrant {
                device_code: code.to_string(),
                user_code: "ABCD-EFGH".to_string(),
                verification_uri: "https://example.com/activate".to_string(),
                verification_uri_complete: None,
                expires_in: 600,
                interval: 5,
            },
            "cid",
            SessionId::from("s"),
            now,
        )
    }

    #[tokio::test]
    async fn lookup_returns_registered_flow() {
        let now = Utc::now();
        let registry = FlowRegistry::new(Duration::seconds(30));
        registry.register(flow("dev-1", now));
        let handle = registry.lookup("dev-1", now).unwrap();
        assert_eq!(handle.lock().await.user_code, "ABCD-EFGH");
    }

    #[test]
    fn unknown_code_is_rejected() {
        let registry = FlowRegistry::default();
        assert!(matches!(
            registry.lookup("forged", Utc::now()),
            Err(DevauthError::UnknownFlow)
        ));
    }

    #[test]
    fn entries_survive_grace_then_vanish() {
        let now = Utc::now();
        let registry = FlowRegistry::new(Duration::seconds(30));
        registry.register(flow("dev-1", now));
        assert!(registry.lookup("dev-1", now + Duration::seconds(620)).is_ok());
        assert!(registry.lookup("dev-1", now + Duration::seconds(631)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn evicted_flow_is_unknown() {
        let now = Utc::now();
        let registry = FlowRegistry::default();
        registry.register(flow("dev-1", now));
        assert!(registry.evict("dev-1"));
        assert!(!registry.evict("dev-1"));
        assert!(matches!(
            registry.lookup("dev-1", now),
            Err(DevauthError::UnknownFlow)
        ));
    }

    #[test]
    fn retire_pulls_deadline_in() {
        let now = Utc::now();
        let registry = FlowRegistry::new(Duration::seconds(30));
        registry.register(flow("dev-1", now));
        registry.retire("dev-1", now + Duration::seconds(10));
        assert!(registry.lookup("dev-1", now + Duration::seconds(40)).is_ok());
        assert!(registry.lookup("dev-1", now + Duration::seconds(41)).is_err());
    }

    #[test]
    fn sweep_removes_only_stale_entries() {
        let now = Utc::now();
        let registry = FlowRegistry::new(Duration::seconds(30));
        registry.register(flow("old", now - Duration::seconds(700)));
        registry.register(flow("new", now));
        assert_eq!(registry.sweep(now), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("new", now).is_ok());
    }

    #[test]
    fn negative_grace_never_hides_a_live_flow() {
        let now = Utc::now();
        let registry = FlowRegistry::new(Duration::seconds(-300));
        assert_eq!(registry.grace(), Duration::zero());
        registry.register(flow("dev-1", now));
        assert!(registry.lookup("dev-1", now + Duration::seconds(400)).is_ok());
        assert!(registry.lookup("dev-1", now + Duration::seconds(600)).is_ok());
        assert!(registry.lookup("dev-1", now + Duration::seconds(601)).is_err());
    }
}
