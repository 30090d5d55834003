//! The registry of per-peer sessions (§4.D): created on first contact by
//! `"<transport>://<remote>"`, swept in the background once expired.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::session::{Session, SESSION_TTL};
use super::DnsError;

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Default)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(transport: &str, remote: &str) -> String {
        format!("{transport}://{remote}")
    }

    /// Runs the loop check/record for `name` against the session for
    /// `key`, creating the session on first contact.
    pub async fn query(&self, key: &str, name: &str) -> Result<(), DnsError> {
        let mut sessions = self.inner.write().await;
        let session = sessions.entry(key.to_string()).or_insert_with(Session::new);
        session.query(name, Instant::now())
    }

    /// Resets the chain for `key` (upstream response was not a
    /// CNAME/DNAME); a no-op if the session doesn't exist yet.
    pub async fn reset(&self, key: &str) {
        let mut sessions = self.inner.write().await;
        if let Some(session) = sessions.get_mut(key) {
            session.reset();
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    async fn sweep_once(&self) {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        sessions.retain(|_, session| !session.is_expired(now));
    }

    /// Spawns the background sweep task; runs until `cancel` resolves.
    pub fn spawn_sweep(&self, mut cancel: tokio::sync::oneshot::Receiver<()>) -> tokio::task::JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = &mut cancel => return,
                    _ = ticker.tick() => sessions.sweep_once().await,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_session_on_first_contact() {
        let sessions = Sessions::new();
        let key = Sessions::key("udp", "10.0.0.5:53");
        sessions.query(&key, "a.example.com.").await.unwrap();
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn reset_is_a_noop_for_unknown_key() {
        let sessions = Sessions::new();
        sessions.reset("udp://missing").await;
        assert_eq!(sessions.len().await, 0);
    }

    #[tokio::test]
    async fn sweep_removes_expired_sessions() {
        let sessions = Sessions::new();
        let key = Sessions::key("udp", "10.0.0.5:53");
        sessions.query(&key, "a.example.com.").await.unwrap();
        {
            let mut inner = sessions.inner.write().await;
            let now_past_ttl = Instant::now() + SESSION_TTL + Duration::from_secs(1);
            assert!(inner.get(&key).unwrap().is_expired(now_past_ttl));
            inner.clear();
        }
        assert_eq!(sessions.len().await, 0);
    }
}
