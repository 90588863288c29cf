use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

/// How many recent queries a session keeps for refinement context.
const RECENT_QUERY_LIMIT: usize = 5;

const DEFAULT_TTL_SECS: u64 = 30 * 60;

/// Per-session conversation state.
///
/// `pending_clarification` holds the original query while we wait for the
/// user to answer a clarification question; at most one is active at a time.
/// `pending_refinement` holds the last final response when the user asked
/// for more detail.
#[derive(Debug, Default)]
pub struct Session {
    recent_queries: Vec<String>,
    pending_clarification: Option<String>,
    pending_refinement: Option<String>,
}

impl Session {
    /// Record an incoming query, keeping only the most recent five.
    pub fn push_query(&mut self, query: &str) {
        self.recent_queries.push(query.to_string());
        if self.recent_queries.len() > RECENT_QUERY_LIMIT {
            let excess = self.recent_queries.len() - RECENT_QUERY_LIMIT;
            self.recent_queries.drain(..excess);
        }
    }

    pub fn recent_queries(&self) -> &[String] {
        &self.recent_queries
    }

    pub fn recent_queries_joined(&self) -> String {
        self.recent_queries.join("\n")
    }

    /// Take (and clear) the pending clarification, if any.
    pub fn take_pending_clarification(&mut self) -> Option<String> {
        self.pending_clarification.take()
    }

    pub fn set_pending_clarification(&mut self, original_query: &str) {
        self.pending_clarification = Some(original_query.to_string());
    }

    pub fn has_pending_clarification(&self) -> bool {
        self.pending_clarification.is_some()
    }

    pub fn set_pending_refinement(&mut self, previous_response: &str) {
        self.pending_refinement = Some(previous_response.to_string());
    }

    pub fn pending_refinement(&self) -> Option<&str> {
        self.pending_refinement.as_deref()
    }
}

struct Entry {
    session: Arc<Mutex<Session>>,
    last_active: Instant,
}

/// Process-lifetime session map, keyed by opaque session id.
///
/// Each session sits behind its own mutex so two simultaneous requests for
/// the same id serialize, while different sessions proceed independently.
/// Idle sessions are swept out after `ttl` on the next store access.
pub struct SessionStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn from_env() -> Self {
        let ttl_secs = dotenv::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TTL_SECS);
        Self::new(Duration::from_secs(ttl_secs))
    }

    /// Fetch the session for `id`, creating it on first use. Also evicts
    /// any session idle longer than the TTL.
    pub async fn get_or_create(&self, id: &str) -> Arc<Mutex<Session>> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| now.duration_since(e.last_active) < self.ttl);

        let entry = entries.entry(id.to_string()).or_insert_with(|| Entry {
            session: Arc::new(Mutex::new(Session::default())),
            last_active: now,
        });
        entry.last_active = now;
        entry.session.clone()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_queries_bounded_newest_last() {
        let mut session = Session::default();
        for i in 1..=7 {
            session.push_query(&format!("query {}", i));
        }
        assert_eq!(session.recent_queries().len(), 5);
        assert_eq!(session.recent_queries().first().unwrap(), "query 3");
        assert_eq!(session.recent_queries().last().unwrap(), "query 7");
    }

    #[test]
    fn test_pending_clarification_take_clears() {
        let mut session = Session::default();
        session.set_pending_clarification("what is my leave policy");
        assert!(session.has_pending_clarification());

        let taken = session.take_pending_clarification();
        assert_eq!(taken.as_deref(), Some("what is my leave policy"));
        assert!(!session.has_pending_clarification());
        assert!(session.take_pending_clarification().is_none());
    }

    #[tokio::test]
    async fn test_store_creates_on_first_use() {
        let store = SessionStore::new(Duration::from_secs(60));
        let s = store.get_or_create("alice").await;
        s.lock().await.push_query("hello");

        let s2 = store.get_or_create("alice").await;
        assert_eq!(s2.lock().await.recent_queries().len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_evicted() {
        let store = SessionStore::new(Duration::from_millis(10));
        store.get_or_create("alice").await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Accessing a different id sweeps the stale one
        store.get_or_create("bob").await;
        assert_eq!(store.len().await, 1);

        // And alice comes back fresh
        let s = store.get_or_create("alice").await;
        assert!(s.lock().await.recent_queries().is_empty());
    }
}
