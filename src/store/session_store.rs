use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::models::Message;

struct SessionEntry {
    history: Vec<Message>,
    last_touched: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Process-wide, in-memory map from session token to its transcript.
///
/// Cloning is cheap; all clones share the same map. Different sessions never
/// contend beyond the short map critical sections. Callers that need a
/// read-modify-write on one session take [`SessionStore::lock`] first.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

/// Held for the duration of one chat turn on a session.
pub type SessionGuard = OwnedMutexGuard<()>;

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&self, session_id: &str) -> Option<Vec<Message>> {
        let sessions = self.inner.sessions.read().await;
        sessions.get(session_id).map(|entry| entry.history.clone())
    }

    pub async fn store(&self, session_id: &str, history: Vec<Message>) {
        let mut sessions = self.inner.sessions.write().await;
        sessions.insert(
            session_id.to_string(),
            SessionEntry { history, last_touched: Utc::now() },
        );
    }

    /// Serializes turns on one session. The guard is released on drop, so every
    /// exit path of the holder, early returns included, frees the session.
    pub async fn lock(&self, session_id: &str) -> SessionGuard {
        let lock = {
            let mut locks = self.inner.locks.lock().await;
            locks.entry(session_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Drops sessions untouched for longer than `ttl`. Sessions with a turn in
    /// flight (or queued) are kept regardless of age.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        match Utc::now().checked_sub_signed(ttl) {
            Some(cutoff) => self.evict_untouched_since(cutoff).await,
            None => 0,
        }
    }

    async fn evict_untouched_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut locks = self.inner.locks.lock().await;
        let mut sessions = self.inner.sessions.write().await;

        // Only the map itself holds an idle lock; guards and waiters hold clones.
        let busy = |id: &str| locks.get(id).is_some_and(|l| Arc::strong_count(l) > 1);

        let stale: Vec<String> = sessions
            .iter()
            .filter(|(id, entry)| entry.last_touched < cutoff && !busy(id.as_str()))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            sessions.remove(id);
            debug!(session = %id, "evicted idle session");
        }
        locks.retain(|id, lock| sessions.contains_key(id) || Arc::strong_count(lock) > 1);

        stale.len()
    }
}

/// Periodically evicts sessions idle for longer than `ttl`.
pub fn spawn_sweeper(store: SessionStore, ttl: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.evict_idle(ttl).await;
            if evicted > 0 {
                let remaining = store.len().await;
                info!(evicted, remaining, "session sweep");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::MessageRole;

    fn transcript() -> Vec<Message> {
        vec![Message::user("hello"), Message::assistant("hi there")]
    }

    #[tokio::test]
    async fn unknown_session_loads_nothing() {
        let store = SessionStore::new();
        assert!(store.load("missing").await.is_none());
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let store = SessionStore::new();
        store.store("abc123", transcript()).await;

        let loaded = store.load("abc123").await.unwrap();
        assert_eq!(loaded, transcript());
        assert_eq!(loaded[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::new();
        store.store("a", transcript()).await;
        store.store("b", vec![Message::user("other")]).await;

        assert_eq!(store.load("a").await.unwrap().len(), 2);
        assert_eq!(store.load("b").await.unwrap().len(), 1);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn lock_serializes_same_session() {
        let store = SessionStore::new();
        let guard = store.lock("abc").await;

        let contender = store.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.lock("abc").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        // A different session is not blocked.
        let _other = store.lock("xyz").await;

        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn evicts_only_idle_unlocked_sessions() {
        let store = SessionStore::new();
        store.store("idle", transcript()).await;
        store.store("busy", transcript()).await;
        let _guard = store.lock("busy").await;

        let evicted = store.evict_untouched_since(Utc::now() + chrono::Duration::seconds(1)).await;

        assert_eq!(evicted, 1);
        assert!(store.load("idle").await.is_none());
        assert!(store.load("busy").await.is_some());
    }

    #[tokio::test]
    async fn fresh_sessions_survive_ttl_sweep() {
        let store = SessionStore::new();
        store.store("fresh", transcript()).await;
        assert_eq!(store.evict_idle(Duration::from_secs(60)).await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_idle_sessions_on_tick() {
        let store = SessionStore::new();
        store.store("idle", transcript()).await;
        store.store("busy", transcript()).await;
        let _guard = store.lock("busy").await;

        let sweeper = spawn_sweeper(store.clone(), Duration::ZERO, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(store.load("idle").await.is_none());
        assert!(store.load("busy").await.is_some());
        sweeper.abort();
    }
}
