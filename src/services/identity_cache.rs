//! Shared id → identity lookup state.
//!
//! Each entry is a tagged state held in its own `watch` channel. The channel
//! doubles as the per-id registry of interested consumers: anyone holding an
//! [`IdentityHandle`] is woken when the entry settles. An entry goes from
//! `Pending` to a terminal state exactly once; later settlements are ignored
//! until the entry is evicted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::domain::UserId;
use crate::domain::events::IdentityEvent;

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IdentityState {
    Pending,
    Resolved {
        name: String,
        username: Option<String>,
    },
    Failed {
        reason: String,
    },
}

impl IdentityState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    pub id: UserId,
    #[serde(flatten)]
    pub state: IdentityState,
}

impl IdentityRecord {
    /// Name to render for a message row; the numeric id stands in while the
    /// lookup is pending or after it failed.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.state {
            IdentityState::Resolved { name, .. } => name.clone(),
            IdentityState::Pending | IdentityState::Failed { .. } => self.id.to_string(),
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.state {
            IdentityState::Resolved { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Interest in one id, obtained from [`IdentityCache::subscribe`].
#[derive(Debug, Clone)]
pub struct IdentityHandle {
    id: UserId,
    rx: watch::Receiver<IdentityState>,
}

impl IdentityHandle {
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn current(&self) -> IdentityRecord {
        IdentityRecord {
            id: self.id,
            state: self.rx.borrow().clone(),
        }
    }

    /// Waits for the terminal state. `None` if the entry was evicted first.
    ///
    /// There is no timeout: a batch that never completes leaves this pending.
    pub async fn settled(mut self) -> Option<IdentityRecord> {
        let state = self
            .rx
            .wait_for(IdentityState::is_terminal)
            .await
            .ok()?
            .clone();
        Some(IdentityRecord { id: self.id, state })
    }
}

pub struct IdentityCache {
    entries: Mutex<HashMap<UserId, watch::Sender<IdentityState>>>,
    events: broadcast::Sender<IdentityEvent>,
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityCache {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<UserId, watch::Sender<IdentityState>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn has(&self, id: UserId) -> bool {
        self.entries().contains_key(&id)
    }

    /// Marks `id` as pending. Returns false, leaving the entry alone, if the
    /// id is already known (pending or settled).
    pub fn reserve(&self, id: UserId) -> bool {
        let mut entries = self.entries();
        if entries.contains_key(&id) {
            return false;
        }
        let (tx, _) = watch::channel(IdentityState::Pending);
        entries.insert(id, tx);
        true
    }

    pub fn resolve(&self, id: UserId, name: impl Into<String>, username: Option<String>) -> bool {
        self.settle(
            id,
            IdentityState::Resolved {
                name: name.into(),
                username,
            },
        )
    }

    pub fn reject(&self, id: UserId, reason: impl Into<String>) -> bool {
        self.settle(
            id,
            IdentityState::Failed {
                reason: reason.into(),
            },
        )
    }

    fn settle(&self, id: UserId, next: IdentityState) -> bool {
        let changed = {
            let entries = self.entries();
            let Some(entry) = entries.get(&id) else {
                debug!(%id, "Ignoring settlement for unreserved identity");
                return false;
            };
            entry.send_if_modified(|state| {
                if state.is_terminal() {
                    false
                } else {
                    *state = next.clone();
                    true
                }
            })
        };

        if !changed {
            debug!(%id, "Identity already settled; keeping first outcome");
            return false;
        }

        let event = match next {
            IdentityState::Resolved { name, username } => {
                IdentityEvent::Resolved { id, name, username }
            }
            IdentityState::Failed { reason } => IdentityEvent::Failed { id, reason },
            IdentityState::Pending => return true,
        };
        debug!(id = %event.id(), "Identity settled");
        // No subscribers is fine.
        let _ = self.events.send(event);
        true
    }

    /// Non-blocking read of the current state.
    #[must_use]
    pub fn get(&self, id: UserId) -> Option<IdentityRecord> {
        self.entries().get(&id).map(|entry| IdentityRecord {
            id,
            state: entry.borrow().clone(),
        })
    }

    #[must_use]
    pub fn subscribe(&self, id: UserId) -> Option<IdentityHandle> {
        self.entries().get(&id).map(|entry| IdentityHandle {
            id,
            rx: entry.subscribe(),
        })
    }

    /// Every terminal transition, cache-wide.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<IdentityEvent> {
        self.events.subscribe()
    }

    /// Drops one entry so the next search fetches it again.
    pub fn evict(&self, id: UserId) -> bool {
        self.entries().remove(&id).is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        debug!(count = entries.len(), "Clearing identity cache");
        entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(id: i64) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn reserve_creates_single_pending_entry() {
        let cache = IdentityCache::new();
        assert!(!cache.has(uid(1)));
        assert!(cache.reserve(uid(1)));
        assert!(!cache.reserve(uid(1)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(uid(1)).unwrap().state, IdentityState::Pending);
        assert!(cache.get(uid(2)).is_none());
    }

    #[test]
    fn resolve_after_reject_is_ignored() {
        let cache = IdentityCache::new();
        cache.reserve(uid(1));
        assert!(cache.reject(uid(1), "user not found"));
        assert!(!cache.resolve(uid(1), "late", None));

        assert_eq!(
            cache.get(uid(1)).unwrap().state,
            IdentityState::Failed {
                reason: "user not found".to_string()
            }
        );
    }

    #[test]
    fn reject_after_resolve_is_ignored() {
        let cache = IdentityCache::new();
        cache.reserve(uid(2));
        assert!(cache.resolve(uid(2), "z", Some("z".to_string())));
        assert!(!cache.reject(uid(2), "too late"));
        assert!(!cache.resolve(uid(2), "other", None));

        assert_eq!(cache.get(uid(2)).unwrap().name(), Some("z"));
    }

    #[test]
    fn reserving_a_settled_id_does_not_re_pend() {
        let cache = IdentityCache::new();
        cache.reserve(uid(3));
        cache.resolve(uid(3), "n", None);
        assert!(!cache.reserve(uid(3)));
        assert!(cache.get(uid(3)).unwrap().state.is_terminal());
    }

    #[test]
    fn settling_unknown_id_is_a_no_op() {
        let cache = IdentityCache::new();
        assert!(!cache.resolve(uid(9), "ghost", None));
        assert!(!cache.reject(uid(9), "ghost"));
        assert!(cache.is_empty());
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let cache = IdentityCache::new();
        cache.reserve(uid(10001));
        assert_eq!(cache.get(uid(10001)).unwrap().display_name(), "10001");
        cache.reject(uid(10001), "gone");
        assert_eq!(cache.get(uid(10001)).unwrap().display_name(), "10001");

        cache.reserve(uid(10002));
        cache.resolve(uid(10002), "z", None);
        assert_eq!(cache.get(uid(10002)).unwrap().display_name(), "z");
    }

    #[tokio::test]
    async fn handle_wakes_on_settlement() {
        let cache = std::sync::Arc::new(IdentityCache::new());
        cache.reserve(uid(5));
        let handle = cache.subscribe(uid(5)).unwrap();
        assert_eq!(handle.current().state, IdentityState::Pending);

        let settler = cache.clone();
        tokio::spawn(async move {
            settler.resolve(uid(5), "five", None);
        });

        let record = handle.settled().await.unwrap();
        assert_eq!(record.name(), Some("five"));
    }

    #[tokio::test]
    async fn handle_on_settled_entry_returns_immediately() {
        let cache = IdentityCache::new();
        cache.reserve(uid(6));
        cache.reject(uid(6), "nope");

        let record = cache.subscribe(uid(6)).unwrap().settled().await.unwrap();
        assert_eq!(
            record.state,
            IdentityState::Failed {
                reason: "nope".to_string()
            }
        );
    }

    #[tokio::test]
    async fn eviction_releases_waiters() {
        let cache = IdentityCache::new();
        cache.reserve(uid(7));
        let handle = cache.subscribe(uid(7)).unwrap();

        assert!(cache.evict(uid(7)));
        assert!(handle.settled().await.is_none());
        assert!(cache.reserve(uid(7)));
    }

    #[tokio::test]
    async fn events_report_each_terminal_transition_once() {
        let cache = IdentityCache::new();
        let mut events = cache.events();
        cache.reserve(uid(1));
        cache.reserve(uid(2));

        cache.resolve(uid(1), "a", None);
        cache.resolve(uid(1), "again", None);
        cache.reject(uid(2), "missing");

        assert_eq!(
            events.recv().await.unwrap(),
            IdentityEvent::Resolved {
                id: uid(1),
                name: "a".to_string(),
                username: None
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            IdentityEvent::Failed {
                id: uid(2),
                reason: "missing".to_string()
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn evicted_id_reports_again_after_resettling() {
        let cache = IdentityCache::new();
        let mut events = cache.events();
        cache.reserve(uid(4));
        cache.reject(uid(4), "first");
        cache.evict(uid(4));
        cache.reserve(uid(4));
        cache.resolve(uid(4), "second", None);

        let first = events.recv().await.unwrap();
        let second = events.recv().await.unwrap();
        assert_eq!(first.id(), uid(4));
        assert_eq!(second.id(), uid(4));
        assert!(matches!(second, IdentityEvent::Resolved { name, .. } if name == "second"));
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = IdentityCache::new();
        cache.reserve(uid(1));
        cache.reserve(uid(2));
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.has(uid(1)));
    }
}
