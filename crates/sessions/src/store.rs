//! In-memory session store keyed by user identifier.
//!
//! Sessions live for the lifetime of the process. Lookup-or-create runs
//! under the map's write lock so two concurrent first messages from the same
//! user always resolve to one [`Session`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use cb_domain::credentials::CredentialSet;
use cb_domain::dialogue::{Dialogue, DialogueTurn};
use cb_domain::trace::TraceEvent;

use crate::credentials::CredentialCache;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// All per-user state: the model dialogue and the cached credentials.
#[derive(Debug)]
pub struct Session {
    user_id: String,
    dialogue: Mutex<Option<Dialogue>>,
    credentials: CredentialCache,
}

impl Session {
    fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_owned(),
            dialogue: Mutex::new(None),
            credentials: CredentialCache::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    pub fn has_dialogue(&self) -> bool {
        self.dialogue.lock().is_some()
    }

    /// Start an empty dialogue if none exists. Returns `true` when a new
    /// dialogue was created.
    pub fn ensure_dialogue(&self) -> bool {
        let mut guard = self.dialogue.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(Dialogue::new());
        true
    }

    /// A copy of the dialogue so far (empty when not started).
    pub fn dialogue_snapshot(&self) -> Dialogue {
        self.dialogue.lock().clone().unwrap_or_default()
    }

    /// Append turns in order, starting the dialogue if needed.
    pub fn append_turns(&self, turns: Vec<DialogueTurn>) {
        self.dialogue
            .lock()
            .get_or_insert_with(Dialogue::new)
            .extend(turns);
    }

    pub fn dialogue_len(&self) -> usize {
        self.dialogue.lock().as_ref().map_or(0, Dialogue::len)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `user_id`, creating an empty one if absent.
    pub fn get_or_create(&self, user_id: &str) -> Arc<Session> {
        // Fast path: read lock.
        if let Some(session) = self.sessions.read().get(user_id) {
            return Arc::clone(session);
        }

        let mut is_new = false;
        let session = {
            let mut map = self.sessions.write();
            Arc::clone(map.entry(user_id.to_owned()).or_insert_with(|| {
                is_new = true;
                Arc::new(Session::new(user_id))
            }))
        };

        if is_new {
            TraceEvent::SessionResolved {
                user_id: user_id.to_owned(),
                is_new: true,
            }
            .emit();
        }
        session
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(user_id).cloned()
    }

    /// Replace the cached credentials of an existing session. A missing
    /// session is left alone; returns whether one was updated.
    pub fn update_credentials(&self, user_id: &str, credentials: CredentialSet) -> bool {
        match self.get(user_id) {
            Some(session) => {
                session.credentials().replace(credentials);
                true
            }
            None => {
                tracing::debug!(user_id, "credential update for unknown session ignored");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(token: &str) -> CredentialSet {
        CredentialSet {
            access_token: token.into(),
            refresh_token: "1//r".into(),
            token_type: "Bearer".into(),
            expiry_unix: 0,
        }
    }

    #[test]
    fn first_lookup_creates_empty_session() {
        let store = SessionStore::new();
        let session = store.get_or_create("5491100000000");
        assert_eq!(session.user_id(), "5491100000000");
        assert!(!session.has_dialogue());
        assert!(session.credentials().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn repeated_lookup_returns_same_session() {
        let store = SessionStore::new();
        let a = store.get_or_create("u1");
        let b = store.get_or_create("u1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_first_lookups_create_one_session() {
        let store = Arc::new(SessionStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.get_or_create("racer"))
            })
            .collect();
        let sessions: Vec<Arc<Session>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(store.len(), 1);
        for s in &sessions[1..] {
            assert!(Arc::ptr_eq(&sessions[0], s));
        }
    }

    #[test]
    fn update_credentials_for_missing_user_is_noop() {
        let store = SessionStore::new();
        assert!(!store.update_credentials("ghost", creds("t")));
        assert!(store.is_empty());
    }

    #[test]
    fn update_credentials_replaces_cached_set() {
        let store = SessionStore::new();
        let session = store.get_or_create("u1");
        session.credentials().replace(creds("old"));
        assert!(store.update_credentials("u1", creds("new")));
        assert_eq!(session.credentials().get().unwrap().access_token, "new");
    }

    #[test]
    fn dialogue_appends_in_order() {
        let store = SessionStore::new();
        let session = store.get_or_create("u1");
        assert!(session.ensure_dialogue());
        assert!(!session.ensure_dialogue());
        session.append_turns(vec![DialogueTurn::user("hola"), DialogueTurn::user("otra")]);
        let snapshot = session.dialogue_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.turns()[0], DialogueTurn::user("hola"));
        assert_eq!(session.dialogue_len(), 2);
    }
}
