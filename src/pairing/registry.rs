//! In-memory registry of pairing sessions, keyed by session id. Hosts call
//! [`SessionRegistry::sweep_expired`] periodically so abandoned sessions
//! cannot hold key material past their deadline.

use std::collections::HashMap;

use crate::pairing::session::PairingSession;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, PairingSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a session under its id, replacing any previous entry.
    pub fn insert(&mut self, session: PairingSession) {
        self.sessions.insert(session.id.clone(), session);
    }

    pub fn get(&self, id: &str) -> Option<&PairingSession> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PairingSession> {
        self.sessions.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<PairingSession> {
        self.sessions.remove(id)
    }

    /// Expire every session past its deadline and drop it from the registry.
    /// Returns the ids that were swept.
    pub fn sweep_expired(&mut self, now: i64) -> Vec<String> {
        let expired: Vec<String> = self
            .sessions
            .values_mut()
            .filter_map(|session| {
                session.check_expiry(now).then(|| session.id.clone())
            })
            .collect();
        for id in &expired {
            self.sessions.remove(id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
