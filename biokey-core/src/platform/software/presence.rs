use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// One-shot user-presence grants, shared between [`SoftwareAuthenticator`]
/// and [`SoftwareKeyStore`].
///
/// A successful challenge grants exactly one private-key operation on one
/// alias, and only to the call presenting that challenge's id. The operation
/// consumes the grant whether it succeeds or fails, so an authenticated state
/// never outlives a single use and cannot be picked up by a concurrent call.
///
/// [`SoftwareAuthenticator`]: super::SoftwareAuthenticator
/// [`SoftwareKeyStore`]: super::SoftwareKeyStore
#[derive(Debug, Default)]
pub struct PresenceGate {
    granted: Mutex<HashSet<(String, u64)>>,
}

impl PresenceGate {
    /// Creates a gate with no pending grants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful authentication of challenge `challenge_id` for `alias`.
    pub fn grant(&self, alias: &str, challenge_id: u64) {
        self.granted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((alias.to_string(), challenge_id));
    }

    /// Consumes the grant of challenge `challenge_id` for `alias`, returning
    /// whether there was one.
    pub fn take(&self, alias: &str, challenge_id: u64) -> bool {
        self.granted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(alias.to_string(), challenge_id))
    }

    /// Drops every pending grant for `alias` without using it.
    pub fn revoke(&self, alias: &str) {
        self.granted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(granted_alias, _)| granted_alias != alias);
    }
}
