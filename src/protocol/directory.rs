use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::keys::HybridPublicKeys;

/// Lookup of published public keys by user id. Implemented by whatever
/// stores user identities; `HybridProtocol` only reads from it.
pub trait PeerKeyDirectory: Send + Sync {
    fn public_keys(&self, user_id: &str) -> Option<HybridPublicKeys>;
}

/// Process-local directory, mostly useful in tests and single-node setups.
#[derive(Debug, Default)]
pub struct InMemoryKeyDirectory {
    entries: RwLock<HashMap<String, HybridPublicKeys>>,
}

impl InMemoryKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or rotate) a user's keys, returning the previous entry.
    pub fn insert(&self, user_id: impl Into<String>, keys: HybridPublicKeys) -> Option<HybridPublicKeys> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.into(), keys)
    }

    pub fn remove(&self, user_id: &str) -> Option<HybridPublicKeys> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PeerKeyDirectory for InMemoryKeyDirectory {
    fn public_keys(&self, user_id: &str) -> Option<HybridPublicKeys> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HybridKeyPair;

    #[test]
    fn test_insert_lookup_remove() {
        let dir = InMemoryKeyDirectory::new();
        assert!(dir.is_empty());

        let alice = HybridKeyPair::generate_from_seed(&[1u8; 32]).unwrap().public_keys();
        assert!(dir.insert("alice", alice.clone()).is_none());
        assert_eq!(dir.public_keys("alice"), Some(alice.clone()));
        assert_eq!(dir.public_keys("bob"), None);

        let rotated = HybridKeyPair::generate_from_seed(&[2u8; 32]).unwrap().public_keys();
        assert_eq!(dir.insert("alice", rotated.clone()), Some(alice));
        assert_eq!(dir.len(), 1);

        assert_eq!(dir.remove("alice"), Some(rotated));
        assert!(dir.is_empty());
    }
}
