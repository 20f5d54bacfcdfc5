//! Persisted set of chats paired with the bot.
//!
//! A chat has to be paired before gated commands are honored. The set is
//! stored as a sorted JSON array of chat ids:
//!
//! ```text
//! [-1001234567890, 42, 100]
//! ```
//!
//! The older `{"42": true}` object form is still accepted on read.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{JsonFileStore, Store};

/// The set of paired chat ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PairingSet {
    chats: BTreeSet<i64>,
}

impl PairingSet {
    pub fn contains(&self, chat_id: i64) -> bool {
        self.chats.contains(&chat_id)
    }

    /// Adds a chat. Returns false if it was already paired.
    pub fn insert(&mut self, chat_id: i64) -> bool {
        self.chats.insert(chat_id)
    }

    /// Removes a chat. Returns false if it was not paired.
    pub fn remove(&mut self, chat_id: i64) -> bool {
        self.chats.remove(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.chats.iter().copied()
    }
}

impl FromIterator<i64> for PairingSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            chats: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for PairingSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StoredPairings {
            List(Vec<i64>),
            Flags(BTreeMap<String, bool>),
        }

        match StoredPairings::deserialize(deserializer)? {
            StoredPairings::List(ids) => Ok(ids.into_iter().collect()),
            StoredPairings::Flags(flags) => flags
                .into_iter()
                .filter(|(_, paired)| *paired)
                .map(|(id, _)| {
                    id.trim()
                        .parse::<i64>()
                        .map_err(|_| serde::de::Error::custom(format!("invalid chat id {id:?}")))
                })
                .collect(),
        }
    }
}

/// Pair, unpair and membership checks against a store.
///
/// Every call goes back to storage; there is no in-process cache.
#[derive(Debug)]
pub struct PairingStore<S = JsonFileStore<PairingSet>> {
    store: S,
}

impl PairingStore {
    /// Opens a pairing store backed by a JSON file.
    pub fn open(path: impl Into<PathBuf>, locking: bool) -> Self {
        Self::new(JsonFileStore::new(path).with_locking(locking))
    }
}

impl<S: Store<PairingSet>> PairingStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pairs a chat. Returns true if it was not paired before.
    pub fn pair(&self, chat_id: i64) -> Result<bool> {
        let added = self.store.update(|set| set.insert(chat_id))?;
        if added {
            info!(chat_id, "Chat paired");
        } else {
            debug!(chat_id, "Chat already paired");
        }
        Ok(added)
    }

    /// Unpairs a chat. Returns true if it was paired before.
    pub fn unpair(&self, chat_id: i64) -> Result<bool> {
        let removed = self.store.update(|set| set.remove(chat_id))?;
        if removed {
            info!(chat_id, "Chat unpaired");
        } else {
            debug!(chat_id, "Chat was not paired");
        }
        Ok(removed)
    }

    /// Whether a chat is paired. A store that was never written holds no chats.
    pub fn is_paired(&self, chat_id: i64) -> Result<bool> {
        Ok(self.store.load()?.contains(chat_id))
    }

    /// All paired chats in ascending order.
    pub fn paired_chats(&self) -> Result<Vec<i64>> {
        Ok(self.store.load()?.iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_pair_and_unpair() {
        let pairings = PairingStore::new(MemoryStore::<PairingSet>::default());

        assert!(!pairings.is_paired(100).unwrap());
        assert!(pairings.pair(100).unwrap());
        assert!(pairings.is_paired(100).unwrap());
        assert!(pairings.unpair(100).unwrap());
        assert!(!pairings.is_paired(100).unwrap());
    }

    #[test]
    fn test_pair_is_idempotent() {
        let pairings = PairingStore::new(MemoryStore::<PairingSet>::default());

        assert!(pairings.pair(5).unwrap());
        assert!(!pairings.pair(5).unwrap());
        assert_eq!(pairings.paired_chats().unwrap(), vec![5]);
    }

    #[test]
    fn test_unpair_unknown_chat() {
        let pairings = PairingStore::new(MemoryStore::<PairingSet>::default());
        pairings.pair(1).unwrap();

        assert!(!pairings.unpair(2).unwrap());
        assert_eq!(pairings.paired_chats().unwrap(), vec![1]);
    }

    #[test]
    fn test_serializes_as_sorted_list() {
        let set: PairingSet = [42, -7, 3].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[-7,3,42]");
    }

    #[test]
    fn test_reads_flag_map() {
        let set: PairingSet =
            serde_json::from_str(r#"{"42": true, "-100": true, "9": false}"#).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![-100, 42]);
    }

    #[test]
    fn test_rejects_non_numeric_flag_keys() {
        let result: std::result::Result<PairingSet, _> =
            serde_json::from_str(r#"{"general": true}"#);
        assert!(result.is_err());
    }
}
