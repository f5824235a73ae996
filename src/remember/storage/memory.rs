//! In-memory triplet store.
//!
//! Suitable for a single process and as the test double for the
//! authenticator. A single mutex serializes every operation, which makes the
//! compare-and-swap in `replace_triplet` trivially atomic.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{TripletLookup, TripletStore};
use crate::remember::triplet::Triplet;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Entry {
    current_token: String,
    expires_at: i64,
}

/// Snapshot row returned by [`MemoryTripletStore::snapshot`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct StoredTriplet {
    pub identity: String,
    pub current_token: String,
    pub persistent_token: String,
    pub expires_at: i64,
}

#[derive(Debug, Default)]
pub struct MemoryTripletStore {
    entries: Mutex<HashMap<(String, String), Entry>>,
}

impl MemoryTripletStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Every stored row, sorted.
    pub async fn snapshot(&self) -> Vec<StoredTriplet> {
        let entries = self.entries.lock().await;
        let mut rows: Vec<StoredTriplet> = entries
            .iter()
            .map(|((identity, persistent_token), entry)| StoredTriplet {
                identity: identity.clone(),
                current_token: entry.current_token.clone(),
                persistent_token: persistent_token.clone(),
                expires_at: entry.expires_at,
            })
            .collect();
        rows.sort();
        rows
    }
}

fn key(identity: &str, persistent_token: &str) -> (String, String) {
    (identity.to_string(), persistent_token.to_string())
}

#[async_trait]
impl TripletStore for MemoryTripletStore {
    async fn find_triplet(&self, triplet: &Triplet, now: i64) -> Result<TripletLookup> {
        let entries = self.entries.lock().await;
        let lookup = match entries.get(&key(triplet.identity(), triplet.persistent_token())) {
            Some(entry) if entry.expires_at > now => {
                if entry.current_token == triplet.current_token() {
                    TripletLookup::Found
                } else {
                    TripletLookup::Invalid
                }
            }
            _ => TripletLookup::NotFound,
        };
        Ok(lookup)
    }

    async fn store_triplet(&self, triplet: &Triplet, expires_at: i64) -> Result<()> {
        self.entries.lock().await.insert(
            key(triplet.identity(), triplet.persistent_token()),
            Entry {
                current_token: triplet.current_token().to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn replace_triplet(
        &self,
        triplet: &Triplet,
        previous_token: &str,
        expires_at: i64,
    ) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(&key(triplet.identity(), triplet.persistent_token())) {
            Some(entry) if entry.current_token == previous_token => {
                entry.current_token = triplet.current_token().to_string();
                entry.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clean_triplet(&self, identity: &str, persistent_token: &str) -> Result<bool> {
        Ok(self
            .entries
            .lock()
            .await
            .remove(&key(identity, persistent_token))
            .is_some())
    }

    async fn clean_all_triplets(&self, identity: &str) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|(stored_identity, _), _| stored_identity != identity);
        Ok((before - entries.len()) as u64)
    }

    async fn clean_expired_tokens(&self, cutoff: i64) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > cutoff);
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[tokio::test]
    async fn find_classifies_lookups() {
        let store = MemoryTripletStore::new();
        store
            .store_triplet(&Triplet::new("u1", "tA", "pA"), NOW + 60)
            .await
            .unwrap();

        let found = store
            .find_triplet(&Triplet::new("u1", "tA", "pA"), NOW)
            .await
            .unwrap();
        let invalid = store
            .find_triplet(&Triplet::new("u1", "stale", "pA"), NOW)
            .await
            .unwrap();
        let missing = store
            .find_triplet(&Triplet::new("u1", "tA", "other"), NOW)
            .await
            .unwrap();
        let other_identity = store
            .find_triplet(&Triplet::new("u2", "tA", "pA"), NOW)
            .await
            .unwrap();

        assert_eq!(found, TripletLookup::Found);
        assert_eq!(invalid, TripletLookup::Invalid);
        assert_eq!(missing, TripletLookup::NotFound);
        assert_eq!(other_identity, TripletLookup::NotFound);
    }

    #[tokio::test]
    async fn expired_triplet_is_not_found() {
        let store = MemoryTripletStore::new();
        store
            .store_triplet(&Triplet::new("u1", "tA", "pA"), NOW)
            .await
            .unwrap();

        let matching = store
            .find_triplet(&Triplet::new("u1", "tA", "pA"), NOW)
            .await
            .unwrap();
        let stale = store
            .find_triplet(&Triplet::new("u1", "tX", "pA"), NOW + 1)
            .await
            .unwrap();
        assert_eq!(matching, TripletLookup::NotFound);
        assert_eq!(stale, TripletLookup::NotFound);
    }

    #[tokio::test]
    async fn store_upserts_same_chain() {
        let store = MemoryTripletStore::new();
        store
            .store_triplet(&Triplet::new("u1", "tA", "pA"), NOW + 60)
            .await
            .unwrap();
        store
            .store_triplet(&Triplet::new("u1", "tB", "pA"), NOW + 120)
            .await
            .unwrap();

        let rows = store.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].current_token, "tB");
        assert_eq!(rows[0].expires_at, NOW + 120);
    }

    #[tokio::test]
    async fn replace_swaps_only_from_expected_token() {
        let store = MemoryTripletStore::new();
        store
            .store_triplet(&Triplet::new("u1", "tA", "pA"), NOW + 60)
            .await
            .unwrap();

        let first = store
            .replace_triplet(&Triplet::new("u1", "tB", "pA"), "tA", NOW + 120)
            .await
            .unwrap();
        let second = store
            .replace_triplet(&Triplet::new("u1", "tC", "pA"), "tA", NOW + 180)
            .await
            .unwrap();
        let missing = store
            .replace_triplet(&Triplet::new("u1", "tD", "nope"), "tA", NOW + 180)
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert!(!missing);
        let rows = store.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].current_token, "tB");
        assert_eq!(rows[0].expires_at, NOW + 120);
    }

    #[tokio::test]
    async fn clean_removes_single_chain() {
        let store = MemoryTripletStore::new();
        for (identity, persistent) in [("u1", "pA"), ("u1", "pB"), ("u2", "pA")] {
            store
                .store_triplet(&Triplet::new(identity, "t", persistent), NOW + 60)
                .await
                .unwrap();
        }

        assert!(store.clean_triplet("u1", "pA").await.unwrap());
        assert!(!store.clean_triplet("u1", "pA").await.unwrap());

        let remaining: Vec<(String, String)> = store
            .snapshot()
            .await
            .into_iter()
            .map(|row| (row.identity, row.persistent_token))
            .collect();
        assert_eq!(
            remaining,
            vec![
                ("u1".to_string(), "pB".to_string()),
                ("u2".to_string(), "pA".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn clean_all_removes_every_chain_of_identity() {
        let store = MemoryTripletStore::new();
        for (identity, persistent) in [("u1", "pA"), ("u1", "pB"), ("u2", "pC")] {
            store
                .store_triplet(&Triplet::new(identity, "t", persistent), NOW + 60)
                .await
                .unwrap();
        }

        assert_eq!(store.clean_all_triplets("u1").await.unwrap(), 2);
        let rows = store.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].identity, "u2");
    }

    #[tokio::test]
    async fn clean_expired_uses_inclusive_cutoff() {
        let store = MemoryTripletStore::new();
        store
            .store_triplet(&Triplet::new("u1", "t", "past"), NOW - 1)
            .await
            .unwrap();
        store
            .store_triplet(&Triplet::new("u1", "t", "edge"), NOW)
            .await
            .unwrap();
        store
            .store_triplet(&Triplet::new("u1", "t", "future"), NOW + 1)
            .await
            .unwrap();

        assert_eq!(store.clean_expired_tokens(NOW).await.unwrap(), 2);
        let rows = store.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].persistent_token, "future");
    }
}
