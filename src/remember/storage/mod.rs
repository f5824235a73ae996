//! Triplet persistence contract and its backends.
//!
//! Every token argument reaching a store is already salted by the
//! authenticator. Stores own all mutual exclusion: `replace_triplet` is a
//! compare-and-swap on the current token so two requests presenting the same
//! token can never both rotate it.

pub mod memory;
pub mod postgres;

pub use self::memory::MemoryTripletStore;
pub use self::postgres::PgTripletStore;

use anyhow::Result;
use async_trait::async_trait;

use super::triplet::Triplet;

/// Result of looking up a presented triplet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TripletLookup {
    /// Unexpired triplet with both tokens matching.
    Found,
    /// No unexpired triplet for `(identity, persistent_token)`.
    NotFound,
    /// The persistent token is live but the current token is stale.
    Invalid,
}

#[async_trait]
pub trait TripletStore: Send + Sync {
    /// Classify `triplet` against stored state at time `now`.
    async fn find_triplet(&self, triplet: &Triplet, now: i64) -> Result<TripletLookup>;

    /// Insert `triplet`, replacing any entry with the same
    /// `(identity, persistent_token)`.
    async fn store_triplet(&self, triplet: &Triplet, expires_at: i64) -> Result<()>;

    /// Swap the current token of `triplet`'s chain from `previous_token` to
    /// `triplet.current_token()` and move its expiry.
    ///
    /// Returns `false`, changing nothing, when the stored current token is no
    /// longer `previous_token` or the entry is gone.
    async fn replace_triplet(
        &self,
        triplet: &Triplet,
        previous_token: &str,
        expires_at: i64,
    ) -> Result<bool>;

    /// Delete the one triplet for `(identity, persistent_token)`.
    ///
    /// Returns whether an entry was removed.
    async fn clean_triplet(&self, identity: &str, persistent_token: &str) -> Result<bool>;

    /// Delete every triplet for `identity`, returning how many were removed.
    async fn clean_all_triplets(&self, identity: &str) -> Result<u64>;

    /// Delete every triplet expiring at or before `cutoff`, returning how many
    /// were removed.
    async fn clean_expired_tokens(&self, cutoff: i64) -> Result<u64>;
}
