//! Persistent login ("remember me") with rotating triplets.
//!
//! A client holds `identity|current_token|persistent_token`. The
//! [`Authenticator`] validates it against a [`TripletStore`], replaces the
//! current token on every successful use and revokes the chain when a stale
//! current token shows up.

pub mod authenticator;
pub mod config;
pub mod cookie;
pub mod storage;
pub mod token;
pub mod triplet;

pub use self::authenticator::{Authenticator, LoginOutcome};
pub use self::config::AuthenticatorConfig;
pub use self::cookie::{CookieOptions, CookieTransport, HttpCookies, MemoryCookies};
pub use self::storage::{MemoryTripletStore, PgTripletStore, TripletLookup, TripletStore};
pub use self::token::{OsRngTokenSource, TokenSource};
pub use self::triplet::Triplet;

use std::time::SystemTime;

/// Current time as unix seconds.
#[must_use]
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
