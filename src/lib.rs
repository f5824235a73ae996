//! # rememberme
//!
//! Persistent ("remember me") login for web applications, built on rotating
//! cookie triplets.
//!
//! A client holds `identity|current_token|persistent_token`. Each successful
//! login swaps the current token for a fresh one, so a stolen cookie is good
//! for one use at most. When a live persistent token arrives with an already
//! rotated current token, the cookie is cleared and every chain of that
//! identity is revoked.
//!
//! The protocol lives in [`remember`]; [`api`] exposes it over HTTP and
//! [`cli`] wires up configuration, logging and the database.

pub mod api;
pub mod cli;
pub mod remember;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
