//! Triplet rotation protocol.
//!
//! Every successful [`Authenticator::login`] replaces the presented current
//! token, so a copied cookie works at most once. Presenting a live persistent
//! token with a stale current token is treated as theft.

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    config::AuthenticatorConfig,
    cookie::{is_cookie_value, CookieTransport},
    now_unix_seconds,
    storage::{TripletLookup, TripletStore},
    token::TokenSource,
    triplet::{valid_identity, Triplet, DELIMITER},
};

/// Outcome of a login attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The cookie was valid and has been rotated.
    Authenticated(String),
    /// No cookie, a malformed cookie, or no live triplet for it.
    NotAuthenticated,
    /// A stale current token was presented for a live chain. The cookie has
    /// been cleared and, depending on configuration, every chain of the
    /// identity revoked.
    Invalid,
}

impl LoginOutcome {
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::NotAuthenticated | Self::Invalid => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Whether the attempt looked like a replayed token, so the caller can
    /// warn the user.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }
}

pub struct Authenticator {
    config: AuthenticatorConfig,
    store: Arc<dyn TripletStore>,
    tokens: Arc<dyn TokenSource>,
}

impl Authenticator {
    #[must_use]
    pub fn new(
        config: AuthenticatorConfig,
        store: Arc<dyn TripletStore>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            config,
            store,
            tokens,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    fn presented_triplet<C: CookieTransport + ?Sized>(&self, cookies: &C) -> Option<Triplet> {
        let value = cookies.read(self.config.cookie_name())?;
        let triplet = Triplet::parse(&value);
        if triplet.is_none() {
            debug!("ignoring malformed remember-me cookie");
        }
        triplet
    }

    /// Authenticate from the request cookie, rotating the current token on
    /// success.
    ///
    /// # Errors
    /// Returns store, token source, or transport errors unchanged.
    #[instrument(skip_all)]
    pub async fn login<C: CookieTransport + ?Sized>(&self, cookies: &mut C) -> Result<LoginOutcome> {
        let Some(triplet) = self.presented_triplet(cookies) else {
            return Ok(LoginOutcome::NotAuthenticated);
        };

        let now = now_unix_seconds();
        if self.config.clean_expired_tokens_on_login() {
            let removed = self.store.clean_expired_tokens(now).await?;
            debug!(removed, "swept expired triplets");
        }

        let salted = triplet.salted(self.config.salt());
        match self.store.find_triplet(&salted, now).await? {
            TripletLookup::Found => self.rotate(&triplet, &salted, now, cookies).await,
            TripletLookup::Invalid => self.reject(&triplet, cookies).await,
            TripletLookup::NotFound => {
                debug!(identity = triplet.identity(), "no live triplet for cookie");
                Ok(LoginOutcome::NotAuthenticated)
            }
        }
    }

    async fn rotate<C: CookieTransport + ?Sized>(
        &self,
        triplet: &Triplet,
        salted: &Triplet,
        now: i64,
        cookies: &mut C,
    ) -> Result<LoginOutcome> {
        let rotated = triplet.rotate(self.tokens.create_token()?);
        let cookie_value = rotated.to_cookie_value();
        if !is_cookie_value(&cookie_value) {
            bail!("token source produced a value that cannot be sent in a cookie");
        }
        let expires_at = now.saturating_add(self.config.expire_time_seconds());

        let swapped = self
            .store
            .replace_triplet(
                &rotated.salted(self.config.salt()),
                salted.current_token(),
                expires_at,
            )
            .await?;

        if !swapped {
            // Another request rotated or removed this chain after our lookup.
            debug!(identity = triplet.identity(), "lost triplet rotation race");
            return match self.store.find_triplet(salted, now).await? {
                TripletLookup::Invalid => self.reject(triplet, cookies).await,
                TripletLookup::Found | TripletLookup::NotFound => {
                    Ok(LoginOutcome::NotAuthenticated)
                }
            };
        }

        cookies.write(self.config.cookie_name(), &cookie_value, expires_at)?;
        info!(identity = triplet.identity(), "remember-me login");
        Ok(LoginOutcome::Authenticated(triplet.identity().to_string()))
    }

    async fn reject<C: CookieTransport + ?Sized>(
        &self,
        triplet: &Triplet,
        cookies: &mut C,
    ) -> Result<LoginOutcome> {
        warn!(
            identity = triplet.identity(),
            "stale remember-me token presented, possible theft"
        );
        cookies.clear(self.config.cookie_name())?;
        if self.config.clean_stored_tokens_on_invalid_result() {
            let removed = self.store.clean_all_triplets(triplet.identity()).await?;
            warn!(
                identity = triplet.identity(),
                removed, "revoked all remember-me triplets"
            );
        }
        Ok(LoginOutcome::Invalid)
    }

    /// Check the request cookie without rotating or otherwise mutating
    /// anything.
    ///
    /// # Errors
    /// Returns store errors unchanged.
    #[instrument(skip_all)]
    pub async fn cookie_is_valid<C: CookieTransport + ?Sized>(&self, cookies: &C) -> Result<bool> {
        let Some(triplet) = self.presented_triplet(cookies) else {
            return Ok(false);
        };
        let salted = triplet.salted(self.config.salt());
        let lookup = self.store.find_triplet(&salted, now_unix_seconds()).await?;
        Ok(lookup == TripletLookup::Found)
    }

    /// Start a new login chain for `identity` and write its cookie.
    ///
    /// Only call this once the application has verified the identity by
    /// other means.
    ///
    /// # Errors
    /// Returns an error if `identity` cannot be carried in the cookie, or
    /// on store, token source, or transport failure.
    #[instrument(skip(self, cookies))]
    pub async fn create_cookie<C: CookieTransport + ?Sized>(
        &self,
        identity: &str,
        cookies: &mut C,
    ) -> Result<()> {
        if !valid_identity(identity) {
            bail!("identity must be non-empty cookie octets without {DELIMITER:?}");
        }

        let triplet = Triplet::new(
            identity,
            self.tokens.create_token()?,
            self.tokens.create_token()?,
        );
        // Nothing is stored unless the value can reach the client.
        let cookie_value = triplet.to_cookie_value();
        if !is_cookie_value(&cookie_value) {
            bail!("token source produced a value that cannot be sent in a cookie");
        }
        let expires_at = now_unix_seconds().saturating_add(self.config.expire_time_seconds());

        self.store
            .store_triplet(&triplet.salted(self.config.salt()), expires_at)
            .await?;
        cookies.write(self.config.cookie_name(), &cookie_value, expires_at)?;
        info!(identity, "remember-me cookie created");
        Ok(())
    }

    /// Log out: clear the cookie and delete the chain it names.
    ///
    /// Returns `true` only when a stored triplet matched the cookie. With no
    /// cookie nothing is touched; a malformed or stale cookie is still
    /// cleared.
    ///
    /// # Errors
    /// Returns store or transport errors unchanged.
    #[instrument(skip_all)]
    pub async fn clear_cookie<C: CookieTransport + ?Sized>(&self, cookies: &mut C) -> Result<bool> {
        let Some(value) = cookies.read(self.config.cookie_name()) else {
            return Ok(false);
        };

        cookies.clear(self.config.cookie_name())?;

        let Some(triplet) = Triplet::parse(&value) else {
            return Ok(false);
        };
        let salted = triplet.salted(self.config.salt());
        let removed = self
            .store
            .clean_triplet(salted.identity(), salted.persistent_token())
            .await?;
        debug!(identity = triplet.identity(), removed, "remember-me cookie cleared");
        Ok(removed)
    }

    /// Remove every triplet that has already expired.
    ///
    /// # Errors
    /// Returns store errors unchanged.
    pub async fn clean_expired_tokens(&self) -> Result<u64> {
        self.store.clean_expired_tokens(now_unix_seconds()).await
    }
}
