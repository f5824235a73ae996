//! Authenticator configuration.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_COOKIE_NAME: &str = "REMEMBERME";
pub const DEFAULT_EXPIRE_TIME_SECONDS: i64 = 7 * 24 * 60 * 60;

/// RFC 6265 cookie names are HTTP tokens.
#[must_use]
pub fn valid_cookie_name(name: &str) -> bool {
    Regex::new(r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+$").is_ok_and(|re| re.is_match(name))
}

#[derive(Clone, Debug)]
pub struct AuthenticatorConfig {
    cookie_name: String,
    expire_time_seconds: i64,
    salt: SecretString,
    clean_stored_tokens_on_invalid_result: bool,
    clean_expired_tokens_on_login: bool,
}

impl AuthenticatorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            expire_time_seconds: DEFAULT_EXPIRE_TIME_SECONDS,
            salt: SecretString::from(String::new()),
            clean_stored_tokens_on_invalid_result: true,
            clean_expired_tokens_on_login: false,
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: String) -> Self {
        self.cookie_name = name;
        self
    }

    /// Lifetime of both the stored triplet and the cookie, from the moment
    /// it is created or rotated.
    #[must_use]
    pub fn with_expire_time_seconds(mut self, seconds: i64) -> Self {
        self.expire_time_seconds = seconds;
        self
    }

    /// Context bound into every stored token, e.g. the client address.
    #[must_use]
    pub fn with_salt(mut self, salt: SecretString) -> Self {
        self.salt = salt;
        self
    }

    #[must_use]
    pub fn with_clean_stored_tokens_on_invalid_result(mut self, clean: bool) -> Self {
        self.clean_stored_tokens_on_invalid_result = clean;
        self
    }

    #[must_use]
    pub fn with_clean_expired_tokens_on_login(mut self, clean: bool) -> Self {
        self.clean_expired_tokens_on_login = clean;
        self
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn expire_time_seconds(&self) -> i64 {
        self.expire_time_seconds
    }

    pub(crate) fn salt(&self) -> &str {
        self.salt.expose_secret()
    }

    #[must_use]
    pub fn clean_stored_tokens_on_invalid_result(&self) -> bool {
        self.clean_stored_tokens_on_invalid_result
    }

    #[must_use]
    pub fn clean_expired_tokens_on_login(&self) -> bool {
        self.clean_expired_tokens_on_login
    }
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self::new()
    }
}
