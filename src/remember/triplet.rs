//! Cookie value layout: `identity|current_token|persistent_token`.

use std::fmt;

use super::cookie::is_cookie_value;

pub const DELIMITER: char = '|';

/// Whether `identity` can be carried as the first cookie segment: non-empty,
/// RFC 6265 cookie octets only, and no delimiter.
#[must_use]
pub fn valid_identity(identity: &str) -> bool {
    !identity.is_empty() && !identity.contains(DELIMITER) && is_cookie_value(identity)
}

/// One login chain as carried by the client.
///
/// The salt is never part of this value; see [`Triplet::salted`].
#[derive(Clone, PartialEq, Eq)]
pub struct Triplet {
    identity: String,
    current_token: String,
    persistent_token: String,
}

impl Triplet {
    #[must_use]
    pub fn new(
        identity: impl Into<String>,
        current_token: impl Into<String>,
        persistent_token: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            current_token: current_token.into(),
            persistent_token: persistent_token.into(),
        }
    }

    /// Parse a transported value.
    ///
    /// Splitting stops after the second delimiter. Returns `None` when fewer
    /// than three parts are present or any part is empty.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.splitn(3, DELIMITER);
        let identity = parts.next()?;
        let current_token = parts.next()?;
        let persistent_token = parts.next()?;
        if identity.is_empty() || current_token.is_empty() || persistent_token.is_empty() {
            return None;
        }
        Some(Self::new(identity, current_token, persistent_token))
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn current_token(&self) -> &str {
        &self.current_token
    }

    #[must_use]
    pub fn persistent_token(&self) -> &str {
        &self.persistent_token
    }

    /// Same chain with a new current token.
    #[must_use]
    pub fn rotate(&self, current_token: impl Into<String>) -> Self {
        Self {
            identity: self.identity.clone(),
            current_token: current_token.into(),
            persistent_token: self.persistent_token.clone(),
        }
    }

    /// Tokens with `salt` appended, as handed to the store for comparison or
    /// storage. The result must never be written back to the client.
    #[must_use]
    pub fn salted(&self, salt: &str) -> Self {
        Self {
            identity: self.identity.clone(),
            current_token: format!("{}{salt}", self.current_token),
            persistent_token: format!("{}{salt}", self.persistent_token),
        }
    }

    /// Value written to the cookie.
    #[must_use]
    pub fn to_cookie_value(&self) -> String {
        format!(
            "{}{DELIMITER}{}{DELIMITER}{}",
            self.identity, self.current_token, self.persistent_token
        )
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Triplet")
            .field("identity", &self.identity)
            .field("current_token", &"[REDACTED]")
            .field("persistent_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_three_parts() {
        let triplet = Triplet::parse("u1|tA|pA").unwrap();
        assert_eq!(triplet.identity(), "u1");
        assert_eq!(triplet.current_token(), "tA");
        assert_eq!(triplet.persistent_token(), "pA");
    }

    #[test]
    fn parse_stops_at_second_delimiter() {
        let triplet = Triplet::parse("u1|tA|pA|extra").unwrap();
        assert_eq!(triplet.identity(), "u1");
        assert_eq!(triplet.persistent_token(), "pA|extra");
    }

    #[test]
    fn parse_rejects_short_values() {
        assert!(Triplet::parse("").is_none());
        assert!(Triplet::parse("u1").is_none());
        assert!(Triplet::parse("u1|tA").is_none());
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert!(Triplet::parse("u1||pA").is_none());
        assert!(Triplet::parse("|tA|pA").is_none());
        assert!(Triplet::parse("u1|tA|").is_none());
    }

    #[test]
    fn identity_rules() {
        assert!(valid_identity("u1"));
        assert!(valid_identity("alice@example.com"));
        assert!(!valid_identity(""));
        assert!(!valid_identity("a|b"));
        assert!(!valid_identity("Alice Smith"));
        assert!(!valid_identity("josé"));
        assert!(!valid_identity("a,b"));
        assert!(!valid_identity("a;b"));
        assert!(!valid_identity("\"quoted\""));
        assert!(!valid_identity("back\\slash"));
    }

    #[test]
    fn cookie_value_matches_parse_input() {
        let triplet = Triplet::new("u1", "tA", "pA");
        assert_eq!(triplet.to_cookie_value(), "u1|tA|pA");
    }

    #[test]
    fn rotate_keeps_identity_and_persistent_token() {
        let rotated = Triplet::new("u1", "tA", "pA").rotate("tB");
        assert_eq!(rotated, Triplet::new("u1", "tB", "pA"));
    }

    #[test]
    fn salted_appends_to_both_tokens() {
        let salted = Triplet::new("u1", "tA", "pA").salted("10.0.0.1");
        assert_eq!(salted.identity(), "u1");
        assert_eq!(salted.current_token(), "tA10.0.0.1");
        assert_eq!(salted.persistent_token(), "pA10.0.0.1");
    }

    #[test]
    fn debug_redacts_tokens() {
        let output = format!("{:?}", Triplet::new("u1", "secret-a", "secret-b"));
        assert!(output.contains("u1"));
        assert!(!output.contains("secret-a"));
        assert!(!output.contains("secret-b"));
    }
}
