//! Cookie transport: how the triplet reaches and leaves the client.

use anyhow::{anyhow, Context, Result};
use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use std::collections::HashMap;

use super::now_unix_seconds;

/// Read/write access to one request's cookie channel.
///
/// Implementations are created per request; the authenticator never keeps one.
pub trait CookieTransport: Send {
    /// Value of the named cookie sent by the client, if any.
    fn read(&self, name: &str) -> Option<String>;

    /// Queue the named cookie for the client, valid until `expires_at`
    /// (unix seconds).
    ///
    /// # Errors
    /// Returns an error if the value cannot be represented on the channel.
    fn write(&mut self, name: &str, value: &str, expires_at: i64) -> Result<()>;

    /// Remove the named cookie from the client by writing an already
    /// expired empty value.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    fn clear(&mut self, name: &str) -> Result<()> {
        self.write(name, "", 0)
    }
}

/// Attributes attached to every `Set-Cookie` written by [`HttpCookies`].
#[derive(Clone, Debug)]
pub struct CookieOptions {
    path: String,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
}

impl CookieOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: String) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn http_only(&self) -> bool {
        self.http_only
    }
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// RFC 6265 `cookie-octet`.
fn is_cookie_octet(c: char) -> bool {
    matches!(c, '\x21' | '\x23'..='\x2B' | '\x2D'..='\x3A' | '\x3C'..='\x5B' | '\x5D'..='\x7E')
}

/// Whether `value` can be sent as a cookie value without quoting.
pub(crate) fn is_cookie_value(value: &str) -> bool {
    value.chars().all(is_cookie_octet)
}

/// Cookie transport over HTTP headers.
///
/// Inbound cookies are parsed once from the request `Cookie` headers; writes
/// accumulate `Set-Cookie` values for the response.
#[derive(Debug)]
pub struct HttpCookies {
    inbound: HashMap<String, String>,
    options: CookieOptions,
    outbound: Vec<HeaderValue>,
}

impl HttpCookies {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, options: CookieOptions) -> Self {
        let mut inbound = HashMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(value) = header.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                let mut parts = pair.trim().splitn(2, '=');
                let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                    continue;
                };
                // First occurrence wins, matching the most specific path.
                inbound
                    .entry(key.trim().to_string())
                    .or_insert_with(|| val.trim().to_string());
            }
        }

        Self {
            inbound,
            options,
            outbound: Vec::new(),
        }
    }

    /// `Set-Cookie` values written so far.
    #[must_use]
    pub fn set_cookies(&self) -> &[HeaderValue] {
        &self.outbound
    }

    /// Response headers carrying every queued `Set-Cookie`.
    #[must_use]
    pub fn into_headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in self.outbound {
            headers.append(SET_COOKIE, value);
        }
        headers
    }

    fn render(&self, name: &str, value: &str, expires_at: i64) -> String {
        let max_age = expires_at.saturating_sub(now_unix_seconds()).max(0);
        let mut cookie = format!("{name}={value}; Path={}", self.options.path());
        if let Some(domain) = self.options.domain() {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        cookie.push_str(&format!("; Max-Age={max_age}"));
        if self.options.http_only() {
            cookie.push_str("; HttpOnly");
        }
        cookie.push_str("; SameSite=Lax");
        if self.options.secure() {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl CookieTransport for HttpCookies {
    fn read(&self, name: &str) -> Option<String> {
        self.inbound.get(name).cloned()
    }

    fn write(&mut self, name: &str, value: &str, expires_at: i64) -> Result<()> {
        if let Some(c) = value.chars().find(|c| !is_cookie_octet(*c)) {
            return Err(anyhow!("cookie value contains invalid character {c:?}"));
        }
        let cookie = self.render(name, value, expires_at);
        let header = HeaderValue::from_str(&cookie).context("invalid Set-Cookie header")?;
        self.outbound.push(header);
        Ok(())
    }
}

/// One write recorded by [`MemoryCookies`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieWrite {
    pub name: String,
    pub value: String,
    pub expires_at: i64,
}

/// In-process cookie jar; stands in for a browser in tests and tooling.
#[derive(Clone, Debug, Default)]
pub struct MemoryCookies {
    inbound: HashMap<String, String>,
    writes: Vec<CookieWrite>,
}

impl MemoryCookies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jar that presents `value` under `name`.
    #[must_use]
    pub fn with_cookie(name: &str, value: &str) -> Self {
        let mut jar = Self::new();
        jar.inbound.insert(name.to_string(), value.to_string());
        jar
    }

    #[must_use]
    pub fn writes(&self) -> &[CookieWrite] {
        &self.writes
    }

    #[must_use]
    pub fn last_write(&self) -> Option<&CookieWrite> {
        self.writes.last()
    }

    /// Jar for the client's next request: every cookie whose last write is
    /// unexpired, the way a browser would send them back.
    #[must_use]
    pub fn next_request(&self) -> Self {
        let now = now_unix_seconds();
        let mut inbound = self.inbound.clone();
        for write in &self.writes {
            if write.expires_at > now {
                inbound.insert(write.name.clone(), write.value.clone());
            } else {
                inbound.remove(&write.name);
            }
        }
        Self {
            inbound,
            writes: Vec::new(),
        }
    }
}

impl CookieTransport for MemoryCookies {
    fn read(&self, name: &str) -> Option<String> {
        self.inbound.get(name).cloned()
    }

    fn write(&mut self, name: &str, value: &str, expires_at: i64) -> Result<()> {
        self.writes.push(CookieWrite {
            name: name.to_string(),
            value: value.to_string(),
            expires_at,
        });
        Ok(())
    }
}
