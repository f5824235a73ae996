//! Cookie and rotation policy arguments for `serve`.

use clap::{builder::ValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

use crate::remember::config::{valid_cookie_name, DEFAULT_COOKIE_NAME};

pub const ARG_COOKIE_NAME: &str = "cookie-name";
pub const ARG_COOKIE_DOMAIN: &str = "cookie-domain";
pub const ARG_COOKIE_PATH: &str = "cookie-path";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_EXPIRE_TIME: &str = "expire-time";
pub const ARG_SALT: &str = "salt";
pub const ARG_NO_CLEAN_ON_INVALID: &str = "no-clean-on-invalid";
pub const ARG_CLEAN_EXPIRED_ON_LOGIN: &str = "clean-expired-on-login";

#[must_use]
pub fn validator_cookie_name() -> ValueParser {
    ValueParser::from(move |name: &str| -> std::result::Result<String, String> {
        if valid_cookie_name(name) {
            Ok(name.to_string())
        } else {
            Err("invalid cookie name".to_string())
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_COOKIE_NAME)
                .long(ARG_COOKIE_NAME)
                .help("Name of the remember-me cookie")
                .env("REMEMBERME_COOKIE_NAME")
                .default_value(DEFAULT_COOKIE_NAME)
                .value_parser(validator_cookie_name()),
        )
        .arg(
            Arg::new(ARG_COOKIE_DOMAIN)
                .long(ARG_COOKIE_DOMAIN)
                .help("Domain attribute of the cookie (host-only when unset)")
                .env("REMEMBERME_COOKIE_DOMAIN"),
        )
        .arg(
            Arg::new(ARG_COOKIE_PATH)
                .long(ARG_COOKIE_PATH)
                .help("Path attribute of the cookie")
                .env("REMEMBERME_COOKIE_PATH")
                .default_value("/"),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Only send the cookie over HTTPS")
                .env("REMEMBERME_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_EXPIRE_TIME)
                .long(ARG_EXPIRE_TIME)
                .help("Lifetime of a triplet and its cookie in seconds")
                .env("REMEMBERME_EXPIRE_TIME")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SALT)
                .long(ARG_SALT)
                .help("Secret appended to tokens before they are stored or compared")
                .env("REMEMBERME_SALT")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_NO_CLEAN_ON_INVALID)
                .long(ARG_NO_CLEAN_ON_INVALID)
                .help("Keep other triplets of an identity when a replayed token is detected")
                .env("REMEMBERME_NO_CLEAN_ON_INVALID")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_CLEAN_EXPIRED_ON_LOGIN)
                .long(ARG_CLEAN_EXPIRED_ON_LOGIN)
                .help("Delete expired triplets on every login attempt")
                .env("REMEMBERME_CLEAN_EXPIRED_ON_LOGIN")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug)]
pub struct Options {
    pub cookie_name: String,
    pub cookie_domain: Option<String>,
    pub cookie_path: String,
    pub cookie_secure: bool,
    pub expire_time_seconds: i64,
    pub salt: Option<SecretString>,
    pub clean_stored_tokens_on_invalid_result: bool,
    pub clean_expired_tokens_on_login: bool,
}

impl Options {
    /// Parse cookie arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // Helper to filter empty strings which clap might pass through if env vars are set to ""
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        Ok(Self {
            cookie_name: get_non_empty(ARG_COOKIE_NAME)
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_COOKIE_NAME}"))?,
            cookie_domain: get_non_empty(ARG_COOKIE_DOMAIN),
            cookie_path: get_non_empty(ARG_COOKIE_PATH).unwrap_or_else(|| "/".to_string()),
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
            expire_time_seconds: matches
                .get_one::<i64>(ARG_EXPIRE_TIME)
                .copied()
                .unwrap_or(crate::remember::config::DEFAULT_EXPIRE_TIME_SECONDS),
            salt: get_non_empty(ARG_SALT).map(SecretString::from),
            clean_stored_tokens_on_invalid_result: !matches.get_flag(ARG_NO_CLEAN_ON_INVALID),
            clean_expired_tokens_on_login: matches.get_flag(ARG_CLEAN_EXPIRED_ON_LOGIN),
        })
    }
}
