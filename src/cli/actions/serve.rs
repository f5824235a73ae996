use crate::{
    api::{self, ApiState},
    cli::{actions::database, commands::cookie},
    remember::{
        Authenticator, AuthenticatorConfig, CookieOptions, OsRngTokenSource, PgTripletStore,
    },
};
use anyhow::Result;
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub issuer_token: Option<SecretString>,
    pub sweep_interval: Option<Duration>,
    pub cookie: cookie::Options,
}

impl Args {
    fn authenticator_config(&self) -> AuthenticatorConfig {
        let mut config = AuthenticatorConfig::new()
            .with_cookie_name(self.cookie.cookie_name.clone())
            .with_expire_time_seconds(self.cookie.expire_time_seconds)
            .with_clean_stored_tokens_on_invalid_result(
                self.cookie.clean_stored_tokens_on_invalid_result,
            )
            .with_clean_expired_tokens_on_login(self.cookie.clean_expired_tokens_on_login);
        if let Some(salt) = &self.cookie.salt {
            config = config.with_salt(salt.clone());
        }
        config
    }

    fn cookie_options(&self) -> CookieOptions {
        CookieOptions::new()
            .with_path(self.cookie.cookie_path.clone())
            .with_domain(self.cookie.cookie_domain.clone())
            .with_secure(self.cookie.cookie_secure)
    }
}

/// Execute the serve action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let pool = database::connect(&args.dsn).await?;
    let store = PgTripletStore::new(pool.clone());
    store.ensure_schema().await?;

    let authenticator = Authenticator::new(
        args.authenticator_config(),
        Arc::new(store),
        Arc::new(OsRngTokenSource),
    );

    let state = ApiState::new(authenticator, args.cookie_options())
        .with_issuer_token(args.issuer_token.clone())
        .with_pool(pool);

    api::new(args.port, Arc::new(state), args.sweep_interval).await
}

fn log_startup_args(args: &Args) {
    info!(
        port = args.port,
        dsn = %database::redact_dsn(&args.dsn),
        cookie_name = %args.cookie.cookie_name,
        cookie_secure = args.cookie.cookie_secure,
        expire_time_seconds = args.cookie.expire_time_seconds,
        salt_set = args.cookie.salt.is_some(),
        issuer_token_set = args.issuer_token.is_some(),
        sweep_interval_seconds = args.sweep_interval.map_or(0, |d| d.as_secs()),
        "Startup configuration"
    );
}
