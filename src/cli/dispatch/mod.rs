use crate::cli::{
    actions::{migrate, serve, sweep, Action},
    commands::{self, cookie},
};
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use std::time::Duration;

fn dsn(matches: &clap::ArgMatches) -> Result<String> {
    matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .filter(|v| !v.trim().is_empty())
        .context("missing required argument: --dsn")
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::CMD_SERVE, sub_m)) => {
            let port = sub_m
                .get_one::<u16>(commands::ARG_PORT)
                .copied()
                .unwrap_or(8080);
            let issuer_token = sub_m
                .get_one::<String>(commands::ARG_ISSUER_TOKEN)
                .filter(|v| !v.trim().is_empty())
                .map(|v| SecretString::from(v.clone()));
            let sweep_interval = sub_m
                .get_one::<u64>(commands::ARG_SWEEP_INTERVAL)
                .copied()
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs);

            Ok(Action::Serve(serve::Args {
                port,
                dsn: dsn(sub_m)?,
                issuer_token,
                sweep_interval,
                cookie: cookie::Options::parse(sub_m)?,
            }))
        }
        Some((commands::CMD_SWEEP, sub_m)) => Ok(Action::Sweep(sweep::Args { dsn: dsn(sub_m)? })),
        Some((commands::CMD_MIGRATE, sub_m)) => {
            Ok(Action::Migrate(migrate::Args { dsn: dsn(sub_m)? }))
        }
        Some((name, _)) => bail!("unknown subcommand: {name}"),
        None => bail!("missing subcommand"),
    }
}
