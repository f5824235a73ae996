use crate::cli::{actions::Action, commands, dispatch::handler, telemetry};
use anyhow::Result;

/// Start the CLI
/// # Errors
/// Returns an error if logging cannot be initialized or the arguments are inconsistent.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let verbosity_level = get_verbosity_level(&matches);

    telemetry::init(verbosity_level)?;

    let action = handler(&matches)?;

    Ok(action)
}

fn get_verbosity_level(matches: &clap::ArgMatches) -> Option<tracing::Level> {
    match matches
        .get_one::<u8>(commands::logging::ARG_VERBOSITY)
        .map_or(0, |&v| v)
    {
        0 => Some(tracing::Level::ERROR),
        1 => Some(tracing::Level::WARN),
        2 => Some(tracing::Level::INFO),
        3 => Some(tracing::Level::DEBUG),
        4 => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        temp_env::with_vars([("REMEMBERME_LOG_LEVEL", None::<&str>)], || {
            let matches = commands::new().get_matches_from(vec!["rememberme", "sweep"]);
            assert_eq!(get_verbosity_level(&matches), Some(tracing::Level::ERROR));

            let matches = commands::new().get_matches_from(vec!["rememberme", "-vvv", "sweep"]);
            assert_eq!(get_verbosity_level(&matches), Some(tracing::Level::DEBUG));
        });
    }
}
