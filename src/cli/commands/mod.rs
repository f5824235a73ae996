use crate::GIT_COMMIT_HASH;
use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub mod cookie;
pub mod logging;

pub const ARG_DSN: &str = "dsn";
pub const ARG_PORT: &str = "port";
pub const ARG_ISSUER_TOKEN: &str = "issuer-token";
pub const ARG_SWEEP_INTERVAL: &str = "sweep-interval";

pub const CMD_SERVE: &str = "serve";
pub const CMD_SWEEP: &str = "sweep";
pub const CMD_MIGRATE: &str = "migrate";

fn serve() -> Command {
    let command = Command::new(CMD_SERVE)
        .about("Serve the remember-me HTTP API")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("REMEMBERME_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_ISSUER_TOKEN)
                .long(ARG_ISSUER_TOKEN)
                .help("Bearer token allowed to issue cookies (issuing is disabled when unset)")
                .env("REMEMBERME_ISSUER_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SWEEP_INTERVAL)
                .long(ARG_SWEEP_INTERVAL)
                .help("Seconds between expired triplet sweeps, 0 disables")
                .default_value("3600")
                .env("REMEMBERME_SWEEP_INTERVAL")
                .value_parser(clap::value_parser!(u64)),
        );

    cookie::with_args(command)
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str =
        Box::leak(format!("{} - {}", env!("CARGO_PKG_VERSION"), GIT_COMMIT_HASH).into_boxed_str());

    let command = Command::new("rememberme")
        .about("Persistent login tokens with rotation and replay detection")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("REMEMBERME_DSN")
                .global(true)
                .hide_env_values(true),
        )
        .subcommand(serve())
        .subcommand(Command::new(CMD_SWEEP).about("Delete expired triplets and exit"))
        .subcommand(Command::new(CMD_MIGRATE).about("Create the triplet table if missing"));

    logging::with_args(command)
}
