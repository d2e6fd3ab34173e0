use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub mod logging;

use crate::identity::{ENV_IDENTITY_KEY, ENV_IDENTITY_URL};

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("sidra-edge")
        .about("SidraOS edge routing guard")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("SIDRA_EDGE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("upstream")
                .short('u')
                .long("upstream")
                .help("Base URL of the upstream application server")
                .default_value("http://localhost:3000")
                .env("SIDRA_EDGE_UPSTREAM"),
        )
        .arg(
            Arg::new("identity-url")
                .long("identity-url")
                .help("Identity provider base URL; omit together with the key for no-auth mode")
                .env(ENV_IDENTITY_URL),
        )
        .arg(
            Arg::new("identity-key")
                .long("identity-key")
                .help("Identity provider service key")
                .env(ENV_IDENTITY_KEY),
        );

    logging::with_args(command)
}

/// Identity credentials come as a pair or not at all.
///
/// # Errors
/// Returns a message naming the missing half.
pub fn validate(matches: &clap::ArgMatches) -> Result<(), String> {
    let url = matches.get_one::<String>("identity-url");
    let key = matches.get_one::<String>("identity-key");
    match (url, key) {
        (Some(_), None) => Err("--identity-key is required with --identity-url".to_string()),
        (None, Some(_)) => Err("--identity-url is required with --identity-key".to_string()),
        _ => Ok(()),
    }
}
