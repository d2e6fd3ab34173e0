//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the server action with its full
//! configuration.

use anyhow::{Context, Result};
use secrecy::SecretString;
use url::Url;

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands;
use crate::identity::IdentityConfig;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    commands::validate(matches).map_err(|e| anyhow::anyhow!(e))?;

    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let upstream = matches
        .get_one::<String>("upstream")
        .context("missing required argument: --upstream")?;
    let upstream = Url::parse(upstream).context("invalid SIDRA_EDGE_UPSTREAM")?;

    let identity = match (
        matches.get_one::<String>("identity-url"),
        matches.get_one::<String>("identity-key"),
    ) {
        (Some(url), Some(key)) => Some(
            IdentityConfig::new(url, SecretString::from(key.clone()))
                .context("invalid SIDRA_IDENTITY_URL")?,
        ),
        _ => None,
    };

    Ok(Action::Server(Args {
        port,
        upstream,
        identity,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_server_action() {
        temp_env::with_vars(
            [
                ("SIDRA_IDENTITY_URL", None::<&str>),
                ("SIDRA_IDENTITY_KEY", None::<&str>),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "sidra-edge",
                    "--port",
                    "9000",
                    "--upstream",
                    "http://app.internal:3000",
                ]);
                let Action::Server(args) = handler(&matches).unwrap();
                assert_eq!(args.port, 9000);
                assert_eq!(args.upstream.as_str(), "http://app.internal:3000/");
                assert!(args.identity.is_none());
            },
        );
    }

    #[test]
    fn dispatches_with_identity_pair() {
        temp_env::with_vars(
            [
                ("SIDRA_IDENTITY_URL", Some("https://id.sidraos.app")),
                ("SIDRA_IDENTITY_KEY", Some("anon-key")),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["sidra-edge"]);
                let Action::Server(args) = handler(&matches).unwrap();
                let identity = args.identity.unwrap();
                assert_eq!(identity.url.as_str(), "https://id.sidraos.app/");
            },
        );
    }

    #[test]
    fn rejects_half_configured_identity() {
        temp_env::with_vars(
            [
                ("SIDRA_IDENTITY_URL", None::<&str>),
                ("SIDRA_IDENTITY_KEY", Some("anon-key")),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["sidra-edge"]);
                assert!(handler(&matches).is_err());
            },
        );
    }

    #[test]
    fn rejects_invalid_upstream() {
        let matches = commands::new().get_matches_from(vec![
            "sidra-edge",
            "--upstream",
            "not a url",
        ]);
        assert!(handler(&matches).is_err());
    }
}
