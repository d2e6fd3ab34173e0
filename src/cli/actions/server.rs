use anyhow::Result;
use tracing::debug;
use url::Url;

use crate::edge::{self, EdgeConfig};
use crate::identity::IdentityConfig;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub upstream: Url,
    pub identity: Option<IdentityConfig>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the route policy is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        "starting edge on port {} for upstream {}",
        args.port, args.upstream
    );

    edge::new(EdgeConfig {
        port: args.port,
        upstream: args.upstream,
        identity: args.identity,
    })
    .await
}
