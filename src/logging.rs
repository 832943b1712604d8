//! `tracing` subscriber wiring for the `vaultkeep` binary.

use crate::Result;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `verbose` widens the default
/// filter from `info` to `debug`; `RUST_LOG` always takes precedence
/// when set.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_filter = if verbose { "vaultkeep=debug" } else { "vaultkeep=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}
