//! `vaultkeep init` — lay out a fresh, empty backup store.

use crate::cli::guarded;
use crate::store::Store;
use crate::Result;
use clap::Args;

#[derive(Args)]
pub struct InitArgs {}

/// The on-disk layout is created by [`Store::init`] before this runs;
/// `run` exists so `init` still goes through the same policy/audit path
/// as every other command.
pub fn run(store: &mut Store, _args: InitArgs) -> Result<()> {
    guarded(store, "init", &[], |_store| Ok(()))
}
