//! `vaultkeep restore` — rebuild a snapshot's files on disk.

use crate::cli::guarded;
use crate::restore::restore;
use crate::store::Store;
use crate::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct RestoreArgs {
    /// Snapshot id to restore.
    pub snapshot_id: String,

    /// Directory to restore into.
    #[arg(short, long)]
    pub target: PathBuf,
}

pub fn run(store: &mut Store, args: RestoreArgs) -> Result<()> {
    let audit_args = vec![args.snapshot_id.clone(), args.target.display().to_string()];
    let outcome = guarded(store, "restore", &audit_args, |store| {
        restore(store, &args.snapshot_id, &args.target)
    })?;

    println!("snapshot {} restored to {}", outcome.snapshot_id, args.target.display());
    println!("  files: {}", outcome.files_written);
    println!("  bytes: {}", outcome.bytes_written);
    Ok(())
}
