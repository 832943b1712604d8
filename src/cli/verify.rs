//! `vaultkeep verify` — re-check a snapshot's integrity stack.

use crate::cli::guarded;
use crate::store::Store;
use crate::verify::verify;
use crate::Result;
use clap::Args;

#[derive(Args)]
pub struct VerifyArgs {
    /// Snapshot id to verify.
    pub snapshot_id: String,
}

pub fn run(store: &mut Store, args: VerifyArgs) -> Result<()> {
    let audit_args = vec![args.snapshot_id.clone()];
    let report = guarded(store, "verify", &audit_args, |store| verify(store, &args.snapshot_id))?;

    println!("snapshot {} verified ok", report.snapshot_id);
    println!("  files:  {}", report.files_checked);
    println!("  chunks: {}", report.chunks_checked);
    Ok(())
}
