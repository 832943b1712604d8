//! `vaultkeep backup` — snapshot a source directory.

use crate::backup::backup;
use crate::cli::guarded;
use crate::store::Store;
use crate::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct BackupArgs {
    /// Directory to back up.
    #[arg(short, long)]
    pub source: PathBuf,

    /// Human-readable label for this snapshot.
    #[arg(short, long, default_value = "backup")]
    pub label: String,
}

pub fn run(store: &mut Store, args: BackupArgs) -> Result<()> {
    let audit_args = vec![args.source.display().to_string(), args.label.clone()];
    let outcome = guarded(store, "backup", &audit_args, |store| {
        backup(store, &args.source, &args.label)
    })?;

    println!("snapshot {} committed", outcome.snapshot_id);
    println!("  files:       {}", outcome.total_files);
    println!("  chunks:      {}", outcome.total_chunks);
    println!("  merkle root: {}", outcome.merkle_root);
    Ok(())
}
