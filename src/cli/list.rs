//! `vaultkeep list` — print stored snapshots in sequence order.

use crate::cli::guarded;
use crate::store::Store;
use crate::Result;
use clap::Args;

#[derive(Args)]
pub struct ListArgs {}

pub fn run(store: &mut Store, _args: ListArgs) -> Result<()> {
    let records = guarded(store, "list", &[], |store| Ok(store.ledger.list().into_iter().cloned().collect::<Vec<_>>()))?;

    if records.is_empty() {
        println!("no snapshots");
        return Ok(());
    }

    for record in records {
        println!(
            "{:<4} {:<24} {:<20} {} files, {} chunks  root={}",
            record.sequence, record.id, record.label, record.total_files, record.total_chunks, record.merkle_root
        );
    }
    Ok(())
}
