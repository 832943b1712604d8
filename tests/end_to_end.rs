//! Integration tests exercising the full store stack across module
//! boundaries, one test per documented end-to-end scenario.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vaultkeep::audit::Status;
use vaultkeep::policy::{Decision, Policy};
use vaultkeep::store::Store;
use vaultkeep::{backup, restore, verify, Error, Result};

fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// E1 Round-trip: a small file and a >1 MiB file both restore bit-exact.
#[test]
fn round_trip_restores_small_and_large_files() -> Result<()> {
    let temp = TempDir::new()?;
    let source = temp.path().join("d");
    write_file(&source.join("a.txt"), b"hello");
    let big = vec![b'x'; 1_500_000];
    write_file(&source.join("b.txt"), &big);

    let mut store = Store::init(temp.path().join("s"))?;
    let outcome = backup::backup(&mut store, &source, "l1")?;

    let restored = temp.path().join("r");
    restore::restore(&store, &outcome.snapshot_id, &restored)?;

    assert_eq!(fs::read(restored.join("a.txt"))?, b"hello");
    assert_eq!(fs::read(restored.join("b.txt"))?, big);
    Ok(())
}

/// E2 Dedup: two files with identical 1 MiB content share one chunk.
#[test]
fn identical_content_across_files_dedups_in_storage() -> Result<()> {
    let temp = TempDir::new()?;
    let source = temp.path().join("d");
    let content = vec![b'z'; 1024 * 1024];
    write_file(&source.join("a.bin"), &content);
    write_file(&source.join("b.bin"), &content);

    let mut store = Store::init(temp.path().join("s"))?;
    let outcome = backup::backup(&mut store, &source, "l1")?;
    let manifest = store.manifests.load(&outcome.snapshot_id)?;
    assert_eq!(manifest.files[0].chunks, manifest.files[1].chunks);

    let mut chunk_file_count = 0;
    for entry in walkdir::WalkDir::new(temp.path().join("s").join("chunks")) {
        if entry?.file_type().is_file() {
            chunk_file_count += 1;
        }
    }
    assert_eq!(chunk_file_count, 1);
    Ok(())
}

/// E3 Tamper chunk: flipping a byte under `chunks/` is caught by verify.
#[test]
fn flipping_a_byte_in_a_chunk_is_caught_by_verify() -> Result<()> {
    let temp = TempDir::new()?;
    let source = temp.path().join("d");
    write_file(&source.join("a.txt"), b"some file content here");

    let mut store = Store::init(temp.path().join("s"))?;
    let outcome = backup::backup(&mut store, &source, "l1")?;

    let manifest = store.manifests.load(&outcome.snapshot_id)?;
    let digest = &manifest.files[0].chunks[0];
    let (shard, file) = digest.split_at(2);
    let chunk_path = temp.path().join("s").join("chunks").join(shard).join(file);
    let mut bytes = fs::read(&chunk_path)?;
    bytes[0] ^= 0xFF;
    fs::write(&chunk_path, bytes)?;

    let result = verify::verify(&store, &outcome.snapshot_id);
    assert!(matches!(result, Err(Error::ChunkCorrupted { .. })));
    Ok(())
}

/// E4 Tamper manifest: renaming a stored path surfaces as a manifest
/// hash or Merkle mismatch, never a silent pass.
#[test]
fn renaming_a_path_in_the_stored_manifest_is_caught_by_verify() -> Result<()> {
    let temp = TempDir::new()?;
    let source = temp.path().join("d");
    write_file(&source.join("a.txt"), b"content a");
    write_file(&source.join("b.txt"), b"content b");

    let mut store = Store::init(temp.path().join("s"))?;
    let outcome = backup::backup(&mut store, &source, "l1")?;

    let mut manifest = store.manifests.load(&outcome.snapshot_id)?;
    manifest.files[0].path = "renamed.txt".to_string();
    manifest.write_to(store.manifests.path_for(&outcome.snapshot_id))?;

    let result = verify::verify(&store, &outcome.snapshot_id);
    assert!(matches!(
        result,
        Err(Error::ManifestCorrupted { .. }) | Err(Error::MerkleMismatch { .. })
    ));
    Ok(())
}

/// E5 Rollback: zeroing a later snapshot's `prev_root` is detected by
/// chain verification.
#[test]
fn zeroing_prev_root_on_the_second_snapshot_is_detected_as_rollback() -> Result<()> {
    let temp = TempDir::new()?;
    let source = temp.path().join("d");
    write_file(&source.join("a.txt"), b"v1");

    let mut store = Store::init(temp.path().join("s"))?;
    let first = backup::backup(&mut store, &source, "l1")?;

    write_file(&source.join("a.txt"), b"v2, a bit different");
    let second = backup::backup(&mut store, &source, "l2")?;
    drop(store);

    let metadata_path = temp.path().join("s").join("metadata.json");
    let mut value: serde_json::Value = serde_json::from_slice(&fs::read(&metadata_path)?)?;
    value["snapshots"][&second.snapshot_id]["prev_root"] = serde_json::Value::String(vaultkeep::hash::ZERO.to_string());
    fs::write(&metadata_path, serde_json::to_vec(&value)?)?;

    let store = Store::open(temp.path().join("s"))?;
    let result = store.ledger.verify_chain(&second.snapshot_id);
    assert!(matches!(result, Err(Error::RollbackDetected { .. })));
    // the untouched first snapshot is unaffected.
    store.ledger.verify_chain(&first.snapshot_id)?;
    Ok(())
}

/// E6 Crash: a BEGIN with no COMMIT (simulating a kill mid-backup) is
/// rolled back on reopen, and the store remains usable afterward.
#[test]
fn an_incomplete_transaction_is_rolled_back_on_reopen_and_store_stays_usable() -> Result<()> {
    let temp = TempDir::new()?;
    let source = temp.path().join("d");
    write_file(&source.join("a.txt"), b"first backup, complete");

    let mut store = Store::init(temp.path().join("s"))?;
    let completed = backup::backup(&mut store, &source, "l1")?;

    // Simulate a crash mid-transaction: a BEGIN with no COMMIT.
    store.journal.begin("snap_9_deadbeef")?;
    drop(store);

    let mut reopened = Store::open(temp.path().join("s"))?;
    let ids: Vec<String> = reopened.ledger.list().iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec![completed.snapshot_id.clone()]);
    assert!(!reopened.manifests.load("snap_9_deadbeef").is_ok());

    write_file(&source.join("b.txt"), b"second backup after crash recovery");
    let second = backup::backup(&mut reopened, &source, "l2")?;
    reopened.ledger.verify_chain(&second.snapshot_id)?;
    Ok(())
}

/// E7 Policy deny + audit: a role lacking `backup` is denied, the audit
/// log records a DENY entry, and the log still verifies clean.
#[test]
fn a_role_without_backup_permission_is_denied_and_audited() -> Result<()> {
    let temp = TempDir::new()?;
    let mut store = Store::init(temp.path().join("s"))?;

    let policy = Policy::default_table();
    assert_eq!(policy.allow("auditor", "backup"), Decision::Deny);

    store
        .audit
        .append(1_000, "auditor", "backup", &["--label".into(), "l1".into()], Status::Deny, None)?;

    store.audit.verify()?;
    Ok(())
}

/// E8 Audit tamper: appending "TAMPERED" to the log is caught by
/// audit-verify, which names the offending line.
#[test]
fn appending_tampered_text_to_the_audit_log_is_caught() -> Result<()> {
    let temp = TempDir::new()?;
    let store = Store::init(temp.path().join("s"))?;
    store
        .audit
        .append(1_000, "alice", "backup", &["l1".into()], Status::Ok, None)?;

    use std::io::Write;
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(temp.path().join("s").join("audit.log"))?;
    writeln!(file, "TAMPERED")?;

    let result = store.audit.verify();
    assert!(matches!(result, Err(Error::AuditCorrupted { line: 2 })));
    Ok(())
}
