//! Command-line interface for `vaultkeep`.
//!
//! Every subcommand routes through [`guarded`], which resolves the
//! invoking user, checks the policy table, runs the operation, and
//! writes exactly one audit entry — `OK`, `DENY`, or `FAIL` — before
//! returning (spec §6/§7).

use crate::audit::Status;
use crate::identity;
use crate::policy::{Decision, Policy};
use crate::store::Store;
use crate::{Error, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

pub mod audit_verify;
pub mod backup;
pub mod init;
pub mod list;
pub mod restore;
pub mod verify;

/// vaultkeep - content-addressed backup with Merkle integrity and a
/// tamper-evident audit trail.
#[derive(Parser)]
#[command(name = "vaultkeep")]
#[command(about = "Content-addressed backup engine with chunked storage, Merkle integrity, and audit trail")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Path to the backup store root.
    #[arg(long, global = true, default_value = ".vaultkeep")]
    pub store: std::path::PathBuf,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new backup store.
    Init(init::InitArgs),
    /// Create a backup snapshot.
    Backup(backup::BackupArgs),
    /// List stored snapshots.
    List(list::ListArgs),
    /// Verify a snapshot's integrity.
    Verify(verify::VerifyArgs),
    /// Restore a snapshot to a target directory.
    Restore(restore::RestoreArgs),
    /// Verify the audit log's hash chain.
    AuditVerify(audit_verify::AuditVerifyArgs),
}

/// Run `op` under the audit/policy guard shared by every subcommand.
///
/// `command` and `args` are recorded on every branch: `DENY` before
/// `op` ever runs, `OK`/`FAIL` after it returns. An identity-probe
/// failure is itself recorded (`user` falls back to `"unknown"`, the
/// only way to keep the audit line's fixed token count when the OS
/// can't name the caller) and short-circuits before the policy check.
pub fn guarded<T>(
    store: &mut Store,
    command: &str,
    args: &[String],
    op: impl FnOnce(&mut Store) -> Result<T>,
) -> Result<T> {
    let unix_ms = Utc::now().timestamp_millis() as u128;

    let user = match identity::current_user() {
        Ok(user) => user,
        Err(e) => {
            store
                .audit
                .append(unix_ms, "unknown", command, args, Status::Fail, Some(&e.to_string()))?;
            return Err(e);
        }
    };

    let policy = Policy::default_table();
    if policy.allow(&user, command) == Decision::Deny {
        store.audit.append(unix_ms, &user, command, args, Status::Deny, None)?;
        return Err(Error::PermissionDenied {
            user,
            command: command.to_string(),
        });
    }

    match op(store) {
        Ok(value) => {
            store.audit.append(unix_ms, &user, command, args, Status::Ok, None)?;
            Ok(value)
        }
        Err(e) => {
            store
                .audit
                .append(unix_ms, &user, command, args, Status::Fail, Some(&e.to_string()))?;
            Err(e)
        }
    }
}
