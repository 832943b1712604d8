//! vaultkeep - command-line entry point.

use clap::Parser;
use vaultkeep::cli::{self, Cli, Commands};
use vaultkeep::store::Store;
use vaultkeep::{logging, Result};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let parsed = Cli::parse();
    logging::init_logging(parsed.verbose)?;

    let mut store = match &parsed.command {
        Commands::Init(_) => Store::init(&parsed.store)?,
        _ => Store::open(&parsed.store)?,
    };

    match parsed.command {
        Commands::Init(args) => cli::init::run(&mut store, args),
        Commands::Backup(args) => cli::backup::run(&mut store, args),
        Commands::List(args) => cli::list::run(&mut store, args),
        Commands::Verify(args) => cli::verify::run(&mut store, args),
        Commands::Restore(args) => cli::restore::run(&mut store, args),
        Commands::AuditVerify(args) => cli::audit_verify::run(&mut store, args),
    }
}
