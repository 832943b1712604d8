//! OS user discovery (spec §6's "OS user interface consumed").

use crate::{Error, Result};

/// Return the invoking user's name, or `Error::Identity` if the host
/// can't tell us (the orchestrator records this as a `FAIL` audit
/// entry and aborts, per spec §6).
pub fn current_user() -> Result<String> {
    let name = whoami::username();
    if name.trim().is_empty() {
        return Err(Error::Identity);
    }
    Ok(name)
}
