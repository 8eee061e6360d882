//! Dissolving recent commits back into the working tree.

use tracing::{debug, info};

use crate::error::ReverseError;
use crate::git::{Gateway, ResetMode};

/// Undo the last `count` commits, keeping their changes unstaged.
///
/// Refuses when any of those commits is reachable from a remote-tracking
/// ref, unless `force` is set. Untracked files are never touched.
pub fn reverse<G: Gateway + ?Sized>(
    gateway: &G,
    count: usize,
    force: bool,
) -> Result<(), ReverseError> {
    if count == 0 {
        return Err(ReverseError::InvalidCount(count));
    }

    if force {
        debug!("Skipping pushed-commit check (--force)");
    } else {
        // Oldest commit being dissolved
        let oldest = format!("HEAD~{}", count - 1);
        if gateway.was_pushed(&oldest)? {
            return Err(ReverseError::PushedCommit { count });
        }
    }

    let target = format!("HEAD~{}", count);
    gateway.reset(ResetMode::Mixed, &target)?;
    info!("Reversed {} commit(s); changes are now unstaged", count);
    Ok(())
}
