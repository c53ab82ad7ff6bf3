//! Persistence of the player credential between runs.
//!
//! The backend issues the identity as a cookie with a one-hour lifetime;
//! this store mirrors that lifetime on disk so a restarted client resumes
//! its session, and so terminal sessions leave nothing behind.

use std::{
    fs, io,
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Lifetime of a stored credential, matching the backend cookie.
const CREDENTIAL_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    player_id: String,
    expires_at: u64,
}

/// File-backed store for the opaque player identity.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    /// Store reading and writing the given credential file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load a previously stored identity.
    ///
    /// Expired or unreadable credentials are removed and reported as
    /// absent, forcing a fresh registration.
    pub fn load(&self) -> Option<String> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read credential");
                return None;
            }
        };

        match serde_json::from_str::<StoredCredential>(&contents) {
            Ok(credential) if credential.expires_at > unix_now() => Some(credential.player_id),
            Ok(_) => {
                debug!(path = %self.path.display(), "stored credential expired");
                self.discard();
                None
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "malformed credential file");
                self.discard();
                None
            }
        }
    }

    /// Persist a freshly issued identity with the standard lifetime.
    pub fn store(&self, player_id: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let credential = StoredCredential {
            player_id: player_id.to_owned(),
            expires_at: unix_now() + CREDENTIAL_TTL.as_secs(),
        };
        let contents = serde_json::to_string(&credential)?;
        fs::write(&self.path, contents)
    }

    /// Remove the stored identity, if any.
    pub fn discard(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "credential discarded"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to remove credential")
            }
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
