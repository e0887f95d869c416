//! On-disk persistence for the session's quote rows and cost params.
//!
//! State is wrapped in a versioned envelope so an old build refuses a newer
//! file instead of mangling it, and saves go through a staged sibling file
//! so a crash mid-write never truncates the last good state.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::PersistedState;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "ImportCostEstimator";
const APP_NAME: &str = "ImportCostEstimator";
const STATE_FILENAME: &str = "state.json";

/// Bumped whenever the persisted layout changes shape.
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedDocument {
    schema_version: u32,
    /// Unix timestamp (seconds) of the save.
    saved_at: u64,
    state: PersistedState,
}

#[derive(Debug, Error)]
pub enum PersistSaveError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Restore the previous session's rows and params, best effort. Anything
/// unreadable, or written by a different schema, is ignored with a warning.
pub fn load_persisted_state() -> Option<PersistedState> {
    let path = state_path()?;
    let data = fs::read_to_string(&path).ok()?;
    let state = decode_state(&data)?;
    debug!("restored {} rows from {}", state.rows.len(), path.display());
    Some(state)
}

/// Save the session state, replacing the previous file in one rename.
pub fn save_persisted_state(state: &PersistedState) -> Result<(), PersistSaveError> {
    let path = state_path().ok_or(PersistSaveError::StorageUnavailable)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let staged = path.with_extension("json.tmp");
    fs::write(&staged, encode_state(state)?)?;
    fs::rename(&staged, &path)?;
    Ok(())
}

fn state_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(STATE_FILENAME))
}

fn encode_state(state: &PersistedState) -> Result<String, serde_json::Error> {
    let saved_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    serde_json::to_string_pretty(&PersistedDocument {
        schema_version: SCHEMA_VERSION,
        saved_at,
        state: state.clone(),
    })
}

/// Unwrap the envelope and sanitize what it carried: rows saved without ids
/// (hand-edited files, older saves) get fresh ones.
fn decode_state(data: &str) -> Option<PersistedState> {
    let document: PersistedDocument = match serde_json::from_str(data) {
        Ok(document) => document,
        Err(error) => {
            warn!("ignoring unreadable state file: {error}");
            return None;
        }
    };

    if document.schema_version != SCHEMA_VERSION {
        warn!(
            "ignoring state file with schema {} (this build speaks {SCHEMA_VERSION})",
            document.schema_version
        );
        return None;
    }

    let mut state = document.state;
    for row in &mut state.rows {
        row.ensure_id();
    }
    Some(state)
}
