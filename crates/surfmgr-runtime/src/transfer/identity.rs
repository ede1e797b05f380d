//! Fresh machine and session identifiers for an application's data folder.
//!
//! Every `*.json` file below the data root is scanned; known identifier keys
//! that are present get new values. `storage.json` always receives the
//! machine id keys, even when it has none yet.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::{Map, Value};
use surfmgr_core::TransferError;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

const MACHINE_ID_KEYS: [&str; 2] = ["machineId", "telemetry.machineId"];
const SESSION_ID_KEY: &str = "sessionId";
const STORAGE_FILE: &str = "storage.json";

/// Result of an identifier refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRefresh {
    pub machine_id: String,
    pub session_id: String,
    /// Identifier keys written, across all files.
    pub keys_updated: usize,
    pub files_updated: usize,
}

/// Replace the identifiers stored under `data_root` with new random ones.
///
/// Files that cannot be read, are not JSON objects or cannot be written are
/// skipped.
pub fn regenerate_ids(data_root: &Path) -> Result<IdentityRefresh, TransferError> {
    if !data_root.is_dir() {
        return Err(TransferError::Io {
            path: data_root.to_path_buf(),
            kind: io::ErrorKind::NotFound,
            message: "Data folder not found".to_string(),
        });
    }

    let mut refresh = IdentityRefresh {
        machine_id: Uuid::new_v4().to_string(),
        session_id: Uuid::new_v4().to_string(),
        keys_updated: 0,
        files_updated: 0,
    };

    let json_files = WalkDir::new(data_root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"));

    for entry in json_files {
        let path = entry.path();
        let Some(mut object) = read_object(path) else {
            continue;
        };
        let is_storage = entry.file_name() == STORAGE_FILE;
        let updated = rewrite_ids(&mut object, is_storage, &refresh.machine_id, &refresh.session_id);
        if updated == 0 {
            continue;
        }

        let written = serde_json::to_vec_pretty(&Value::Object(object))
            .map_err(io::Error::other)
            .and_then(|json| fs::write(path, json));
        match written {
            Ok(()) => {
                debug!(path = %path.display(), updated, "Rewrote identifiers");
                refresh.keys_updated += updated;
                refresh.files_updated += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Could not write identifiers"),
        }
    }

    info!(
        data_root = %data_root.display(),
        keys = refresh.keys_updated,
        files = refresh.files_updated,
        "Generated new identifiers"
    );
    Ok(refresh)
}

fn read_object(path: &Path) -> Option<Map<String, Value>> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(object)) => Some(object),
        _ => {
            debug!(path = %path.display(), "Skipping non-object JSON file");
            None
        }
    }
}

/// Overwrite identifier keys in `object`, returning how many were written.
fn rewrite_ids(object: &mut Map<String, Value>, force_machine_id: bool, machine_id: &str, session_id: &str) -> usize {
    let mut updated = 0;
    let had_machine_id = object.contains_key(MACHINE_ID_KEYS[0]);

    for key in MACHINE_ID_KEYS {
        if object.contains_key(key) || (force_machine_id && !had_machine_id) {
            object.insert(key.to_string(), Value::String(machine_id.to_string()));
            updated += 1;
        }
    }
    if object.contains_key(SESSION_ID_KEY) {
        object.insert(SESSION_ID_KEY.to_string(), Value::String(session_id.to_string()));
        updated += 1;
    }
    updated
}
