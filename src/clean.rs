//! Emptying the download and converted-card folders between decks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What happened to one directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanStatus {
    Removed { path: PathBuf },
    Failed { path: PathBuf, reason: String },
    /// The directory itself does not exist; nothing to do.
    MissingDir { path: PathBuf },
}

impl fmt::Display for CleanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanStatus::Removed { path } => write!(f, "Removed: {}", path.display()),
            CleanStatus::Failed { path, reason } => {
                write!(f, "Error removing {}: {reason}", path.display())
            }
            CleanStatus::MissingDir { path } => {
                write!(f, "{} does not exist, skipping", path.display())
            }
        }
    }
}

/// Remove every file and sub-directory inside each of `dirs`, keeping the
/// directories themselves.
pub fn clean_dirs<P: AsRef<Path>>(dirs: &[P]) -> Vec<CleanStatus> {
    let mut statuses = Vec::new();
    for dir in dirs {
        let dir = dir.as_ref();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                statuses.push(CleanStatus::MissingDir {
                    path: dir.to_path_buf(),
                });
                continue;
            }
            Err(e) => {
                statuses.push(CleanStatus::Failed {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        for entry in entries {
            let status = match entry {
                Ok(entry) => remove_entry(&entry.path()),
                Err(e) => CleanStatus::Failed {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                },
            };
            match &status {
                CleanStatus::Failed { .. } => warn!("{status}"),
                _ => info!("{status}"),
            }
            statuses.push(status);
        }
    }
    statuses
}

fn remove_entry(path: &Path) -> CleanStatus {
    // symlink_metadata: a link to a directory is removed, not followed.
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => CleanStatus::Removed {
            path: path.to_path_buf(),
        },
        Err(e) => CleanStatus::Failed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    }
}
