use std::cmp::Ordering;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored backup, identified by its name within the backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl BackupEntry {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
        }
    }

    /// Newest first, ties broken by id ascending.
    #[must_use]
    pub fn cmp_newest_first(&self, other: &Self) -> Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Backups that fall outside the retention window.
///
/// `retention == 0` keeps everything. Otherwise entries are ordered newest
/// first (ties by id) and everything after the first `retention` is returned,
/// in that same order.
#[must_use]
pub fn next_backups_to_prune(existing: &[BackupEntry], retention: u32) -> Vec<BackupEntry> {
    if retention == 0 {
        return Vec::new();
    }
    let keep = usize::try_from(retention).unwrap_or(usize::MAX);

    let mut ordered = existing.to_vec();
    ordered.sort_by(BackupEntry::cmp_newest_first);
    ordered.into_iter().skip(keep).collect()
}

/// List the entries of a backup directory, using modification time as the
/// creation time. A missing directory has no backups.
///
/// # Errors
/// Returns an error if the directory exists but cannot be read.
pub fn scan_backups(dir: &Path) -> std::io::Result<Vec<BackupEntry>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error),
    };

    let mut backups = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        backups.push(BackupEntry::new(name, DateTime::<Utc>::from(modified)));
    }
    backups.sort_by(BackupEntry::cmp_newest_first);
    Ok(backups)
}
