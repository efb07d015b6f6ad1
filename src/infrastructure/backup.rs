// bmk/src/infrastructure/backup.rs
//
// Snapshot backups via `VACUUM INTO`: atomic, WAL-independent and
// defragmented. Rotation (keep N, delete oldest) is the caller's policy;
// this module only creates, verifies and lists.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::infrastructure::repositories::sqlite::connection;
use crate::infrastructure::repositories::sqlite::repository::SqliteBookmarkRepository;

/// Create a verified snapshot of the repository's database under
/// `backup_dir`, named `<YYYYMMDD-HHMMSS>_<db_name>`.
#[instrument(skip(repository), fields(db = %repository.db_name()), level = "debug")]
pub fn create_backup(
    repository: &SqliteBookmarkRepository,
    backup_dir: &Path,
) -> DomainResult<PathBuf> {
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    create_backup_at(repository, backup_dir, &stamp)
}

/// Backup with an explicit timestamp component; `create_backup` is the
/// wall-clock entry point.
pub fn create_backup_at(
    repository: &SqliteBookmarkRepository,
    backup_dir: &Path,
    stamp: &str,
) -> DomainResult<PathBuf> {
    fs::create_dir_all(backup_dir)?;

    let dest = backup_dir.join(format!("{}_{}", stamp, repository.db_name()));
    if dest.exists() {
        return Err(DomainError::BackupExists(dest.display().to_string()));
    }

    repository.vacuum_into(&dest)?;

    // A snapshot that does not verify is worthless; surface the corruption
    // but leave the file for the caller to inspect.
    connection::check_integrity(&dest.to_string_lossy()).map_err(DomainError::from)?;

    debug!("backup written to {}", dest.display());
    Ok(dest)
}

/// Open a backup file as a repository, verifying its integrity first.
pub fn from_backup<P: AsRef<Path>>(path: P) -> DomainResult<SqliteBookmarkRepository> {
    let path = path.as_ref();
    connection::check_integrity(&path.to_string_lossy()).map_err(DomainError::from)?;
    SqliteBookmarkRepository::open(path)
}

/// List backup files of the given database name inside `dir`, sorted by file
/// name. The timestamp prefix makes that chronological; locked backups
/// (`….db.enc`) match too.
pub fn list_backups(dir: &Path, db_name: &str) -> DomainResult<Vec<PathBuf>> {
    let mut backups = Vec::new();

    if !dir.exists() {
        return Ok(backups);
    }

    let suffix = format!("_{}", db_name);
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(&suffix) || name.contains(&format!("{}.", suffix)) {
            backups.push(entry.path());
        }
    }

    backups.sort();
    Ok(backups)
}
