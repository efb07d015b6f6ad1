// bmk/src/infrastructure/locker.rs
//
// At-rest encryption of the database file. The file is an opaque blob here;
// the locker must never run while a SQLite handle is open on the same path.
//
// Ciphertext layout: nonce (12 bytes) || AES-256-GCM seal of the plaintext.
// Key: SHA-256 of the passphrase.
//
// lock/unlock replace the file through a backup copy so a partial failure
// never leaves an ambiguous mix of old and new content: transform in memory,
// copy the original aside, write the target, remove the original, and only
// then delete the backup. Any failed step restores from the backup and
// surfaces a composite error naming both failures.

use std::fs;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, KeyInit, Nonce};
use chrono::Local;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument};

/// GCM standard nonce size in bytes.
const NONCE_SIZE: usize = 12;

/// Extension of a locked file.
const LOCKED_EXT: &str = "enc";

#[derive(Error, Debug)]
pub enum LockerError {
    #[error("passphrase cannot be empty")]
    PassphraseEmpty,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("file extension mismatch, expected .{LOCKED_EXT}: {0}")]
    FileExtMismatch(String),

    #[error("ciphertext shorter than the nonce")]
    CipherTextShort,

    #[error("file is locked: {0}")]
    ItemLocked(String),

    #[error("cipher failure: {0}")]
    Crypto(String),

    #[error("failed to replace {path}: {cause}; {rollback}")]
    ReplaceFailed {
        path: String,
        cause: String,
        rollback: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LockerResult<T> = Result<T, LockerError>;

fn derive_key(passphrase: &str) -> [u8; 32] {
    Sha256::digest(passphrase.as_bytes()).into()
}

fn cipher_for(passphrase: &str) -> LockerResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&derive_key(passphrase))
        .map_err(|e| LockerError::Crypto(e.to_string()))
}

/// Encrypt `plaintext` under the passphrase-derived key.
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> LockerResult<Vec<u8>> {
    let cipher = cipher_for(passphrase)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| LockerError::Crypto(e.to_string()))?;

    let mut output = Vec::with_capacity(NONCE_SIZE + sealed.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&sealed);
    Ok(output)
}

/// Decrypt `nonce || seal` data; a wrong passphrase or tampered payload
/// fails authentication.
pub fn decrypt(data: &[u8], passphrase: &str) -> LockerResult<Vec<u8>> {
    if data.len() < NONCE_SIZE {
        return Err(LockerError::CipherTextShort);
    }

    let (nonce_bytes, sealed) = data.split_at(NONCE_SIZE);
    let cipher = cipher_for(passphrase)?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), sealed)
        .map_err(|_| LockerError::Crypto("authentication failed".to_string()))
}

/// Encrypt the file in place, producing `<path>.enc` and removing the
/// original. Returns the locked path.
#[instrument(skip(passphrase), level = "debug")]
pub fn lock(path: &Path, passphrase: &str) -> LockerResult<PathBuf> {
    if passphrase.is_empty() {
        return Err(LockerError::PassphraseEmpty);
    }
    if !path.exists() {
        return Err(LockerError::FileNotFound(path.display().to_string()));
    }

    let plaintext = fs::read(path)?;
    let output = encrypt(&plaintext, passphrase)?;

    let target = locked_path(path);
    replace_file(path, &target, &output)?;
    debug!("locked {} -> {}", path.display(), target.display());
    Ok(target)
}

/// Decrypt `<path>.enc` back into the original file name. Returns the
/// unlocked path.
#[instrument(skip(passphrase), level = "debug")]
pub fn unlock(path: &Path, passphrase: &str) -> LockerResult<PathBuf> {
    if passphrase.is_empty() {
        return Err(LockerError::PassphraseEmpty);
    }
    if !path.exists() {
        return Err(LockerError::FileNotFound(path.display().to_string()));
    }
    if path.extension().and_then(|e| e.to_str()) != Some(LOCKED_EXT) {
        return Err(LockerError::FileExtMismatch(path.display().to_string()));
    }

    let ciphertext = fs::read(path)?;
    let output = decrypt(&ciphertext, passphrase)?;

    let target = path.with_extension("");
    replace_file(path, &target, &output)?;
    debug!("unlocked {} -> {}", path.display(), target.display());
    Ok(target)
}

/// Ok when no locked counterpart exists; `ItemLocked` when it does.
pub fn is_locked(path: &Path) -> LockerResult<()> {
    let locked = if path.extension().and_then(|e| e.to_str()) == Some(LOCKED_EXT) {
        path.to_path_buf()
    } else {
        locked_path(path)
    };

    if locked.exists() {
        return Err(LockerError::ItemLocked(locked.display().to_string()));
    }
    Ok(())
}

fn locked_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(LOCKED_EXT);
    PathBuf::from(name)
}

/// Write `output` to `target` and retire `source`, with a timestamped backup
/// copy of `source` as the rollback log. The backup is removed only after
/// every step succeeded.
fn replace_file(source: &Path, target: &Path, output: &[u8]) -> LockerResult<()> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup = PathBuf::from(format!("{}.backup_{}", source.display(), stamp));
    fs::copy(source, &backup)?;

    if let Err(write_err) = fs::write(target, output) {
        let _ = fs::remove_file(target);
        let rollback = match fs::copy(&backup, source) {
            Ok(_) => "original restored from backup".to_string(),
            Err(restore_err) => format!("backup restore failed: {}", restore_err),
        };
        let _ = fs::remove_file(&backup);
        return Err(LockerError::ReplaceFailed {
            path: target.display().to_string(),
            cause: write_err.to_string(),
            rollback,
        });
    }

    if source != target {
        if let Err(remove_err) = fs::remove_file(source) {
            let _ = fs::remove_file(target);
            let rollback = match fs::copy(&backup, source) {
                Ok(_) => "original restored from backup".to_string(),
                Err(restore_err) => format!("backup restore failed: {}", restore_err),
            };
            let _ = fs::remove_file(&backup);
            return Err(LockerError::ReplaceFailed {
                path: source.display().to_string(),
                cause: remove_err.to_string(),
                rollback,
            });
        }
    }

    fs::remove_file(&backup)?;
    Ok(())
}
