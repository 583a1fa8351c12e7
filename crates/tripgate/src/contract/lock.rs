//! Contract lock: freeze and drift verification.
//!
//! The lock file holds the SHA-256 hex digest of the contract document's
//! bytes. Verification recomputes the digest and compares it byte-for-byte
//! against the recorded value; any mismatch is a blocking failure with no
//! partial-success mode. Hashing the raw bytes (rather than a re-serialized
//! form) means even a comment or whitespace edit counts as drift, which is
//! the point: the reviewed artifact is the file.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{Error, Result};

/// Compute the SHA-256 hex digest of the contract file's bytes.
///
/// # Errors
///
/// Returns [`Error::ContractLoad`] if the file cannot be read.
pub fn contract_digest(contract_path: &Path) -> Result<String> {
    let bytes = std::fs::read(contract_path)
        .map_err(|err| Error::contract_load(contract_path, err.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Read the recorded digest from a lock file, trimmed.
///
/// # Errors
///
/// Returns [`Error::ContractLoad`] if the lock file cannot be read.
pub fn read_lock(lock_path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(lock_path)
        .map_err(|err| Error::contract_load(lock_path, err.to_string()))?;
    Ok(text.trim().to_string())
}

/// Freeze the contract: write its digest to the lock file.
///
/// Refuses to overwrite an existing lock unless `force` is set; replacing
/// a lock is a versioned contract change, not a routine operation.
///
/// # Errors
///
/// Returns a configuration error when the lock already exists without
/// `force`, or [`Error::ContractLoad`] / I/O errors on filesystem failures.
pub fn freeze(contract_path: &Path, lock_path: &Path, force: bool) -> Result<String> {
    if lock_path.exists() && !force {
        return Err(Error::config(format!(
            "lock file {} already exists; pass --force to re-freeze the contract",
            lock_path.display()
        )));
    }
    let digest = contract_digest(contract_path)?;
    std::fs::write(lock_path, format!("{digest}\n"))?;
    info!(lock = %lock_path.display(), %digest, "contract frozen");
    Ok(digest)
}

/// Verify that the contract still matches its recorded lock.
///
/// Returns the confirmed digest on success.
///
/// # Errors
///
/// Returns [`Error::ContractDrift`] when the digests differ, or
/// [`Error::ContractLoad`] when either file is unreadable.
pub fn verify(contract_path: &Path, lock_path: &Path) -> Result<String> {
    let expected = read_lock(lock_path)?;
    let actual = contract_digest(contract_path)?;
    if expected != actual {
        return Err(Error::ContractDrift {
            path: contract_path.to_path_buf(),
            expected,
            actual,
        });
    }
    info!(contract = %contract_path.display(), digest = %actual, "lock matches contract");
    Ok(actual)
}
