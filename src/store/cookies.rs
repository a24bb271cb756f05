// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable storage for session cookies, one JSON file per account.
//!
//! The store is the only persistence in the pipeline. Writes are atomic
//! (temp file + rename) so a crash mid-write can never leave a truncated
//! bundle that a later run misreads as valid cookies.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One persisted session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// Derive the store key for an account from its login email.
///
/// Uses the local part only and strips anything unsafe for a filename, so
/// `rider@example.com` and `rider@other.org` share history only if they
/// share a local part and store directory.
pub fn identity_key(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    local
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Filesystem-backed credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{identity}.cookies.json"))
    }

    /// Read the persisted bundle for an identity.
    ///
    /// A missing file is `Ok(None)`, not an error. A file that exists but
    /// does not decode is reported as a store error; the authenticator
    /// decides whether to proceed login-only.
    pub fn read(&self, identity: &str) -> Result<Option<Vec<SessionCookie>>, AppError> {
        let path = self.path_for(identity);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Store(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let bundle: Vec<SessionCookie> = serde_json::from_slice(&data).map_err(|e| {
            AppError::Store(format!("corrupt cookie file {}: {e}", path.display()))
        })?;

        tracing::debug!(identity, count = bundle.len(), "cookie bundle loaded");
        Ok(Some(bundle))
    }

    /// Durably persist a bundle, replacing any prior value for the identity.
    pub fn save(&self, identity: &str, bundle: &[SessionCookie]) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::Store(format!("failed to create {}: {e}", self.dir.display()))
        })?;

        let path = self.path_for(identity);
        let tmp = path.with_extension("json.tmp");

        let data = serde_json::to_vec_pretty(bundle)
            .map_err(|e| AppError::Store(format!("failed to encode cookie bundle: {e}")))?;

        write_and_sync(&tmp, &data)
            .map_err(|e| AppError::Store(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::Store(format!("failed to replace {}: {e}", path.display()))
        })?;

        tracing::info!(identity, count = bundle.len(), "cookie bundle saved");
        Ok(())
    }

    /// Delete any persisted bundle for the identity. Idempotent.
    pub fn remove(&self, identity: &str) -> Result<(), AppError> {
        let path = self.path_for(identity);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::warn!(identity, "invalid cookie bundle deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Store(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

fn write_and_sync(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_key_uses_local_part() {
        assert_eq!(identity_key("rider@example.com"), "rider");
        assert_eq!(identity_key("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn identity_key_sanitizes_separators() {
        assert_eq!(identity_key("weird/../name@example.com"), "weird_.._name");
    }
}
