// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory credential slot mirrored to the token file.

use std::path::{Path, PathBuf};

use crate::credential::{epoch_secs, persist, Credential};
use crate::error::TokenError;

/// Holds at most one live [`Credential`] and its durable copy.
///
/// The store is not synchronized itself; [`super::manager::TokenManager`]
/// keeps it behind a mutex so that whole load-refresh-save sequences are
/// atomic. Only one daemon may use a given token file.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    slot: Option<Credential>,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), slot: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the current credential, reading the token file on first use.
    ///
    /// Once populated the in-memory copy is authoritative and the file is not
    /// consulted again. `Ok(None)` means nothing has been stored yet.
    pub fn load(&mut self) -> Result<Option<Credential>, TokenError> {
        if self.slot.is_none() {
            self.slot = persist::read(&self.path)?;
            if self.slot.is_some() {
                tracing::debug!(path = %self.path.display(), "loaded credential from disk");
            }
        }
        Ok(self.slot.clone())
    }

    /// Stamp `credential` with its expiry, make it current, and write it out.
    pub fn save(&mut self, credential: Credential) -> Result<Credential, TokenError> {
        self.save_at(credential, epoch_secs())
    }

    /// [`save`](Self::save) with an explicit write time.
    ///
    /// If the file write fails the in-memory slot keeps the new credential
    /// and the error is returned; [`persist`](Self::persist) retries the
    /// durable write.
    pub fn save_at(&mut self, credential: Credential, now: f64) -> Result<Credential, TokenError> {
        let credential = credential.stamped(now);
        self.slot = Some(credential.clone());
        persist::write(&self.path, &credential)?;
        tracing::debug!(path = %self.path.display(), "credential persisted");
        Ok(credential)
    }

    /// Rewrite the token file from the in-memory slot.
    pub fn persist(&self) -> Result<(), TokenError> {
        match self.slot {
            Some(ref credential) => persist::write(&self.path, credential),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
