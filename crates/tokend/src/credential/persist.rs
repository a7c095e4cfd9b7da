// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token file I/O: JSON record, rewritten wholesale with an atomic rename.

use std::io::ErrorKind;
use std::path::Path;

use crate::credential::Credential;
use crate::error::TokenError;

/// Read the token file. A missing file is `Ok(None)`, not an error.
pub fn read(path: &Path) -> Result<Option<Credential>, TokenError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TokenError::storage(format!("read {}: {e}", path.display()))),
    };
    let credential = serde_json::from_str(&contents)
        .map_err(|e| TokenError::storage(format!("parse {}: {e}", path.display())))?;
    Ok(Some(credential))
}

/// Replace the token file with `credential` (write tmp + rename).
///
/// Uses a unique temp filename (PID + counter) so overlapping writes never
/// share a partially written `.tmp` file.
pub fn write(path: &Path, credential: &Credential) -> Result<(), TokenError> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(credential).map_err(TokenError::storage)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| TokenError::storage(format!("create {}: {e}", parent.display())))?;
    }

    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);

    let result = write_private(&tmp_path, json.as_bytes())
        .and_then(|()| std::fs::rename(&tmp_path, path));
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(TokenError::storage(format!("write {}: {e}", path.display())));
    }
    sync_parent(path)
        .map_err(|e| TokenError::storage(format!("sync dir of {}: {e}", path.display())))
}

/// Flush the directory entry so the rename survives a crash.
#[cfg(unix)]
fn sync_parent(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Write `data` to a new file readable only by the owner.
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
