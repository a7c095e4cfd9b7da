// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;

fn full_credential() -> Credential {
    let mut cred = Credential {
        refresh_token: Some("rt-1".into()),
        expires_in: Some(1800),
        ..Credential::new("at-1")
    };
    cred.raw_fields.insert("token_type".into(), json!("Bearer"));
    cred.raw_fields.insert("scope".into(), json!("api"));
    cred
}

#[test]
fn cold_start_without_file_is_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = TokenStore::new(dir.path().join("token_store.json"));
    assert_eq!(store.load()?, None);
    Ok(())
}

#[test]
fn save_stamps_expiry_from_write_time() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = TokenStore::new(dir.path().join("token_store.json"));

    let saved = store.save_at(full_credential(), 1_000.0)?;
    assert_eq!(saved.expires_at, Some(2_800.0));
    Ok(())
}

#[test]
fn save_uses_wall_clock() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = TokenStore::new(dir.path().join("token_store.json"));

    let before = epoch_secs();
    let saved = store.save(full_credential())?;
    let after = epoch_secs();

    let expires_at = saved.expires_at.unwrap_or_default();
    assert!(expires_at >= before + 1800.0 && expires_at <= after + 1800.0);
    Ok(())
}

#[test]
fn save_then_load_is_field_for_field_equal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = TokenStore::new(dir.path().join("token_store.json"));

    let saved = store.save(full_credential())?;
    let loaded = store.load()?;
    assert_eq!(loaded, Some(saved));
    Ok(())
}

#[test]
fn cold_load_reads_what_was_saved() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("token_store.json");

    let saved = TokenStore::new(&path).save_at(full_credential(), 1_000.0)?;
    let loaded = TokenStore::new(&path).load()?;
    assert_eq!(loaded, Some(saved));
    Ok(())
}

#[test]
fn memory_is_authoritative_once_loaded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("token_store.json");
    std::fs::write(&path, r#"{"access_token":"from-disk"}"#)?;

    let mut store = TokenStore::new(&path);
    assert_eq!(store.load()?.map(|c| c.access_token), Some("from-disk".to_owned()));

    // A foreign write after the first load is ignored.
    std::fs::write(&path, r#"{"access_token":"tampered"}"#)?;
    assert_eq!(store.load()?.map(|c| c.access_token), Some("from-disk".to_owned()));
    Ok(())
}

#[test]
fn failed_write_keeps_new_credential_in_memory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory")?;
    let mut store = TokenStore::new(blocker.join("token_store.json"));

    let result = store.save_at(full_credential(), 0.0);
    assert!(matches!(result, Err(TokenError::Storage(_))));
    assert_eq!(store.load()?.map(|c| c.access_token), Some("at-1".to_owned()));

    // Once the obstacle is gone the durable write can be retried.
    std::fs::remove_file(&blocker)?;
    store.persist()?;
    let on_disk = TokenStore::new(store.path()).load()?;
    assert_eq!(on_disk.map(|c| c.access_token), Some("at-1".to_owned()));
    Ok(())
}

#[test]
fn persist_on_empty_store_is_noop() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = TokenStore::new(dir.path().join("token_store.json"));
    store.persist()?;
    assert!(!store.path().exists());
    Ok(())
}
