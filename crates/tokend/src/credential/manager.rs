// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token manager: the one place that decides when to refresh.
//!
//! Both the background monitor and the HTTP endpoint go through
//! [`TokenManager::ensure_fresh`], which holds the store mutex across the
//! whole load-check-refresh-save sequence. A caller that queued behind an
//! in-flight refresh re-checks the freshly saved credential instead of
//! refreshing again, so at most one grant is ever in flight.

use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::credential::authorize::InitialAuth;
use crate::credential::refresh::OAuthClient;
use crate::credential::store::TokenStore;
use crate::credential::{epoch_secs, Credential, TokenStatus};
use crate::error::TokenError;

/// Who asked for a freshness check. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Startup,
    Monitor,
    Request,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => f.write_str("startup"),
            Self::Monitor => f.write_str("monitor"),
            Self::Request => f.write_str("request"),
        }
    }
}

/// Result of [`TokenManager::ensure_fresh`].
#[derive(Debug, Clone, PartialEq)]
pub struct Checked {
    pub credential: Credential,
    /// Whether this call performed a refresh.
    pub refreshed: bool,
}

/// Owner of the token store and the refresh client.
pub struct TokenManager {
    store: Mutex<TokenStore>,
    client: OAuthClient,
    /// Proactive refresh margin, also used for `should_refresh_in`.
    skew: Duration,
}

impl TokenManager {
    pub fn new(store: TokenStore, client: OAuthClient, skew: Duration) -> Self {
        Self { store: Mutex::new(store), client, skew }
    }

    /// The current credential, if any, without refreshing.
    pub async fn current(&self) -> Result<Option<Credential>, TokenError> {
        self.store.lock().await.load()
    }

    /// Refresh the credential if `now >= expires_at - skew`, then return it.
    ///
    /// Fails with [`TokenError::NotAuthorized`] when nothing is stored. A
    /// failed refresh leaves the stored credential untouched.
    pub async fn ensure_fresh(
        &self,
        skew: Duration,
        trigger: RefreshTrigger,
    ) -> Result<Checked, TokenError> {
        let mut store = self.store.lock().await;
        let current = store.load()?.ok_or(TokenError::NotAuthorized)?;

        if !current.needs_refresh_at(epoch_secs(), skew) {
            return Ok(Checked { credential: current, refreshed: false });
        }

        info!(%trigger, "access token due for refresh");
        let fresh = self.client.refresh(&current).await?;
        let credential = save_with_retry(&mut store, fresh)?;
        info!(%trigger, expires_in = ?credential.expires_in, "access token refreshed");
        Ok(Checked { credential, refreshed: true })
    }

    /// Token snapshot for the HTTP endpoint, refreshing synchronously only
    /// once the access token has actually expired.
    pub async fn status(&self) -> Result<TokenStatus, TokenError> {
        let checked = self.ensure_fresh(Duration::ZERO, RefreshTrigger::Request).await?;
        Ok(TokenStatus::at(&checked.credential, epoch_secs(), self.skew))
    }

    /// Make sure a usable credential exists before serving.
    ///
    /// - nothing stored: run `auth`
    /// - stored but expired: refresh once; run `auth` if the refresh token is
    ///   missing or rejected
    /// - stored and valid: keep it
    ///
    /// Any other failure is returned and is fatal to startup.
    pub async fn bootstrap<A: InitialAuth>(&self, auth: &A) -> Result<Credential, TokenError> {
        let mut store = self.store.lock().await;

        let Some(current) = store.load()? else {
            info!(
                path = %store.path().display(),
                "no stored credential, initial authorization required"
            );
            let credential = auth.authorize().await?;
            return save_with_retry(&mut store, credential);
        };

        if !current.needs_refresh_at(epoch_secs(), Duration::ZERO) {
            info!("stored credential is still valid");
            return Ok(current);
        }

        info!(trigger = %RefreshTrigger::Startup, "stored credential expired, refreshing");
        match self.client.refresh(&current).await {
            Ok(fresh) => save_with_retry(&mut store, fresh),
            Err(e) if e.requires_reauth() => {
                warn!(err = %e, "refresh impossible, falling back to initial authorization");
                let credential = auth.authorize().await?;
                save_with_retry(&mut store, credential)
            }
            Err(e) => Err(e),
        }
    }
}

/// Save, retrying the durable write once if it fails.
///
/// The in-memory slot takes the new credential either way, but a write that
/// fails twice is returned as [`TokenError::Storage`].
fn save_with_retry(
    store: &mut TokenStore,
    credential: Credential,
) -> Result<Credential, TokenError> {
    let err = match store.save(credential) {
        Ok(saved) => return Ok(saved),
        Err(e) => e,
    };
    warn!(err = %err, "failed to persist credential, retrying once");
    store.persist()?;
    store.load()?.ok_or(err)
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
