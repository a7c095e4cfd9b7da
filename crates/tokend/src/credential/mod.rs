// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single OAuth credential this daemon keeps alive.
//!
//! A [`Credential`] is created by the authorization-code exchange or by a
//! refresh, stamped with an absolute expiry when saved, and superseded by the
//! next one. [`manager::TokenManager`] owns the only live copy.

pub mod authorize;
pub mod manager;
pub mod persist;
pub mod refresh;
pub mod store;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{de, Deserialize, Deserializer, Serialize};

/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Margin before expiry at which a proactive refresh is due.
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::from_secs(60);

/// An access/refresh token pair plus whatever else the provider sent.
///
/// Serializes to the same flat JSON object the token endpoint returns, with
/// `expires_at` added. Unknown fields survive a save/load cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, as reported by the provider.
    #[serde(default, deserialize_with = "lenient_secs", skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Absolute expiry as fractional epoch seconds. Set by the store on save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<f64>,
    /// Provider-specific fields (`token_type`, `scope`, `id_token`, ...).
    #[serde(flatten)]
    pub raw_fields: serde_json::Map<String, serde_json::Value>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), ..Default::default() }
    }

    /// Whether a refresh-token grant can be attempted at all.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|rt| !rt.is_empty())
    }

    /// Derive `expires_at` from `expires_in` relative to `now`.
    ///
    /// Any `expires_at` already present (e.g. echoed by the provider) is
    /// overwritten.
    pub fn stamped(mut self, now: f64) -> Self {
        let lifetime = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        self.expires_at = Some(now + lifetime as f64);
        self
    }

    /// True once `now` has reached `expires_at - skew`.
    ///
    /// A credential without a known expiry never needs a refresh.
    pub fn needs_refresh_at(&self, now: f64, skew: Duration) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at - skew.as_secs_f64())
    }
}

/// Snapshot of the credential as reported by `GET /get_token`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenStatus {
    pub access_token: String,
    pub expires_at: Option<f64>,
    /// Whole seconds until expiry.
    pub expires_in: Option<i64>,
    /// Whole seconds until the proactive refresh boundary, floored at 0.
    pub should_refresh_in: Option<i64>,
}

impl TokenStatus {
    pub fn at(credential: &Credential, now: f64, skew: Duration) -> Self {
        let remaining = credential.expires_at.map(|expires_at| expires_at - now);
        Self {
            access_token: credential.access_token.clone(),
            expires_at: credential.expires_at,
            expires_in: remaining.map(|r| r as i64),
            should_refresh_in: remaining.map(|r| ((r - skew.as_secs_f64()) as i64).max(0)),
        }
    }
}

/// Provider endpoints and client credentials, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub scope: Option<String>,
    /// Upper bound on any single token endpoint request.
    pub request_timeout: Duration,
}

/// Accept a lifetime given as an integer, a float or a numeric string.
///
/// Fractions are truncated and negative values clamp to zero.
fn lenient_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let secs = match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match secs {
        Some(secs) if secs.is_finite() => Ok(Some(secs.max(0.0) as u64)),
        _ => Err(de::Error::custom("expires_in is not a number of seconds")),
    }
}

/// Current wall-clock time as fractional epoch seconds.
pub fn epoch_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
