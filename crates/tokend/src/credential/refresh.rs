// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token endpoint client: refresh-token and authorization-code grants.

use serde::Deserialize;

use crate::credential::{Credential, OAuthSettings};
use crate::error::TokenError;

/// OAuth error response from the provider.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// How a token endpoint call failed, before it is mapped to a grant-specific
/// [`TokenError`].
#[derive(Debug)]
enum GrantError {
    /// The server answered with an OAuth error body.
    OAuth { status: reqwest::StatusCode, error: String, description: Option<String> },
    /// Anything else: transport, non-OAuth status, undecodable body.
    Other(String),
}

impl std::fmt::Display for GrantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OAuth { status, error, description: Some(d) } => {
                write!(f, "HTTP {status}: {error}: {d}")
            }
            Self::OAuth { status, error, description: None } => write!(f, "HTTP {status}: {error}"),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

/// Client for the provider's token endpoint.
///
/// Performs exactly one request per call. Retry policy belongs to callers.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    settings: OAuthSettings,
}

impl OAuthClient {
    pub fn new(settings: OAuthSettings) -> anyhow::Result<Self> {
        crate::install_crypto_provider();
        let http = reqwest::Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Exchange the refresh token of `current` for a new credential.
    ///
    /// Fails with [`TokenError::NoRefreshToken`] without touching the network
    /// when there is nothing to exchange. The result is not stamped or saved.
    pub async fn refresh(&self, current: &Credential) -> Result<Credential, TokenError> {
        let refresh_token = match current.refresh_token.as_deref() {
            Some(rt) if !rt.is_empty() => rt,
            _ => return Err(TokenError::NoRefreshToken),
        };

        let mut form = vec![("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        if let Some(ref scope) = self.settings.scope {
            form.push(("scope", scope.as_str()));
        }

        let mut fresh = self.post_token(&form).await.map_err(|e| {
            let rejected =
                matches!(e, GrantError::OAuth { ref error, .. } if error == "invalid_grant");
            TokenError::RefreshFailed { cause: e.to_string(), rejected }
        })?;

        // Providers that do not rotate refresh tokens omit them on refresh.
        if !fresh.has_refresh_token() {
            fresh.refresh_token = current.refresh_token.clone();
        }
        Ok(fresh)
    }

    /// Exchange an authorization code for the first credential.
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, TokenError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
        ];
        self.post_token(&form).await.map_err(|e| TokenError::CodeExchangeFailed(e.to_string()))
    }

    /// POST a form to the token endpoint with HTTP Basic client auth.
    async fn post_token(&self, form: &[(&str, &str)]) -> Result<Credential, GrantError> {
        let resp = self
            .http
            .post(&self.settings.token_url)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| GrantError::Other(format!("HTTP error: {e}")))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| GrantError::Other(format!("read body: {e}")))?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&body) {
                return Err(GrantError::OAuth {
                    status,
                    error: err.error,
                    description: err.error_description,
                });
            }
            return Err(GrantError::Other(format!("HTTP {status}: {body}")));
        }

        let credential: Credential = serde_json::from_str(&body)
            .map_err(|e| GrantError::Other(format!("parse response: {e}")))?;
        if credential.access_token.is_empty() {
            return Err(GrantError::Other("response has empty access_token".to_owned()));
        }
        Ok(credential)
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
