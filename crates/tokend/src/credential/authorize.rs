// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive authorization-code flow that produces the first credential.
//!
//! The operator opens the printed URL, signs in with the provider, and pastes
//! back the URL the browser was redirected to. The code in that URL is then
//! exchanged at the token endpoint.

use std::future::Future;

use rand::Rng;
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::credential::refresh::OAuthClient;
use crate::credential::{Credential, OAuthSettings};
use crate::error::TokenError;

/// Source of a brand-new credential when none exists or the refresh token
/// is no longer usable.
pub trait InitialAuth {
    /// Run the flow once. May block on the operator for a long time.
    fn authorize(&self) -> impl Future<Output = Result<Credential, TokenError>> + Send;
}

/// Authorization URL plus the CSRF `state` it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

impl AuthorizationRequest {
    pub fn new(settings: &OAuthSettings) -> anyhow::Result<Self> {
        Self::with_state(settings, generate_state())
    }

    pub fn with_state(settings: &OAuthSettings, state: String) -> anyhow::Result<Self> {
        let mut url = Url::parse(&settings.authorize_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &settings.client_id)
                .append_pair("redirect_uri", &settings.redirect_uri);
            if let Some(ref scope) = settings.scope {
                query.append_pair("scope", scope);
            }
            query.append_pair("state", &state);
        }
        Ok(Self { url: url.into(), state })
    }

    /// Pull the authorization code out of the pasted redirect URL.
    ///
    /// A redirect whose `state` differs from ours is treated like one with no
    /// code at all. Redirects without a `state` are accepted since some
    /// providers drop it.
    pub fn extract_code(&self, redirected: &str) -> Result<String, TokenError> {
        let url = Url::parse(redirected.trim()).map_err(|_| TokenError::MissingAuthorizationCode)?;

        let mut code = None;
        let mut state = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                _ => {}
            }
        }

        if state.is_some_and(|s| s != self.state) {
            tracing::warn!("authorization redirect carried a mismatched state");
            return Err(TokenError::MissingAuthorizationCode);
        }
        code.filter(|c| !c.is_empty()).ok_or(TokenError::MissingAuthorizationCode)
    }
}

/// Random URL-safe `state` value (32 chars).
pub fn generate_state() -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut rng = rand::rng();
    (0..32).map(|_| char::from(CHARS[rng.random_range(0..CHARS.len())])).collect()
}

/// Console implementation of [`InitialAuth`]: prints the URL on stdout and
/// reads the redirect URL from stdin.
pub struct ConsoleAuth {
    client: OAuthClient,
}

impl ConsoleAuth {
    pub fn new(client: OAuthClient) -> Self {
        Self { client }
    }

    async fn prompt(&self, request: &AuthorizationRequest) -> Result<String, TokenError> {
        let mut stdout = tokio::io::stdout();
        let banner = format!(
            "\nOpen this URL in a browser and sign in:\n\n  {}\n\nPaste the full URL you were redirected to: ",
            request.url
        );
        stdout
            .write_all(banner.as_bytes())
            .await
            .map_err(|_| TokenError::MissingAuthorizationCode)?;
        stdout.flush().await.map_err(|_| TokenError::MissingAuthorizationCode)?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|_| TokenError::MissingAuthorizationCode)?;
        Ok(line)
    }
}

impl InitialAuth for ConsoleAuth {
    async fn authorize(&self) -> Result<Credential, TokenError> {
        let request = AuthorizationRequest::new(self.client.settings())
            .map_err(|e| TokenError::CodeExchangeFailed(format!("authorization URL: {e}")))?;
        tracing::info!("waiting for interactive authorization");

        let redirected = self.prompt(&request).await?;
        let code = request.extract_code(&redirected)?;
        let credential = self.client.exchange_code(&code).await?;
        tracing::info!("authorization code exchanged");
        Ok(credential)
    }
}

#[cfg(test)]
#[path = "authorize_tests.rs"]
mod tests;
