// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Failures of the token lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The authorization redirect carried no `code` (or a mismatched `state`).
    MissingAuthorizationCode,
    /// The token endpoint refused to exchange the authorization code.
    CodeExchangeFailed(String),
    /// The stored credential has no usable refresh token.
    NoRefreshToken,
    /// Talking to the authorization server failed.
    ///
    /// `rejected` is set when the server answered `invalid_grant`, meaning the
    /// refresh token itself is dead and only a new authorization can recover.
    RefreshFailed { cause: String, rejected: bool },
    /// No credential has ever been stored.
    NotAuthorized,
    /// Reading or writing the token file failed.
    Storage(String),
}

impl TokenError {
    pub fn storage(cause: impl fmt::Display) -> Self {
        Self::Storage(cause.to_string())
    }

    /// Whether recovery requires running the interactive authorization again.
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Self::NoRefreshToken | Self::NotAuthorized | Self::RefreshFailed { rejected: true, .. }
        )
    }

    /// Message safe to hand to HTTP callers.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::NotAuthorized => "initial authorization required",
            _ => "failed to obtain access token",
        }
    }

    /// Structured failure response for the token endpoint.
    pub fn to_http_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: self.public_message().to_owned() }),
        )
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAuthorizationCode => f.write_str("missing authorization code"),
            Self::CodeExchangeFailed(cause) => write!(f, "authorization code exchange failed: {cause}"),
            Self::NoRefreshToken => f.write_str("no refresh token available"),
            Self::RefreshFailed { cause, rejected: true } => {
                write!(f, "refresh token rejected: {cause}")
            }
            Self::RefreshFailed { cause, rejected: false } => write!(f, "refresh failed: {cause}"),
            Self::NotAuthorized => f.write_str("no credential stored"),
            Self::Storage(cause) => write!(f, "token storage error: {cause}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Error envelope returned by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
